use std::{sync::Arc, time::Duration};

use clap::{Parser, Subcommand};
use env_logger::Env;
use log::{error, info, warn};
use mathbot::Config;
use tokio::net::TcpListener;

mod error;
mod handler;
mod health;
mod keyboard;
mod settings;
mod telegram;

use error::Result;
use settings::Settings;
use telegram::Client;

const RETRY_DELAY: Duration = Duration::from_secs(3);

/// Telegram bot that solves math typed in plain text.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Polls Telegram and serves the health endpoint (default)
    Serve,
    /// Serves only the health endpoint
    Health,
    /// Sends one GET request to keep a hosted instance awake
    Ping {
        /// Address of the running service
        url: String,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let result = match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve().await,
        Command::Health => health_only().await,
        Command::Ping { url } => ping(&url).await,
    };
    if let Err(err) = result {
        error!("❌ {}", err);
        std::process::exit(1);
    }
}

async fn serve() -> Result<()> {
    let settings = Settings::from_env()?;
    info!("✅ Токен получен, запускаем бота...");
    let config = Arc::new(Config::from_env()?);
    let client = Client::new(&settings)?;

    let listener = TcpListener::bind(("0.0.0.0", settings.port)).await?;
    tokio::spawn(async move {
        if let Err(err) = health::serve(listener).await {
            error!("health endpoint stopped: {}", err);
        }
    });

    info!("🚀 Запускаем Math Genius Bot...");
    tokio::select! {
        result = poll(client, config, settings.poll_timeout) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
            Ok(())
        }
    }
}

async fn health_only() -> Result<()> {
    let port = settings::port(|key| std::env::var(key).ok())?;
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    tokio::select! {
        result = health::serve(listener) => Ok(result?),
        _ = tokio::signal::ctrl_c() => Ok(()),
    }
}

/// Long polling loop. Each update is handled on its own task.
async fn poll(client: Client, config: Arc<Config>, timeout: u64) -> Result<()> {
    let mut offset = 0;
    loop {
        let updates = match client.get_updates(offset, timeout).await {
            Ok(updates) => updates,
            Err(err) => {
                warn!("getUpdates failed: {}", err);
                tokio::time::sleep(RETRY_DELAY).await;
                continue;
            }
        };
        for update in updates {
            offset = offset.max(update.update_id + 1);
            let client = client.clone();
            let config = Arc::clone(&config);
            tokio::spawn(async move {
                let id = update.update_id;
                if let Err(err) = handler::handle_update(&client, &config, update).await {
                    warn!("update {} failed: {}", id, err);
                }
            });
        }
    }
}

async fn ping(url: &str) -> Result<()> {
    let response = reqwest::get(url).await?;
    info!("Ping successful: {}", response.status());
    Ok(())
}
