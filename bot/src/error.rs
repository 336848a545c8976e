use thiserror::Error;

#[derive(Debug, Error)]
pub enum BotError {
    #[error("TELEGRAM_TOKEN не найден в переменных окружения")]
    MissingToken,

    #[error("invalid PORT `{0}`")]
    InvalidPort(String),

    #[error(transparent)]
    Config(#[from] mathbot::ConfigError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Telegram answered with `ok: false`.
    #[error("telegram api error in {method}: {description}")]
    Api { method: String, description: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BotError>;
