//! Replies to commands, messages and button presses.

use std::sync::Arc;

use mathbot::{catalog, format, interpret, lookup_symbol, Callback, Category, Config};

use crate::{
    error::Result,
    keyboard,
    telegram::{Client, InlineKeyboardMarkup, Message, Update},
};

pub const WELCOME: &str = "🤖 *Math Genius Bot*

Привет! Я решаю математические примеры.

*Примеры:*
• 2+2\\*2
• x^2-4=0
• (15-3)/4

Просто напиши пример! 🚀";

pub const HELP: &str = "📖 *Что я умею*

• арифметика: `2+2*2`, `sqrt(16)`, `pi*2`
• уравнения: `x^2-4=0`, `solve x^3 - 8`
• неравенства: `x^2 < 9`
• производные: `diff x^3`, `diff(x*y, y)`
• интегралы: `integrate x^2 dx`, `integrate(x^2, (x, 0, 1))`
• пределы: `limit sin(x)/x, x->0`
• суммы и произведения: `Sum n`, `Product(k, (k, 1, 4))`
• факториалы: `5!`

Можно писать символами: ×, ÷, √, π, ², ≤, ∫, ∑.
/examples примеры, /symbols символы";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<InlineKeyboardMarkup>,
}

impl Reply {
    fn text(text: impl Into<String>) -> Reply {
        Reply {
            text: text.into(),
            keyboard: None,
        }
    }

    fn with(text: impl Into<String>, keyboard: InlineKeyboardMarkup) -> Reply {
        Reply {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }
}

/// The reply to a `/command`, ignoring a `@botname` suffix.
pub fn reply_for_command(text: &str) -> Option<Reply> {
    let command = text.split_whitespace().next()?;
    let command = command.split('@').next().unwrap_or(command);
    match command {
        "/start" => Some(Reply::with(WELCOME, keyboard::welcome())),
        "/help" => Some(Reply::text(HELP)),
        "/examples" => Some(Reply::with(examples_text(), keyboard::categories())),
        "/symbols" => Some(Reply::with(
            "🔣 *Символы*\nНажмите на символ, чтобы узнать, как я его понимаю.",
            keyboard::symbols(),
        )),
        _ => None,
    }
}

pub fn examples_text() -> String {
    let mut text = String::from("📋 *Примеры для теста:*");
    for category in Category::ALL {
        text.push_str(&format!("\n\n*{}*", category.title()));
        for example in catalog().iter().filter(|e| e.category == category) {
            text.push_str(&format!(
                "\n{} {}",
                format::code(example.expression),
                format::escape(example.description)
            ));
        }
    }
    text
}

/// The reply to a button press. `Calculate` runs the full pipeline.
pub fn reply_for_callback(callback: &Callback, config: &Config) -> Reply {
    match callback {
        Callback::Calculate(expr) => Reply::text(interpret(expr, config)),
        Callback::Symbol(code) => match lookup_symbol(code) {
            Some(entry) => Reply::text(format!(
                "{} → {}\n{}",
                format::code(&entry.pattern),
                format::code(&entry.canonical),
                format::escape(&entry.description)
            )),
            None => Reply::text("❓ Неизвестный символ"),
        },
        Callback::ExamplesMenu => Reply::with("🧮 Выберите раздел:", keyboard::categories()),
        Callback::SymbolsMenu => Reply::with("🔣 Выберите символ:", keyboard::symbols()),
        Callback::Category(category) => Reply::with(
            format!("*{}*\nНажмите на пример, чтобы решить его.", category.title()),
            keyboard::examples(*category),
        ),
    }
}

pub async fn handle_update(client: &Client, config: &Arc<Config>, update: Update) -> Result<()> {
    if let Some(message) = update.message {
        return handle_message(client, config, message).await;
    }
    let Some(query) = update.callback_query else {
        return Ok(());
    };
    client.answer_callback_query(&query.id).await?;
    let (Some(data), Some(message)) = (query.data, query.message) else {
        return Ok(());
    };
    let Some(callback) = Callback::parse(&data) else {
        log::debug!("ignoring callback {:?}", data);
        return Ok(());
    };
    let chat = message.chat.id;
    let reply = if matches!(callback, Callback::Calculate(_)) {
        client.send_chat_action(chat, "typing").await?;
        let config = Arc::clone(config);
        tokio::task::spawn_blocking(move || reply_for_callback(&callback, &config))
            .await
            .unwrap_or_else(|err| Reply::text(format!("❌ Ошибка: {}", err)))
    } else {
        reply_for_callback(&callback, config)
    };
    client
        .send_message(chat, &reply.text, None, reply.keyboard.as_ref())
        .await
}

async fn handle_message(client: &Client, config: &Arc<Config>, message: Message) -> Result<()> {
    let Some(text) = message.text else {
        return Ok(());
    };
    let chat = message.chat.id;
    if text.starts_with('/') {
        let reply = reply_for_command(&text).unwrap_or_else(|| Reply::text(HELP));
        return client
            .send_message(chat, &reply.text, None, reply.keyboard.as_ref())
            .await;
    }
    log::info!("chat {}: {:?}", chat, text);
    client.send_chat_action(chat, "typing").await?;
    let job_config = Arc::clone(config);
    let reply = tokio::task::spawn_blocking(move || interpret(&text, &job_config))
        .await
        .unwrap_or_else(|err| format!("❌ Ошибка: {}", err));
    client
        .send_message(chat, &reply, Some(message.message_id), None)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands() {
        let start = reply_for_command("/start").unwrap();
        assert!(start.text.starts_with("🤖 *Math Genius Bot*"));
        assert_eq!(start.keyboard, Some(keyboard::welcome()));
        assert_eq!(reply_for_command("/help@MathGeniusBot").unwrap().text, HELP);
        assert!(reply_for_command("/examples").unwrap().text.contains("`x^2-4=0`"));
        assert!(reply_for_command("/symbols").unwrap().keyboard.is_some());
        assert_eq!(reply_for_command("/nope"), None);
    }

    #[test]
    fn examples_list_the_originals() {
        let text = examples_text();
        for expr in ["2+2*2", "x^2-4=0", "(15-3)/4", "sqrt(16)", "pi*2"] {
            assert!(text.contains(&format!("`{expr}`")), "{expr}");
        }
    }

    #[test]
    fn callbacks() {
        let config = Config::default();
        let reply = reply_for_callback(&Callback::Calculate("2+2*2".into()), &config);
        assert_eq!(reply.text, "🎯 *Пример:* `2+2*2`\n📚 *Решение:* Результат: `6`");
        let reply = reply_for_callback(&Callback::Symbol("le".into()), &config);
        assert!(reply.text.starts_with("`≤` → `<=`"));
        let reply = reply_for_callback(&Callback::Symbol("missing".into()), &config);
        assert!(reply.text.contains("Неизвестный"));
        let reply = reply_for_callback(&Callback::Category(Category::Series), &config);
        assert_eq!(reply.keyboard, Some(keyboard::examples(Category::Series)));
        assert!(reply_for_callback(&Callback::ExamplesMenu, &config).keyboard.is_some());
    }
}
