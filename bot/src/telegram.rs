//! The subset of the Telegram Bot API the bot talks.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    error::{BotError, Result},
    settings::Settings,
};

#[derive(Deserialize, Debug)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Chat {
    pub id: i64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CallbackQuery {
    pub id: String,
    pub data: Option<String>,
    pub message: Option<Message>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base: String,
}

impl Client {
    pub fn new(settings: &Settings) -> Result<Client> {
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()?;
        Ok(Client {
            http,
            base: format!("{}/bot{}", settings.api_url.trim_end_matches('/'), settings.token),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: &Value) -> Result<T> {
        let response: ApiResponse<T> = self
            .http
            .post(format!("{}/{}", self.base, method))
            .json(body)
            .send()
            .await?
            .json()
            .await?;
        match response {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse { description, .. } => Err(BotError::Api {
                method: method.to_owned(),
                description: description.unwrap_or_else(|| String::from("no result")),
            }),
        }
    }

    /// Long polls for updates after `offset`.
    pub async fn get_updates(&self, offset: i64, timeout: u64) -> Result<Vec<Update>> {
        let body = json!({
            "offset": offset,
            "timeout": timeout,
            "allowed_updates": ["message", "callback_query"],
        });
        self.call("getUpdates", &body).await
    }

    /// Sends Markdown text. Falls back to plain text when Telegram cannot
    /// parse the markup.
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i64>,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<()> {
        let mut body = message_body(chat_id, text, reply_to, keyboard);
        match self.call::<Value>("sendMessage", &body).await {
            Err(BotError::Api { description, .. }) if description.contains("can't parse entities") => {
                log::warn!("markdown rejected, sending plain text: {}", description);
                if let Some(fields) = body.as_object_mut() {
                    fields.remove("parse_mode");
                }
                self.call::<Value>("sendMessage", &body).await.map(drop)
            }
            result => result.map(drop),
        }
    }

    pub async fn send_chat_action(&self, chat_id: i64, action: &str) -> Result<()> {
        let body = json!({ "chat_id": chat_id, "action": action });
        self.call::<bool>("sendChatAction", &body).await.map(drop)
    }

    pub async fn answer_callback_query(&self, id: &str) -> Result<()> {
        let body = json!({ "callback_query_id": id });
        self.call::<bool>("answerCallbackQuery", &body).await.map(drop)
    }
}

fn message_body(
    chat_id: i64,
    text: &str,
    reply_to: Option<i64>,
    keyboard: Option<&InlineKeyboardMarkup>,
) -> Value {
    let mut body = json!({
        "chat_id": chat_id,
        "text": text,
        "parse_mode": "Markdown",
    });
    if let Some(fields) = body.as_object_mut() {
        if let Some(id) = reply_to {
            fields.insert(String::from("reply_to_message_id"), json!(id));
        }
        if let Some(keyboard) = keyboard {
            fields.insert(String::from("reply_markup"), json!(keyboard));
        }
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn updates_deserialize() {
        let raw = r#"{
            "ok": true,
            "result": [
                {"update_id": 7, "message": {"message_id": 1, "chat": {"id": 42, "type": "private"}, "text": "2+2"}},
                {"update_id": 8, "callback_query": {"id": "q", "data": "menu_examples",
                    "message": {"message_id": 2, "chat": {"id": 42}}}}
            ]
        }"#;
        let response: ApiResponse<Vec<Update>> = serde_json::from_str(raw).unwrap();
        let updates = response.result.unwrap();
        assert_eq!(updates[0].message.as_ref().unwrap().text.as_deref(), Some("2+2"));
        let query = updates[1].callback_query.as_ref().unwrap();
        assert_eq!(query.data.as_deref(), Some("menu_examples"));
        assert_eq!(query.message.as_ref().unwrap().chat.id, 42);
    }

    #[test]
    fn errors_deserialize() {
        let raw = r#"{"ok": false, "error_code": 401, "description": "Unauthorized"}"#;
        let response: ApiResponse<Vec<Update>> = serde_json::from_str(raw).unwrap();
        assert!(!response.ok);
        assert_eq!(response.description.as_deref(), Some("Unauthorized"));
    }

    #[test]
    fn message_bodies() {
        let keyboard = InlineKeyboardMarkup {
            inline_keyboard: vec![vec![InlineKeyboardButton {
                text: String::from("🧮 Примеры"),
                callback_data: String::from("menu_examples"),
            }]],
        };
        let body = message_body(1, "hi", Some(5), Some(&keyboard));
        assert_eq!(body["parse_mode"], "Markdown");
        assert_eq!(body["reply_to_message_id"], 5);
        assert_eq!(
            body["reply_markup"]["inline_keyboard"][0][0]["callback_data"],
            "menu_examples"
        );
        assert!(message_body(1, "hi", None, None).get("reply_markup").is_none());
    }
}
