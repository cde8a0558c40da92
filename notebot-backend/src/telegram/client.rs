//! Outbound Telegram Bot API calls.
//!
//! Everything the bot says goes through [`ChatTransport`] so the workflow and
//! the thought relay can be exercised without the network.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::types::InlineKeyboardMarkup;

/// A chat message to deliver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub chat_id: String,
    pub text: String,
    pub reply_markup: Option<InlineKeyboardMarkup>,
    /// Thread the message as a reply to this message in `chat_id`
    pub reply_to_message_id: Option<i64>,
}

impl OutboundMessage {
    pub fn text(chat_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            text: text.into(),
            reply_markup: None,
            reply_to_message_id: None,
        }
    }

    pub fn with_markup(mut self, markup: InlineKeyboardMarkup) -> Self {
        self.reply_markup = Some(markup);
        self
    }

    pub fn replying_to(mut self, message_id: i64) -> Self {
        self.reply_to_message_id = Some(message_id);
        self
    }
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_message(&self, message: OutboundMessage) -> Result<(), String>;

    /// Acknowledge a button press, optionally with a toast text
    async fn answer_callback(&self, callback_id: &str, text: &str) -> Result<(), String>;
}

/// reqwest-backed Bot API client
pub struct TelegramClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
}

impl TelegramClient {
    pub fn new(api_base: &str, token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn parse_telegram_error(status: reqwest::StatusCode, body: &str) -> String {
        if let Ok(error_json) = serde_json::from_str::<Value>(body) {
            let error_code = error_json.get("error_code").and_then(|c| c.as_u64()).unwrap_or(0);
            let description = error_json.get("description").and_then(|m| m.as_str()).unwrap_or("Unknown error");
            format!("Telegram API error: {} (code {})", description, error_code)
        } else {
            format!("Telegram API error ({}): {}", status, body)
        }
    }

    async fn telegram_api_call(&self, method: &str, params: &Value) -> Result<Value, String> {
        let url = format!("{}/bot{}/{}", self.api_base, self.token, method);

        let response = self
            .http
            .post(&url)
            .json(params)
            .send()
            .await
            .map_err(|e| format!("Failed to call Telegram API {}: {}", method, e.without_url()))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(Self::parse_telegram_error(status, &body));
        }

        let response_json: Value =
            serde_json::from_str(&body).map_err(|e| format!("Failed to parse Telegram response: {}", e))?;

        if response_json.get("ok").and_then(|v| v.as_bool()) != Some(true) {
            return Err(Self::parse_telegram_error(status, &body));
        }

        Ok(response_json.get("result").cloned().unwrap_or(json!(true)))
    }
}

/// Bot API `sendMessage` parameters for a message
pub fn send_message_params(message: &OutboundMessage) -> Value {
    let mut params = json!({
        "chat_id": message.chat_id,
        "text": message.text,
    });
    if let Some(markup) = &message.reply_markup {
        params["reply_markup"] = json!(markup);
    }
    if let Some(reply_to) = message.reply_to_message_id {
        params["reply_parameters"] = json!({ "message_id": reply_to });
    }
    params
}

#[async_trait]
impl ChatTransport for TelegramClient {
    async fn send_message(&self, message: OutboundMessage) -> Result<(), String> {
        self.telegram_api_call("sendMessage", &send_message_params(&message)).await?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: &str) -> Result<(), String> {
        let mut params = json!({ "callback_query_id": callback_id });
        if !text.is_empty() {
            params["text"] = json!(text);
        }
        self.telegram_api_call("answerCallbackQuery", &params).await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::Mutex;

    /// Captures outbound traffic; can be told to fail every send
    #[derive(Default)]
    pub struct RecordingTransport {
        pub sent: Mutex<Vec<OutboundMessage>>,
        pub answered: Mutex<Vec<(String, String)>>,
        pub fail_sends: bool,
    }

    impl RecordingTransport {
        pub fn failing() -> Self {
            Self {
                fail_sends: true,
                ..Default::default()
            }
        }

        pub fn sent(&self) -> Vec<OutboundMessage> {
            self.sent.lock().unwrap().clone()
        }

        pub fn sent_texts(&self) -> Vec<String> {
            self.sent().into_iter().map(|m| m.text).collect()
        }

        pub fn answered(&self) -> Vec<(String, String)> {
            self.answered.lock().unwrap().clone()
        }

        pub fn last_sent(&self) -> Option<OutboundMessage> {
            self.sent.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl ChatTransport for RecordingTransport {
        async fn send_message(&self, message: OutboundMessage) -> Result<(), String> {
            self.sent.lock().unwrap().push(message);
            if self.fail_sends {
                return Err("Telegram API error: Bad Request: chat not found (code 400)".to_string());
            }
            Ok(())
        }

        async fn answer_callback(&self, callback_id: &str, text: &str) -> Result<(), String> {
            self.answered
                .lock()
                .unwrap()
                .push((callback_id.to_string(), text.to_string()));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telegram::types::InlineKeyboardButton;

    #[test]
    fn test_send_message_params_plain() {
        let params = send_message_params(&OutboundMessage::text("42", "hello"));
        assert_eq!(params, json!({ "chat_id": "42", "text": "hello" }));
    }

    #[test]
    fn test_send_message_params_with_markup_and_reply() {
        let markup = InlineKeyboardMarkup::single_column([InlineKeyboardButton::new("Save", "newnote_save_truncated")]);
        let message = OutboundMessage::text("42", "pick").with_markup(markup).replying_to(17);
        let params = send_message_params(&message);
        assert_eq!(params["reply_parameters"]["message_id"], 17);
        assert_eq!(
            params["reply_markup"]["inline_keyboard"][0][0]["callback_data"],
            "newnote_save_truncated"
        );
    }

    #[test]
    fn test_parse_telegram_error() {
        let msg = TelegramClient::parse_telegram_error(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#,
        );
        assert_eq!(msg, "Telegram API error: Bad Request: chat not found (code 400)");

        let msg = TelegramClient::parse_telegram_error(reqwest::StatusCode::BAD_GATEWAY, "upstream down");
        assert!(msg.contains("502"));
        assert!(msg.ends_with("upstream down"));
    }

    #[test]
    fn test_api_base_trailing_slash() {
        let client = TelegramClient::new("https://api.telegram.org/", "t");
        assert_eq!(client.api_base, "https://api.telegram.org");
    }
}
