//! Subset of the Telegram Bot API update/markup shapes the bot consumes.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    #[serde(default)]
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub text: Option<String>,
    pub chat: Chat,
    pub from: Option<User>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub data: Option<String>,
    pub message: Option<CallbackMessage>,
    pub from: User,
}

/// The bot message a pressed button belongs to
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackMessage {
    pub message_id: i64,
    pub chat: Chat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

impl InlineKeyboardMarkup {
    /// One button per row
    pub fn single_column<I>(buttons: I) -> Self
    where
        I: IntoIterator<Item = InlineKeyboardButton>,
    {
        Self {
            inline_keyboard: buttons.into_iter().map(|b| vec![b]).collect(),
        }
    }
}

impl InlineKeyboardButton {
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_message_update() {
        let update: Update = serde_json::from_str(
            r#"{"update_id":9,"message":{"message_id":77,"text":"/newnote hi","chat":{"id":1001,"type":"private"},"from":{"id":5,"is_bot":false}}}"#,
        )
        .unwrap();
        let message = update.message.unwrap();
        assert_eq!(message.message_id, 77);
        assert_eq!(message.chat.id, 1001);
        assert_eq!(message.from.unwrap().id, 5);
        assert!(update.callback_query.is_none());
    }

    #[test]
    fn test_parse_callback_update() {
        let update: Update = serde_json::from_str(
            r#"{"update_id":10,"callback_query":{"id":"cb1","data":"edit_select_4","from":{"id":5},"message":{"message_id":80,"chat":{"id":1001}}}}"#,
        )
        .unwrap();
        let callback = update.callback_query.unwrap();
        assert_eq!(callback.data.as_deref(), Some("edit_select_4"));
        assert_eq!(callback.message.unwrap().chat.id, 1001);
    }

    #[test]
    fn test_keyboard_serialization() {
        let markup = InlineKeyboardMarkup::single_column(vec![
            InlineKeyboardButton::new("A", "a"),
            InlineKeyboardButton::new("B", "b"),
        ]);
        let value = serde_json::to_value(&markup).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"inline_keyboard": [[{"text": "A", "callback_data": "a"}], [{"text": "B", "callback_data": "b"}]]})
        );
    }
}
