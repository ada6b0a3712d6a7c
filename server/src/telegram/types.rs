//! Serde types for the Telegram Bot API.
//!
//! Only the fields the bridge needs are deserialized; unknown fields are ignored.

use serde::{Deserialize, Serialize};

/// Generic Telegram API response wrapper.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub description: Option<String>,
    pub error_code: Option<i64>,
    pub result: Option<T>,
}

/// A Telegram Update delivered to the bot's webhook.
#[derive(Debug, Default, Deserialize)]
pub struct Update {
    #[serde(default)]
    pub update_id: i64,
    pub message: Option<Message>,
    pub edited_message: Option<Message>,
}

/// A Telegram Message.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
}

impl Message {
    /// Message text, if present and non-empty.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }
}

/// A Telegram User.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub language_code: Option<String>,
}

/// A Telegram Chat.
#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: Option<String>,
}

/// One size of a profile photo.
#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

/// Result of `getUserProfilePhotos`; each photo is a list of sizes, smallest first.
#[derive(Debug, Deserialize)]
pub struct UserProfilePhotos {
    pub total_count: u32,
    #[serde(default)]
    pub photos: Vec<Vec<PhotoSize>>,
}

/// Result of `getFile`.
#[derive(Debug, Deserialize)]
pub struct File {
    pub file_id: String,
    pub file_path: Option<String>,
}

/// Sent or edited message result (we only need `message_id`).
#[derive(Debug, Deserialize)]
pub struct SentMessage {
    pub message_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_update_with_message() {
        let json = r#"{
            "update_id": 10,
            "message": {
                "message_id": 101,
                "from": {"id": 7, "is_bot": false, "first_name": "Ann", "username": "abc", "language_code": "en"},
                "chat": {"id": 555, "type": "private"},
                "date": 1700000000,
                "text": "hi"
            }
        }"#;
        let update: Update = serde_json::from_str(json).unwrap();
        let msg = update.message.unwrap();
        assert_eq!(msg.message_id, 101);
        assert_eq!(msg.text(), Some("hi"));
        assert_eq!(msg.chat.id, 555);
        assert_eq!(msg.from.unwrap().username.as_deref(), Some("abc"));
        assert!(update.edited_message.is_none());
    }

    #[test]
    fn deserialize_edited_message() {
        let json = r#"{
            "update_id": 11,
            "edited_message": {
                "message_id": 101,
                "chat": {"id": -100123},
                "date": 1700000000,
                "edit_date": 1700000100,
                "text": "fixed"
            }
        }"#;
        let update: Update = serde_json::from_str(json).unwrap();
        assert!(update.message.is_none());
        assert_eq!(update.edited_message.unwrap().text(), Some("fixed"));
    }

    #[test]
    fn empty_text_is_treated_as_absent() {
        let json = r#"{"message_id": 1, "chat": {"id": 1}, "text": ""}"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.text(), None);
    }

    #[test]
    fn deserialize_profile_photos() {
        let json = r#"{
            "total_count": 1,
            "photos": [[
                {"file_id": "small", "file_unique_id": "s", "width": 160, "height": 160},
                {"file_id": "big", "file_unique_id": "b", "width": 640, "height": 640}
            ]]
        }"#;
        let photos: UserProfilePhotos = serde_json::from_str(json).unwrap();
        assert_eq!(photos.total_count, 1);
        assert_eq!(photos.photos[0].last().unwrap().file_id, "big");
    }
}
