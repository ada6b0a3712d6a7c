//! Telegram Bot API
//!
//! The chat-platform side of the bridge: webhook payload types and an HTTP
//! client for the handful of Bot API methods the bridge calls.

pub mod api;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use api::TelegramApi;
pub use types::{Message, Update, User};

/// Errors returned by the chat-platform client.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// Transport-level failure (connect, timeout, body decode).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The Bot API answered `ok: false`.
    #[error("Telegram API error {code:?}: {description}")]
    Api {
        code: Option<i64>,
        description: String,
    },

    /// A file download returned a non-success status.
    #[error("Download of {url} failed with status {status}")]
    Download { url: String, status: u16 },
}

/// Current avatar of a chat-platform user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfilePhoto {
    /// Platform file reference of the largest size of the newest photo.
    pub source_id: String,
    /// Direct download URL, when the platform could resolve one.
    pub url: Option<String>,
}

/// Operations the bridge performs against the chat platform.
///
/// Every call is made on behalf of one bot, identified by its token.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Identity of the bot owning `token`; fails for invalid tokens.
    async fn get_me(&self, token: &str) -> Result<User, TelegramError>;

    /// Newest profile photo of `user_id`, or `None` if the user has none.
    async fn get_user_profile_photo(
        &self,
        token: &str,
        user_id: i64,
    ) -> Result<Option<ProfilePhoto>, TelegramError>;

    /// Fetch the bytes behind a URL returned by [`Self::get_user_profile_photo`].
    async fn download(&self, url: &str) -> Result<Vec<u8>, TelegramError>;

    /// Send a text message and return its native message id.
    async fn send_message(&self, token: &str, chat_id: i64, text: &str)
        -> Result<i64, TelegramError>;

    async fn edit_message(
        &self,
        token: &str,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> Result<(), TelegramError>;

    async fn delete_message(
        &self,
        token: &str,
        chat_id: i64,
        message_id: i64,
    ) -> Result<(), TelegramError>;

    /// Point the bot's update delivery at `url`.
    async fn set_webhook(&self, token: &str, url: &str) -> Result<(), TelegramError>;
}
