//! Connection, Bot and Profile Directories
//!
//! Storage seams for the translation engine. Uniqueness of client ids,
//! CRM URLs and bot tokens is enforced by the store and reported as
//! [`DirectoryError::Conflict`].

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{Bot, CachedUserProfile, Connection};

pub use memory::MemoryDirectory;

/// Directory errors.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// A uniqueness constraint rejected the write.
    #[error("Record already exists: {0}")]
    Conflict(String),

    /// The record to update does not exist.
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Lookup and persistence of bridged CRM accounts.
#[async_trait]
pub trait ConnectionDirectory: Send + Sync {
    async fn get_by_client_id(&self, client_id: &str)
        -> Result<Option<Connection>, DirectoryError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Connection>, DirectoryError>;

    async fn get_by_api_url(&self, api_url: &str) -> Result<Option<Connection>, DirectoryError>;

    /// Insert a new connection. Fails with `Conflict` on a duplicate client id or CRM URL.
    async fn create(&self, connection: &Connection) -> Result<(), DirectoryError>;

    /// Update CRM and transport credentials of an existing connection.
    async fn save(&self, connection: &Connection) -> Result<(), DirectoryError>;

    async fn set_active(&self, client_id: &str, active: bool) -> Result<(), DirectoryError>;
}

/// Lookup and persistence of bridged bots.
#[async_trait]
pub trait BotDirectory: Send + Sync {
    async fn get_by_token(&self, token: &str) -> Result<Option<Bot>, DirectoryError>;

    async fn get_by_channel_and_connection(
        &self,
        connection_id: Uuid,
        channel_id: &str,
    ) -> Result<Option<Bot>, DirectoryError>;

    async fn list_by_connection(&self, connection_id: Uuid) -> Result<Vec<Bot>, DirectoryError>;

    /// Insert a new bot. Fails with `Conflict` if the token is already registered.
    async fn create(&self, bot: &Bot) -> Result<(), DirectoryError>;

    async fn set_active(&self, token: &str, active: bool) -> Result<(), DirectoryError>;

    async fn set_channel(&self, token: &str, channel_id: &str) -> Result<(), DirectoryError>;
}

/// Cached chat-platform user profiles.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, external_id: i64) -> Result<Option<CachedUserProfile>, DirectoryError>;

    /// Insert or replace the profile keyed by its external id.
    async fn save(&self, profile: &CachedUserProfile) -> Result<(), DirectoryError>;
}
