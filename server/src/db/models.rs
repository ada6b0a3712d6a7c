//! Database Models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A bridged CRM account.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Connection {
    pub id: Uuid,
    /// Opaque identifier the CRM uses to address this account.
    pub client_id: String,
    pub api_url: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    /// Messaging transport base URL, assigned by the CRM on integration.
    pub transport_url: String,
    #[serde(skip_serializing)]
    pub transport_token: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Connection {
    /// Create a new, not yet persisted connection without transport credentials.
    pub fn new(client_id: String, api_url: String, api_key: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            client_id,
            api_url,
            api_key,
            transport_url: String::new(),
            transport_token: String::new(),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the CRM has handed out transport credentials for this account.
    pub fn has_transport(&self) -> bool {
        !self.transport_url.is_empty() && !self.transport_token.is_empty()
    }
}

/// A chat-platform bot bridged into one connection.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Bot {
    pub id: Uuid,
    pub connection_id: Uuid,
    pub token: String,
    pub name: String,
    /// Transport channel id; kept after deactivation so the channel can be re-activated.
    pub channel_id: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bot {
    /// Create a new, inactive bot with no channel yet.
    pub fn new(connection_id: Uuid, token: String, name: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            connection_id,
            token,
            name,
            channel_id: String::new(),
            active: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this bot has ever been activated.
    pub fn has_channel(&self) -> bool {
        !self.channel_id.is_empty()
    }
}

/// Cached avatar of a chat-platform user.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CachedUserProfile {
    pub external_id: i64,
    /// Chat-platform file reference of the avatar last uploaded.
    pub avatar_source_id: Option<String>,
    pub avatar_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl CachedUserProfile {
    /// Empty profile that has never been refreshed.
    pub const fn empty(external_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            external_id,
            avatar_source_id: None,
            avatar_url: None,
            updated_at: now,
        }
    }
}
