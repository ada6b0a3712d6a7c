//! CRM Messaging Transport
//!
//! The CRM side of the bridge: channel activation and message submission
//! against the transport API of one connected account.

pub mod client;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use client::TransportClient;
pub use types::{
    ChannelSpec, SendMessageRequest, TransportMessage, TransportUser, UpdateMessageRequest,
    WebhookData, WebhookRequest, CHANNEL_EVENTS,
};

/// Errors returned by the transport client.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The transport answered with a non-success status.
    #[error("Transport API returned {status}: {body}")]
    Status { status: u16, body: String },
}

impl TransportError {
    /// HTTP status returned by the transport, if it answered at all.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Network(_) => None,
        }
    }
}

/// Base URL and token of one account's transport API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportCredentials {
    pub url: String,
    pub token: String,
}

/// Operations the bridge performs against the transport API.
#[async_trait]
pub trait TransportApi: Send + Sync {
    /// Create or re-activate a channel and return its id.
    async fn activate_channel(
        &self,
        creds: &TransportCredentials,
        spec: &ChannelSpec,
    ) -> Result<String, TransportError>;

    async fn deactivate_channel(
        &self,
        creds: &TransportCredentials,
        channel_id: &str,
    ) -> Result<(), TransportError>;

    async fn send_message(
        &self,
        creds: &TransportCredentials,
        request: &SendMessageRequest,
    ) -> Result<serde_json::Value, TransportError>;

    async fn update_message(
        &self,
        creds: &TransportCredentials,
        request: &UpdateMessageRequest,
    ) -> Result<serde_json::Value, TransportError>;
}
