//! Outbound Translator
//!
//! Transport webhooks to chat-platform calls.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use super::BridgeError;
use crate::db::Bot;
use crate::directory::{BotDirectory, ConnectionDirectory};
use crate::telegram::ChatPlatform;
use crate::transport::{WebhookData, WebhookRequest};

/// Transport webhook event kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    MessageSent,
    MessageUpdated,
    MessageDeleted,
    /// Anything else (e.g. `message_read`); acknowledged without action.
    Unknown(String),
}

impl From<&str> for TransportEvent {
    fn from(kind: &str) -> Self {
        match kind {
            "message_sent" => Self::MessageSent,
            "message_updated" => Self::MessageUpdated,
            "message_deleted" => Self::MessageDeleted,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Result of a handled transport webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundReply {
    /// Message delivered; the native id correlates later edits and deletes.
    Sent { external_message_id: String },
    Updated,
    Deleted,
    Ignored,
}

#[derive(Clone)]
pub struct OutboundTranslator {
    connections: Arc<dyn ConnectionDirectory>,
    bots: Arc<dyn BotDirectory>,
    chat: Arc<dyn ChatPlatform>,
    log_payloads: bool,
}

fn parse_id(value: Option<&str>, field: &str) -> Result<i64, BridgeError> {
    value
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(|| BridgeError::Validation(format!("missing or invalid {field}")))
}

fn content(data: &WebhookData) -> Result<&str, BridgeError> {
    data.content
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| BridgeError::Validation("missing content".into()))
}

impl OutboundTranslator {
    pub fn new(
        connections: Arc<dyn ConnectionDirectory>,
        bots: Arc<dyn BotDirectory>,
        chat: Arc<dyn ChatPlatform>,
        log_payloads: bool,
    ) -> Self {
        Self {
            connections,
            bots,
            chat,
            log_payloads,
        }
    }

    /// Handle one transport webhook addressed to `client_id`.
    #[instrument(skip(self, body))]
    pub async fn handle(
        &self,
        client_id: Option<&str>,
        body: &[u8],
    ) -> Result<OutboundReply, BridgeError> {
        if self.log_payloads {
            debug!(payload = %String::from_utf8_lossy(body), "Transport webhook");
        }

        let client_id = client_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| BridgeError::Validation("missing Clientid header".into()))?;
        let connection = self
            .connections
            .get_by_client_id(client_id)
            .await?
            .ok_or_else(|| BridgeError::Validation(format!("unknown client {client_id}")))?;
        if !connection.active {
            return Err(BridgeError::Validation(format!(
                "connection {client_id} is inactive"
            )));
        }

        let request: WebhookRequest = serde_json::from_slice(body)
            .map_err(|e| BridgeError::Validation(format!("malformed webhook: {e}")))?;

        let bot = self
            .bots
            .get_by_channel_and_connection(connection.id, &request.data.channel_id)
            .await?
            .filter(|b| b.active)
            .ok_or_else(|| {
                BridgeError::Validation(format!(
                    "no active bot for channel {}",
                    request.data.channel_id
                ))
            })?;

        self.dispatch(&bot, TransportEvent::from(request.kind.as_str()), &request.data)
            .await
    }

    async fn dispatch(
        &self,
        bot: &Bot,
        event: TransportEvent,
        data: &WebhookData,
    ) -> Result<OutboundReply, BridgeError> {
        match event {
            TransportEvent::MessageSent => {
                let chat_id = parse_id(data.external_chat_id.as_deref(), "external_chat_id")?;
                let native_id = self
                    .chat
                    .send_message(&bot.token, chat_id, content(data)?)
                    .await?;
                info!(channel_id = %bot.channel_id, chat_id, native_id, "Message sent to chat");
                Ok(OutboundReply::Sent {
                    external_message_id: native_id.to_string(),
                })
            }
            TransportEvent::MessageUpdated => {
                let chat_id = parse_id(data.external_chat_id.as_deref(), "external_chat_id")?;
                let message_id =
                    parse_id(data.external_message_id.as_deref(), "external_message_id")?;
                self.chat
                    .edit_message(&bot.token, chat_id, message_id, content(data)?)
                    .await?;
                info!(channel_id = %bot.channel_id, chat_id, message_id, "Chat message edited");
                Ok(OutboundReply::Updated)
            }
            TransportEvent::MessageDeleted => {
                let chat_id = parse_id(data.external_chat_id.as_deref(), "external_chat_id")?;
                let message_id =
                    parse_id(data.external_message_id.as_deref(), "external_message_id")?;
                self.chat
                    .delete_message(&bot.token, chat_id, message_id)
                    .await?;
                info!(channel_id = %bot.channel_id, chat_id, message_id, "Chat message deleted");
                Ok(OutboundReply::Deleted)
            }
            TransportEvent::Unknown(kind) => {
                debug!(%kind, "Ignoring transport event");
                Ok(OutboundReply::Ignored)
            }
        }
    }
}
