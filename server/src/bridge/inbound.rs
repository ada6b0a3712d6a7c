//! Inbound Translator
//!
//! Chat-platform updates to transport messages. New text messages become
//! transport sends, edits become transport updates, everything else is
//! acknowledged and dropped.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};

use super::activation::credentials;
use super::profile::UserIdentityCache;
use super::BridgeError;
use crate::db::Bot;
use crate::directory::{BotDirectory, ConnectionDirectory};
use crate::telegram::{Message, Update, User};
use crate::transport::{
    SendMessageRequest, TransportApi, TransportCredentials, TransportMessage, TransportUser,
    UpdateMessageRequest,
};

/// What happened to an inbound update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundOutcome {
    /// A new message was sent to the transport.
    Forwarded,
    /// An edit was pushed to the transport.
    Updated,
    /// Nothing to do; the reason is logged.
    Ignored(&'static str),
}

#[derive(Clone)]
pub struct InboundTranslator {
    bots: Arc<dyn BotDirectory>,
    connections: Arc<dyn ConnectionDirectory>,
    transport: Arc<dyn TransportApi>,
    identities: UserIdentityCache,
    log_payloads: bool,
}

fn transport_user(user: &User, avatar: Option<String>) -> TransportUser {
    TransportUser {
        external_id: user.id.to_string(),
        nickname: user.username.clone(),
        firstname: Some(user.first_name.clone()).filter(|n| !n.is_empty()),
        lastname: user.last_name.clone(),
        avatar,
        language: user.language_code.clone(),
    }
}

fn text_message(message: &Message, text: &str, stamp: bool) -> TransportMessage {
    TransportMessage {
        external_id: message.message_id.to_string(),
        kind: "text".to_string(),
        text: text.to_string(),
        sent_at: stamp.then(Utc::now),
    }
}

impl InboundTranslator {
    pub fn new(
        bots: Arc<dyn BotDirectory>,
        connections: Arc<dyn ConnectionDirectory>,
        transport: Arc<dyn TransportApi>,
        identities: UserIdentityCache,
        log_payloads: bool,
    ) -> Self {
        Self {
            bots,
            connections,
            transport,
            identities,
            log_payloads,
        }
    }

    /// Translate one webhook delivery for the bot owning `token`.
    #[instrument(skip_all)]
    pub async fn handle(&self, token: &str, body: &[u8]) -> Result<InboundOutcome, BridgeError> {
        if self.log_payloads {
            debug!(payload = %String::from_utf8_lossy(body), "Inbound update");
        }

        let Some(bot) = self.bots.get_by_token(token).await? else {
            return Ok(InboundOutcome::Ignored("unknown bot"));
        };
        if !bot.active {
            return Ok(InboundOutcome::Ignored("bot inactive"));
        }

        let connection = self.connections.get_by_id(bot.connection_id).await?;
        let Some(connection) = connection.filter(|c| c.active) else {
            return Ok(InboundOutcome::Ignored("connection inactive"));
        };

        let update: Update = serde_json::from_slice(body)
            .map_err(|e| BridgeError::Validation(format!("malformed update: {e}")))?;
        let creds = credentials(&connection)?;

        if let Some(message) = &update.message {
            self.forward_new(&bot, &creds, message).await
        } else if let Some(message) = &update.edited_message {
            self.forward_edit(&bot, &creds, message).await
        } else {
            Ok(InboundOutcome::Ignored("unsupported update"))
        }
    }

    async fn forward_new(
        &self,
        bot: &Bot,
        creds: &TransportCredentials,
        message: &Message,
    ) -> Result<InboundOutcome, BridgeError> {
        let Some(text) = message.text() else {
            return Ok(InboundOutcome::Ignored("no text"));
        };
        let Some(sender) = &message.from else {
            return Ok(InboundOutcome::Ignored("no sender"));
        };

        let profile = self
            .identities
            .ensure_fresh(&bot.token, sender.id, Utc::now())
            .await?;

        let request = SendMessageRequest {
            message: text_message(message, text, true),
            user: transport_user(sender, profile.avatar_url),
            channel: bot.channel_id.clone(),
            external_chat_id: message.chat.id.to_string(),
        };
        let reply = self.transport.send_message(creds, &request).await?;

        info!(
            channel_id = %bot.channel_id,
            message_id = message.message_id,
            "Message forwarded to transport"
        );
        if self.log_payloads {
            debug!(response = %reply, "Transport send response");
        }
        Ok(InboundOutcome::Forwarded)
    }

    async fn forward_edit(
        &self,
        bot: &Bot,
        creds: &TransportCredentials,
        message: &Message,
    ) -> Result<InboundOutcome, BridgeError> {
        let Some(text) = message.text() else {
            return Ok(InboundOutcome::Ignored("no text"));
        };

        let request = UpdateMessageRequest {
            message: text_message(message, text, false),
            channel: bot.channel_id.clone(),
        };
        let reply = self.transport.update_message(creds, &request).await?;

        info!(
            channel_id = %bot.channel_id,
            message_id = message.message_id,
            "Message edit forwarded to transport"
        );
        if self.log_payloads {
            debug!(response = %reply, "Transport update response");
        }
        Ok(InboundOutcome::Updated)
    }
}
