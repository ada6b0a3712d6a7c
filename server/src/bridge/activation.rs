//! Channel Activation Manager
//!
//! Keeps a bot's `active` flag and channel id in step with the transport.
//! Local state only changes after the transport accepted the call.

use std::sync::Arc;

use tracing::{info, instrument};

use super::BridgeError;
use crate::db::{Bot, Connection};
use crate::directory::BotDirectory;
use crate::transport::{ChannelSpec, TransportApi, TransportCredentials};

/// Creates, re-activates and deactivates transport channels for bots.
#[derive(Clone)]
pub struct ChannelActivationManager {
    transport: Arc<dyn TransportApi>,
    bots: Arc<dyn BotDirectory>,
    channel_type: String,
}

/// Transport credentials of `connection`, or `NotConfigured`.
pub fn credentials(connection: &Connection) -> Result<TransportCredentials, BridgeError> {
    if !connection.has_transport() {
        return Err(BridgeError::NotConfigured(format!(
            "connection {} has no transport credentials",
            connection.client_id
        )));
    }
    Ok(TransportCredentials {
        url: connection.transport_url.clone(),
        token: connection.transport_token.clone(),
    })
}

impl ChannelActivationManager {
    pub fn new(
        transport: Arc<dyn TransportApi>,
        bots: Arc<dyn BotDirectory>,
        channel_type: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            bots,
            channel_type: channel_type.into(),
        }
    }

    /// Activate the bot's channel and record the returned id on `bot`.
    ///
    /// Does not persist; on error `bot` is untouched.
    #[instrument(skip_all, fields(client_id = %connection.client_id, bot = %bot.name))]
    pub async fn activate(&self, connection: &Connection, bot: &mut Bot) -> Result<(), BridgeError> {
        let creds = credentials(connection)?;
        let existing = bot.has_channel().then_some(bot.channel_id.as_str());
        let spec = ChannelSpec::new(&self.channel_type, existing);

        let channel_id = self
            .transport
            .activate_channel(&creds, &spec)
            .await
            .map_err(BridgeError::Activation)?;

        info!(channel_id = %channel_id, "Channel activated");
        bot.channel_id = channel_id;
        bot.active = true;
        Ok(())
    }

    /// Deactivate the bot's channel. The channel id is kept.
    #[instrument(skip_all, fields(client_id = %connection.client_id, channel_id = %bot.channel_id))]
    pub async fn deactivate(
        &self,
        connection: &Connection,
        bot: &mut Bot,
    ) -> Result<(), BridgeError> {
        let creds = credentials(connection)?;
        if !bot.has_channel() {
            return Err(BridgeError::NotConfigured(format!(
                "bot {} has no channel",
                bot.name
            )));
        }

        self.transport
            .deactivate_channel(&creds, &bot.channel_id)
            .await
            .map_err(BridgeError::Deactivation)?;

        info!("Channel deactivated");
        bot.active = false;
        Ok(())
    }

    /// Flip the bot's activity and persist the new state.
    pub async fn toggle(&self, connection: &Connection, bot: &mut Bot) -> Result<(), BridgeError> {
        if bot.active {
            self.deactivate(connection, bot).await?;
        } else {
            self.activate(connection, bot).await?;
            self.bots.set_channel(&bot.token, &bot.channel_id).await?;
        }
        self.bots.set_active(&bot.token, bot.active).await?;
        Ok(())
    }
}
