//! Account and Bot Provisioning
//!
//! Connecting a CRM account, registering bots under it and flipping their
//! activity. Uniqueness is enforced by the directories; the lookups done
//! here only avoid a pointless remote call.

use std::sync::Arc;

use regex::Regex;
use tracing::{info, instrument, warn};

use super::activation::ChannelActivationManager;
use super::{random_hex, BridgeError};
use crate::config::Config;
use crate::crm::{CrmApi, IntegrationModule};
use crate::db::{Bot, Connection};
use crate::directory::{BotDirectory, ConnectionDirectory, DirectoryError};
use crate::telegram::ChatPlatform;

#[derive(Clone)]
pub struct Provisioner {
    connections: Arc<dyn ConnectionDirectory>,
    bots: Arc<dyn BotDirectory>,
    chat: Arc<dyn ChatPlatform>,
    crm: Arc<dyn CrmApi>,
    activation: ChannelActivationManager,
    config: Config,
    crm_url: Regex,
}

fn require_connection(
    connection: Option<Connection>,
    client_id: &str,
) -> Result<Connection, BridgeError> {
    connection.ok_or_else(|| BridgeError::NotFound(format!("connection {client_id}")))
}

impl Provisioner {
    pub fn new(
        connections: Arc<dyn ConnectionDirectory>,
        bots: Arc<dyn BotDirectory>,
        chat: Arc<dyn ChatPlatform>,
        crm: Arc<dyn CrmApi>,
        activation: ChannelActivationManager,
        config: &Config,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            connections,
            bots,
            chat,
            crm,
            activation,
            crm_url: Regex::new(&config.crm_url_pattern)?,
            config: config.clone(),
        })
    }

    /// Validate CRM credentials and return the account URL in its stored
    /// form, without a trailing slash.
    fn validate_credentials<'a>(
        &self,
        api_url: &'a str,
        api_key: &str,
    ) -> Result<&'a str, BridgeError> {
        if api_key.trim().is_empty() {
            return Err(BridgeError::Validation("api_key is required".into()));
        }
        if !self.crm_url.is_match(api_url) {
            return Err(BridgeError::Validation(format!(
                "{api_url} is not a supported CRM URL"
            )));
        }
        Ok(api_url.trim_end_matches('/'))
    }

    /// Connect a CRM account: verify its key, register the integration
    /// module and store the transport credentials the CRM hands back.
    #[instrument(skip(self, api_key))]
    pub async fn create_connection(
        &self,
        api_url: &str,
        api_key: &str,
    ) -> Result<Connection, BridgeError> {
        let api_url = self.validate_credentials(api_url, api_key)?;
        if self.connections.get_by_api_url(api_url).await?.is_some() {
            return Err(BridgeError::Conflict(format!("connection for {api_url}")));
        }

        let mut connection = Connection::new(random_hex(32), api_url.into(), api_key.into());

        self.crm.check_credentials(api_url, api_key).await?;
        let module = IntegrationModule::for_bridge(
            &self.config.integration_code,
            &self.config.base_url(),
            &connection.client_id,
        );
        let transport = self
            .crm
            .register_integration(api_url, api_key, &module)
            .await?;
        connection.transport_url = transport.url;
        connection.transport_token = transport.token;

        self.connections.create(&connection).await?;
        info!(client_id = %connection.client_id, "Connection created");
        Ok(connection)
    }

    /// Replace the CRM credentials of an existing connection.
    #[instrument(skip(self, api_key))]
    pub async fn save_connection(
        &self,
        client_id: &str,
        api_url: &str,
        api_key: &str,
    ) -> Result<Connection, BridgeError> {
        let api_url = self.validate_credentials(api_url, api_key)?;
        let mut connection = require_connection(
            self.connections.get_by_client_id(client_id).await?,
            client_id,
        )?;
        connection.api_url = api_url.to_string();
        connection.api_key = api_key.to_string();
        self.connections.save(&connection).await?;
        Ok(connection)
    }

    /// Apply the CRM's activity toggle for a whole account.
    #[instrument(skip(self))]
    pub async fn set_connection_activity(
        &self,
        client_id: &str,
        active: bool,
    ) -> Result<(), BridgeError> {
        match self.connections.set_active(client_id, active).await {
            Ok(()) => Ok(()),
            Err(DirectoryError::NotFound) => {
                Err(BridgeError::NotFound(format!("connection {client_id}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Register a bot under a connection and activate its transport channel.
    ///
    /// The bot is only stored once the channel is active. If the insert
    /// loses a race against a concurrent registration, the fresh channel is
    /// deactivated again.
    #[instrument(skip(self, token))]
    pub async fn add_bot(&self, client_id: &str, token: &str) -> Result<Bot, BridgeError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(BridgeError::Validation("bot token is required".into()));
        }
        if self.bots.get_by_token(token).await?.is_some() {
            return Err(BridgeError::Conflict("bot already registered".into()));
        }

        let me = self.chat.get_me(token).await.map_err(|e| {
            warn!(error = %e, "Bot token rejected by chat platform");
            BridgeError::Validation("incorrect bot token".into())
        })?;

        let connection = require_connection(
            self.connections.get_by_client_id(client_id).await?,
            client_id,
        )?;
        if !connection.has_transport() {
            return Err(BridgeError::NotFound(format!(
                "transport credentials for {client_id}"
            )));
        }

        let mut bot = Bot::new(connection.id, token.to_string(), me.first_name);

        self.chat
            .set_webhook(token, &self.config.telegram_webhook_url(token))
            .await?;
        self.activation.activate(&connection, &mut bot).await?;

        if let Err(err) = self.bots.create(&bot).await {
            if self
                .activation
                .deactivate(&connection, &mut bot.clone())
                .await
                .is_err()
            {
                warn!(channel_id = %bot.channel_id, "Could not roll back channel activation");
            }
            return Err(err.into());
        }

        info!(client_id, channel_id = %bot.channel_id, bot = %bot.name, "Bot added");
        Ok(bot)
    }

    /// Flip a bot between active and inactive.
    #[instrument(skip(self, token))]
    pub async fn toggle_bot(&self, client_id: &str, token: &str) -> Result<Bot, BridgeError> {
        let connection = require_connection(
            self.connections.get_by_client_id(client_id).await?,
            client_id,
        )?;
        let mut bot = self
            .bots
            .get_by_token(token)
            .await?
            .filter(|b| b.connection_id == connection.id)
            .ok_or_else(|| BridgeError::NotFound("bot".into()))?;

        self.activation.toggle(&connection, &mut bot).await?;
        info!(client_id, active = bot.active, "Bot activity changed");
        Ok(bot)
    }

    pub async fn list_bots(&self, client_id: &str) -> Result<Vec<Bot>, BridgeError> {
        let connection = require_connection(
            self.connections.get_by_client_id(client_id).await?,
            client_id,
        )?;
        Ok(self.bots.list_by_connection(connection.id).await?)
    }
}
