//! API Router and Application State
//!
//! Central routing configuration and shared state.

pub mod provisioning;
pub mod webhooks;

use std::sync::Arc;

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::bridge::{
    AvatarSettings, ChannelActivationManager, InboundTranslator, OutboundTranslator, Provisioner,
    UserIdentityCache,
};
use crate::config::Config;
use crate::crm::{CrmApi, LOGO_PATH};
use crate::directory::{BotDirectory, ConnectionDirectory, ProfileStore};
use crate::storage::ObjectStorage;
use crate::telegram::ChatPlatform;
use crate::transport::TransportApi;

/// Service handles the application is assembled from.
pub struct AppStateConfig {
    pub config: Config,
    pub connections: Arc<dyn ConnectionDirectory>,
    pub bots: Arc<dyn BotDirectory>,
    pub profiles: Arc<dyn ProfileStore>,
    pub transport: Arc<dyn TransportApi>,
    pub chat: Arc<dyn ChatPlatform>,
    pub storage: Arc<dyn ObjectStorage>,
    pub crm: Arc<dyn CrmApi>,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration
    pub config: Arc<Config>,
    /// Chat platform → transport
    pub inbound: Arc<InboundTranslator>,
    /// Transport → chat platform
    pub outbound: Arc<OutboundTranslator>,
    /// Account and bot management
    pub provisioner: Arc<Provisioner>,
    /// Avatar storage, probed by the health check
    pub storage: Arc<dyn ObjectStorage>,
}

impl AppState {
    /// Wire the translators and provisioning services together.
    ///
    /// Fails only if the configured CRM URL pattern is not a valid regex.
    pub fn new(deps: AppStateConfig) -> Result<Self, regex::Error> {
        let AppStateConfig {
            config,
            connections,
            bots,
            profiles,
            transport,
            chat,
            storage,
            crm,
        } = deps;

        let identities = UserIdentityCache::new(
            chat.clone(),
            storage.clone(),
            profiles,
            AvatarSettings {
                folder: config.s3_folder.clone(),
                content_type: config.s3_content_type.clone(),
                update_interval: config.update_interval,
            },
        );
        let activation = ChannelActivationManager::new(
            transport.clone(),
            bots.clone(),
            config.transport_channel_type.clone(),
        );

        let inbound = InboundTranslator::new(
            bots.clone(),
            connections.clone(),
            transport,
            identities,
            config.debug,
        );
        let outbound =
            OutboundTranslator::new(connections.clone(), bots.clone(), chat.clone(), config.debug);
        let provisioner = Provisioner::new(connections, bots, chat, crm, activation, &config)?;

        Ok(Self {
            config: Arc::new(config),
            inbound: Arc::new(inbound),
            outbound: Arc::new(outbound),
            provisioner: Arc::new(provisioner),
            storage,
        })
    }
}

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        .route(LOGO_PATH, get(logo))
        // Webhooks
        .route("/telegram/{token}", post(webhooks::telegram_webhook))
        .route("/webhook", post(webhooks::transport_webhook))
        // Account provisioning
        .route("/create", post(provisioning::create_connection))
        .route("/save", post(provisioning::save_connection))
        .route("/actions/activity", post(provisioning::connection_activity))
        .route("/add-bot", post(provisioning::add_bot))
        .route("/activity-bot", post(provisioning::toggle_bot))
        .route("/bots/{client_id}", get(provisioning::list_bots))
        // Middleware
        .layer(TraceLayer::new_for_http())
        // State
        .with_state(state)
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    /// Service status
    status: &'static str,
    /// Whether avatar storage is reachable
    storage: bool,
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        storage: state.storage.health_check().await.is_ok(),
    })
}

const LOGO_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 240 240"><circle cx="120" cy="120" r="120" fill="#2AABEE"/><path fill="#fff" d="M54 118l110-43c5-2 10 1 8 9l-19 88c-1 6-5 8-10 5l-28-21-14 13c-2 2-3 3-6 3l2-29 53-48c2-2 0-3-3-1l-66 41-28-9c-6-2-6-6 1-8z"/></svg>"##;

/// Integration logo shown by the CRM.
async fn logo() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "image/svg+xml")], LOGO_SVG)
}
