//! Bridge Server - Main Entry Point
//!
//! Webhook bridge between Telegram bots and the CRM messaging transport.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

use bridge_server::{
    api, config,
    crm::CrmClient,
    db::{self, PgDirectory},
    storage::{ObjectStorage, S3Client},
    telegram::TelegramApi,
    transport::TransportClient,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env()?;

    // Initialize Sentry only when DSN is configured
    let _sentry_guard = config.sentry_dsn.clone().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                environment: Some(config.app_env.clone().into()),
                sample_rate: 1.0,
                send_default_pii: false,
                ..Default::default()
            },
        ))
    });

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bridge_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .with(config.has_sentry().then(sentry_tracing::layer))
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        public_host = %config.public_host,
        "Starting bridge server"
    );

    // Initialize database
    let db_pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&db_pool).await?;
    let directory = Arc::new(PgDirectory::new(db_pool));

    // Object storage for mirrored avatars
    let s3 = S3Client::new(&config);
    if let Err(e) = s3.health_check().await {
        warn!(error = %e, "S3 health check failed; avatar uploads will fail until it recovers");
    }

    // Remote API clients
    let chat = TelegramApi::new(&config.telegram_api_url, config.http_timeout)?;
    let transport = TransportClient::new(config.http_timeout)?;
    let crm = CrmClient::new(config.http_timeout)?;

    // Build application state
    let state = api::AppState::new(api::AppStateConfig {
        config: config.clone(),
        connections: directory.clone(),
        bots: directory.clone(),
        profiles: directory,
        transport: Arc::new(transport),
        chat: Arc::new(chat),
        storage: Arc::new(s3),
        crm: Arc::new(crm),
    })?;

    // Build router
    let app = api::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(address = %config.bind_address, "Server listening");

    // Graceful shutdown handler
    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal, cleaning up...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shutdown complete");

    Ok(())
}
