//! Bridge Error Types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::crm::CrmError;
use crate::directory::DirectoryError;
use crate::telegram::TelegramError;
use crate::transport::TransportError;

/// A remote API failure, tagged by the side that failed.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("chat platform: {0}")]
    Telegram(#[from] TelegramError),

    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    #[error("CRM: {0}")]
    Crm(#[from] CrmError),
}

/// Errors raised while translating or provisioning.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Connection or bot is missing what the operation needs.
    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream call failed: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Profile sync failed: {0}")]
    ProfileSync(String),

    #[error("Channel activation failed: {0}")]
    Activation(#[source] TransportError),

    #[error("Channel deactivation failed: {0}")]
    Deactivation(#[source] TransportError),

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<DirectoryError> for BridgeError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Conflict(what) => Self::Conflict(what),
            DirectoryError::NotFound => Self::NotFound("record".into()),
            DirectoryError::Database(e) => Self::Database(e),
        }
    }
}

impl From<TelegramError> for BridgeError {
    fn from(err: TelegramError) -> Self {
        Self::Upstream(err.into())
    }
}

impl From<TransportError> for BridgeError {
    fn from(err: TransportError) -> Self {
        Self::Upstream(err.into())
    }
}

impl From<CrmError> for BridgeError {
    fn from(err: CrmError) -> Self {
        Self::Upstream(err.into())
    }
}

impl BridgeError {
    /// Whether the failure is worth an error-tracking event.
    pub const fn is_reportable(&self) -> bool {
        matches!(
            self,
            Self::Upstream(_)
                | Self::ProfileSync(_)
                | Self::Activation(_)
                | Self::Deactivation(_)
                | Self::Database(_)
        )
    }

    /// Log the failure and forward reportable ones to Sentry.
    ///
    /// Sentry calls are no-ops when no client is bound.
    pub fn report(&self) {
        if self.is_reportable() {
            error!(error = %self, "Bridge operation failed");
            sentry::capture_error(self);
        } else {
            tracing::warn!(error = %self, "Bridge request rejected");
        }
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotConfigured(_)
            | Self::Validation(_)
            | Self::Upstream(_)
            | Self::Activation(_)
            | Self::Deactivation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::ProfileSync(_) | Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            Self::Database(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
