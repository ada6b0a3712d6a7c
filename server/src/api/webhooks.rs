//! Webhook Handlers
//!
//! `POST /telegram/{token}` receives chat-platform updates and always
//! answers 200 unless a retry could help. `POST /webhook` receives transport
//! events for the account named in the `Clientid` header.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{debug, instrument};

use super::AppState;
use crate::bridge::{BridgeError, OutboundReply};

/// Header the transport uses to name the target account.
pub const CLIENT_ID_HEADER: &str = "clientid";

/// Bot id part of a token (`<bot id>:<secret>`), safe to log.
fn bot_id(token: &str) -> &str {
    token.split_once(':').map_or("?", |(id, _)| id)
}

/// POST /telegram/{token}
#[instrument(skip_all, fields(bot_id = bot_id(&token)))]
pub async fn telegram_webhook(
    State(state): State<AppState>,
    Path(token): Path<String>,
    body: Bytes,
) -> StatusCode {
    match state.inbound.handle(&token, &body).await {
        Ok(outcome) => {
            debug!(?outcome, "Inbound update handled");
            StatusCode::OK
        }
        // Redelivery cannot fix these
        Err(err @ (BridgeError::Validation(_) | BridgeError::NotConfigured(_))) => {
            err.report();
            StatusCode::OK
        }
        Err(err) => {
            err.report();
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// POST /webhook
#[instrument(skip_all, fields(client_id))]
pub async fn transport_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, BridgeError> {
    let client_id = headers
        .get(CLIENT_ID_HEADER)
        .and_then(|v| v.to_str().ok());
    if let Some(id) = client_id {
        tracing::Span::current().record("client_id", id);
    }

    match state.outbound.handle(client_id, &body).await {
        Ok(OutboundReply::Sent {
            external_message_id,
        }) => Ok(Json(json!({ "external_message_id": external_message_id })).into_response()),
        Ok(reply) => {
            debug!(?reply, "Transport webhook handled");
            Ok(StatusCode::OK.into_response())
        }
        Err(err) => {
            err.report();
            Err(err)
        }
    }
}
