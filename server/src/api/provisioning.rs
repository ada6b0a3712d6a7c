//! Provisioning Handlers
//!
//! JSON endpoints for connecting CRM accounts and managing their bots.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::AppState;
use crate::bridge::BridgeError;
use crate::db::Bot;

#[derive(Debug, Deserialize)]
pub struct CreateConnectionRequest {
    pub api_url: String,
    pub api_key: String,
}

#[derive(Debug, Serialize)]
pub struct ConnectionCreatedResponse {
    pub client_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SaveConnectionRequest {
    pub client_id: String,
    pub api_url: String,
    pub api_key: String,
}

/// Activity callback sent by the CRM.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRequest {
    pub client_id: String,
    pub active: bool,
}

#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BotRequest {
    pub client_id: String,
    #[serde(default)]
    pub token: String,
}

fn reported<T>(result: Result<T, BridgeError>) -> Result<T, BridgeError> {
    result.inspect_err(BridgeError::report)
}

/// POST /create
#[instrument(skip_all, fields(api_url = %req.api_url))]
pub async fn create_connection(
    State(state): State<AppState>,
    Json(req): Json<CreateConnectionRequest>,
) -> Result<(StatusCode, Json<ConnectionCreatedResponse>), BridgeError> {
    let connection = reported(
        state
            .provisioner
            .create_connection(req.api_url.trim(), req.api_key.trim())
            .await,
    )?;

    Ok((
        StatusCode::CREATED,
        Json(ConnectionCreatedResponse {
            client_id: connection.client_id,
        }),
    ))
}

/// POST /save
#[instrument(skip_all, fields(client_id = %req.client_id))]
pub async fn save_connection(
    State(state): State<AppState>,
    Json(req): Json<SaveConnectionRequest>,
) -> Result<StatusCode, BridgeError> {
    reported(
        state
            .provisioner
            .save_connection(&req.client_id, req.api_url.trim(), req.api_key.trim())
            .await,
    )?;
    Ok(StatusCode::OK)
}

/// POST /actions/activity
///
/// Always answers 200; failures are reported in the body.
#[instrument(skip_all)]
pub async fn connection_activity(
    State(state): State<AppState>,
    body: Bytes,
) -> Json<ActivityResponse> {
    let result = match serde_json::from_slice::<ActivityRequest>(&body) {
        Ok(req) => {
            state
                .provisioner
                .set_connection_activity(&req.client_id, req.active)
                .await
        }
        Err(e) => Err(BridgeError::Validation(format!("incorrect data: {e}"))),
    };

    match result {
        Ok(()) => Json(ActivityResponse {
            success: true,
            error: None,
        }),
        Err(err) => {
            err.report();
            Json(ActivityResponse {
                success: false,
                error: Some(err.to_string()),
            })
        }
    }
}

/// POST /add-bot
#[instrument(skip_all, fields(client_id = %req.client_id))]
pub async fn add_bot(
    State(state): State<AppState>,
    Json(req): Json<BotRequest>,
) -> Result<(StatusCode, Json<Bot>), BridgeError> {
    let bot = reported(state.provisioner.add_bot(&req.client_id, &req.token).await)?;
    Ok((StatusCode::CREATED, Json(bot)))
}

/// POST /activity-bot
#[instrument(skip_all, fields(client_id = %req.client_id))]
pub async fn toggle_bot(
    State(state): State<AppState>,
    Json(req): Json<BotRequest>,
) -> Result<Json<Bot>, BridgeError> {
    let bot = reported(state.provisioner.toggle_bot(&req.client_id, &req.token).await)?;
    Ok(Json(bot))
}

/// GET /bots/{client_id}
#[instrument(skip(state))]
pub async fn list_bots(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> Result<Json<Vec<Bot>>, BridgeError> {
    let bots = reported(state.provisioner.list_bots(&client_id).await)?;
    Ok(Json(bots))
}
