//! HTTP client for the transport API.
//!
//! Every request carries the account's token in `X-Transport-Token`.
//! Any 2xx answer is a success.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::Value;
use tracing::{debug, warn};

use super::types::{ActivateResponse, ChannelSpec, SendMessageRequest, UpdateMessageRequest};
use super::{TransportApi, TransportCredentials, TransportError};

const TOKEN_HEADER: &str = "X-Transport-Token";
const API_PREFIX: &str = "api/transport/v1";

/// Transport API client shared by all connections.
#[derive(Clone)]
pub struct TransportClient {
    client: Client,
}

impl TransportClient {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client))
    }

    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn request(&self, creds: &TransportCredentials, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{API_PREFIX}/{path}", creds.url.trim_end_matches('/'));
        debug!(%method, %url, "Transport API call");
        self.client
            .request(method, url)
            .header(TOKEN_HEADER, &creds.token)
    }

    /// Pass 2xx responses through, turn anything else into [`TransportError::Status`].
    async fn check(resp: Response) -> Result<Response, TransportError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), %body, "Transport API rejected request");
        Err(TransportError::Status {
            status: status.as_u16(),
            body,
        })
    }

    /// Decode a JSON body, treating an empty one as `null`.
    async fn json_or_null(resp: Response) -> Result<Value, TransportError> {
        let bytes = resp.bytes().await?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }
}

#[async_trait]
impl TransportApi for TransportClient {
    async fn activate_channel(
        &self,
        creds: &TransportCredentials,
        spec: &ChannelSpec,
    ) -> Result<String, TransportError> {
        let resp = self
            .request(creds, Method::POST, "channels")
            .json(spec)
            .send()
            .await?;
        let activated: ActivateResponse = Self::check(resp).await?.json().await?;
        Ok(activated.id)
    }

    async fn deactivate_channel(
        &self,
        creds: &TransportCredentials,
        channel_id: &str,
    ) -> Result<(), TransportError> {
        let resp = self
            .request(creds, Method::DELETE, &format!("channels/{channel_id}"))
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn send_message(
        &self,
        creds: &TransportCredentials,
        request: &SendMessageRequest,
    ) -> Result<Value, TransportError> {
        let resp = self
            .request(creds, Method::POST, "messages")
            .json(request)
            .send()
            .await?;
        Self::json_or_null(Self::check(resp).await?).await
    }

    async fn update_message(
        &self,
        creds: &TransportCredentials,
        request: &UpdateMessageRequest,
    ) -> Result<Value, TransportError> {
        let resp = self
            .request(creds, Method::PUT, "messages")
            .json(request)
            .send()
            .await?;
        Self::json_or_null(Self::check(resp).await?).await
    }
}
