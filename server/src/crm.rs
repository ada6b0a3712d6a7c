//! CRM API Client
//!
//! Credential check and integration-module registration against a CRM
//! account's REST API. Registration is what hands the bridge its transport
//! credentials.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::transport::TransportCredentials;

const API_KEY_HEADER: &str = "X-API-KEY";

/// Errors returned by the CRM client.
#[derive(Debug, Error)]
pub enum CrmError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("CRM API returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The CRM answered `success: false`.
    #[error("CRM rejected the request: {0}")]
    Rejected(String),

    #[error("CRM response carried no transport credentials")]
    MissingTransport,
}

/// Path the bridge serves its integration logo from.
pub const LOGO_PATH: &str = "/web/telegram_logo.svg";

/// Integration module advertised to the CRM when a connection is created.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationModule {
    pub code: String,
    pub integration_code: String,
    pub active: bool,
    pub name: String,
    pub client_id: String,
    pub logo: String,
    pub base_url: String,
    /// Link the CRM shows for the account; the bridge answers it with the bot list.
    pub account_url: String,
    pub actions: HashMap<String, String>,
    pub integrations: Integrations,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Integrations {
    pub mg_transport: MgTransport,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MgTransport {
    pub webhook_url: String,
}

impl IntegrationModule {
    /// Module for a bridge served at `base_url`, owned by `client_id`.
    pub fn for_bridge(code: &str, base_url: &str, client_id: &str) -> Self {
        Self {
            code: code.to_string(),
            integration_code: code.to_string(),
            active: true,
            name: "Telegram".to_string(),
            client_id: client_id.to_string(),
            logo: format!("{base_url}{LOGO_PATH}"),
            base_url: base_url.to_string(),
            account_url: format!("{base_url}/bots/{client_id}"),
            actions: HashMap::from([("activity".to_string(), "/actions/activity".to_string())]),
            integrations: Integrations {
                mg_transport: MgTransport {
                    webhook_url: format!("{base_url}/webhook"),
                },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct CredentialsResponse {
    success: bool,
    #[serde(rename = "errorMsg")]
    error_msg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IntegrationResponse {
    success: bool,
    #[serde(rename = "errorMsg")]
    error_msg: Option<String>,
    #[serde(default)]
    info: HashMap<String, serde_json::Value>,
}

/// Operations the bridge performs against a CRM account.
#[async_trait]
pub trait CrmApi: Send + Sync {
    /// Verify that `api_key` is accepted by the CRM at `api_url`.
    async fn check_credentials(&self, api_url: &str, api_key: &str) -> Result<(), CrmError>;

    /// Register (or update) the integration module and return the transport
    /// credentials the CRM assigned.
    async fn register_integration(
        &self,
        api_url: &str,
        api_key: &str,
        module: &IntegrationModule,
    ) -> Result<TransportCredentials, CrmError>;
}

/// reqwest-backed [`CrmApi`].
#[derive(Clone)]
pub struct CrmClient {
    client: Client,
}

impl CrmClient {
    pub fn new(timeout: Duration) -> Result<Self, CrmError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client))
    }

    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn url(api_url: &str, path: &str) -> String {
        format!("{}/{path}", api_url.trim_end_matches('/'))
    }

    async fn check(resp: Response) -> Result<Response, CrmError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), %body, "CRM API rejected request");
        Err(CrmError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

fn info_string(info: &HashMap<String, serde_json::Value>, key: &str) -> Option<String> {
    info.get(key)
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl CrmApi for CrmClient {
    async fn check_credentials(&self, api_url: &str, api_key: &str) -> Result<(), CrmError> {
        debug!(%api_url, "Checking CRM credentials");
        let resp = self
            .client
            .get(Self::url(api_url, "api/credentials"))
            .header(API_KEY_HEADER, api_key)
            .send()
            .await?;
        let body: CredentialsResponse = Self::check(resp).await?.json().await?;
        if !body.success {
            return Err(CrmError::Rejected(body.error_msg.unwrap_or_default()));
        }
        Ok(())
    }

    async fn register_integration(
        &self,
        api_url: &str,
        api_key: &str,
        module: &IntegrationModule,
    ) -> Result<TransportCredentials, CrmError> {
        debug!(%api_url, code = %module.code, "Registering integration module");
        let encoded = serde_json::to_string(module)
            .map_err(|e| CrmError::Rejected(format!("unencodable module: {e}")))?;
        let resp = self
            .client
            .post(Self::url(
                api_url,
                &format!("api/v5/integration-modules/{}/edit", module.code),
            ))
            .header(API_KEY_HEADER, api_key)
            .form(&[("integrationModule", encoded)])
            .send()
            .await?;
        let body: IntegrationResponse = Self::check(resp).await?.json().await?;
        if !body.success {
            return Err(CrmError::Rejected(body.error_msg.unwrap_or_default()));
        }

        match (
            info_string(&body.info, "baseUrl"),
            info_string(&body.info, "token"),
        ) {
            (Some(url), Some(token)) => Ok(TransportCredentials { url, token }),
            _ => Err(CrmError::MissingTransport),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn rejected_credentials_are_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/credentials"))
            .and(header(API_KEY_HEADER, "bad-key"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": false, "errorMsg": "Wrong apiKey value"})),
            )
            .mount(&server)
            .await;

        let err = CrmClient::with_client(Client::new())
            .check_credentials(&server.uri(), "bad-key")
            .await
            .unwrap_err();
        assert!(matches!(err, CrmError::Rejected(msg) if msg.contains("apiKey")));
    }

    #[tokio::test]
    async fn registration_returns_transport_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v5/integration-modules/telegram/edit"))
            .and(header(API_KEY_HEADER, "key"))
            .and(body_string_contains("integrationModule="))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "info": {"baseUrl": "https://mg.example.com", "token": "mg-token"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let module =
            IntegrationModule::for_bridge("telegram", "https://bridge.example.com", "client-1");
        let creds = CrmClient::with_client(Client::new())
            .register_integration(&server.uri(), "key", &module)
            .await
            .unwrap();
        assert_eq!(creds.url, "https://mg.example.com");
        assert_eq!(creds.token, "mg-token");
    }

    #[test]
    fn module_advertises_bridge_endpoints() {
        let module =
            IntegrationModule::for_bridge("telegram", "https://bridge.example.com", "abc");
        let body = serde_json::to_value(&module).unwrap();
        assert_eq!(body["clientId"], "abc");
        assert_eq!(
            body["logo"],
            "https://bridge.example.com/web/telegram_logo.svg"
        );
        assert_eq!(body["accountUrl"], "https://bridge.example.com/bots/abc");
        assert_eq!(body["actions"]["activity"], "/actions/activity");
        assert_eq!(
            body["integrations"]["mgTransport"]["webhookUrl"],
            "https://bridge.example.com/webhook"
        );
    }
}
