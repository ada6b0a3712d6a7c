//! Reusable test helpers for HTTP integration tests.
//!
//! Provides `TestApp` for building and sending requests through the full axum
//! router. The chat platform, the transport and the CRM are `wiremock`
//! servers; directories live in memory and uploads are recorded instead of
//! hitting S3.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{self, Method, Request, Response};
use axum::Router;
use bridge_server::api::{create_router, AppState, AppStateConfig};
use bridge_server::config::Config;
use bridge_server::crm::CrmClient;
use bridge_server::db::{Bot, Connection};
use bridge_server::directory::{BotDirectory, ConnectionDirectory, MemoryDirectory};
use bridge_server::storage::{ObjectStorage, S3Error};
use bridge_server::telegram::TelegramApi;
use bridge_server::transport::TransportClient;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Token of the bot most tests talk through.
pub const BOT_TOKEN: &str = "123456:test-token";

/// Transport token seeded on test connections.
pub const TRANSPORT_TOKEN: &str = "transport-token";

/// Base URL the recording storage hands out.
pub const CDN_BASE: &str = "https://cdn.test";

/// One recorded upload.
#[derive(Debug, Clone)]
pub struct Upload {
    pub key: String,
    pub size: usize,
    pub content_type: String,
}

/// Object storage that remembers what it was asked to store.
#[derive(Default)]
pub struct RecordingStorage {
    uploads: Mutex<Vec<Upload>>,
}

impl RecordingStorage {
    pub fn uploads(&self) -> Vec<Upload> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStorage for RecordingStorage {
    async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, S3Error> {
        self.uploads.lock().unwrap().push(Upload {
            key: key.to_string(),
            size: data.len(),
            content_type: content_type.to_string(),
        });
        Ok(format!("{CDN_BASE}/{key}"))
    }
}

/// Full router wired against mock upstreams.
pub struct TestApp {
    pub router: Router,
    pub config: Config,
    pub directory: Arc<MemoryDirectory>,
    pub storage: Arc<RecordingStorage>,
    pub telegram: MockServer,
    pub transport: MockServer,
    pub crm: MockServer,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(Config::default_for_test()).await
    }

    /// Build the app with `config`; upstream URLs are replaced by the mocks.
    pub async fn with_config(mut config: Config) -> Self {
        let telegram = MockServer::start().await;
        let transport = MockServer::start().await;
        let crm = MockServer::start().await;

        config.telegram_api_url = telegram.uri();
        config.crm_url_pattern =
            r"^(http://127\.0\.0\.1:\d+|https://[\da-z\.-]+\.retailcrm\.(ru|pro))/?$".into();

        let directory = Arc::new(MemoryDirectory::new());
        let storage = Arc::new(RecordingStorage::default());
        let client = reqwest::Client::new();

        let state = AppState::new(AppStateConfig {
            config: config.clone(),
            connections: directory.clone(),
            bots: directory.clone(),
            profiles: directory.clone(),
            transport: Arc::new(TransportClient::with_client(client.clone())),
            chat: Arc::new(TelegramApi::with_client(client.clone(), &telegram.uri())),
            storage: storage.clone(),
            crm: Arc::new(CrmClient::with_client(client)),
        })
        .expect("Failed to build app state");

        Self {
            router: create_router(state),
            config,
            directory,
            storage,
            telegram,
            transport,
            crm,
        }
    }

    /// Build a request with the given method and URI.
    pub fn request(method: Method, uri: &str) -> http::request::Builder {
        Request::builder().method(method).uri(uri)
    }

    /// Send a request through the router.
    pub async fn oneshot(&self, req: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to execute request")
    }

    /// POST a JSON body to `uri`.
    pub async fn post_json(&self, uri: &str, body: &Value) -> Response<Body> {
        let req = Self::request(Method::POST, uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.oneshot(req).await
    }

    /// POST a transport webhook for `client_id`.
    pub async fn post_transport_webhook(&self, client_id: &str, body: &Value) -> Response<Body> {
        let req = Self::request(Method::POST, "/webhook")
            .header("Content-Type", "application/json")
            .header("Clientid", client_id)
            .body(Body::from(body.to_string()))
            .unwrap();
        self.oneshot(req).await
    }

    /// POST a chat-platform update for the bot owning `token`.
    pub async fn post_update(&self, token: &str, body: &Value) -> Response<Body> {
        self.post_json(&format!("/telegram/{token}"), body).await
    }

    /// Store an active connection whose transport is the mock server.
    pub async fn seed_connection(&self, client_id: &str) -> Connection {
        let mut connection = Connection::new(
            client_id.to_string(),
            format!("https://{client_id}.retailcrm.ru"),
            "crm-key".to_string(),
        );
        connection.transport_url = self.transport.uri();
        connection.transport_token = TRANSPORT_TOKEN.to_string();
        ConnectionDirectory::create(&*self.directory, &connection)
            .await
            .expect("Failed to seed connection");
        connection
    }

    /// Store a bot with `channel_id` under `connection`.
    pub async fn seed_bot(
        &self,
        connection: &Connection,
        token: &str,
        channel_id: &str,
        active: bool,
    ) -> Bot {
        let mut bot = Bot::new(connection.id, token.to_string(), "test_bot".to_string());
        bot.channel_id = channel_id.to_string();
        bot.active = active;
        BotDirectory::create(&*self.directory, &bot)
            .await
            .expect("Failed to seed bot");
        bot
    }

    pub async fn bot(&self, token: &str) -> Option<Bot> {
        BotDirectory::get_by_token(&*self.directory, token)
            .await
            .unwrap()
    }

    pub async fn connection(&self, client_id: &str) -> Option<Connection> {
        ConnectionDirectory::get_by_client_id(&*self.directory, client_id)
            .await
            .unwrap()
    }

    /// Bot API path for `method` of the bot owning `token`.
    pub fn bot_path(token: &str, method: &str) -> String {
        format!("/bot{token}/{method}")
    }

    /// Mount a profile photo for `user_id` and the file behind it.
    pub async fn mount_profile_photo(&self, token: &str, user_id: i64, file_id: &str) {
        Mock::given(method("POST"))
            .and(path(Self::bot_path(token, "getUserProfilePhotos")))
            .and(body_partial_json(json!({ "user_id": user_id })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": {"total_count": 1, "photos": [[
                    {"file_id": format!("{file_id}-small"), "width": 160, "height": 160},
                    {"file_id": file_id, "width": 640, "height": 640}
                ]]}
            })))
            .mount(&self.telegram)
            .await;
        Mock::given(method("POST"))
            .and(path(Self::bot_path(token, "getFile")))
            .and(body_partial_json(json!({ "file_id": file_id })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": {"file_id": file_id, "file_path": format!("photos/{file_id}.jpg")}
            })))
            .mount(&self.telegram)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/file/bot{token}/photos/{file_id}.jpg")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0]))
            .mount(&self.telegram)
            .await;
    }

    /// Mount an empty photo list for every user of `token`.
    pub async fn mount_no_profile_photo(&self, token: &str) {
        Mock::given(method("POST"))
            .and(path(Self::bot_path(token, "getUserProfilePhotos")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": {"total_count": 0, "photos": []}
            })))
            .mount(&self.telegram)
            .await;
    }

    /// Requests the transport mock received for `method`/`path`.
    pub async fn transport_requests(&self, http_method: &str, request_path: &str) -> Vec<Value> {
        self.transport
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.method.as_str() == http_method && r.url.path() == request_path)
            .map(|r| serde_json::from_slice(&r.body).unwrap_or(Value::Null))
            .collect()
    }
}

/// Collect a response body and parse it as JSON.
pub async fn body_to_json(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to collect response body")
        .to_bytes();
    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        let preview = String::from_utf8_lossy(&bytes);
        panic!("Failed to parse response as JSON: {e}\nBody: {preview}")
    })
}

/// Collect a response body as bytes.
pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("Failed to collect response body")
        .to_bytes()
        .to_vec()
}

/// Chat-platform update carrying a new text message.
pub fn text_update(message_id: i64, user_id: i64, chat_id: i64, text: &str) -> Value {
    json!({
        "update_id": 1,
        "message": {
            "message_id": message_id,
            "from": {"id": user_id, "is_bot": false, "first_name": "Ann", "username": "abc", "language_code": "en"},
            "chat": {"id": chat_id, "type": "private"},
            "date": 1_700_000_000,
            "text": text
        }
    })
}
