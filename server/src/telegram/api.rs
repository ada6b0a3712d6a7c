//! Raw HTTP calls to the Telegram Bot API.
//!
//! Wraps reqwest for `getMe`, `getUserProfilePhotos`, `getFile`,
//! `sendMessage`, `editMessageText`, `deleteMessage` and `setWebhook`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::types::{ApiResponse, File, SentMessage, User, UserProfilePhotos};
use super::{ChatPlatform, ProfilePhoto, TelegramError};

/// Low-level Telegram Bot API client shared by all bots.
#[derive(Clone)]
pub struct TelegramApi {
    client: Client,
    base_url: String,
}

impl TelegramApi {
    /// Create a client against `base_url` (normally `https://api.telegram.org`).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TelegramError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Create a client reusing an existing reqwest client.
    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn method_url(&self, token: &str, method: &str) -> String {
        format!("{}/bot{token}/{method}", self.base_url)
    }

    fn file_url(&self, token: &str, file_path: &str) -> String {
        format!("{}/file/bot{token}/{file_path}", self.base_url)
    }

    /// POST a Bot API method and unwrap the `{ok, result}` envelope.
    async fn call<T: DeserializeOwned>(
        &self,
        token: &str,
        method: &str,
        body: Value,
    ) -> Result<T, TelegramError> {
        debug!(method, "Telegram API call");

        let resp = self
            .client
            .post(self.method_url(token, method))
            .json(&body)
            .send()
            .await?;

        let api_resp: ApiResponse<T> = resp.json().await?;
        match api_resp {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse {
                description,
                error_code,
                ..
            } => {
                let description = description.unwrap_or_default();
                warn!(method, code = ?error_code, "{method} failed: {description}");
                Err(TelegramError::Api {
                    code: error_code,
                    description,
                })
            }
        }
    }
}

#[async_trait]
impl ChatPlatform for TelegramApi {
    async fn get_me(&self, token: &str) -> Result<User, TelegramError> {
        self.call(token, "getMe", json!({})).await
    }

    async fn get_user_profile_photo(
        &self,
        token: &str,
        user_id: i64,
    ) -> Result<Option<ProfilePhoto>, TelegramError> {
        let photos: UserProfilePhotos = self
            .call(
                token,
                "getUserProfilePhotos",
                json!({ "user_id": user_id, "limit": 1 }),
            )
            .await?;

        // Sizes are ordered smallest first; keep the largest of the newest photo.
        let Some(largest) = photos.photos.first().and_then(|sizes| sizes.last()) else {
            return Ok(None);
        };

        let file: File = self
            .call(token, "getFile", json!({ "file_id": largest.file_id }))
            .await?;

        Ok(Some(ProfilePhoto {
            source_id: largest.file_id.clone(),
            url: file.file_path.map(|path| self.file_url(token, &path)),
        }))
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, TelegramError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TelegramError::Download {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(resp.bytes().await?.to_vec())
    }

    async fn send_message(
        &self,
        token: &str,
        chat_id: i64,
        text: &str,
    ) -> Result<i64, TelegramError> {
        let sent: SentMessage = self
            .call(
                token,
                "sendMessage",
                json!({ "chat_id": chat_id, "text": text }),
            )
            .await?;
        Ok(sent.message_id)
    }

    async fn edit_message(
        &self,
        token: &str,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> Result<(), TelegramError> {
        // Result is the edited Message, or `true` for inline messages.
        let _: Value = self
            .call(
                token,
                "editMessageText",
                json!({ "chat_id": chat_id, "message_id": message_id, "text": text }),
            )
            .await?;
        Ok(())
    }

    async fn delete_message(
        &self,
        token: &str,
        chat_id: i64,
        message_id: i64,
    ) -> Result<(), TelegramError> {
        let _: bool = self
            .call(
                token,
                "deleteMessage",
                json!({ "chat_id": chat_id, "message_id": message_id }),
            )
            .await?;
        Ok(())
    }

    async fn set_webhook(&self, token: &str, url: &str) -> Result<(), TelegramError> {
        let _: bool = self
            .call(
                token,
                "setWebhook",
                json!({ "url": url, "allowed_updates": ["message", "edited_message"] }),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api_for(server: &MockServer) -> TelegramApi {
        TelegramApi::with_client(Client::new(), &server.uri())
    }

    #[tokio::test]
    async fn send_message_returns_native_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bottest-token/sendMessage"))
            .and(body_partial_json(json!({"chat_id": 555, "text": "hello"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"ok": true, "result": {"message_id": 4242, "chat": {"id": 555}}}),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let id = api_for(&server)
            .send_message("test-token", 555, "hello")
            .await
            .unwrap();
        assert_eq!(id, 4242);
    }

    #[tokio::test]
    async fn api_error_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bottest-token/deleteMessage"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: message to delete not found"
            })))
            .mount(&server)
            .await;

        let err = api_for(&server)
            .delete_message("test-token", 555, 101)
            .await
            .unwrap_err();
        match err {
            TelegramError::Api { code, description } => {
                assert_eq!(code, Some(400));
                assert!(description.contains("not found"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn profile_photo_resolves_largest_size_and_file_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bottest-token/getUserProfilePhotos"))
            .and(body_partial_json(json!({"user_id": 7, "limit": 1})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": {"total_count": 1, "photos": [[
                    {"file_id": "small", "width": 160, "height": 160},
                    {"file_id": "big", "width": 640, "height": 640}
                ]]}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/bottest-token/getFile"))
            .and(body_partial_json(json!({"file_id": "big"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": {"file_id": "big", "file_path": "photos/file_1.jpg"}
            })))
            .mount(&server)
            .await;

        let photo = api_for(&server)
            .get_user_profile_photo("test-token", 7)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(photo.source_id, "big");
        assert_eq!(
            photo.url.unwrap(),
            format!("{}/file/bottest-token/photos/file_1.jpg", server.uri())
        );
    }

    #[tokio::test]
    async fn user_without_photo_yields_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bottest-token/getUserProfilePhotos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": {"total_count": 0, "photos": []}
            })))
            .mount(&server)
            .await;

        let photo = api_for(&server)
            .get_user_profile_photo("test-token", 7)
            .await
            .unwrap();
        assert!(photo.is_none());
    }

    #[tokio::test]
    async fn failed_download_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/file/bottest-token/photos/missing.jpg"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = format!("{}/file/bottest-token/photos/missing.jpg", server.uri());
        let err = api_for(&server).download(&url).await.unwrap_err();
        assert!(matches!(err, TelegramError::Download { status: 404, .. }));
    }
}
