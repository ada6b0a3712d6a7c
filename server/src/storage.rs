//! S3 Storage Client
//!
//! Publicly readable object storage for mirrored user avatars.
//! Supports any S3-compatible backend: AWS S3, MinIO, Backblaze B2, Cloudflare R2.

use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_s3::{
    config::{Credentials, IdentityCache, SharedCredentialsProvider, StalledStreamProtectionConfig},
    primitives::ByteStream,
    types::ObjectCannedAcl,
    Client,
};
use thiserror::Error;
use tracing::info;

use crate::config::Config;

/// S3-related errors.
#[derive(Debug, Error)]
pub enum S3Error {
    /// Failed to upload file.
    #[error("Failed to upload file: {0}")]
    Upload(String),

    /// S3 configuration error.
    #[error("S3 configuration error: {0}")]
    Config(String),
}

/// Object storage the avatar mirror writes to.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `data` under `key` and return the object's public URL.
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str)
        -> Result<String, S3Error>;

    /// Whether the backing store is reachable.
    async fn health_check(&self) -> Result<(), S3Error> {
        Ok(())
    }
}

/// S3 client wrapper with configuration.
#[derive(Clone)]
pub struct S3Client {
    client: Client,
    bucket: String,
    public_base: String,
}

impl S3Client {
    /// Create a new S3 client from configuration.
    ///
    /// Uses path-style addressing when a custom endpoint is configured.
    pub fn new(config: &Config) -> Self {
        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .region(Region::new(config.s3_region.clone()))
            .stalled_stream_protection(StalledStreamProtectionConfig::disabled())
            .identity_cache(IdentityCache::no_cache());

        if let (Ok(access_key), Ok(secret_key)) = (
            std::env::var("AWS_ACCESS_KEY_ID"),
            std::env::var("AWS_SECRET_ACCESS_KEY"),
        ) {
            let credentials = Credentials::new(access_key, secret_key, None, None, "environment");
            s3_config_builder =
                s3_config_builder.credentials_provider(SharedCredentialsProvider::new(credentials));
        }

        if let Some(endpoint) = &config.s3_endpoint {
            s3_config_builder = s3_config_builder
                .endpoint_url(endpoint)
                .force_path_style(true);
        }

        let client = Client::from_conf(s3_config_builder.build());
        let public_base = public_base_url(config);

        info!(
            bucket = %config.s3_bucket,
            endpoint = ?config.s3_endpoint,
            %public_base,
            "S3 client initialized"
        );

        Self {
            client,
            bucket: config.s3_bucket.clone(),
            public_base,
        }
    }
}

#[async_trait]
impl ObjectStorage for S3Client {
    async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, S3Error> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .acl(ObjectCannedAcl::PublicRead)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| S3Error::Upload(e.to_string()))?;

        Ok(format!("{}/{key}", self.public_base))
    }

    async fn health_check(&self) -> Result<(), S3Error> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| S3Error::Config(format!("Bucket not accessible: {e}")))?;

        Ok(())
    }
}

/// Base URL objects are publicly served from.
///
/// `S3_PUBLIC_URL` wins, then a path-style URL on the custom endpoint, then
/// the virtual-hosted AWS URL.
pub fn public_base_url(config: &Config) -> String {
    if let Some(public) = &config.s3_public_url {
        return public.trim_end_matches('/').to_string();
    }
    if let Some(endpoint) = &config.s3_endpoint {
        return format!("{}/{}", endpoint.trim_end_matches('/'), config.s3_bucket);
    }
    format!(
        "https://{}.s3.{}.amazonaws.com",
        config.s3_bucket, config.s3_region
    )
}
