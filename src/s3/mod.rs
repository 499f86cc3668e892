//! Object store gateway
//!
//! Uploads processed videos and issues presigned GET URLs through the AWS
//! SDK. Every operation is a single attempt; SDK retries are disabled.
//!
//! # Example
//!
//! ```no_run
//! use tubely_ingest::config::StorageConfig;
//! use tubely_ingest::s3::{ObjectStore, S3Gateway};
//! use std::path::Path;
//! use std::time::Duration;
//!
//! # async fn example(config: StorageConfig) -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = S3Gateway::new(&config).await?;
//! gateway
//!     .put_object(&config.bucket, "landscape/abc.mp4", Path::new("/tmp/abc.mp4"), "video/mp4")
//!     .await?;
//! let url = gateway
//!     .presign_get(&config.bucket, "landscape/abc.mp4", Duration::from_secs(300))
//!     .await?;
//! println!("{}", url);
//! # Ok(())
//! # }
//! ```
//!
//! # Tracing
//!
//! | Operation | Span Name | Attributes |
//! |-----------|-----------|------------|
//! | PutObject | `s3.put_object` | bucket, key, content type, bytes, etag |
//! | Presign GET | `s3.presign_get` | bucket, key, expiry |

pub mod locator;

pub use locator::{Locator, LocatorError, DELIMITER};

use crate::config::StorageConfig;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Lifetime of every presigned GET URL
pub const PRESIGN_EXPIRY: Duration = Duration::from_secs(5 * 60);

/// Object store errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unable to read upload source: {0}")]
    SourceError(String),

    #[error("PutObject failed: {0}")]
    UploadFailed(String),

    #[error("Unable to presign request: {0}")]
    PresignFailed(String),
}

/// Outcome of a successful upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub etag: Option<String>,
    pub bytes: u64,
}

/// Object store capability used by the pipeline
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload the file at `path` to `bucket`/`key` in a single request
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> Result<UploadResult, StorageError>;

    /// Signed GET URL for `bucket`/`key`, valid for `expires_in`
    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError>;
}

/// AWS SDK backed gateway
#[derive(Debug, Clone)]
pub struct S3Gateway {
    client: Client,
}

impl S3Gateway {
    /// Build a client from storage config.
    ///
    /// Static credentials are used when configured, otherwise the default AWS
    /// provider chain. A custom endpoint switches to path-style addressing.
    pub async fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let region = Region::new(config.region.clone());

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(region.clone())
            .retry_config(RetryConfig::disabled());

        match (&config.access_key, &config.secret_key) {
            (Some(access_key), Some(secret_key)) => {
                let credentials = Credentials::new(
                    access_key.clone(),
                    secret_key.clone(),
                    None,
                    None,
                    "tubely-config",
                );
                loader = loader.credentials_provider(credentials);
            }
            (None, None) => {}
            _ => {
                return Err(StorageError::ConfigError(
                    "access_key and secret_key must be set together".into(),
                ))
            }
        }

        let shared_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared_config)
            .region(region)
            .retry_config(RetryConfig::disabled());

        if let Some(endpoint) = &config.endpoint {
            url::Url::parse(endpoint)
                .map_err(|e| StorageError::ConfigError(format!("invalid endpoint: {}", e)))?;
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        tracing::info!(
            region = %config.region,
            endpoint = ?config.endpoint,
            "S3 gateway configured"
        );

        Ok(Self::from_client(Client::from_conf(builder.build())))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3Gateway {
    #[tracing::instrument(
        name = "s3.put_object",
        skip(self, path),
        fields(
            s3.bucket = %bucket,
            s3.key = %key,
            upload.bytes = tracing::field::Empty,
            s3.etag = tracing::field::Empty
        ),
        err
    )]
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> Result<UploadResult, StorageError> {
        let bytes = tokio::fs::metadata(path)
            .await
            .map_err(|e| StorageError::SourceError(e.to_string()))?
            .len();
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::SourceError(e.to_string()))?;

        let output = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| StorageError::UploadFailed(DisplayErrorContext(&e).to_string()))?;

        let etag = output.e_tag().map(str::to_string);

        let span = tracing::Span::current();
        span.record("upload.bytes", bytes);
        if let Some(etag) = &etag {
            span.record("s3.etag", etag.as_str());
        }

        tracing::info!(bytes, etag = ?etag, "PutObject completed");

        Ok(UploadResult { etag, bytes })
    }

    #[tracing::instrument(
        name = "s3.presign_get",
        skip(self),
        fields(s3.bucket = %bucket, s3.key = %key, expires_secs = expires_in.as_secs()),
        err
    )]
    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        let presigning_config = PresigningConfig::builder()
            .expires_in(expires_in)
            .build()
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning_config)
            .await
            .map_err(|e| StorageError::PresignFailed(DisplayErrorContext(&e).to_string()))?;

        Ok(request.uri().to_string())
    }
}
