//! Object storage
//!
//! [`ObjectStore`] is the single write the pipeline makes to durable
//! storage. [`S3Client`] implements it against any S3-compatible endpoint.
//!
//! # Example
//!
//! ```no_run
//! use reel_uploadr::config::StorageConfig;
//! use reel_uploadr::s3::{ObjectStore, S3Client};
//!
//! # async fn example(config: StorageConfig) -> Result<(), Box<dyn std::error::Error>> {
//! let client = S3Client::from_config(&config).await;
//! let file = tokio::fs::File::open("/tmp/video.mp4").await?;
//! let response = client
//!     .put_object(&config.bucket, "landscape/abc.mp4", "video/mp4", file)
//!     .await?;
//! println!("ETag: {:?}", response.etag);
//! # Ok(())
//! # }
//! ```
//!
//! # Tracing
//!
//! | Operation | Span Name | Fields |
//! |-----------|-----------|--------|
//! | PutObject | `s3.put_object` | bucket, key, content_type, bytes, etag |

use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use thiserror::Error;

use crate::config::StorageConfig;

/// S3 client errors
#[derive(Error, Debug)]
pub enum S3ClientError {
    #[error("Body error: {0}")]
    BodyError(String),

    #[error("Request error: {0}")]
    RequestError(String),
}

/// Result of a successful PutObject
#[derive(Debug, Clone, Default)]
pub struct PutObjectResponse {
    pub etag: Option<String>,
}

/// Durable blob storage with a put operation
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` under `key`, streaming it from the open file
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        body: tokio::fs::File,
    ) -> Result<PutObjectResponse, S3ClientError>;
}

/// S3 Client
#[derive(Clone, Debug)]
pub struct S3Client {
    client: aws_sdk_s3::Client,
}

impl S3Client {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }

    /// Build a client from storage settings
    ///
    /// Static credentials are used when both keys are configured, otherwise
    /// the default AWS provider chain. A custom endpoint implies path-style
    /// addressing.
    pub async fn from_config(config: &StorageConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
            loader = loader.credentials_provider(Credentials::new(
                access_key.clone(),
                secret_key.clone(),
                None,
                None,
                "static",
            ));
        }

        let sdk_config = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.endpoint.is_some())
            .build();

        tracing::info!(
            region = %config.region,
            endpoint = ?config.endpoint,
            bucket = %config.bucket,
            "S3 client configured"
        );

        Self::new(aws_sdk_s3::Client::from_conf(s3_config))
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    #[tracing::instrument(
        name = "s3.put_object",
        skip(self, body),
        fields(
            s3.bucket = %bucket,
            s3.key = %key,
            content_type = %content_type,
            upload.bytes = tracing::field::Empty,
            s3.etag = tracing::field::Empty
        ),
        err
    )]
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        body: tokio::fs::File,
    ) -> Result<PutObjectResponse, S3ClientError> {
        let length = body
            .metadata()
            .await
            .map_err(|e| S3ClientError::BodyError(e.to_string()))?
            .len();

        let stream = ByteStream::read_from()
            .file(body)
            .build()
            .await
            .map_err(|e| S3ClientError::BodyError(e.to_string()))?;

        let output = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .content_length(length as i64)
            .body(stream)
            .send()
            .await
            .map_err(|e| S3ClientError::RequestError(DisplayErrorContext(&e).to_string()))?;

        let etag = output.e_tag().map(str::to_string);

        let span = tracing::Span::current();
        span.record("upload.bytes", length);
        if let Some(etag) = &etag {
            span.record("s3.etag", etag.as_str());
        }

        tracing::info!(bytes = length, "PutObject completed");

        Ok(PutObjectResponse { etag })
    }
}
