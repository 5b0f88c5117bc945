//! Storage layer for hosted files
//!
//! Uploads generated files to Cloudflare R2 / AWS S3 under a per-message prefix.

use crate::config::Settings;
use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use aws_types::region::Region;
use thiserror::Error;
use tracing::{debug, error, info};

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Error putting object into S3
    #[error("S3 put error: {0}")]
    S3Put(String),
    /// Error checking the bucket
    #[error("S3 head bucket error: {0}")]
    S3Head(String),
    /// Configuration error (missing credentials, etc.)
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Interface for object stores
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `content` under `key`, overwriting any existing object.
    ///
    /// Returns `true` iff the upload succeeded.
    async fn put(&self, key: &str, content: &[u8]) -> bool;
}

/// R2-backed object store
pub struct R2Storage {
    client: Client,
    bucket: String,
}

impl R2Storage {
    /// Create a new R2 storage instance
    ///
    /// # Errors
    ///
    /// Returns an error if R2 configuration is missing.
    pub async fn new(settings: &Settings) -> Result<Self, StorageError> {
        let endpoint_url = settings
            .r2_endpoint_url
            .as_ref()
            .ok_or_else(|| StorageError::Config("R2_ENDPOINT_URL is missing".into()))?;
        let access_key = settings
            .r2_access_key_id
            .as_ref()
            .ok_or_else(|| StorageError::Config("R2_ACCESS_KEY_ID is missing".into()))?;
        let secret_key = settings
            .r2_secret_access_key
            .as_ref()
            .ok_or_else(|| StorageError::Config("R2_SECRET_ACCESS_KEY is missing".into()))?;

        let credentials = Credentials::new(access_key, secret_key, None, None, "r2-storage");

        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new("auto"))
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .endpoint_url(endpoint_url)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(s3_config),
            bucket: settings.r2_bucket_name.clone(),
        })
    }

    /// Upload raw bytes under `key`
    ///
    /// # Errors
    ///
    /// Returns `StorageError::S3Put` if the request fails or the service rejects it.
    pub async fn put_object(&self, key: &str, content: &[u8]) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(content.to_vec()))
            .content_type(content_type_for(key))
            .send()
            .await
            .map_err(|e| StorageError::S3Put(format!("{e:#?}")))?;
        Ok(())
    }

    /// Check that the configured bucket is reachable with the configured credentials
    ///
    /// # Errors
    ///
    /// Returns `StorageError::S3Head` if the bucket cannot be reached.
    pub async fn check_connection(&self) -> Result<(), StorageError> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => {
                info!(bucket = %self.bucket, "Successfully connected to R2 storage.");
                Ok(())
            }
            Err(e) => {
                let err_msg = format!("R2 connectivity test failed: {e:#?}");
                error!("{}", err_msg);
                Err(StorageError::S3Head(err_msg))
            }
        }
    }
}

#[async_trait]
impl ObjectStore for R2Storage {
    async fn put(&self, key: &str, content: &[u8]) -> bool {
        match self.put_object(key, content).await {
            Ok(()) => {
                debug!(key = %key, bytes = content.len(), "Object stored");
                true
            }
            Err(e) => {
                error!(key = %key, error = %e, "Failed to store object");
                false
            }
        }
    }
}

/// Returns the object key for a hosted file
#[must_use]
pub fn hosted_file_key(upload_key: &str, filename: &str) -> String {
    format!("{upload_key}/{filename}")
}

/// Guess a `Content-Type` from the key's extension so browsers render hosted pages
#[must_use]
pub fn content_type_for(key: &str) -> &'static str {
    let extension = std::path::Path::new(key)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("txt" | "md") => "text/plain; charset=utf-8",
        Some("xml") => "application/xml",
        _ => "application/octet-stream",
    }
}
