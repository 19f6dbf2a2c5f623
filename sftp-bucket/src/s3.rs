//! S3 adapters: the destination [`ObjectStore`] and the config document source.

use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use sftp_bucket_core::config::Config;
use sftp_bucket_core::contract::{ConfigProvider, ObjectStore};
use sftp_bucket_core::destination::destination_uri;
use sftp_bucket_core::error::{ConfigError, TransferError};
use tracing::{debug, info};

pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn upload_file(
        &self,
        local_path: &Path,
        bucket: &str,
        key: &str,
    ) -> Result<(), TransferError> {
        let upload_error = |reason: String| TransferError::Upload {
            local_path: local_path.to_path_buf(),
            uri: destination_uri(bucket, key),
            reason,
        };

        let body = ByteStream::from_path(local_path)
            .await
            .map_err(|e| upload_error(e.to_string()))?;
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| upload_error(DisplayErrorContext(&e).to_string()))?;

        debug!(bucket, key, "Uploaded object");
        Ok(())
    }

    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool, TransferError> {
        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(false),
            Err(e) => Err(TransferError::DestinationCheck {
                uri: destination_uri(bucket, key),
                reason: DisplayErrorContext(&e).to_string(),
            }),
        }
    }
}

/// Reads the JSON config document from `s3://bucket/key`.
pub struct S3ConfigProvider {
    client: Client,
    bucket: String,
    key: String,
}

impl S3ConfigProvider {
    pub fn new(client: Client, bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    fn location(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }
}

#[async_trait]
impl ConfigProvider for S3ConfigProvider {
    async fn load(&self) -> Result<Config, ConfigError> {
        info!(location = %self.location(), "Loading configuration from S3");
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .send()
            .await
            .map_err(|e| ConfigError::Fetch {
                location: self.location(),
                reason: DisplayErrorContext(&e).to_string(),
            })?;
        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| ConfigError::Fetch {
                location: self.location(),
                reason: e.to_string(),
            })?
            .into_bytes();
        let document = String::from_utf8(bytes.to_vec())?;
        Config::from_json(&document)
    }
}
