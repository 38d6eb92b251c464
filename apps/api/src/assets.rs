//! Blob-store access for uploaded resume assets.

use async_trait::async_trait;
use tracing::info;

use crate::errors::AppError;

/// Seam for the pipeline: delete an uploaded asset once it is no longer
/// needed.
#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn delete(&self, key: &str) -> Result<(), AppError>;
}

pub struct S3AssetStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3AssetStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    /// Existence probe; a missing key is `Ok(false)`, not an error.
    #[allow(dead_code)]
    pub async fn exists(&self, key: &str) -> Result<bool, AppError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.as_service_error().map(|se| se.is_not_found()).unwrap_or(false) {
                    Ok(false)
                } else {
                    Err(AppError::S3(format!("Failed to check file existence: {e}")))
                }
            }
        }
    }
}

#[async_trait]
impl AssetStore for S3AssetStore {
    async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::S3(format!("Failed to delete file: {e}")))?;

        info!("File deleted from S3: {key}");
        Ok(())
    }
}
