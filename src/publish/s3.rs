use anyhow::{Context, Result};
use serde::Serialize;

use super::Publisher;

/// Uploads JSON documents to an S3 bucket with `application/json` content type.
pub struct S3Publisher {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Publisher {
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Creates a publisher using the ambient AWS configuration (env vars,
    /// instance profile, etc.).
    pub async fn from_env(bucket: impl Into<String>) -> Self {
        let config = aws_config::load_from_env().await;
        Self::new(aws_sdk_s3::Client::new(&config), bucket)
    }
}

#[async_trait::async_trait]
impl Publisher for S3Publisher {
    async fn put_json<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<()> {
        let body = serde_json::to_vec(value)?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body.into())
            .content_type("application/json")
            .send()
            .await
            .with_context(|| format!("S3 PutObject failed for 's3://{}/{key}'", self.bucket))?;

        Ok(())
    }
}
