use super::{public_url, BlobStore};
use crate::models::FileRecord;
use crate::{Error, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::{config::Region, types::ObjectCannedAcl, Client as S3Client};

/// S3-compatible bucket with public-read objects.
pub struct S3BlobStore {
    client: S3Client,
    bucket: String,
    base_url: String,
}

impl S3BlobStore {
    pub async fn new(
        access_key_id: String,
        secret_access_key: String,
        endpoint: String,
        bucket: String,
        base_url: String,
    ) -> Result<Self> {
        let credentials = aws_sdk_s3::config::Credentials::new(
            access_key_id,
            secret_access_key,
            None,
            None,
            "editor-ai-storage",
        );

        // Region is required by the SDK but ignored by most S3-compatible hosts.
        let config = aws_config::defaults(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new("us-east-1"))
            .endpoint_url(endpoint)
            .load()
            .await;

        Ok(Self {
            client: S3Client::new(&config),
            bucket,
            base_url,
        })
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, record: &FileRecord, data: &[u8], content_type: &str) -> Result<String> {
        let key = record.key();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(data.to_vec()))
            .content_type(content_type)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| Error::Storage(format!("Failed to upload file: {}", e)))?;

        tracing::info!("Uploaded {} ({} bytes) to bucket {}", key, data.len(), self.bucket);
        Ok(public_url(&self.base_url, &key))
    }
}
