//! Blob storage for generated images
//!
//! Images are written either to an S3-compatible bucket or to a local
//! directory served by the HTTP surface, and addressed by a public URL.

pub mod client;
pub mod local;
pub mod mock;

pub use client::S3BlobStore;
pub use local::LocalBlobStore;
pub use mock::MockBlobStore;

use crate::models::FileRecord;
use crate::Result;
use async_trait::async_trait;
use std::time::Duration;
use tokio_retry::{strategy::FixedInterval, Retry};

/// Pause between upload attempts.
pub const RETRY_INTERVAL: Duration = Duration::from_millis(500);
/// Attempts after the first one.
pub const RETRY_ATTEMPTS: usize = 2;

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `data` under the record's key and returns its public URL.
    async fn put(&self, record: &FileRecord, data: &[u8], content_type: &str) -> Result<String>;
}

/// Upload with a short fixed-interval retry; the last error is returned.
pub async fn put_with_retry(
    store: &dyn BlobStore,
    record: &FileRecord,
    data: &[u8],
    content_type: &str,
) -> Result<String> {
    let strategy = FixedInterval::new(RETRY_INTERVAL).take(RETRY_ATTEMPTS);

    Retry::spawn(strategy, || async {
        store.put(record, data, content_type).await.map_err(|e| {
            tracing::warn!("Upload of {} failed: {}. Will retry...", record.key(), e);
            e
        })
    })
    .await
    .map_err(|e| {
        tracing::error!("Failed to store {} after retries: {}", record.key(), e);
        e
    })
}

pub(crate) fn public_url(base_url: &str, key: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), key)
}
