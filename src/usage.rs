//! Best-effort usage log
//!
//! Every generation request leaves a `UsageRecord` behind. Recording happens
//! off the request path: a failing sink is logged and otherwise ignored.

use crate::models::UsageRecord;
use crate::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;

#[async_trait]
pub trait UsageSink: Send + Sync {
    async fn append(&self, record: &UsageRecord) -> Result<()>;
}

/// Appends one JSON object per line.
pub struct JsonlUsageSink {
    path: PathBuf,
    // Serializes appends so concurrent records never interleave.
    lock: tokio::sync::Mutex<()>,
}

impl JsonlUsageSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: tokio::sync::Mutex::new(()),
        }
    }
}

#[async_trait]
impl UsageSink for JsonlUsageSink {
    async fn append(&self, record: &UsageRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Emits records as tracing events only.
pub struct TracingUsageSink;

#[async_trait]
impl UsageSink for TracingUsageSink {
    async fn append(&self, record: &UsageRecord) -> Result<()> {
        tracing::info!(
            user_id = record.user_id,
            created_at = %record.created_at,
            prompt_chars = record.prompt.chars().count(),
            "Image generation requested"
        );
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryUsageSink {
    records: Arc<Mutex<Vec<UsageRecord>>>,
    fail: bool,
}

impl MemoryUsageSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every append fails; records are still not kept.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn records(&self) -> Vec<UsageRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl UsageSink for MemoryUsageSink {
    async fn append(&self, record: &UsageRecord) -> Result<()> {
        if self.fail {
            return Err(crate::Error::Storage("usage sink unavailable".to_string()));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

#[derive(Clone)]
pub struct UsageLog {
    sink: Arc<dyn UsageSink>,
}

impl UsageLog {
    pub fn new(sink: Arc<dyn UsageSink>) -> Self {
        Self { sink }
    }

    /// Hands the record to the sink on a background task.
    pub fn record(&self, record: UsageRecord) -> tokio::task::JoinHandle<()> {
        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            if let Err(e) = sink.append(&record).await {
                tracing::warn!(
                    "Failed to record usage for user {}: {}",
                    record.user_id,
                    e
                );
            }
        })
    }
}
