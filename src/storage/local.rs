use super::{public_url, BlobStore};
use crate::models::FileRecord;
use crate::{Error, Result};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

/// Writes files below a directory that the server exposes at `base_url`.
pub struct LocalBlobStore {
    root: PathBuf,
    base_url: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            base_url: base_url.into(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, record: &FileRecord, data: &[u8], _content_type: &str) -> Result<String> {
        let key = record.key();
        let relative = Path::new(&key);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(Error::Storage(format!("Refusing to write outside storage: {}", key)));
        }

        let target = self.root.join(relative);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, data).await?;

        tracing::info!("Stored {} ({} bytes)", target.display(), data.len());
        Ok(public_url(&self.base_url, &key))
    }
}
