use super::{public_url, BlobStore};
use crate::models::FileRecord;
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub data: Vec<u8>,
    pub content_type: String,
}

#[derive(Clone)]
pub struct MockBlobStore {
    files: Arc<Mutex<HashMap<String, StoredFile>>>,
    base_url: String,
    upload_count: Arc<Mutex<usize>>,
    failures_left: Arc<Mutex<usize>>,
}

impl MockBlobStore {
    pub fn new() -> Self {
        Self {
            files: Arc::new(Mutex::new(HashMap::new())),
            base_url: "https://mock-storage.example.com".to_string(),
            upload_count: Arc::new(Mutex::new(0)),
            failures_left: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// The next `count` uploads fail.
    pub fn with_failures(self, count: usize) -> Self {
        *self.failures_left.lock().unwrap() = count;
        self
    }

    pub fn get_upload_count(&self) -> usize {
        *self.upload_count.lock().unwrap()
    }

    pub fn get_files(&self) -> HashMap<String, StoredFile> {
        self.files.lock().unwrap().clone()
    }
}

impl Default for MockBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for MockBlobStore {
    async fn put(&self, record: &FileRecord, data: &[u8], content_type: &str) -> Result<String> {
        *self.upload_count.lock().unwrap() += 1;

        {
            let mut failures = self.failures_left.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(Error::Storage("Mock upload failure".to_string()));
            }
        }

        let key = record.key();
        self.files.lock().unwrap().insert(
            key.clone(),
            StoredFile {
                data: data.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(public_url(&self.base_url, &key))
    }
}
