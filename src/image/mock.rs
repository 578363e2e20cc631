use super::ImageService;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Passes images through untouched and counts the calls.
#[derive(Clone, Default)]
pub struct MockImageProcessor {
    process_count: Arc<Mutex<usize>>,
    stamp: Option<Vec<u8>>,
}

impl MockImageProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every image with `bytes` instead of echoing it.
    pub fn with_output(mut self, bytes: Vec<u8>) -> Self {
        self.stamp = Some(bytes);
        self
    }

    pub fn get_process_count(&self) -> usize {
        *self.process_count.lock().unwrap()
    }
}

#[async_trait]
impl ImageService for MockImageProcessor {
    async fn watermark(&self, image_data: &[u8]) -> Vec<u8> {
        *self.process_count.lock().unwrap() += 1;
        match &self.stamp {
            Some(bytes) => bytes.clone(),
            None => image_data.to_vec(),
        }
    }
}
