//! Watermarking of generated images.
//!
//! A badge (raster or SVG) is composited onto the bottom-right corner of
//! every image before it is stored.

pub mod badge;
pub mod mock;
pub mod watermark;

pub use badge::Badge;
pub use mock::MockImageProcessor;
pub use watermark::{apply_watermark, Watermarker};

use async_trait::async_trait;

#[async_trait]
pub trait ImageService: Send + Sync {
    /// Returns PNG bytes with the badge applied, or the input when that is
    /// not possible.
    async fn watermark(&self, image_data: &[u8]) -> Vec<u8>;
}
