//! Port definition for image decoding and encoding.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::entities::OutputFormat;
use crate::domain::errors::OptimizeResult;

/// Port for the external image codec.
/// Implementations must be thread-safe; CPU-heavy work belongs on a
/// blocking task.
#[async_trait]
pub trait ImageCodecPort: Send + Sync {
    /// Decodes raw bytes into an image handle.
    async fn decode(&self, bytes: Bytes) -> OptimizeResult<Arc<image::DynamicImage>>;

    /// Encodes the image at `target_width` in the given format and quality,
    /// resizing down first when the handle is wider than the target. Never
    /// upscales; callers gate on intrinsic width before asking.
    async fn encode(
        &self,
        image: Arc<image::DynamicImage>,
        target_width: u32,
        format: OutputFormat,
        quality: u8,
    ) -> OptimizeResult<Bytes>;
}
