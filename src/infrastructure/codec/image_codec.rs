//! Image transcoding backed by the `image` and `webp` crates.

use std::borrow::Cow;
use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use image::DynamicImage;
use image::codecs::avif::AvifEncoder;
use image::imageops::FilterType;
use tracing::trace;

use crate::domain::entities::OutputFormat;
use crate::domain::errors::{OptimizeError, OptimizeResult};
use crate::domain::ports::ImageCodecPort;

/// AVIF encoder speed, trading output size for latency (1 slowest, 10
/// fastest).
const AVIF_SPEED: u8 = 8;

/// Codec that decodes with the `image` crate and encodes lossy WebP through
/// `libwebp` and AVIF through `ravif`.
///
/// Both directions run on blocking tasks so the async runtime stays
/// responsive while pixels churn.
#[derive(Debug, Default)]
pub struct ImageCodec;

impl ImageCodec {
    /// Creates the default codec.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ImageCodecPort for ImageCodec {
    async fn decode(&self, bytes: Bytes) -> OptimizeResult<Arc<DynamicImage>> {
        let decoded = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
            .await
            .map_err(|e| OptimizeError::decode(format!("Decode task panicked: {e}")))?
            .map_err(|e| OptimizeError::decode(format!("Failed to decode image: {e}")))?;

        trace!(
            width = decoded.width(),
            height = decoded.height(),
            "Decoded source image"
        );
        Ok(Arc::new(decoded))
    }

    async fn encode(
        &self,
        image: Arc<DynamicImage>,
        target_width: u32,
        format: OutputFormat,
        quality: u8,
    ) -> OptimizeResult<Bytes> {
        tokio::task::spawn_blocking(move || {
            encode_blocking(&image, target_width, format, quality)
        })
        .await
        .map_err(|e| OptimizeError::encode(format!("Encode task panicked: {e}")))?
    }
}

fn encode_blocking(
    image: &DynamicImage,
    target_width: u32,
    format: OutputFormat,
    quality: u8,
) -> OptimizeResult<Bytes> {
    let scaled = scale_to_width(image, target_width);
    match format {
        OutputFormat::Webp => {
            let rgba = scaled.to_rgba8();
            let (width, height) = rgba.dimensions();
            let encoder = webp::Encoder::from_rgba(&rgba, width, height);
            let memory = encoder.encode(f32::from(quality));
            Ok(Bytes::from(memory.to_vec()))
        }
        OutputFormat::Avif => {
            let mut buffer = Vec::new();
            let encoder =
                AvifEncoder::new_with_speed_quality(Cursor::new(&mut buffer), AVIF_SPEED, quality);
            scaled
                .write_with_encoder(encoder)
                .map_err(|e| OptimizeError::encode(format!("Failed to encode AVIF: {e}")))?;
            Ok(Bytes::from(buffer))
        }
    }
}

/// Downscales to exactly `target_width`, preserving aspect ratio. Images at
/// or below the target pass through untouched.
fn scale_to_width(image: &DynamicImage, target_width: u32) -> Cow<'_, DynamicImage> {
    if image.width() <= target_width {
        return Cow::Borrowed(image);
    }
    let height = scaled_height(image.width(), image.height(), target_width);
    Cow::Owned(image.resize_exact(target_width, height, FilterType::Lanczos3))
}

fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    if width == 0 {
        return 1;
    }
    let scaled =
        (u64::from(target_width) * u64::from(height) + u64::from(width) / 2) / u64::from(width);
    u32::try_from(scaled).unwrap_or(u32::MAX).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> DynamicImage {
        let buf = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        DynamicImage::ImageRgb8(buf)
    }

    fn png_bytes(width: u32, height: u32) -> Bytes {
        let mut buffer = Vec::new();
        gradient(width, height)
            .write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
            .unwrap();
        Bytes::from(buffer)
    }

    #[test]
    fn test_scaled_height_preserves_aspect_ratio() {
        assert_eq!(scaled_height(1920, 1080, 640), 360);
        assert_eq!(scaled_height(100, 75, 64), 48);
        assert_eq!(scaled_height(4000, 1, 360), 1);
    }

    #[tokio::test]
    async fn test_decode_reports_dimensions() {
        let codec = ImageCodec::new();
        let image = codec.decode(png_bytes(120, 80)).await.unwrap();
        assert_eq!(image.width(), 120);
        assert_eq!(image.height(), 80);
    }

    #[tokio::test]
    async fn test_decode_rejects_garbage() {
        let codec = ImageCodec::new();
        let err = codec
            .decode(Bytes::from_static(b"definitely not pixels"))
            .await
            .unwrap_err();
        assert!(matches!(err, OptimizeError::Decode { .. }));
        assert!(err.is_collaborator_error());
    }

    #[tokio::test]
    async fn test_encode_webp_scales_down() {
        let codec = ImageCodec::new();
        let image = Arc::new(gradient(128, 96));

        let bytes = codec
            .encode(image, 64, OutputFormat::Webp, 65)
            .await
            .unwrap();

        assert_eq!(&bytes[0..4], &b"RIFF"[..]);
        assert_eq!(&bytes[8..12], &b"WEBP"[..]);
        let roundtrip = image::load_from_memory(&bytes).unwrap();
        assert_eq!(roundtrip.width(), 64);
        assert_eq!(roundtrip.height(), 48);
    }

    #[tokio::test]
    async fn test_encode_never_upscales() {
        let codec = ImageCodec::new();
        let image = Arc::new(gradient(64, 48));

        let bytes = codec
            .encode(image, 64, OutputFormat::Webp, 65)
            .await
            .unwrap();

        let roundtrip = image::load_from_memory(&bytes).unwrap();
        assert_eq!(roundtrip.width(), 64);
        assert_eq!(roundtrip.height(), 48);
    }

    #[tokio::test]
    async fn test_encode_avif_produces_container() {
        let codec = ImageCodec::new();
        let image = Arc::new(gradient(64, 48));

        let bytes = codec
            .encode(image, 32, OutputFormat::Avif, 45)
            .await
            .unwrap();

        assert!(bytes.len() > 12);
        assert_eq!(&bytes[4..8], &b"ftyp"[..]);
    }
}
