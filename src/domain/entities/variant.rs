//! Variant keys and outcomes.

use bytes::Bytes;

use super::format::OutputFormat;

/// Default ladder of target widths, ascending.
pub const DEFAULT_SIZE_LADDER: [u32; 8] = [360, 640, 1024, 1280, 1600, 1920, 2560, 3840];

/// Key for a stored variant inside one source record.
///
/// Quality is deliberately absent: the allowed-size ladder bounds the number
/// of slots per source, and the last-computed quality for a (format, size)
/// pair overwrites any previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariantKey {
    /// Encoded format.
    pub format: OutputFormat,
    /// Target width in pixels.
    pub size: u32,
}

impl VariantKey {
    /// Creates a store key.
    #[must_use]
    pub const fn new(format: OutputFormat, size: u32) -> Self {
        Self { format, size }
    }
}

impl std::fmt::Display for VariantKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.format, self.size)
    }
}

/// Dedup key for the pending-request table: one exact requested variant.
///
/// Unlike [`VariantKey`] this includes the effective quality, so two
/// concurrent requests only coalesce when they would produce byte-identical
/// responses.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    /// Source identifier.
    pub src: String,
    /// Target width in pixels.
    pub size: u32,
    /// Negotiated format.
    pub format: OutputFormat,
    /// Effective quality after any per-request override.
    pub quality: u8,
}

impl RequestKey {
    /// Creates a dedup key.
    #[must_use]
    pub fn new(src: impl Into<String>, size: u32, format: OutputFormat, quality: u8) -> Self {
        Self {
            src: src.into(),
            size,
            format,
            quality,
        }
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}",
            self.src, self.size, self.format, self.quality
        )
    }
}

/// Result of asking a source record for a variant.
#[derive(Debug, Clone)]
pub enum VariantOutcome {
    /// Encoded bytes, served from the store or freshly computed.
    Ready(Bytes),
    /// The requested size exceeds the source's intrinsic width; re-request
    /// at the corrected size. Upscaling is never performed.
    Redirect {
        /// Intrinsic width of the source in pixels.
        width: u32,
    },
}

impl VariantOutcome {
    /// Returns true for the redirect outcome.
    #[must_use]
    pub const fn is_redirect(&self) -> bool {
        matches!(self, Self::Redirect { .. })
    }
}
