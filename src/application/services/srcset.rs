//! `srcset` string building for the optimize endpoint.

use url::form_urlencoded;

use crate::domain::entities::DEFAULT_SIZE_LADDER;

/// Endpoint path the builder targets by default.
pub const DEFAULT_ENDPOINT: &str = "/_image";

/// Builds `src`/`srcset` attribute values pointing at the optimize endpoint.
///
/// The size ladder must match the serving optimizer's configuration, or the
/// generated URLs will be rejected as off-ladder.
#[derive(Debug, Clone)]
pub struct SrcSetBuilder {
    endpoint: String,
    sizes: Vec<u32>,
}

impl SrcSetBuilder {
    /// Builder for the default endpoint and size ladder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            sizes: DEFAULT_SIZE_LADDER.to_vec(),
        }
    }

    /// Points the builder at a different endpoint path.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Replaces the size ladder.
    #[must_use]
    pub fn with_sizes(mut self, sizes: Vec<u32>) -> Self {
        self.sizes = sizes;
        self
    }

    /// Snaps a desired display width to the ladder: the first ladder size
    /// at least as wide, or the largest when the width exceeds them all.
    #[must_use]
    pub fn size_for_width(&self, width: u32) -> u32 {
        self.sizes
            .iter()
            .copied()
            .find(|size| width <= *size)
            .or_else(|| self.sizes.last().copied())
            .unwrap_or(width)
    }

    /// URL for a single snapped width, suitable for a `src` attribute.
    #[must_use]
    pub fn url_for_width(&self, src: &str, width: u32, quality: Option<u8>) -> String {
        self.url_for_size(src, self.size_for_width(width), quality)
    }

    /// Full `srcset` value covering every ladder size, with width
    /// descriptors.
    #[must_use]
    pub fn srcset(&self, src: &str, quality: Option<u8>) -> String {
        self.sizes
            .iter()
            .map(|size| format!("{} {size}w", self.url_for_size(src, *size, quality)))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn url_for_size(&self, src: &str, size: u32, quality: Option<u8>) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query.append_pair("src", src);
        query.append_pair("size", &size.to_string());
        if let Some(quality) = quality {
            query.append_pair("quality", &quality.to_string());
        }
        format!("{}?{}", self.endpoint, query.finish())
    }
}

impl Default for SrcSetBuilder {
    fn default() -> Self {
        Self::new()
    }
}
