//! Output format definitions for encoded variants.

use serde::{Deserialize, Serialize};

/// Target encoding for a computed variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Lossy WebP.
    Webp,
    /// AVIF (AV1 still image).
    Avif,
}

impl OutputFormat {
    /// Returns the short format name as used in query strings and Accept
    /// headers.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Webp => "webp",
            Self::Avif => "avif",
        }
    }

    /// Returns the MIME type for response headers.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Webp => "image/webp",
            Self::Avif => "image/avif",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A format paired with the quality it should be encoded at.
///
/// Preferences are held in priority order; the first whose format name
/// appears in the request's `Accept` header wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatPreference {
    /// Target format.
    pub format: OutputFormat,
    /// Encoder quality, 1-100.
    pub quality: u8,
}

impl FormatPreference {
    /// Creates a preference pair.
    #[must_use]
    pub const fn new(format: OutputFormat, quality: u8) -> Self {
        Self { format, quality }
    }
}

impl std::fmt::Display for FormatPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.format, self.quality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_names() {
        assert_eq!(OutputFormat::Webp.name(), "webp");
        assert_eq!(OutputFormat::Avif.name(), "avif");
    }

    #[test]
    fn test_content_types() {
        assert_eq!(OutputFormat::Webp.content_type(), "image/webp");
        assert_eq!(OutputFormat::Avif.content_type(), "image/avif");
    }

    #[test]
    fn test_preference_display() {
        let pref = FormatPreference::new(OutputFormat::Avif, 45);
        assert_eq!(pref.to_string(), "avif@45");
    }

    #[test]
    fn test_serde_lowercase() {
        let doc = "format = \"webp\"\nquality = 65";
        let pref: FormatPreference = toml::from_str(doc).unwrap();

        assert_eq!(pref.format, OutputFormat::Webp);
        assert_eq!(pref.quality, 65);
    }
}
