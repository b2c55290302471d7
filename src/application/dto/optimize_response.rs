//! Response-side DTO for the optimizer entry point.

use std::collections::HashMap;

use bytes::Bytes;

use crate::domain::entities::OutputFormat;

/// Cache lifetime for served variants: one year, immutable.
const CACHE_CONTROL_IMMUTABLE: &str = "public, max-age=31536000, immutable";

/// An HTTP-shaped optimize outcome.
///
/// The library does not bind to a web framework; callers translate this into
/// their server's response type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizeResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: Bytes,
}

impl OptimizeResponse {
    /// A served variant with immutable caching headers.
    #[must_use]
    pub fn ok(body: Bytes, format: OutputFormat) -> Self {
        let mut headers = HashMap::new();
        headers.insert(
            "Content-Type".to_string(),
            format.content_type().to_string(),
        );
        headers.insert(
            "Cache-Control".to_string(),
            CACHE_CONTROL_IMMUTABLE.to_string(),
        );
        Self {
            status: 200,
            headers,
            body,
        }
    }

    /// A redirect to the corrected variant URL.
    #[must_use]
    pub fn redirect(location: impl Into<String>) -> Self {
        let mut headers = HashMap::new();
        headers.insert("Location".to_string(), location.into());
        Self {
            status: 302,
            headers,
            body: Bytes::new(),
        }
    }

    /// A client error with a short diagnostic body.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: 400,
            headers: HashMap::new(),
            body: Bytes::from(message.into()),
        }
    }

    /// A client error with an empty body. Used when the request itself could
    /// not be parsed.
    #[must_use]
    pub fn bad_request_empty() -> Self {
        Self {
            status: 400,
            headers: HashMap::new(),
            body: Bytes::new(),
        }
    }

    /// Returns the named header, if set.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// True for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// True for the redirect-to-corrected-size outcome.
    #[must_use]
    pub const fn is_redirect(&self) -> bool {
        self.status == 302
    }
}
