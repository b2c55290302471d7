//! Request-side DTOs for the optimizer entry point.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::ports::AssetLoaderPort;

/// Request headers, looked up case-insensitively.
///
/// Built once at the boundary from whatever the embedding server exposes;
/// names are stored lowercased so lookups cost one map probe.
#[derive(Debug, Clone, Default)]
pub struct HeaderSource {
    entries: HashMap<String, String>,
}

impl HeaderSource {
    /// Creates an empty header source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a header source from name/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let entries = pairs
            .into_iter()
            .map(|(name, value)| (name.as_ref().to_ascii_lowercase(), value.into()))
            .collect();
        Self { entries }
    }

    /// Adds one header, replacing any previous value under the same name.
    #[must_use]
    pub fn with(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.entries
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Returns the value for `name`, ignoring ASCII case.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The `Accept` header, if present.
    #[must_use]
    pub fn accept(&self) -> Option<&str> {
        self.get("accept")
    }

    /// The `Cookie` header, if present.
    #[must_use]
    pub fn cookie(&self) -> Option<&str> {
        self.get("cookie")
    }

    /// The `Host` header, if present.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.get("host")
    }

    /// Iterates over all `(name, value)` pairs, names lowercased.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

/// One optimize call: the target URL plus the caller's request headers.
#[derive(Clone)]
pub struct OptimizeRequest {
    /// Request URL, absolute or server-relative, carrying `src` and `size`
    /// query parameters and an optional `quality`.
    pub target: String,
    /// Caller headers, read for format negotiation, the serving port, and
    /// cookie forwarding.
    pub headers: HeaderSource,
    /// Loader for local sources. Overrides the optimizer's configured
    /// loader for this request.
    pub loader: Option<Arc<dyn AssetLoaderPort>>,
}

impl OptimizeRequest {
    /// Creates a request for `target` with no headers.
    #[must_use]
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            headers: HeaderSource::new(),
            loader: None,
        }
    }

    /// Replaces the header set.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderSource) -> Self {
        self.headers = headers;
        self
    }

    /// Adds one header.
    #[must_use]
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers = self.headers.with(name, value);
        self
    }

    /// Supplies a per-request asset loader.
    #[must_use]
    pub fn with_loader(mut self, loader: Arc<dyn AssetLoaderPort>) -> Self {
        self.loader = Some(loader);
        self
    }
}

impl std::fmt::Debug for OptimizeRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptimizeRequest")
            .field("target", &self.target)
            .field("headers", &self.headers)
            .field("has_loader", &self.loader.is_some())
            .finish_non_exhaustive()
    }
}
