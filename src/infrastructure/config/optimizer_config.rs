//! Optimizer configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::entities::{DEFAULT_SIZE_LADDER, FormatPreference, OutputFormat};

/// Which remote hosts may be optimized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainPolicy {
    /// Any remote host.
    AllowAll,
    /// No remote hosts; only local path sources.
    #[default]
    LocalOnly,
    /// Remote hosts matching one of the listed domain suffixes.
    ///
    /// Matching is dot-anchored: `example.com` admits `example.com` and
    /// `cdn.example.com` but not `evilexample.com`.
    AllowedSuffixes(Vec<String>),
}

impl DomainPolicy {
    /// Returns true when `host` may be fetched under this policy.
    #[must_use]
    pub fn allows(&self, host: &str) -> bool {
        match self {
            Self::AllowAll => true,
            Self::LocalOnly => false,
            Self::AllowedSuffixes(suffixes) => {
                suffixes.iter().any(|suffix| host_matches(host, suffix))
            }
        }
    }
}

fn host_matches(host: &str, suffix: &str) -> bool {
    let suffix = suffix.trim_start_matches('.');
    host == suffix
        || host
            .strip_suffix(suffix)
            .is_some_and(|rest| rest.ends_with('.'))
}

/// Optimizer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Output formats to negotiate, in preference order.
    #[serde(default = "default_formats")]
    pub formats: Vec<FormatPreference>,

    /// Allowed target widths, ascending.
    #[serde(default = "default_sizes")]
    pub sizes: Vec<u32>,

    /// Cache budget in megabytes.
    #[serde(default = "default_cache_size_mb")]
    pub cache_size_mb: u64,

    /// Eviction grace window in milliseconds.
    #[serde(default = "default_grace_window_millis")]
    pub grace_window_millis: u64,

    /// Remote host policy.
    #[serde(default)]
    pub domains: DomainPolicy,

    /// Directory local sources are read from. When unset, local sources are
    /// fetched back through the serving port instead.
    #[serde(default)]
    pub asset_root: Option<PathBuf>,

    /// Port assumed for loopback fetches when the request URL carries none.
    #[serde(default)]
    pub fallback_port: Option<u16>,

    /// Source fetch timeout in seconds.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl OptimizerConfig {
    /// Parses a configuration from TOML, filling omitted fields with
    /// defaults.
    ///
    /// # Errors
    /// Returns the underlying TOML error when the document does not parse.
    pub fn from_toml_str(doc: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(doc)
    }

    /// Replaces the format preference list.
    #[must_use]
    pub fn with_formats(mut self, formats: Vec<FormatPreference>) -> Self {
        self.formats = formats;
        self
    }

    /// Replaces the size ladder.
    #[must_use]
    pub fn with_sizes(mut self, sizes: Vec<u32>) -> Self {
        self.sizes = sizes;
        self
    }

    /// Sets the cache budget in megabytes.
    #[must_use]
    pub const fn with_cache_size_mb(mut self, megabytes: u64) -> Self {
        self.cache_size_mb = megabytes;
        self
    }

    /// Sets the eviction grace window in milliseconds.
    #[must_use]
    pub const fn with_grace_window_millis(mut self, millis: u64) -> Self {
        self.grace_window_millis = millis;
        self
    }

    /// Sets the remote host policy.
    #[must_use]
    pub fn with_domains(mut self, domains: DomainPolicy) -> Self {
        self.domains = domains;
        self
    }

    /// Sets the local asset directory.
    #[must_use]
    pub fn with_asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.asset_root = Some(root.into());
        self
    }

    /// Sets the loopback fallback port.
    #[must_use]
    pub const fn with_fallback_port(mut self, port: u16) -> Self {
        self.fallback_port = Some(port);
        self
    }

    /// Cache budget in bytes.
    #[must_use]
    pub const fn cache_size_bytes(&self) -> u64 {
        self.cache_size_mb * 1024 * 1024
    }

    /// Eviction grace window as a duration.
    #[must_use]
    pub const fn grace_window(&self) -> Duration {
        Duration::from_millis(self.grace_window_millis)
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            formats: default_formats(),
            sizes: default_sizes(),
            cache_size_mb: default_cache_size_mb(),
            grace_window_millis: default_grace_window_millis(),
            domains: DomainPolicy::default(),
            asset_root: None,
            fallback_port: None,
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

fn default_formats() -> Vec<FormatPreference> {
    vec![
        FormatPreference::new(OutputFormat::Webp, 65),
        FormatPreference::new(OutputFormat::Avif, 45),
    ]
}

fn default_sizes() -> Vec<u32> {
    DEFAULT_SIZE_LADDER.to_vec()
}

fn default_cache_size_mb() -> u64 {
    50
}

fn default_grace_window_millis() -> u64 {
    1000
}

fn default_fetch_timeout_secs() -> u64 {
    30
}
