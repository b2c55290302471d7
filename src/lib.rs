//! imgopt - On-demand image variant optimization.
//!
//! Serves resized, re-encoded image variants from a size-bounded in-memory
//! cache, coalescing concurrent work: one decode per source, one encode per
//! exact variant, LRU eviction under a byte budget. Framework-agnostic; wire
//! [`Optimizer::optimize`] into whatever HTTP server hosts it.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing the optimizer orchestration, DTOs, and
/// request-side services.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing caches, adapters, and configuration.
pub mod infrastructure;

use std::sync::Arc;
use std::time::Duration;

pub use application::Optimizer;
pub use application::dto::{HeaderSource, OptimizeRequest, OptimizeResponse};
pub use application::services::{DEFAULT_ENDPOINT, SrcSetBuilder};
pub use domain::entities::{DEFAULT_SIZE_LADDER, FormatPreference, OutputFormat};
pub use domain::errors::OptimizeError;
pub use infrastructure::config::{DomainPolicy, OptimizerConfig};

use infrastructure::codec::ImageCodec;
use infrastructure::loader::{FsAssetLoader, HttpSourceTransport};

/// Creates an optimizer wired with the default codec, the HTTP transport,
/// and a filesystem loader when the configuration names an asset root.
///
/// # Errors
/// Returns [`OptimizeError::Load`] if the HTTP client cannot be built.
pub fn create_optimizer(config: OptimizerConfig) -> Result<Optimizer, OptimizeError> {
    let timeout = Duration::from_secs(config.fetch_timeout_secs);
    let transport = HttpSourceTransport::new(timeout)?;
    let loader = config.asset_root.clone().map(FsAssetLoader::new);

    let mut optimizer = Optimizer::new(config, Arc::new(ImageCodec::new()), Arc::new(transport));
    if let Some(loader) = loader {
        optimizer = optimizer.with_loader(Arc::new(loader));
    }
    Ok(optimizer)
}

/// Current version of the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = "imgopt";
