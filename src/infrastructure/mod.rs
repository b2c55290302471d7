//! Infrastructure layer with external service adapters.

/// In-memory caching.
pub mod cache;
/// Image decoding and encoding.
pub mod codec;
/// Configuration types.
pub mod config;
/// Source loading (filesystem and HTTP).
pub mod loader;

pub use cache::{DEFAULT_GRACE_WINDOW, PendingTable, SharedComputation, SourceCache};
pub use codec::ImageCodec;
pub use config::{DomainPolicy, OptimizerConfig};
pub use loader::{FsAssetLoader, HttpSourceTransport};
