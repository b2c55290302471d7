//! Port definition for pluggable local asset loading.

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::errors::OptimizeResult;

/// Port for resolving local (path-prefixed) source identifiers into raw
/// bytes. Supplied by the host application; the crate ships a filesystem
/// adapter.
#[async_trait]
pub trait AssetLoaderPort: Send + Sync {
    /// Loads the bytes behind a local source identifier.
    async fn load(&self, src: &str) -> OptimizeResult<Bytes>;
}
