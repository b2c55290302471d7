//! Filesystem-backed asset loader for local sources.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::domain::errors::{OptimizeError, OptimizeResult};
use crate::domain::ports::AssetLoaderPort;

/// Loads local sources from a directory root, typically the public asset
/// directory of the site being served.
///
/// Source paths are resolved relative to the root; anything that would step
/// outside it is refused.
#[derive(Debug)]
pub struct FsAssetLoader {
    root: PathBuf,
}

impl FsAssetLoader {
    /// Creates a loader rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl AssetLoaderPort for FsAssetLoader {
    async fn load(&self, src: &str) -> OptimizeResult<Bytes> {
        let relative = src.trim_start_matches('/');
        let candidate = Path::new(relative);
        if candidate
            .components()
            .any(|part| !matches!(part, Component::Normal(_)))
        {
            return Err(OptimizeError::load(format!(
                "Refusing path outside asset root: {src}"
            )));
        }

        let path = self.root.join(candidate);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| OptimizeError::load(format!("Failed to read {}: {e}", path.display())))?;

        debug!(src = %src, len = bytes.len(), "Loaded asset from disk");
        Ok(Bytes::from(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_reads_file_under_root() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::TempDir::new()?;
        tokio::fs::create_dir_all(dir.path().join("images")).await?;
        tokio::fs::write(dir.path().join("images/hero.png"), b"png bytes").await?;

        let loader = FsAssetLoader::new(dir.path());
        let bytes = loader.load("/images/hero.png").await?;

        assert_eq!(&bytes[..], &b"png bytes"[..]);
        Ok(())
    }

    #[tokio::test]
    async fn test_load_missing_file_is_load_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let loader = FsAssetLoader::new(dir.path());

        let err = loader.load("/missing.png").await.unwrap_err();
        assert!(matches!(err, OptimizeError::Load { .. }));
    }

    #[tokio::test]
    async fn test_load_refuses_parent_traversal() {
        let dir = tempfile::TempDir::new().unwrap();
        tokio::fs::write(dir.path().join("inside.txt"), b"ok")
            .await
            .unwrap();

        let loader = FsAssetLoader::new(dir.path().join("assets"));
        let err = loader.load("/../inside.txt").await.unwrap_err();

        assert!(matches!(err, OptimizeError::Load { .. }));
    }
}
