//! Local filesystem storage.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use catwalk_abstraction::{ModelError, Storage};
use tracing::debug;

/// Reads artifacts from a directory on the local filesystem.
///
/// Relative artifact paths are resolved against `base_path`; absolute paths
/// are used as given.
#[derive(Debug, Clone)]
pub struct FileSystemStorage {
    base_path: PathBuf,
}

impl FileSystemStorage {
    /// Creates a storage rooted at `base_path`.
    #[must_use]
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self { base_path: base_path.into() }
    }

    /// Returns the storage root.
    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolves an artifact path against the storage root.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() { path.to_path_buf() } else { self.base_path.join(path) }
    }
}

#[async_trait]
impl Storage for FileSystemStorage {
    async fn read(&self, path: &Path) -> Result<Bytes, ModelError> {
        let resolved = self.resolve(path);
        debug!(path = %resolved.display(), "Reading artifact from filesystem");

        match tokio::fs::read(&resolved).await {
            Ok(bytes) => Ok(Bytes::from(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(ModelError::NotFound(resolved.display().to_string()))
            }
            Err(e) => Err(ModelError::Storage(format!("{}: {}", resolved.display(), e))),
        }
    }
}
