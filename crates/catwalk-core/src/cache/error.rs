//! Errors returned by cache operations.

use catwalk_abstraction::ModelError;
use thiserror::Error;

/// Error type for cache operations.
///
/// `Clone` so that one failed load can be handed to every caller that was
/// waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The model cannot be admitted without crossing the hard limit, even
    /// after evicting every unreferenced entry.
    #[error(
        "Out of space: cannot admit {requested} bytes for model '{id}' under hard limit of {hard_limit} bytes"
    )]
    OutOfSpace {
        /// Model that was being admitted.
        id: String,
        /// Bytes requested.
        requested: u64,
        /// Configured hard limit.
        hard_limit: u64,
    },

    /// The loader failed.
    #[error("Failed to load model '{id}': {source}")]
    Load {
        /// Model that was being loaded.
        id: String,
        /// Loader error.
        source: ModelError,
    },

    /// The id is not in the catalog.
    #[error("Model not found: {0}")]
    NotFound(String),

    /// The cache no longer admits models.
    #[error("Cache is shut down")]
    ShutDown,
}
