//! Error types for Catwalk Core.

use catwalk_abstraction::ModelError;
use thiserror::Error;

use crate::cache::CacheError;
use crate::config::ConfigError;

/// Top-level error for operations that span configuration, cache and models.
#[derive(Error, Debug)]
pub enum CatwalkError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Cache errors
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Inference errors
    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}

/// Result type alias for Catwalk operations.
pub type Result<T> = std::result::Result<T, CatwalkError>;
