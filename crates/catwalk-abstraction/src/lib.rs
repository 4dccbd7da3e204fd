//! Model abstraction layer for Catwalk.
//!
//! This crate defines the capabilities the model cache is polymorphic over:
//! resident models, the per-format loaders that materialize them, and the
//! storage backends those loaders read bytes from.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Represents an error raised by a loader, a storage backend, or a model.
///
/// Errors are `Clone` so a single load failure can be handed to every caller
/// that was waiting on the same load.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelError {
    /// The artifact could not be located in storage.
    #[error("Artifact Not Found: {0}")]
    NotFound(String),

    /// The storage backend failed while reading the artifact.
    #[error("Storage Error: {0}")]
    Storage(String),

    /// The artifact bytes could not be decoded into a model.
    #[error("Decode Error: {0}")]
    Decode(String),

    /// The model rejected the inputs of a prediction.
    #[error("Invalid Input: {0}")]
    InvalidInput(String),

    /// No loader exists for the requested model format.
    #[error("Unsupported Model Format: {0}")]
    UnsupportedFormat(String),

    /// The loader failed to release a model.
    #[error("Unload Error: {0}")]
    Unload(String),

    /// Other unexpected errors.
    #[error("Other Model Error: {0}")]
    Other(String),
}

/// Everything a loader needs to know about one configured model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelDescriptor {
    /// Unique model identifier.
    pub id: String,
    /// Format name used to select the loader (e.g. "raw", "linear").
    pub format: String,
    /// Location of the artifact, relative to the storage root or absolute.
    pub path: PathBuf,
    /// Declared footprint in bytes, used to reserve memory before loading.
    pub memory_estimate: u64,
    /// Model version string.
    pub version: String,
    /// Whether the model should be loaded at startup.
    pub preload: bool,
}

impl ModelDescriptor {
    /// Creates a descriptor with version "1.0.0" and preload disabled.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        format: impl Into<String>,
        path: impl Into<PathBuf>,
        memory_estimate: u64,
    ) -> Self {
        Self {
            id: id.into(),
            format: format.into(),
            path: path.into(),
            memory_estimate,
            version: "1.0.0".to_string(),
            preload: false,
        }
    }

    /// Sets the version of this descriptor.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Marks this model for loading at startup.
    #[must_use]
    pub fn with_preload(mut self, preload: bool) -> Self {
        self.preload = preload;
        self
    }
}

/// A model that is resident in memory and ready to serve predictions.
///
/// All models must be `Send + Sync` so a single resident instance can be
/// shared by every concurrent holder of a cache handle.
#[async_trait]
pub trait Model: Send + Sync {
    /// Returns the ID of the model.
    fn model_id(&self) -> &str;

    /// Returns the format name of the model.
    fn format(&self) -> &str;

    /// Runs inference on the given inputs.
    ///
    /// # Errors
    /// Returns a `ModelError` if the inputs are rejected or inference fails.
    async fn predict(&self, inputs: &Value) -> Result<Value, ModelError>;
}

/// The product of a successful load: the model and its measured footprint.
#[derive(Clone)]
pub struct LoadedModel {
    /// The resident model.
    pub model: Arc<dyn Model>,
    /// Measured memory footprint in bytes.
    pub size_bytes: u64,
}

impl LoadedModel {
    /// Wraps a model together with its measured size.
    pub fn new(model: Arc<dyn Model>, size_bytes: u64) -> Self {
        Self { model, size_bytes }
    }
}

impl fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModel")
            .field("model_id", &self.model.model_id())
            .field("size_bytes", &self.size_bytes)
            .finish()
    }
}

/// Turns stored artifacts of one format into resident models.
///
/// One implementation exists per supported format; the cache only ever talks
/// to this trait.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    /// Returns the format name this loader handles.
    fn format(&self) -> &str;

    /// Loads the model described by `descriptor`.
    ///
    /// # Errors
    /// Returns a `ModelError` if the artifact cannot be read or decoded.
    async fn load(&self, descriptor: &ModelDescriptor) -> Result<LoadedModel, ModelError>;

    /// Releases a model that the cache has evicted.
    ///
    /// The default implementation simply drops the cache's reference.
    ///
    /// # Errors
    /// Returns a `ModelError` if the loader could not release the model.
    async fn unload(&self, model: Arc<dyn Model>) -> Result<(), ModelError> {
        drop(model);
        Ok(())
    }
}

/// Supplies raw artifact bytes to loaders.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Reads the full contents of the artifact at `path`.
    ///
    /// # Errors
    /// Returns `ModelError::NotFound` if the artifact does not exist and
    /// `ModelError::Storage` for any other failure.
    async fn read(&self, path: &Path) -> Result<Bytes, ModelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoModel;

    #[async_trait]
    impl Model for EchoModel {
        fn model_id(&self) -> &str {
            "echo"
        }

        fn format(&self) -> &str {
            "test"
        }

        async fn predict(&self, inputs: &Value) -> Result<Value, ModelError> {
            Ok(inputs.clone())
        }
    }

    #[test]
    fn test_model_error_display() {
        let err = ModelError::NotFound("models/a.bin".to_string());
        assert_eq!(err.to_string(), "Artifact Not Found: models/a.bin");

        let err = ModelError::UnsupportedFormat("onnx".to_string());
        assert!(err.to_string().contains("onnx"));
    }

    #[test]
    fn test_descriptor_builder() {
        let descriptor = ModelDescriptor::new("a", "raw", "models/a.bin", 1024)
            .with_version("2.1.0")
            .with_preload(true);

        assert_eq!(descriptor.id, "a");
        assert_eq!(descriptor.format, "raw");
        assert_eq!(descriptor.memory_estimate, 1024);
        assert_eq!(descriptor.version, "2.1.0");
        assert!(descriptor.preload);
    }

    #[test]
    fn test_loaded_model_debug_hides_model_internals() {
        let loaded = LoadedModel::new(Arc::new(EchoModel), 42);
        let rendered = format!("{loaded:?}");
        assert!(rendered.contains("echo"));
        assert!(rendered.contains("42"));
    }
}
