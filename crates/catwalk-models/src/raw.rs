//! Raw artifact format: the model is the artifact's bytes.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use catwalk_abstraction::{LoadedModel, Model, ModelDescriptor, ModelError, ModelLoader, Storage};
use serde_json::{Value, json};
use tracing::{debug, info};

/// Format name of raw artifacts.
pub const RAW_FORMAT: &str = "raw";

/// A model whose resident state is the unmodified artifact bytes.
#[derive(Debug, Clone)]
pub struct RawModel {
    id: String,
    bytes: Bytes,
}

impl RawModel {
    /// Creates a raw model from its bytes.
    #[must_use]
    pub fn new(id: impl Into<String>, bytes: Bytes) -> Self {
        Self { id: id.into(), bytes }
    }

    /// Returns the resident bytes.
    #[must_use]
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }
}

#[async_trait]
impl Model for RawModel {
    fn model_id(&self) -> &str {
        &self.id
    }

    fn format(&self) -> &str {
        RAW_FORMAT
    }

    async fn predict(&self, inputs: &Value) -> Result<Value, ModelError> {
        debug!(model_id = %self.id, "RawModel echoing inputs");
        Ok(json!({
            "model_id": self.id,
            "size_bytes": self.bytes.len(),
            "echo": inputs,
        }))
    }
}

/// Loads raw artifacts; the footprint is the number of bytes read.
pub struct RawLoader {
    storage: Arc<dyn Storage>,
}

impl RawLoader {
    /// Creates a loader reading from `storage`.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl ModelLoader for RawLoader {
    fn format(&self) -> &str {
        RAW_FORMAT
    }

    async fn load(&self, descriptor: &ModelDescriptor) -> Result<LoadedModel, ModelError> {
        let bytes = self.storage.read(&descriptor.path).await?;
        let size_bytes = bytes.len() as u64;
        info!(model_id = %descriptor.id, size_bytes, "Loaded raw model");

        Ok(LoadedModel::new(Arc::new(RawModel::new(descriptor.id.clone(), bytes)), size_bytes))
    }
}
