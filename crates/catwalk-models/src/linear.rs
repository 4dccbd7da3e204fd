//! Linear model format.
//!
//! Artifacts are JSON documents of the form
//! `{"weights": [0.5, -1.0], "bias": 0.25}`. Predictions take
//! `{"data": [x0, x1]}` and return `{"output": w·x + b}`.

use std::sync::Arc;

use async_trait::async_trait;
use catwalk_abstraction::{LoadedModel, Model, ModelDescriptor, ModelError, ModelLoader, Storage};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

/// Format name of linear artifacts.
pub const LINEAR_FORMAT: &str = "linear";

/// Decoded parameters of a linear model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearParams {
    /// One weight per input feature.
    pub weights: Vec<f64>,
    /// Intercept term.
    #[serde(default)]
    pub bias: f64,
}

impl LinearParams {
    /// Resident footprint of the decoded parameters in bytes.
    #[must_use]
    pub fn footprint(&self) -> u64 {
        ((self.weights.len() + 1) * std::mem::size_of::<f64>()) as u64
    }
}

/// A resident linear model.
#[derive(Debug, Clone)]
pub struct LinearModel {
    id: String,
    params: LinearParams,
}

impl LinearModel {
    /// Creates a linear model from decoded parameters.
    #[must_use]
    pub fn new(id: impl Into<String>, params: LinearParams) -> Self {
        Self { id: id.into(), params }
    }

    /// Evaluates the model on one feature vector.
    ///
    /// # Errors
    /// Returns `ModelError::InvalidInput` if the dimension does not match.
    pub fn evaluate(&self, features: &[f64]) -> Result<f64, ModelError> {
        if features.len() != self.params.weights.len() {
            return Err(ModelError::InvalidInput(format!(
                "expected {} features, got {}",
                self.params.weights.len(),
                features.len()
            )));
        }

        Ok(self.params.weights.iter().zip(features).map(|(w, x)| w * x).sum::<f64>()
            + self.params.bias)
    }
}

#[async_trait]
impl Model for LinearModel {
    fn model_id(&self) -> &str {
        &self.id
    }

    fn format(&self) -> &str {
        LINEAR_FORMAT
    }

    async fn predict(&self, inputs: &Value) -> Result<Value, ModelError> {
        let features: Vec<f64> = inputs
            .get("data")
            .cloned()
            .ok_or_else(|| ModelError::InvalidInput("missing \"data\" field".to_string()))
            .and_then(|data| {
                serde_json::from_value(data)
                    .map_err(|e| ModelError::InvalidInput(format!("\"data\" must be numbers: {e}")))
            })?;

        let output = self.evaluate(&features)?;
        debug!(model_id = %self.id, features = features.len(), "LinearModel evaluated");
        Ok(json!({ "output": output }))
    }
}

/// Loads linear models from JSON artifacts.
pub struct LinearLoader {
    storage: Arc<dyn Storage>,
}

impl LinearLoader {
    /// Creates a loader reading from `storage`.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl ModelLoader for LinearLoader {
    fn format(&self) -> &str {
        LINEAR_FORMAT
    }

    async fn load(&self, descriptor: &ModelDescriptor) -> Result<LoadedModel, ModelError> {
        let bytes = self.storage.read(&descriptor.path).await?;
        let params: LinearParams = serde_json::from_slice(&bytes).map_err(|e| {
            ModelError::Decode(format!("{}: {}", descriptor.path.display(), e))
        })?;

        if params.weights.is_empty() {
            return Err(ModelError::Decode(format!(
                "{}: linear model has no weights",
                descriptor.path.display()
            )));
        }

        let size_bytes = params.footprint();
        info!(
            model_id = %descriptor.id,
            features = params.weights.len(),
            size_bytes,
            "Loaded linear model"
        );

        Ok(LoadedModel::new(Arc::new(LinearModel::new(descriptor.id.clone(), params)), size_bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FileSystemStorage;
    use tempfile::TempDir;

    fn write_model(dir: &TempDir, name: &str, content: &str) {
        std::fs::write(dir.path().join(name), content).unwrap();
    }

    #[tokio::test]
    async fn test_linear_loader_decodes_params() {
        let temp = TempDir::new().unwrap();
        write_model(&temp, "lin.json", r#"{"weights": [1.0, 2.0, 3.0], "bias": 0.5}"#);

        let loader = LinearLoader::new(Arc::new(FileSystemStorage::new(temp.path())));
        let loaded =
            loader.load(&ModelDescriptor::new("lin", "linear", "lin.json", 64)).await.unwrap();

        // three weights plus the bias
        assert_eq!(loaded.size_bytes, 32);
        let output = loaded.model.predict(&json!({"data": [1.0, 1.0, 1.0]})).await.unwrap();
        assert_eq!(output["output"], 6.5);
    }

    #[tokio::test]
    async fn test_linear_loader_rejects_malformed_json() {
        let temp = TempDir::new().unwrap();
        write_model(&temp, "bad.json", "not json");

        let loader = LinearLoader::new(Arc::new(FileSystemStorage::new(temp.path())));
        let err =
            loader.load(&ModelDescriptor::new("bad", "linear", "bad.json", 64)).await.unwrap_err();
        assert!(matches!(err, ModelError::Decode(_)));
    }

    #[tokio::test]
    async fn test_linear_loader_rejects_empty_weights() {
        let temp = TempDir::new().unwrap();
        write_model(&temp, "empty.json", r#"{"weights": []}"#);

        let loader = LinearLoader::new(Arc::new(FileSystemStorage::new(temp.path())));
        let err = loader
            .load(&ModelDescriptor::new("empty", "linear", "empty.json", 64))
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::Decode(msg) if msg.contains("no weights")));
    }

    #[tokio::test]
    async fn test_linear_predict_dimension_mismatch() {
        let model = LinearModel::new("lin", LinearParams { weights: vec![1.0, 2.0], bias: 0.0 });

        let err = model.predict(&json!({"data": [1.0]})).await.unwrap_err();
        assert!(matches!(err, ModelError::InvalidInput(msg) if msg.contains("expected 2")));

        let err = model.predict(&json!({"values": [1.0, 2.0]})).await.unwrap_err();
        assert!(matches!(err, ModelError::InvalidInput(_)));
    }
}
