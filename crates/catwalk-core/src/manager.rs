//! Model manager: configuration, loaders and cache wired together.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use catwalk_abstraction::{ModelLoader, Storage};
use catwalk_models::{FileSystemStorage, LoaderFactory, ModelFormat};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::cache::{CacheError, CacheManager, CacheStatus, EntryState, MetricsSnapshot};
use crate::catalog::ModelCatalog;
use crate::config::{Config, ConfigError};
use crate::error::Result;
use crate::inference::{InferenceMetrics, InferenceSnapshot};

/// Descriptive view of one configured model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    /// Model id as configured.
    pub id: String,
    /// Configured version string.
    pub version: String,
    /// Loader format name.
    pub format: String,
    /// Artifact path as configured.
    pub path: PathBuf,
    /// Current cache state.
    pub state: EntryState,
    /// Measured bytes when resident, the configured estimate otherwise.
    pub memory_usage: u64,
    /// Configured estimate reserved before a load.
    pub memory_estimate: u64,
    /// Wall-clock time of the last access, if resident.
    pub last_used: Option<DateTime<Utc>>,
    /// Inferences served since startup.
    pub inference: InferenceSnapshot,
}

/// Output of one inference call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    /// Model that served the request.
    pub model_id: String,
    /// Version of that model.
    pub version: String,
    /// Model output.
    pub output: Value,
    /// Wall time including any load the call had to wait for.
    pub latency_ms: f64,
}

/// A model that failed to preload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreloadFailure {
    /// Model that failed.
    pub id: String,
    /// Rendered error.
    pub error: String,
}

/// Outcome of the startup preload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreloadReport {
    /// Models now resident.
    pub loaded: Vec<String>,
    /// Models that could not be loaded.
    pub failed: Vec<PreloadFailure>,
}

/// Cache counters plus per-model inference counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServingMetrics {
    /// Cache hits, misses, loads and evictions.
    #[serde(flatten)]
    pub cache: MetricsSnapshot,
    /// Inference counters by model id.
    pub inference: BTreeMap<String, InferenceSnapshot>,
}

/// Serves predictions for the models named in a [`Config`].
///
/// One loader is created per format and shared by all models of that format.
#[derive(Debug)]
pub struct ModelManager {
    config: Config,
    cache: CacheManager,
    inference: InferenceMetrics,
}

impl ModelManager {
    /// Builds the catalog and cache for `config`.
    ///
    /// # Errors
    /// Returns `ConfigError` if a model type is unknown or the cache limits are invalid.
    pub fn from_config(config: Config) -> Result<Self> {
        let storage: Arc<dyn Storage> = Arc::new(FileSystemStorage::new(config.base_dir.clone()));
        let mut loaders: HashMap<ModelFormat, Arc<dyn ModelLoader>> = HashMap::new();
        let mut catalog = ModelCatalog::new();

        for descriptor in config.descriptors() {
            let format = ModelFormat::from_str(&descriptor.format).map_err(|_| {
                ConfigError::UnknownModelType {
                    id: descriptor.id.clone(),
                    format: descriptor.format.clone(),
                }
            })?;
            let loader = loaders
                .entry(format)
                .or_insert_with(|| LoaderFactory::create(format, Arc::clone(&storage)));
            catalog.register(descriptor, Arc::clone(loader));
        }

        let cache = CacheManager::new(config.cache_config(), catalog).map_err(ConfigError::from)?;
        info!(
            models = config.models.len(),
            base_dir = %config.base_dir.display(),
            "Model manager initialized"
        );

        Ok(Self { config, cache, inference: InferenceMetrics::new() })
    }

    /// Loads a config file and builds the manager.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be loaded or is invalid.
    pub fn load(path: &Path) -> Result<Self> {
        Self::from_config(Config::load(path)?)
    }

    /// Starts the sweeper and preloads models. Must be called within a runtime.
    pub async fn start(&self) -> PreloadReport {
        self.cache.spawn_sweeper();
        self.preload().await
    }

    /// Loads every model flagged `preload`. Failures are logged and reported,
    /// never fatal.
    pub async fn preload(&self) -> PreloadReport {
        let mut report = PreloadReport::default();

        for id in self.cache.catalog().preload_ids() {
            match self.cache.acquire(id).await {
                Ok(handle) => {
                    self.cache.release(handle);
                    report.loaded.push(id.to_string());
                }
                Err(err) => {
                    warn!(model_id = %id, error = %err, "Failed to preload model");
                    report.failed.push(PreloadFailure { id: id.to_string(), error: err.to_string() });
                }
            }
        }

        info!(loaded = report.loaded.len(), failed = report.failed.len(), "Preload finished");
        report
    }

    /// Runs one inference, loading the model first if needed.
    ///
    /// # Errors
    /// Returns a cache error if the model cannot be made resident, or the
    /// model's own error if inference fails.
    pub async fn predict(&self, id: &str, inputs: &Value) -> Result<Prediction> {
        let started = Instant::now();
        let handle = self.cache.acquire(id).await?;
        let inference_started = Instant::now();
        let output = handle.predict(inputs).await;
        self.inference.record(id, inference_started.elapsed(), output.is_ok());
        self.cache.release(handle);
        let output = output?;

        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        info!(model_id = %id, latency_ms, "Prediction served");

        Ok(Prediction {
            model_id: id.to_string(),
            version: self.version_of(id),
            output,
            latency_ms,
        })
    }

    /// Describes one configured model.
    ///
    /// # Errors
    /// Returns `CacheError::NotFound` if the id is not configured.
    pub fn model_info(&self, id: &str) -> Result<ModelInfo> {
        let section =
            self.config.models.get(id).ok_or_else(|| CacheError::NotFound(id.to_string()))?;
        let status = self.cache.status();
        let entry = status.entry(id);

        Ok(ModelInfo {
            id: id.to_string(),
            version: section.version.clone(),
            format: section.format.clone(),
            path: section.path.clone(),
            state: entry.map_or(EntryState::Unloaded, |entry| entry.state),
            memory_usage: entry.map_or(section.memory_estimate.bytes(), |entry| entry.size_bytes),
            memory_estimate: section.memory_estimate.bytes(),
            last_used: entry.and_then(|entry| entry.last_access),
            inference: self.inference.get(id),
        })
    }

    #[must_use]
    pub fn status(&self) -> CacheStatus {
        self.cache.status()
    }

    /// Cache counters together with per-model inference counters.
    #[must_use]
    pub fn metrics(&self) -> ServingMetrics {
        ServingMetrics { cache: self.cache.metrics(), inference: self.inference.snapshot() }
    }

    #[must_use]
    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Stops background work and unloads idle models.
    pub async fn shutdown(&self) {
        self.cache.shutdown().await;
    }

    fn version_of(&self, id: &str) -> String {
        self.config.models.get(id).map(|model| model.version.clone()).unwrap_or_default()
    }
}
