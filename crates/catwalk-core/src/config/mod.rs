//! Server configuration loaded from YAML.
//!
//! ```yaml
//! cache:
//!   max_memory: 1GB
//!   soft_limit: 800MB
//!   ttl: 3600
//! models:
//!   sentiment:
//!     path: models/sentiment.json
//!     type: linear
//!     memory_estimate: 300MB
//!     preload: true
//! ```

pub mod size;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use catwalk_abstraction::ModelDescriptor;
use catwalk_models::ModelFormat;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::cache::{CacheConfig, CacheConfigError};

pub use size::{ByteSize, format_size, parse_size};

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config file {}: {source}", .path.display())]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not valid YAML for this schema.
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A byte quantity could not be parsed.
    #[error("Invalid size '{0}': expected a number with an optional B, KB, MB, GB or TB unit")]
    InvalidSize(String),

    /// The cache section is inconsistent.
    #[error("Invalid cache configuration: {0}")]
    Cache(#[from] CacheConfigError),

    /// A model names a type no loader handles.
    #[error("Model '{id}' has unknown type '{format}'")]
    UnknownModelType {
        /// Model id.
        id: String,
        /// Configured type.
        format: String,
    },

    /// Any other validation failure.
    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Top-level configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Cache limits and timers.
    pub cache: CacheSection,

    /// Configured models by id.
    #[serde(default)]
    pub models: BTreeMap<String, ModelSection>,

    /// Directory that relative model paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// The `cache:` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheSection {
    /// Hard limit.
    pub max_memory: ByteSize,

    /// Soft limit; must not exceed `max_memory`.
    pub soft_limit: ByteSize,

    /// Idle expiry in seconds (absent disables it).
    #[serde(default)]
    pub ttl: Option<u64>,

    /// Seconds between maintenance sweeps (default: 60).
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval: u64,
}

fn default_sweep_interval() -> u64 {
    60
}

/// One entry of the `models:` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelSection {
    /// Artifact location, relative to the config file directory unless absolute.
    pub path: PathBuf,

    /// Loader format name.
    #[serde(rename = "type")]
    pub format: String,

    /// Bytes reserved before the load starts.
    pub memory_estimate: ByteSize,

    /// Load at startup.
    #[serde(default)]
    pub preload: bool,

    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

impl Config {
    /// Reads and validates a config file.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;

        let base_dir = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

        debug!(path = %path.display(), base_dir = %base_dir.display(), "Loading configuration");
        Self::from_yaml_str(&content, base_dir)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    /// Returns `ConfigError` if the text cannot be parsed or validated.
    pub fn from_yaml_str(yaml: &str, base_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yaml::from_str(yaml)?;
        config.base_dir = base_dir.into();
        config.validate()?;
        Ok(config)
    }

    /// Checks limits, model types and model sizes.
    ///
    /// # Errors
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let cache = self.cache_config();
        cache.validate()?;

        for (id, model) in &self.models {
            if ModelFormat::from_str(&model.format).is_err() {
                return Err(ConfigError::UnknownModelType {
                    id: id.clone(),
                    format: model.format.clone(),
                });
            }

            if model.path.as_os_str().is_empty() {
                return Err(ConfigError::Validation(format!("model '{id}' has an empty path")));
            }

            if model.memory_estimate.bytes() > cache.hard_limit_bytes {
                return Err(ConfigError::Validation(format!(
                    "model '{id}' estimate of {} exceeds max_memory of {}",
                    model.memory_estimate, self.cache.max_memory
                )));
            }
        }

        Ok(())
    }

    /// The cache settings as engine configuration.
    #[must_use]
    pub fn cache_config(&self) -> CacheConfig {
        let mut config = CacheConfig::new(self.cache.soft_limit.bytes(), self.cache.max_memory.bytes())
            .with_sweep_interval_secs(self.cache.sweep_interval);
        config.ttl_secs = self.cache.ttl;
        config
    }

    /// Descriptors for every configured model, in id order.
    ///
    /// Paths are kept as written; storage resolves them against `base_dir`.
    pub fn descriptors(&self) -> impl Iterator<Item = ModelDescriptor> + '_ {
        self.models.iter().map(|(id, model)| {
            ModelDescriptor::new(
                id.as_str(),
                model.format.as_str(),
                model.path.clone(),
                model.memory_estimate.bytes(),
            )
            .with_version(model.version.as_str())
            .with_preload(model.preload)
        })
    }
}
