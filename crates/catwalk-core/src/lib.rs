//! Catwalk core: a memory-bounded model cache and the server facade around it.
//!
//! - [`cache`]: accounting, recency, eviction, single-flight loading, sweeping
//! - [`config`]: YAML configuration
//! - [`ModelManager`]: binds a configuration to a running cache
//! - [`inference`]: per-model inference counters

pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod inference;
pub mod manager;

pub use cache::{
    CacheConfig, CacheError, CacheManager, CacheStatus, EntryState, EntryStatus, EvictionCause,
    MetricsSnapshot, ModelHandle, SweepReport,
};
pub use catalog::{CatalogEntry, ModelCatalog};
pub use config::{ByteSize, Config, ConfigError};
pub use error::{CatwalkError, Result};
pub use inference::{InferenceMetrics, InferenceSnapshot};
pub use manager::{
    ModelInfo, ModelManager, Prediction, PreloadFailure, PreloadReport, ServingMetrics,
};
