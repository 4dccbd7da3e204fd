//! Memory-bounded model cache.
//!
//! Loaded models are kept resident until memory pressure, idle expiry or
//! shutdown unloads them. Resident bytes are tracked against a soft limit
//! (preemptive LRU eviction) and a hard limit (never exceeded).

pub mod accounting;
pub mod config;
pub mod error;
mod eviction;
pub mod manager;
pub mod metrics;
pub mod recency;
pub mod single_flight;
mod state;
pub mod sweeper;
pub mod types;

pub use accounting::{MemoryAccounting, Reservation};
pub use config::{CacheConfig, CacheConfigError};
pub use error::CacheError;
pub use manager::{CacheManager, ModelHandle};
pub use metrics::{EvictionCounts, MetricsSnapshot};
pub use recency::RecencyTracker;
pub use sweeper::SweepReport;
pub use types::{CacheStatus, EntryState, EntryStatus, EvictionCause};
