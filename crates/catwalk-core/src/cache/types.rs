//! Core data types for model caching.

use std::fmt;
use std::sync::Arc;

use catwalk_abstraction::{Model, ModelLoader};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;

/// Lifecycle state of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryState {
    /// Known to the catalog but not resident.
    Unloaded,
    /// A load is in flight; bytes are reserved.
    Loading,
    /// Resident and usable.
    Loaded,
    /// Claimed by an eviction; the unload is in progress.
    Evicting,
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unloaded => "unloaded",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
            Self::Evicting => "evicting",
        })
    }
}

/// Why an entry left the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionCause {
    /// Preemptive cleanup above the soft limit.
    Soft,
    /// Mandatory eviction to admit a load under the hard limit.
    Hard,
    /// Idle longer than the configured TTL.
    Ttl,
    /// Unloaded during cache shutdown.
    Shutdown,
}

impl fmt::Display for EvictionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Soft => "soft",
            Self::Hard => "hard",
            Self::Ttl => "ttl",
            Self::Shutdown => "shutdown",
        })
    }
}

/// One resident or in-flight model.
pub(crate) struct Entry {
    pub(crate) id: String,
    /// Reserved bytes while loading, measured bytes once loaded.
    pub(crate) size_bytes: u64,
    pub(crate) state: EntryState,
    pub(crate) last_access: Instant,
    /// Position in the global touch order.
    pub(crate) access_seq: u64,
    pub(crate) access_count: u64,
    pub(crate) ref_count: usize,
    /// Callers waiting on the in-flight load; they become references on publish.
    pub(crate) pending: usize,
    /// Also serves as the entry's generation.
    pub(crate) insertion_seq: u64,
    pub(crate) model: Option<Arc<dyn Model>>,
    pub(crate) loader: Arc<dyn ModelLoader>,
}

impl Entry {
    /// A new entry in state `Loading` holding a reservation of `reserved` bytes.
    pub(crate) fn loading(
        id: &str,
        reserved: u64,
        insertion_seq: u64,
        loader: Arc<dyn ModelLoader>,
        now: Instant,
    ) -> Self {
        Self {
            id: id.to_string(),
            size_bytes: reserved,
            state: EntryState::Loading,
            last_access: now,
            access_seq: insertion_seq,
            access_count: 0,
            ref_count: 0,
            pending: 0,
            insertion_seq,
            model: None,
            loader,
        }
    }

    /// Records an access. `last_access` never moves backwards.
    pub(crate) fn touch(&mut self, now: Instant, seq: u64) {
        if now > self.last_access {
            self.last_access = now;
        }
        self.access_seq = seq;
        self.access_count += 1;
    }

    /// Loaded and unreferenced.
    pub(crate) fn is_evictable(&self) -> bool {
        self.state == EntryState::Loaded && self.ref_count == 0
    }

    /// Whether this entry's bytes count against the limits.
    pub(crate) fn holds_bytes(&self) -> bool {
        self.state != EntryState::Unloaded
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("id", &self.id)
            .field("size_bytes", &self.size_bytes)
            .field("state", &self.state)
            .field("last_access", &self.last_access)
            .field("access_seq", &self.access_seq)
            .field("ref_count", &self.ref_count)
            .field("pending", &self.pending)
            .field("insertion_seq", &self.insertion_seq)
            .finish_non_exhaustive()
    }
}

/// Point-in-time view of one model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryStatus {
    /// Model identifier.
    pub id: String,
    /// Footprint in bytes (the configured estimate for unloaded models).
    pub size_bytes: u64,
    /// Current lifecycle state.
    pub state: EntryState,
    /// Wall-clock time of the last access, if the model is resident.
    pub last_access: Option<DateTime<Utc>>,
    /// Milliseconds since the last access, if the model is resident.
    pub idle_ms: Option<u64>,
    /// Active holders.
    pub ref_count: usize,
    /// Accesses since the model became resident.
    pub access_count: u64,
}

/// Point-in-time view of the whole cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStatus {
    /// Every known model, sorted by id.
    pub entries: Vec<EntryStatus>,
    /// Bytes held by resident, evicting and loading entries.
    pub resident_bytes: u64,
    /// Soft limit in bytes.
    pub soft_limit_bytes: u64,
    /// Hard limit in bytes.
    pub hard_limit_bytes: u64,
    /// `resident_bytes / hard_limit_bytes`.
    pub utilization: f64,
    /// Number of entries in state `Loaded`.
    pub loaded_count: usize,
}

impl CacheStatus {
    /// Looks up the status of one model.
    #[must_use]
    pub fn entry(&self, id: &str) -> Option<&EntryStatus> {
        self.entries.iter().find(|entry| entry.id == id)
    }
}
