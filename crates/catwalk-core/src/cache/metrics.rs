//! Cache counters for observability.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use super::types::EvictionCause;

/// Lock-free counters updated by the cache.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
    load_failures: AtomicU64,
    soft_evictions: AtomicU64,
    hard_evictions: AtomicU64,
    ttl_evictions: AtomicU64,
}

impl CacheMetrics {
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_load(&self) {
        self.loads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_load_failure(&self) {
        self.load_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_eviction(&self, cause: EvictionCause) {
        let counter = match cause {
            EvictionCause::Soft => &self.soft_evictions,
            EvictionCause::Hard => &self.hard_evictions,
            EvictionCause::Ttl => &self.ttl_evictions,
            EvictionCause::Shutdown => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a consistent-enough copy of every counter.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let soft = self.soft_evictions.load(Ordering::Relaxed);
        let hard = self.hard_evictions.load(Ordering::Relaxed);
        let ttl = self.ttl_evictions.load(Ordering::Relaxed);

        MetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            load_failures: self.load_failures.load(Ordering::Relaxed),
            evictions: EvictionCounts { soft, hard, ttl, total: soft + hard + ttl },
        }
    }
}

/// Eviction totals by cause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EvictionCounts {
    /// Preemptive soft-limit evictions.
    pub soft: u64,
    /// Hard-limit admission evictions.
    pub hard: u64,
    /// Idle-expiry evictions.
    pub ttl: u64,
    /// Sum of the above.
    pub total: u64,
}

/// Counter values at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Acquires served by a resident model.
    pub hits: u64,
    /// Acquires that had to load or wait for a load.
    pub misses: u64,
    /// Successful loads.
    pub loads: u64,
    /// Failed loads.
    pub load_failures: u64,
    /// Evictions by cause.
    pub evictions: EvictionCounts,
}

impl MetricsSnapshot {
    /// Fraction of acquires served from memory.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 { 0.0 } else { self.hits as f64 / total as f64 }
    }
}
