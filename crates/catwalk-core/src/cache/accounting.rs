//! Memory accounting for resident and reserved model bytes.

use tracing::trace;

/// Outcome of a reservation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    /// The bytes were added to the counter.
    Granted,
    /// Granting would have crossed the hard limit; nothing changed.
    Denied,
}

/// Tracks aggregate bytes held by the cache against a soft and a hard limit.
///
/// The counter covers loaded entries, entries being evicted, and reservations
/// taken for loads still in flight, so concurrent admissions can never
/// overshoot the hard limit together.
#[derive(Debug, Clone)]
pub struct MemoryAccounting {
    current: u64,
    soft_limit: u64,
    hard_limit: u64,
}

impl MemoryAccounting {
    /// Creates an empty counter. `soft_limit` must not exceed `hard_limit`.
    #[must_use]
    pub fn new(soft_limit: u64, hard_limit: u64) -> Self {
        debug_assert!(soft_limit <= hard_limit, "soft limit above hard limit");
        Self { current: 0, soft_limit, hard_limit }
    }

    /// Adds `bytes` to the counter unless that would cross the hard limit.
    pub fn reserve(&mut self, bytes: u64) -> Reservation {
        match self.current.checked_add(bytes) {
            Some(next) if next <= self.hard_limit => {
                self.current = next;
                trace!(bytes, current = self.current, "Reserved bytes");
                Reservation::Granted
            }
            _ => Reservation::Denied,
        }
    }

    /// Returns `bytes` to the pool.
    ///
    /// # Panics
    /// Panics if more bytes are released than are currently accounted for.
    pub fn release(&mut self, bytes: u64) {
        let Some(next) = self.current.checked_sub(bytes) else {
            panic!(
                "invariant violation: releasing {bytes} bytes with only {} accounted",
                self.current
            );
        };
        self.current = next;
        trace!(bytes, current = self.current, "Released bytes");
    }

    /// Bytes currently accounted for.
    #[must_use]
    pub fn current_bytes(&self) -> u64 {
        self.current
    }

    /// Whether the counter is above the soft limit.
    #[must_use]
    pub fn is_over_soft(&self) -> bool {
        self.current > self.soft_limit
    }

    /// Whether the counter is above the hard limit.
    ///
    /// Only `reconcile` can ever make this true.
    #[must_use]
    pub fn is_over_hard(&self) -> bool {
        self.current > self.hard_limit
    }

    /// Whether admitting `bytes` more would cross the soft limit.
    #[must_use]
    pub fn would_exceed_soft(&self, bytes: u64) -> bool {
        self.current.saturating_add(bytes) > self.soft_limit
    }

    /// Whether admitting `bytes` more would cross the hard limit.
    #[must_use]
    pub fn would_exceed_hard(&self, bytes: u64) -> bool {
        self.current.saturating_add(bytes) > self.hard_limit
    }

    /// The soft limit in bytes.
    #[must_use]
    pub fn soft_limit(&self) -> u64 {
        self.soft_limit
    }

    /// The hard limit in bytes.
    #[must_use]
    pub fn hard_limit(&self) -> u64 {
        self.hard_limit
    }

    /// Overwrites the counter with a recomputed total and returns the signed
    /// drift that was corrected.
    pub fn reconcile(&mut self, actual: u64) -> i128 {
        let drift = i128::from(self.current) - i128::from(actual);
        self.current = actual;
        drift
    }
}
