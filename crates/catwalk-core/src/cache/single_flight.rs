//! Single-flight coordination of model loads.
//!
//! At most one load per key is in flight. The first caller starts it and
//! every later caller for the same key receives a clone of the same shared
//! future, so all of them observe the identical outcome.

use std::collections::HashMap;
use std::future::Future;

use futures::future::{BoxFuture, FutureExt, Shared};

/// A load outcome that any number of callers can await.
pub type SharedFlight<T> = Shared<BoxFuture<'static, T>>;

/// Whether the caller started the flight or joined an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightRole {
    /// The caller's `start` closure ran.
    Leader,
    /// The caller joined a flight that was already running.
    Follower,
}

struct InFlight<T: Clone> {
    generation: u64,
    future: SharedFlight<T>,
}

/// Registry of in-flight loads keyed by model id.
///
/// The registry itself is not synchronized; the cache keeps it inside its
/// state lock so that starting, joining and completing a flight are atomic
/// with the entry transitions they accompany.
pub struct SingleFlight<T: Clone> {
    flights: HashMap<String, InFlight<T>>,
}

impl<T: Clone> Default for SingleFlight<T> {
    fn default() -> Self {
        Self { flights: HashMap::new() }
    }
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the flight for `key`, starting it with `start` if none exists.
    ///
    /// `generation` tags a newly started flight so that a stale completion
    /// cannot remove a newer flight for the same key.
    pub fn load_once<F, Fut>(
        &mut self,
        key: &str,
        generation: u64,
        start: F,
    ) -> (SharedFlight<T>, FlightRole)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        if let Some(flight) = self.flights.get(key) {
            return (flight.future.clone(), FlightRole::Follower);
        }

        let future = start().boxed().shared();
        self.flights.insert(key.to_string(), InFlight { generation, future: future.clone() });
        (future, FlightRole::Leader)
    }

    /// Joins the flight for `key`, if one is running.
    #[must_use]
    pub fn join(&self, key: &str) -> Option<SharedFlight<T>> {
        self.flights.get(key).map(|flight| flight.future.clone())
    }

    /// Forgets the flight for `key` if it belongs to `generation`.
    ///
    /// Callers already holding the shared future still receive its outcome.
    pub fn complete(&mut self, key: &str, generation: u64) -> bool {
        match self.flights.get(key) {
            Some(flight) if flight.generation == generation => {
                self.flights.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Whether a flight for `key` is running.
    #[must_use]
    pub fn is_in_flight(&self, key: &str) -> bool {
        self.flights.contains_key(key)
    }

    /// Number of running flights.
    #[must_use]
    pub fn len(&self) -> usize {
        self.flights.len()
    }

    /// Whether no flights are running.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flights.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_followers_share_the_leader_outcome() {
        let mut flights: SingleFlight<Result<u32, String>> = SingleFlight::new();
        let starts = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = oneshot::channel::<u32>();

        let counter = Arc::clone(&starts);
        let (leader, role) = flights.load_once("model", 1, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { rx.await.map_err(|e| e.to_string()) }
        });
        assert_eq!(role, FlightRole::Leader);

        let counter = Arc::clone(&starts);
        let (follower, role) = flights.load_once("model", 2, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(0) }
        });
        assert_eq!(role, FlightRole::Follower);
        assert_eq!(starts.load(Ordering::SeqCst), 1);

        tx.send(7).unwrap();
        assert_eq!(leader.await, Ok(7));
        assert_eq!(follower.await, Ok(7));
    }

    #[tokio::test]
    async fn test_failure_is_shared_and_retry_starts_fresh() {
        let mut flights: SingleFlight<Result<u32, String>> = SingleFlight::new();

        let (first, _) = flights.load_once("model", 1, || async { Err("boom".to_string()) });
        let second = flights.join("model").unwrap();
        assert_eq!(first.await, Err("boom".to_string()));
        assert_eq!(second.await, Err("boom".to_string()));

        assert!(flights.complete("model", 1));
        assert!(!flights.is_in_flight("model"));

        let (retry, role) = flights.load_once("model", 2, || async { Ok(1) });
        assert_eq!(role, FlightRole::Leader);
        assert_eq!(retry.await, Ok(1));
    }

    #[tokio::test]
    async fn test_stale_generation_does_not_complete_newer_flight() {
        let mut flights: SingleFlight<u32> = SingleFlight::new();
        let _ = flights.load_once("model", 5, || async { 1 });

        assert!(!flights.complete("model", 4));
        assert_eq!(flights.len(), 1);
        assert!(flights.complete("model", 5));
        assert!(flights.is_empty());
        assert!(flights.join("model").is_none());
    }
}
