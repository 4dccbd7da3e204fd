//! The mutable state behind one cache instance.
//!
//! Everything in here is mutated only while the manager's state lock is held.

use std::collections::HashMap;
use std::sync::Arc;

use catwalk_abstraction::Model;
use tokio::time::Instant;

use super::accounting::MemoryAccounting;
use super::config::CacheConfig;
use super::manager::LoadOutcome;
use super::recency::RecencyTracker;
use super::single_flight::SingleFlight;
use super::types::{Entry, EntryState};

pub(crate) struct CacheState {
    pub(crate) entries: HashMap<String, Entry>,
    pub(crate) recency: RecencyTracker,
    pub(crate) memory: MemoryAccounting,
    pub(crate) flights: SingleFlight<LoadOutcome>,
    pub(crate) shut_down: bool,
    next_seq: u64,
}

impl CacheState {
    pub(crate) fn new(config: &CacheConfig) -> Self {
        Self {
            entries: HashMap::new(),
            recency: RecencyTracker::new(),
            memory: MemoryAccounting::new(config.soft_limit_bytes, config.hard_limit_bytes),
            flights: SingleFlight::new(),
            shut_down: false,
            next_seq: 0,
        }
    }

    /// Next value of the counter shared by insertions and touches.
    pub(crate) fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// The entry for `id`, if it is still the same generation.
    pub(crate) fn entry_mut(&mut self, id: &str, generation: u64) -> Option<&mut Entry> {
        self.entries.get_mut(id).filter(|entry| entry.insertion_seq == generation)
    }

    /// Takes a reference on a loaded entry and marks it most recently used.
    pub(crate) fn acquire_loaded(&mut self, id: &str, now: Instant) -> Option<(Arc<dyn Model>, u64)> {
        if self.entries.get(id).is_none_or(|entry| entry.state != EntryState::Loaded) {
            return None;
        }

        let seq = self.next_seq();
        let entry = self.entries.get_mut(id)?;
        let model = entry.model.clone()?;
        entry.touch(now, seq);
        entry.ref_count += 1;
        let generation = entry.insertion_seq;
        self.recency.touch(id);
        Some((model, generation))
    }

    /// Refreshes recency of a loaded entry without taking a reference.
    pub(crate) fn touch(&mut self, id: &str, now: Instant) -> bool {
        if self.entries.get(id).is_none_or(|entry| entry.state != EntryState::Loaded) {
            return false;
        }

        let seq = self.next_seq();
        if let Some(entry) = self.entries.get_mut(id) {
            entry.touch(now, seq);
        }
        self.recency.touch(id);
        true
    }

    /// Turns a `Loading` entry into a `Loaded` one.
    ///
    /// Waiting callers become references. A reservation larger than the
    /// measured size is trimmed; growth must already have been reserved.
    pub(crate) fn publish(
        &mut self,
        id: &str,
        generation: u64,
        model: Arc<dyn Model>,
        measured: u64,
        now: Instant,
    ) -> bool {
        let seq = self.next_seq();
        let Some(entry) = self
            .entries
            .get_mut(id)
            .filter(|entry| entry.insertion_seq == generation && entry.state == EntryState::Loading)
        else {
            return false;
        };

        let reserved = entry.size_bytes;
        entry.state = EntryState::Loaded;
        entry.size_bytes = measured;
        entry.model = Some(model);
        entry.ref_count += entry.pending;
        entry.pending = 0;
        entry.touch(now, seq);

        if measured < reserved {
            self.memory.release(reserved - measured);
        }
        self.recency.touch(id);
        self.flights.complete(id, generation);
        true
    }

    /// Drops a `Loading` entry and its reservation after a failed load.
    pub(crate) fn fail_load(&mut self, id: &str, generation: u64) -> bool {
        let matches = self.entries.get(id).is_some_and(|entry| {
            entry.insertion_seq == generation && entry.state == EntryState::Loading
        });
        if !matches {
            return false;
        }

        if let Some(entry) = self.entries.remove(id) {
            self.memory.release(entry.size_bytes);
        }
        self.flights.complete(id, generation);
        true
    }

    /// Gives back a reference, or a pending claim that never became one.
    ///
    /// # Panics
    /// Panics if no such reference exists.
    pub(crate) fn release_ref(&mut self, id: &str, generation: u64) -> usize {
        let Some(entry) = self.entry_mut(id, generation) else {
            panic!("invariant violation: released a reference to unknown entry '{id}'");
        };
        assert!(
            entry.ref_count > 0,
            "invariant violation: released a reference to '{id}' with none outstanding"
        );
        entry.ref_count -= 1;
        entry.ref_count
    }

    /// Recomputes the byte total from the entries and corrects the counter.
    pub(crate) fn reconcile(&mut self) -> i128 {
        let actual = self
            .entries
            .values()
            .filter(|entry| entry.holds_bytes())
            .map(|entry| entry.size_bytes)
            .sum();
        self.memory.reconcile(actual)
    }

    pub(crate) fn evicting_count(&self) -> usize {
        self.entries.values().filter(|entry| entry.state == EntryState::Evicting).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catwalk_abstraction::ModelLoader;
    use catwalk_models::{MockLoader, MockModel};

    fn state() -> CacheState {
        CacheState::new(&CacheConfig::new(800, 1000))
    }

    fn insert_loading(state: &mut CacheState, id: &str, reserved: u64) -> u64 {
        let generation = state.next_seq();
        let loader: Arc<dyn ModelLoader> = Arc::new(MockLoader::new());
        state.memory.reserve(reserved);
        state
            .entries
            .insert(id.to_string(), Entry::loading(id, reserved, generation, loader, Instant::now()));
        generation
    }

    #[test]
    fn test_publish_trims_reservation_and_converts_waiters() {
        let mut state = state();
        let generation = insert_loading(&mut state, "a", 300);
        state.entries.get_mut("a").unwrap().pending = 2;

        let model: Arc<dyn Model> = Arc::new(MockModel::new("a".to_string()));
        assert!(state.publish("a", generation, model, 250, Instant::now()));

        let entry = &state.entries["a"];
        assert_eq!(entry.state, EntryState::Loaded);
        assert_eq!(entry.ref_count, 2);
        assert_eq!(entry.pending, 0);
        assert_eq!(state.memory.current_bytes(), 250);
        assert!(state.recency.contains("a"));
    }

    #[test]
    fn test_fail_load_releases_reservation() {
        let mut state = state();
        let generation = insert_loading(&mut state, "a", 300);

        assert!(!state.fail_load("a", generation + 1));
        assert!(state.fail_load("a", generation));
        assert!(state.entries.is_empty());
        assert_eq!(state.memory.current_bytes(), 0);
        assert!(!state.fail_load("a", generation));
    }

    #[test]
    fn test_acquire_loaded_only_for_loaded_entries() {
        let mut state = state();
        let generation = insert_loading(&mut state, "a", 100);
        assert!(state.acquire_loaded("a", Instant::now()).is_none());
        assert!(!state.touch("a", Instant::now()));

        let model: Arc<dyn Model> = Arc::new(MockModel::new("a".to_string()));
        state.publish("a", generation, model, 100, Instant::now());

        let (_, acquired_generation) = state.acquire_loaded("a", Instant::now()).unwrap();
        assert_eq!(acquired_generation, generation);
        assert_eq!(state.entries["a"].ref_count, 1);
        assert_eq!(state.release_ref("a", generation), 0);
    }

    #[test]
    #[should_panic(expected = "invariant violation")]
    fn test_release_without_reference_panics() {
        let mut state = state();
        let generation = insert_loading(&mut state, "a", 100);
        state.release_ref("a", generation);
    }

    #[test]
    fn test_reconcile_corrects_drift() {
        let mut state = state();
        insert_loading(&mut state, "a", 100);
        state.memory.reserve(40);

        assert_eq!(state.reconcile(), 40);
        assert_eq!(state.memory.current_bytes(), 100);
    }
}
