//! Eviction policy: which entries leave the cache, and why.
//!
//! The policy only plans and claims victims. Unloading happens outside the
//! state lock, after which the manager reports back through [`EvictionPolicy::finish`]
//! or [`EvictionPolicy::abort`].

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use catwalk_abstraction::{Model, ModelLoader};
use tokio::time::Instant;

use super::accounting::Reservation;
use super::state::CacheState;
use super::types::{EntryState, EvictionCause};

/// An entry claimed for eviction. It stays in state `Evicting` until the
/// unload either finishes or is aborted.
pub(crate) struct Victim {
    pub(crate) id: String,
    pub(crate) generation: u64,
    pub(crate) size_bytes: u64,
    pub(crate) cause: EvictionCause,
    pub(crate) model: Arc<dyn Model>,
    pub(crate) loader: Arc<dyn ModelLoader>,
}

/// Result of asking for room for `need` more bytes.
pub(crate) enum RoomPlan {
    /// The bytes have been reserved.
    Reserved,
    /// These victims must be unloaded before asking again.
    Evict(Vec<Victim>),
    /// Nothing is evictable right now, but unloads in progress will free bytes.
    WaitForEvictions,
    /// The request can never fit with the current references.
    OutOfSpace,
}

pub(crate) struct EvictionPolicy;

impl EvictionPolicy {
    /// Reserves `need` bytes, or says which entries must go first.
    ///
    /// Below the soft limit the bytes are reserved directly. Above it, idle
    /// entries are evicted LRU-first until the admission fits under the soft
    /// limit or `need` bytes have been freed. `freed` carries the bytes
    /// already released for this admission by earlier rounds. When nothing is
    /// evictable the soft limit is not enforced and only the hard limit decides.
    pub(crate) fn make_room(
        state: &mut CacheState,
        need: u64,
        freed: u64,
        skipped: &HashSet<String>,
    ) -> RoomPlan {
        if need > state.memory.hard_limit() {
            return RoomPlan::OutOfSpace;
        }

        if !state.memory.would_exceed_soft(need) {
            return Self::reserve(state, need);
        }

        if freed >= need && !state.memory.would_exceed_hard(need) {
            return Self::reserve(state, need);
        }

        let picks = Self::select(state, need, freed, skipped);
        if !picks.is_empty() {
            return RoomPlan::Evict(Self::claim(state, picks));
        }

        if !state.memory.would_exceed_hard(need) {
            return Self::reserve(state, need);
        }

        if state.evicting_count() > 0 {
            RoomPlan::WaitForEvictions
        } else {
            RoomPlan::OutOfSpace
        }
    }

    /// Claims idle entries until resident bytes are back under the soft limit.
    pub(crate) fn preemptive(state: &mut CacheState, skipped: &HashSet<String>) -> Vec<Victim> {
        if !state.memory.is_over_soft() {
            return Vec::new();
        }
        let picks = Self::select(state, 0, 0, skipped);
        Self::claim(state, picks)
    }

    /// Claims idle entries whose last access is at least `ttl` old.
    pub(crate) fn expired(state: &mut CacheState, now: Instant, ttl: Duration) -> Vec<Victim> {
        let picks: Vec<(String, EvictionCause)> = state
            .recency
            .peek_lru_candidates()
            .filter_map(|id| state.entries.get(id))
            .filter(|entry| {
                entry.is_evictable() && now.saturating_duration_since(entry.last_access) >= ttl
            })
            .map(|entry| (entry.id.clone(), EvictionCause::Ttl))
            .collect();
        Self::claim(state, picks)
    }

    /// Claims every idle entry for shutdown.
    pub(crate) fn drain(state: &mut CacheState) -> Vec<Victim> {
        let picks: Vec<(String, EvictionCause)> = state
            .recency
            .peek_lru_candidates()
            .filter_map(|id| state.entries.get(id))
            .filter(|entry| entry.is_evictable())
            .map(|entry| (entry.id.clone(), EvictionCause::Shutdown))
            .collect();
        Self::claim(state, picks)
    }

    /// Removes an unloaded victim and returns its bytes.
    pub(crate) fn finish(state: &mut CacheState, victim: &Victim) -> bool {
        let matches = state.entries.get(&victim.id).is_some_and(|entry| {
            entry.insertion_seq == victim.generation && entry.state == EntryState::Evicting
        });
        if !matches {
            return false;
        }

        if let Some(entry) = state.entries.remove(&victim.id) {
            state.memory.release(entry.size_bytes);
        }
        state.recency.remove(&victim.id);
        true
    }

    /// Puts a victim whose unload did not complete back into service.
    pub(crate) fn abort(state: &mut CacheState, victim: &Victim) {
        if let Some(entry) = state.entry_mut(&victim.id, victim.generation)
            && entry.state == EntryState::Evicting
        {
            entry.state = EntryState::Loaded;
        }
    }

    fn reserve(state: &mut CacheState, need: u64) -> RoomPlan {
        match state.memory.reserve(need) {
            Reservation::Granted => RoomPlan::Reserved,
            Reservation::Denied => RoomPlan::OutOfSpace,
        }
    }

    /// Walks entries LRU-first and picks idle ones.
    ///
    /// Stops once the admission fits under the soft limit, or once `need`
    /// bytes have been freed and the admission fits under the hard limit. A
    /// victim is labelled `Hard` when the admission would still cross the
    /// hard limit without it.
    fn select(
        state: &CacheState,
        need: u64,
        mut freed: u64,
        skipped: &HashSet<String>,
    ) -> Vec<(String, EvictionCause)> {
        let soft = state.memory.soft_limit();
        let hard = state.memory.hard_limit();
        let mut projected = state.memory.current_bytes();
        let mut picks = Vec::new();

        for id in state.recency.peek_lru_candidates() {
            let fits_hard = projected.saturating_add(need) <= hard;
            if projected.saturating_add(need) <= soft || (need > 0 && freed >= need && fits_hard) {
                break;
            }

            let Some(entry) = state.entries.get(id) else {
                continue;
            };
            if !entry.is_evictable() || skipped.contains(id) {
                continue;
            }

            let cause = if projected.saturating_add(need) > hard {
                EvictionCause::Hard
            } else {
                EvictionCause::Soft
            };
            projected = projected.saturating_sub(entry.size_bytes);
            freed = freed.saturating_add(entry.size_bytes);
            picks.push((id.to_string(), cause));
        }

        picks
    }

    fn claim(state: &mut CacheState, picks: Vec<(String, EvictionCause)>) -> Vec<Victim> {
        picks
            .into_iter()
            .filter_map(|(id, cause)| {
                let entry = state.entries.get_mut(&id)?;
                let model = entry.model.clone()?;
                entry.state = EntryState::Evicting;
                Some(Victim {
                    generation: entry.insertion_seq,
                    size_bytes: entry.size_bytes,
                    cause,
                    model,
                    loader: Arc::clone(&entry.loader),
                    id,
                })
            })
            .collect()
    }
}
