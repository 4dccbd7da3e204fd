//! Cache manager implementation.
//!
//! [`CacheManager`] is the facade callers use. It combines the memory
//! accounting, the recency tracker, the eviction policy and the single-flight
//! loader behind one state lock that is never held across an `.await`.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::future::Future;
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use catwalk_abstraction::{Model, ModelDescriptor, ModelError, ModelLoader};
use chrono::Utc;
use tokio::sync::Notify;
use tokio::sync::futures::Notified;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::config::{CacheConfig, CacheConfigError};
use super::error::CacheError;
use super::eviction::{EvictionPolicy, RoomPlan, Victim};
use super::metrics::{CacheMetrics, MetricsSnapshot};
use super::single_flight::{FlightRole, SharedFlight};
use super::state::CacheState;
use super::sweeper::{SweepReport, SweeperHandle};
use super::types::{CacheStatus, Entry, EntryState, EntryStatus};
use crate::catalog::{CatalogEntry, ModelCatalog};

/// What every caller of one load observes.
pub(crate) type LoadOutcome = Result<Arc<dyn Model>, CacheError>;

/// Shared by the manager, its handles and its background tasks.
pub(crate) struct CacheInner {
    pub(crate) config: CacheConfig,
    pub(crate) catalog: ModelCatalog,
    state: Mutex<CacheState>,
    evictions: Notify,
    pub(crate) metrics: CacheMetrics,
}

/// Memory-bounded LRU cache of loaded models.
///
/// Models are loaded on demand through their catalog loader, at most once at
/// a time per id. Resident bytes never exceed the hard limit; crossing the
/// soft limit triggers preemptive eviction of idle models. Models referenced
/// by a live [`ModelHandle`] are never evicted.
pub struct CacheManager {
    inner: Arc<CacheInner>,
    sweeper: Mutex<Option<SweeperHandle>>,
}

impl CacheManager {
    /// Create a new cache over `catalog`.
    ///
    /// # Errors
    /// Returns `CacheConfigError` if the configuration is invalid.
    pub fn new(config: CacheConfig, catalog: ModelCatalog) -> Result<Self, CacheConfigError> {
        config.validate()?;

        info!(
            hard_limit_bytes = config.hard_limit_bytes,
            soft_limit_bytes = config.soft_limit_bytes,
            ttl_secs = ?config.ttl_secs,
            models = catalog.len(),
            "Initialized model cache"
        );

        let inner = CacheInner {
            state: Mutex::new(CacheState::new(&config)),
            config,
            catalog,
            evictions: Notify::new(),
            metrics: CacheMetrics::default(),
        };

        Ok(Self { inner: Arc::new(inner), sweeper: Mutex::new(None) })
    }

    /// Returns a handle to the model, loading it if needed.
    ///
    /// Concurrent acquires of an absent model share a single load and its
    /// outcome. The returned handle keeps the model resident until dropped.
    ///
    /// # Errors
    /// - `NotFound` if the id is not in the catalog
    /// - `OutOfSpace` if the model cannot fit under the hard limit
    /// - `Load` if the loader failed
    /// - `ShutDown` after [`CacheManager::shutdown`]
    pub async fn acquire(&self, id: &str) -> Result<ModelHandle, CacheError> {
        self.inner.acquire(id).await
    }

    /// Gives back a handle. Same as dropping it.
    pub fn release(&self, handle: ModelHandle) {
        drop(handle);
    }

    /// Marks a resident model as recently used without taking a reference.
    ///
    /// Returns `false` if the model is not loaded.
    pub fn touch(&self, id: &str) -> bool {
        self.inner.lock().touch(id, Instant::now())
    }

    /// Evicts idle models until resident bytes are at or below the soft limit.
    ///
    /// Best effort: referenced models and models whose unload fails stay.
    /// Returns the number of models evicted.
    pub async fn evict_if_needed(&self) -> usize {
        self.inner.evict_if_needed().await
    }

    /// Runs one maintenance pass: TTL expiry and accounting reconciliation.
    pub async fn sweep(&self) -> SweepReport {
        self.inner.sweep().await
    }

    /// Starts the periodic maintenance task. Must be called within a runtime.
    ///
    /// Calling it again while a sweeper is running does nothing.
    pub fn spawn_sweeper(&self) {
        let mut sweeper = self.sweeper.lock().unwrap_or_else(PoisonError::into_inner);
        if sweeper.is_none() {
            *sweeper = Some(SweeperHandle::spawn(
                Arc::downgrade(&self.inner),
                self.inner.config.sweep_interval(),
            ));
        }
    }

    /// Point-in-time view of every catalog model.
    #[must_use]
    pub fn status(&self) -> CacheStatus {
        self.inner.status()
    }

    /// Current counter values.
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// Bytes held by loaded, loading and evicting models.
    #[must_use]
    pub fn resident_bytes(&self) -> u64 {
        self.inner.lock().memory.current_bytes()
    }

    /// Whether the model is loaded and usable right now.
    #[must_use]
    pub fn is_loaded(&self, id: &str) -> bool {
        self.inner
            .lock()
            .entries
            .get(id)
            .is_some_and(|entry| entry.state == EntryState::Loaded)
    }

    /// Get the cache configuration.
    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Models this cache may load.
    #[must_use]
    pub fn catalog(&self) -> &ModelCatalog {
        &self.inner.catalog
    }

    /// Stops the sweeper, refuses further acquires, and unloads every idle model.
    ///
    /// Models still referenced stay resident until their handles are dropped.
    pub async fn shutdown(&self) {
        let sweeper = self.sweeper.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(sweeper) = sweeper {
            sweeper.stop().await;
        }

        let victims = {
            let mut state = self.inner.lock();
            state.shut_down = true;
            EvictionPolicy::drain(&mut state)
        };

        let candidates = victims.len();
        let failed = Arc::clone(&self.inner).unload_victims(victims).await;
        info!(
            unloaded = candidates - failed.len(),
            unload_failures = failed.len(),
            resident_bytes = self.resident_bytes(),
            "Model cache shut down"
        );
    }
}

impl Drop for CacheManager {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.get_mut().unwrap_or_else(PoisonError::into_inner).take() {
            sweeper.abort();
        }
    }
}

impl fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheManager")
            .field("config", &self.inner.config)
            .field("models", &self.inner.catalog.len())
            .finish_non_exhaustive()
    }
}

/// A reference to a resident model.
///
/// While any handle exists the model cannot be evicted. Dropping the handle
/// releases the reference.
pub struct ModelHandle {
    inner: Arc<CacheInner>,
    id: String,
    generation: u64,
    model: Arc<dyn Model>,
}

impl ModelHandle {
    /// Id of the referenced model.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The model itself. Holding the returned `Arc` does not pin it in the cache.
    #[must_use]
    pub fn model(&self) -> Arc<dyn Model> {
        Arc::clone(&self.model)
    }
}

impl Deref for ModelHandle {
    type Target = dyn Model;

    fn deref(&self) -> &Self::Target {
        self.model.as_ref()
    }
}

impl Drop for ModelHandle {
    fn drop(&mut self) {
        self.inner.release_ref(&self.id, self.generation);
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("id", &self.id)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

/// A caller's claim on a load in flight.
///
/// Becomes a [`ModelHandle`] when the load succeeds. If the caller goes away
/// first, dropping the claim gives back whatever it accounted for.
struct PendingClaim {
    inner: Option<Arc<CacheInner>>,
    id: String,
    generation: u64,
}

impl PendingClaim {
    fn new(inner: Arc<CacheInner>, id: &str, generation: u64) -> Self {
        Self { inner: Some(inner), id: id.to_string(), generation }
    }

    fn into_handle(mut self, model: Arc<dyn Model>) -> Option<ModelHandle> {
        let inner = self.inner.take()?;
        Some(ModelHandle { inner, id: std::mem::take(&mut self.id), generation: self.generation, model })
    }
}

impl Drop for PendingClaim {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            inner.abandon_claim(&self.id, self.generation);
        }
    }
}

/// Fails the load if the task ends without publishing.
struct LoadGuard {
    inner: Arc<CacheInner>,
    id: String,
    generation: u64,
    armed: bool,
}

impl Drop for LoadGuard {
    fn drop(&mut self) {
        if self.armed && self.inner.fail_load(&self.id, self.generation) {
            warn!(model_id = %self.id, "Load ended without publishing; reservation released");
        }
    }
}

/// Victims whose unload has not completed. Dropping the batch puts any that
/// remain back into service.
struct EvictionBatch {
    inner: Arc<CacheInner>,
    victims: VecDeque<Victim>,
}

impl Drop for EvictionBatch {
    fn drop(&mut self) {
        if self.victims.is_empty() {
            return;
        }
        {
            let mut state = self.inner.lock();
            for victim in &self.victims {
                EvictionPolicy::abort(&mut state, victim);
            }
        }
        warn!(remaining = self.victims.len(), "Eviction interrupted; victims restored");
        self.inner.evictions.notify_waiters();
    }
}

enum AcquireStep<'a> {
    Hit(ModelHandle),
    Join(SharedFlight<LoadOutcome>, PendingClaim),
    WaitForEviction(Notified<'a>),
    Miss,
}

impl CacheInner {
    pub(crate) fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn acquire(self: &Arc<Self>, id: &str) -> Result<ModelHandle, CacheError> {
        let Some(catalog_entry) = self.catalog.get(id) else {
            warn!(model_id = %id, "Model not found in catalog");
            return Err(CacheError::NotFound(id.to_string()));
        };

        let mut missed = false;
        loop {
            let step = {
                let mut state = self.lock();
                self.plan_acquire(&mut state, id, &mut missed)?
            };

            match step {
                AcquireStep::Hit(handle) => return Ok(handle),
                AcquireStep::Join(flight, claim) => return Self::await_flight(flight, claim).await,
                AcquireStep::WaitForEviction(notified) => notified.await,
                AcquireStep::Miss => {
                    let need = catalog_entry.descriptor.memory_estimate;
                    let started = self
                        .make_room(id, need, |state| self.begin_load(state, catalog_entry, need))
                        .await?;
                    if let Some((flight, claim)) = started {
                        return Self::await_flight(flight, claim).await;
                    }
                }
            }
        }
    }

    fn plan_acquire<'a>(
        self: &'a Arc<Self>,
        state: &mut CacheState,
        id: &str,
        missed: &mut bool,
    ) -> Result<AcquireStep<'a>, CacheError> {
        if state.shut_down {
            return Err(CacheError::ShutDown);
        }

        if let Some((model, generation)) = state.acquire_loaded(id, Instant::now()) {
            if !*missed {
                self.metrics.record_hit();
                debug!(model_id = %id, "Cache hit");
            }
            return Ok(AcquireStep::Hit(ModelHandle {
                inner: Arc::clone(self),
                id: id.to_string(),
                generation,
                model,
            }));
        }

        if !*missed {
            *missed = true;
            self.metrics.record_miss();
            debug!(model_id = %id, "Cache miss");
        }

        match state.entries.get(id).map(|entry| entry.state) {
            Some(EntryState::Loading) => {
                let flight = state.flights.join(id);
                let entry = state.entries.get_mut(id);
                match (flight, entry) {
                    (Some(flight), Some(entry)) => {
                        entry.pending += 1;
                        let claim = PendingClaim::new(Arc::clone(self), id, entry.insertion_seq);
                        debug!(model_id = %id, waiters = entry.pending, "Joining in-flight load");
                        Ok(AcquireStep::Join(flight, claim))
                    }
                    _ => panic!("invariant violation: loading entry '{id}' has no in-flight load"),
                }
            }
            Some(EntryState::Evicting) => Ok(AcquireStep::WaitForEviction(self.evictions.notified())),
            _ => Ok(AcquireStep::Miss),
        }
    }

    /// Inserts a `Loading` entry for the freshly reserved bytes and starts
    /// its load. Gives the bytes back if another caller got there first.
    fn begin_load(
        self: &Arc<Self>,
        state: &mut CacheState,
        catalog_entry: &CatalogEntry,
        reserved: u64,
    ) -> Option<(SharedFlight<LoadOutcome>, PendingClaim)> {
        let id = catalog_entry.descriptor.id.as_str();
        if state.shut_down || state.entries.contains_key(id) {
            state.memory.release(reserved);
            return None;
        }

        let generation = state.next_seq();
        let mut entry = Entry::loading(
            id,
            reserved,
            generation,
            Arc::clone(&catalog_entry.loader),
            Instant::now(),
        );
        entry.pending = 1;
        state.entries.insert(id.to_string(), entry);

        let inner = Arc::clone(self);
        let descriptor = catalog_entry.descriptor.clone();
        let loader = Arc::clone(&catalog_entry.loader);
        let (flight, role) = state
            .flights
            .load_once(id, generation, move || inner.spawn_load(descriptor, loader, generation));
        debug_assert_eq!(role, FlightRole::Leader);

        info!(
            model_id = %id,
            reserved_bytes = reserved,
            resident_bytes = state.memory.current_bytes(),
            "Loading model"
        );
        Some((flight, PendingClaim::new(Arc::clone(self), id, generation)))
    }

    async fn await_flight(
        flight: SharedFlight<LoadOutcome>,
        claim: PendingClaim,
    ) -> Result<ModelHandle, CacheError> {
        let model = flight.await?;
        let id = claim.id.clone();
        claim.into_handle(model).ok_or(CacheError::NotFound(id))
    }

    /// Runs the load on its own task so that it completes even if every
    /// waiting caller is cancelled.
    fn spawn_load(
        self: Arc<Self>,
        descriptor: ModelDescriptor,
        loader: Arc<dyn ModelLoader>,
        generation: u64,
    ) -> impl Future<Output = LoadOutcome> + Send + 'static {
        let id = descriptor.id.clone();
        let task = tokio::spawn(self.run_load(descriptor, loader, generation));
        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(err) => Err(CacheError::Load {
                    id,
                    source: ModelError::Other(format!("load task failed: {err}")),
                }),
            }
        }
    }

    async fn run_load(
        self: Arc<Self>,
        descriptor: ModelDescriptor,
        loader: Arc<dyn ModelLoader>,
        generation: u64,
    ) -> LoadOutcome {
        let id = descriptor.id.clone();
        let mut guard =
            LoadGuard { inner: Arc::clone(&self), id: id.clone(), generation, armed: true };
        let started = Instant::now();

        let outcome = match loader.load(&descriptor).await {
            Ok(loaded) => {
                self.publish(&descriptor, &loader, generation, loaded.model, loaded.size_bytes, started)
                    .await
            }
            Err(source) => {
                self.fail_load(&id, generation);
                warn!(model_id = %id, error = %source, "Model load failed");
                Err(CacheError::Load { id, source })
            }
        };

        guard.armed = false;
        outcome
    }

    async fn publish(
        self: &Arc<Self>,
        descriptor: &ModelDescriptor,
        loader: &Arc<dyn ModelLoader>,
        generation: u64,
        model: Arc<dyn Model>,
        measured: u64,
        started: Instant,
    ) -> LoadOutcome {
        let id = descriptor.id.as_str();
        let reserved = descriptor.memory_estimate;

        if measured > reserved {
            let extra = measured - reserved;
            debug!(model_id = %id, reserved, measured, "Model larger than estimated");

            let attached = self
                .make_room(id, extra, |state| match state.entry_mut(id, generation) {
                    Some(entry) => {
                        entry.size_bytes += extra;
                        true
                    }
                    None => {
                        state.memory.release(extra);
                        false
                    }
                })
                .await;

            if !matches!(attached, Ok(true)) {
                warn!(
                    model_id = %id,
                    measured_bytes = measured,
                    "Loaded model does not fit; discarding it"
                );
                if let Err(err) = loader.unload(model).await {
                    warn!(model_id = %id, error = %err, "Failed to unload discarded model");
                }
                self.fail_load(id, generation);
                return Err(attached.err().unwrap_or_else(|| CacheError::OutOfSpace {
                    id: id.to_string(),
                    requested: measured,
                    hard_limit: self.config.hard_limit_bytes,
                }));
            }
        }

        let published = {
            let mut state = self.lock();
            let published = state.publish(id, generation, Arc::clone(&model), measured, Instant::now());
            if !published {
                state.memory.release(measured);
            }
            published
        };

        if !published {
            self.metrics.record_load_failure();
            return Err(CacheError::Load {
                id: id.to_string(),
                source: ModelError::Other("entry vanished before publish".to_string()),
            });
        }

        self.metrics.record_load();
        info!(
            model_id = %id,
            size_bytes = measured,
            load_ms = started.elapsed().as_millis(),
            "Model loaded"
        );
        Ok(model)
    }

    pub(crate) fn fail_load(&self, id: &str, generation: u64) -> bool {
        let failed = self.lock().fail_load(id, generation);
        if failed {
            self.metrics.record_load_failure();
            self.evictions.notify_waiters();
        }
        failed
    }

    fn abandon_claim(&self, id: &str, generation: u64) {
        let mut state = self.lock();
        let Some(entry) = state.entry_mut(id, generation) else {
            return;
        };
        match entry.state {
            EntryState::Loading => entry.pending = entry.pending.saturating_sub(1),
            EntryState::Loaded if entry.ref_count > 0 => entry.ref_count -= 1,
            _ => {}
        }
    }

    fn release_ref(&self, id: &str, generation: u64) {
        if std::thread::panicking() {
            let mut state = self.lock();
            if let Some(entry) = state.entry_mut(id, generation) {
                entry.ref_count = entry.ref_count.saturating_sub(1);
            }
            return;
        }

        let remaining = self.lock().release_ref(id, generation);
        if remaining == 0 {
            debug!(model_id = %id, "Model released and now evictable");
        }
    }

    /// Reserves `need` bytes, evicting as required, then runs `admit` under
    /// the same lock so the reservation is attached to an entry atomically.
    async fn make_room<R>(
        self: &Arc<Self>,
        id: &str,
        need: u64,
        mut admit: impl FnMut(&mut CacheState) -> R,
    ) -> Result<R, CacheError> {
        let mut skipped = HashSet::new();
        let mut freed = 0_u64;

        loop {
            let (plan, notified) = {
                let mut state = self.lock();
                match EvictionPolicy::make_room(&mut state, need, freed, &skipped) {
                    RoomPlan::Reserved => return Ok(admit(&mut *state)),
                    plan => (plan, self.evictions.notified()),
                }
            };

            match plan {
                RoomPlan::Evict(victims) => {
                    let claimed: Vec<(String, u64)> =
                        victims.iter().map(|victim| (victim.id.clone(), victim.size_bytes)).collect();
                    let failed = self.evict(victims).await;
                    freed += claimed
                        .iter()
                        .filter(|(id, _)| !failed.contains(id))
                        .map(|(_, size)| size)
                        .sum::<u64>();
                    skipped.extend(failed);
                }
                RoomPlan::WaitForEvictions => {
                    debug!(model_id = %id, need, "Waiting for evictions in progress");
                    notified.await;
                }
                RoomPlan::OutOfSpace | RoomPlan::Reserved => {
                    warn!(
                        model_id = %id,
                        requested = need,
                        resident_bytes = self.lock().memory.current_bytes(),
                        hard_limit = self.config.hard_limit_bytes,
                        "Out of space"
                    );
                    return Err(CacheError::OutOfSpace {
                        id: id.to_string(),
                        requested: need,
                        hard_limit: self.config.hard_limit_bytes,
                    });
                }
            }
        }
    }

    async fn evict_if_needed(self: &Arc<Self>) -> usize {
        let mut skipped = HashSet::new();
        let mut evicted = 0;

        loop {
            let victims = EvictionPolicy::preemptive(&mut self.lock(), &skipped);
            if victims.is_empty() {
                return evicted;
            }

            let count = victims.len();
            let failed = self.evict(victims).await;
            evicted += count - failed.len();
            skipped.extend(failed);
        }
    }

    /// Unloads victims on a separate task so a cancelled caller cannot
    /// leave them half-evicted. Returns ids whose unload failed.
    async fn evict(self: &Arc<Self>, victims: Vec<Victim>) -> Vec<String> {
        let task = tokio::spawn(Arc::clone(self).unload_victims(victims));
        match task.await {
            Ok(failed) => failed,
            Err(err) => {
                warn!(error = %err, "Eviction task failed");
                Vec::new()
            }
        }
    }

    pub(crate) async fn unload_victims(self: Arc<Self>, victims: Vec<Victim>) -> Vec<String> {
        let mut batch = EvictionBatch { inner: Arc::clone(&self), victims: victims.into() };
        let mut failed = Vec::new();

        while let Some(victim) = batch.victims.front() {
            let result = victim.loader.unload(Arc::clone(&victim.model)).await;
            let Some(victim) = batch.victims.pop_front() else {
                break;
            };

            match result {
                Ok(()) => self.finish_eviction(&victim),
                Err(err) => {
                    warn!(
                        model_id = %victim.id,
                        cause = %victim.cause,
                        error = %err,
                        "Failed to unload model; keeping it resident"
                    );
                    EvictionPolicy::abort(&mut self.lock(), &victim);
                    failed.push(victim.id);
                }
            }
            self.evictions.notify_waiters();
        }

        failed
    }

    fn finish_eviction(&self, victim: &Victim) {
        let (finished, resident_bytes) = {
            let mut state = self.lock();
            let finished = EvictionPolicy::finish(&mut state, victim);
            (finished, state.memory.current_bytes())
        };

        if finished {
            self.metrics.record_eviction(victim.cause);
            info!(
                model_id = %victim.id,
                freed_bytes = victim.size_bytes,
                cause = %victim.cause,
                resident_bytes,
                "Evicted model"
            );
        }
    }

    fn status(&self) -> CacheStatus {
        let state = self.lock();
        let now = Instant::now();
        let wall_now = Utc::now();

        let entries: Vec<EntryStatus> = self
            .catalog
            .iter()
            .map(|catalog_entry| {
                let id = catalog_entry.descriptor.id.clone();
                match state.entries.get(&id) {
                    Some(entry) => {
                        let resident = matches!(entry.state, EntryState::Loaded | EntryState::Evicting);
                        let idle = now.saturating_duration_since(entry.last_access);
                        let idle_delta =
                            chrono::Duration::from_std(idle).unwrap_or_else(|_| chrono::Duration::zero());
                        EntryStatus {
                            id,
                            size_bytes: entry.size_bytes,
                            state: entry.state,
                            last_access: resident.then(|| wall_now - idle_delta),
                            idle_ms: resident
                                .then(|| u64::try_from(idle.as_millis()).unwrap_or(u64::MAX)),
                            ref_count: entry.ref_count,
                            access_count: entry.access_count,
                        }
                    }
                    None => EntryStatus {
                        id,
                        size_bytes: catalog_entry.descriptor.memory_estimate,
                        state: EntryState::Unloaded,
                        last_access: None,
                        idle_ms: None,
                        ref_count: 0,
                        access_count: 0,
                    },
                }
            })
            .collect();

        let resident_bytes = state.memory.current_bytes();
        let hard_limit_bytes = state.memory.hard_limit();
        CacheStatus {
            loaded_count: entries.iter().filter(|entry| entry.state == EntryState::Loaded).count(),
            entries,
            resident_bytes,
            soft_limit_bytes: state.memory.soft_limit(),
            hard_limit_bytes,
            utilization: resident_bytes as f64 / hard_limit_bytes as f64,
        }
    }

    pub(crate) async fn sweep(self: &Arc<Self>) -> SweepReport {
        let victims = match self.config.ttl() {
            Some(ttl) => EvictionPolicy::expired(&mut self.lock(), Instant::now(), ttl),
            None => Vec::new(),
        };

        let candidates = victims.len();
        let failed =
            if victims.is_empty() { Vec::new() } else { Arc::clone(self).unload_victims(victims).await };

        let drift_bytes = self.lock().reconcile();
        if drift_bytes != 0 {
            warn!(drift_bytes = %drift_bytes, "Corrected memory accounting drift");
        }

        let report = SweepReport { expired: candidates - failed.len(), unload_failures: failed.len(), drift_bytes };
        debug!(
            expired = report.expired,
            unload_failures = report.unload_failures,
            "Maintenance sweep finished"
        );
        report
    }
}
