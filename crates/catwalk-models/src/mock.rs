//! In-memory mock loader for testing and development.
//!
//! The mock loader never touches storage. It reports the descriptor's memory
//! estimate as the measured size unless told otherwise, counts every load and
//! unload, and can be told to fail or to take a while.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use catwalk_abstraction::{LoadedModel, Model, ModelDescriptor, ModelError, ModelLoader};
use serde_json::{Value, json};
use tracing::debug;

/// Format name of mock models.
pub const MOCK_FORMAT: &str = "mock";

/// A mock implementation of the `Model` trait.
#[derive(Debug, Default)]
pub struct MockModel {
    id: String,
}

impl MockModel {
    /// Creates a new `MockModel` with the given ID.
    #[must_use]
    pub const fn new(id: String) -> Self {
        Self { id }
    }
}

#[async_trait]
impl Model for MockModel {
    fn model_id(&self) -> &str {
        &self.id
    }

    fn format(&self) -> &str {
        MOCK_FORMAT
    }

    async fn predict(&self, inputs: &Value) -> Result<Value, ModelError> {
        debug!(model_id = %self.id, "MockModel predicting");
        Ok(json!({ "model_id": self.id, "inputs": inputs }))
    }
}

#[derive(Debug, Default)]
struct MockBehavior {
    failing_loads: HashSet<String>,
    failing_unloads: HashSet<String>,
    measured_sizes: HashMap<String, u64>,
    load_counts: HashMap<String, usize>,
}

/// A loader that fabricates `MockModel`s.
#[derive(Debug, Default)]
pub struct MockLoader {
    delay: Duration,
    behavior: Mutex<MockBehavior>,
    unloads: AtomicUsize,
}

impl MockLoader {
    /// Creates a mock loader that loads instantly and never fails.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every load sleep for `delay` before completing.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Makes loads of `id` fail (or succeed again).
    pub fn set_fail_load(&self, id: &str, fail: bool) {
        let mut behavior = self.behavior();
        if fail {
            behavior.failing_loads.insert(id.to_string());
        } else {
            behavior.failing_loads.remove(id);
        }
    }

    /// Makes unloads of `id` fail (or succeed again).
    pub fn set_fail_unload(&self, id: &str, fail: bool) {
        let mut behavior = self.behavior();
        if fail {
            behavior.failing_unloads.insert(id.to_string());
        } else {
            behavior.failing_unloads.remove(id);
        }
    }

    /// Overrides the measured size reported for `id`.
    pub fn set_measured_size(&self, id: &str, size_bytes: u64) {
        self.behavior().measured_sizes.insert(id.to_string(), size_bytes);
    }

    /// Number of times `id` has been loaded (successfully or not).
    pub fn load_count(&self, id: &str) -> usize {
        self.behavior().load_counts.get(id).copied().unwrap_or(0)
    }

    /// Number of loads across all ids.
    pub fn total_loads(&self) -> usize {
        self.behavior().load_counts.values().sum()
    }

    /// Number of successful unloads.
    pub fn unload_count(&self) -> usize {
        self.unloads.load(Ordering::SeqCst)
    }

    fn behavior(&self) -> std::sync::MutexGuard<'_, MockBehavior> {
        self.behavior.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ModelLoader for MockLoader {
    fn format(&self) -> &str {
        MOCK_FORMAT
    }

    async fn load(&self, descriptor: &ModelDescriptor) -> Result<LoadedModel, ModelError> {
        let (fail, size_bytes) = {
            let mut behavior = self.behavior();
            *behavior.load_counts.entry(descriptor.id.clone()).or_insert(0) += 1;
            (
                behavior.failing_loads.contains(&descriptor.id),
                behavior
                    .measured_sizes
                    .get(&descriptor.id)
                    .copied()
                    .unwrap_or(descriptor.memory_estimate),
            )
        };

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if fail {
            return Err(ModelError::Other(format!("mock load failure for {}", descriptor.id)));
        }

        debug!(model_id = %descriptor.id, size_bytes, "MockLoader loaded model");
        Ok(LoadedModel::new(Arc::new(MockModel::new(descriptor.id.clone())), size_bytes))
    }

    async fn unload(&self, model: Arc<dyn Model>) -> Result<(), ModelError> {
        if self.behavior().failing_unloads.contains(model.model_id()) {
            return Err(ModelError::Unload(format!(
                "mock unload failure for {}",
                model.model_id()
            )));
        }

        self.unloads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
