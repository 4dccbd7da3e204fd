//! Per-model inference counters.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    requests: u64,
    failures: u64,
    total_latency: Duration,
    max_latency: Duration,
}

/// Inference counts and latencies, keyed by model id.
///
/// Only calls that reached a resident model are recorded; cache errors such
/// as an unknown id or `OutOfSpace` never create a row.
#[derive(Debug, Default)]
pub struct InferenceMetrics {
    models: Mutex<HashMap<String, Tally>>,
}

impl InferenceMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one inference and how long it took.
    pub fn record(&self, id: &str, latency: Duration, succeeded: bool) {
        let mut models = self.models.lock().unwrap_or_else(PoisonError::into_inner);
        let tally = models.entry(id.to_string()).or_default();
        tally.requests += 1;
        if !succeeded {
            tally.failures += 1;
        }
        tally.total_latency += latency;
        tally.max_latency = tally.max_latency.max(latency);
    }

    /// Counters for one model, zeroed if it has never served a request.
    #[must_use]
    pub fn get(&self, id: &str) -> InferenceSnapshot {
        let models = self.models.lock().unwrap_or_else(PoisonError::into_inner);
        models.get(id).copied().map(InferenceSnapshot::from).unwrap_or_default()
    }

    /// Counters for every model that has served a request, in id order.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, InferenceSnapshot> {
        let models = self.models.lock().unwrap_or_else(PoisonError::into_inner);
        models.iter().map(|(id, tally)| (id.clone(), InferenceSnapshot::from(*tally))).collect()
    }

    /// Requests served across all models.
    #[must_use]
    pub fn request_count(&self) -> u64 {
        let models = self.models.lock().unwrap_or_else(PoisonError::into_inner);
        models.values().map(|tally| tally.requests).sum()
    }
}

/// Inference counters for one model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct InferenceSnapshot {
    /// Inferences run, including failed ones.
    pub requests: u64,
    /// Inferences the model rejected.
    pub failures: u64,
    /// Sum of inference latencies.
    pub total_latency_ms: f64,
    /// Mean latency, zero when there were no requests.
    pub avg_latency_ms: f64,
    /// Slowest inference seen.
    pub max_latency_ms: f64,
}

impl From<Tally> for InferenceSnapshot {
    fn from(tally: Tally) -> Self {
        let total_latency_ms = tally.total_latency.as_secs_f64() * 1000.0;
        let avg_latency_ms =
            if tally.requests == 0 { 0.0 } else { total_latency_ms / tally.requests as f64 };

        Self {
            requests: tally.requests,
            failures: tally.failures,
            total_latency_ms,
            avg_latency_ms,
            max_latency_ms: tally.max_latency.as_secs_f64() * 1000.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_model_reads_as_zero() {
        let metrics = InferenceMetrics::new();
        assert_eq!(metrics.get("missing"), InferenceSnapshot::default());
        assert!(metrics.snapshot().is_empty());
        assert_eq!(metrics.request_count(), 0);
    }

    #[test]
    fn test_record_accumulates_per_model() {
        let metrics = InferenceMetrics::new();
        metrics.record("a", Duration::from_millis(10), true);
        metrics.record("a", Duration::from_millis(30), false);
        metrics.record("b", Duration::from_millis(5), true);

        let a = metrics.get("a");
        assert_eq!(a.requests, 2);
        assert_eq!(a.failures, 1);
        assert!((a.total_latency_ms - 40.0).abs() < 1e-9);
        assert!((a.avg_latency_ms - 20.0).abs() < 1e-9);
        assert!((a.max_latency_ms - 30.0).abs() < 1e-9);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(snapshot["b"].requests, 1);
        assert_eq!(metrics.request_count(), 3);
    }
}
