//! Background maintenance for the cache.
//!
//! Each tick runs one sweep: idle models past their TTL are unloaded and the
//! byte counter is reconciled against the entries it is meant to cover.

use std::sync::Weak;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use super::manager::CacheInner;

/// Outcome of one maintenance pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Models unloaded because they were idle past the TTL.
    pub expired: usize,
    /// Expired models whose unload failed; they stay resident.
    pub unload_failures: usize,
    /// Accounting drift that was corrected, in bytes. Zero when healthy.
    pub drift_bytes: i128,
}

/// Running maintenance task.
pub(crate) struct SweeperHandle {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Spawns the sweep loop. The task holds only a weak reference and ends
    /// on its own once the cache is gone.
    pub(crate) fn spawn(inner: Weak<CacheInner>, period: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await;

            debug!(interval_secs = period.as_secs(), "Cache sweeper started");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let Some(inner) = inner.upgrade() else {
                            break;
                        };
                        let report = inner.sweep().await;
                        if report.unload_failures > 0 {
                            warn!(
                                unload_failures = report.unload_failures,
                                "Some expired models could not be unloaded"
                            );
                        }
                    }
                    _ = &mut shutdown_rx => break,
                }
            }
            debug!("Cache sweeper stopped");
        });

        Self { shutdown_tx, task }
    }

    /// Signals the loop and waits for the sweep in progress, if any, to finish.
    pub(crate) async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(err) = self.task.await
            && !err.is_cancelled()
        {
            warn!(error = %err, "Cache sweeper task failed");
        }
    }

    pub(crate) fn abort(self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use crate::cache::{CacheConfig, CacheManager};
    use crate::catalog::ModelCatalog;
    use catwalk_abstraction::{ModelDescriptor, ModelLoader};
    use catwalk_models::MockLoader;
    use std::sync::Arc;
    use std::time::Duration;

    fn cache(loader: &Arc<MockLoader>, ttl_secs: u64) -> CacheManager {
        let mut catalog = ModelCatalog::new();
        for id in ["a", "b"] {
            let loader: Arc<dyn ModelLoader> = Arc::clone(loader) as Arc<dyn ModelLoader>;
            catalog.register(ModelDescriptor::new(id, "mock", format!("{id}.bin"), 100), loader);
        }
        let config = CacheConfig::new(800, 1000).with_ttl_secs(ttl_secs);
        CacheManager::new(config, catalog).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_expires_only_idle_unreferenced_models() {
        let loader = Arc::new(MockLoader::new());
        let cache = cache(&loader, 60);

        drop(cache.acquire("a").await.unwrap());
        let b = cache.acquire("b").await.unwrap();

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(cache.sweep().await.expired, 0);

        tokio::time::advance(Duration::from_secs(31)).await;
        let report = cache.sweep().await;
        assert_eq!(report.expired, 1);
        assert_eq!(report.drift_bytes, 0);
        assert!(!cache.is_loaded("a"));
        assert!(cache.is_loaded("b"));
        drop(b);
    }

    #[tokio::test(start_paused = true)]
    async fn test_touch_postpones_expiry() {
        let loader = Arc::new(MockLoader::new());
        let cache = cache(&loader, 60);
        drop(cache.acquire("a").await.unwrap());

        tokio::time::advance(Duration::from_secs(50)).await;
        assert!(cache.touch("a"));
        tokio::time::advance(Duration::from_secs(50)).await;

        assert_eq!(cache.sweep().await.expired, 0);
        assert!(cache.is_loaded("a"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_unload_keeps_model_resident() {
        let loader = Arc::new(MockLoader::new());
        loader.set_fail_unload("a", true);
        let cache = cache(&loader, 60);
        drop(cache.acquire("a").await.unwrap());

        tokio::time::advance(Duration::from_secs(61)).await;
        let report = cache.sweep().await;
        assert_eq!(report.expired, 0);
        assert_eq!(report.unload_failures, 1);
        assert!(cache.is_loaded("a"));
        assert_eq!(cache.resident_bytes(), 100);
    }

    #[tokio::test]
    async fn test_sweep_without_ttl_only_reconciles() {
        let loader = Arc::new(MockLoader::new());
        let mut catalog = ModelCatalog::new();
        catalog.register(
            ModelDescriptor::new("a", "mock", "a.bin", 100),
            Arc::clone(&loader) as Arc<dyn ModelLoader>,
        );
        let cache = CacheManager::new(CacheConfig::new(800, 1000), catalog).unwrap();
        drop(cache.acquire("a").await.unwrap());

        let report = cache.sweep().await;
        assert_eq!(report.expired, 0);
        assert_eq!(report.drift_bytes, 0);
        assert!(cache.is_loaded("a"));
    }
}
