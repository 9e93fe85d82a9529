//! Background driving of loads.
//!
//! Every load the cache starts is driven by a task of its own, so it runs to
//! completion and populates the cache even when every caller has gone away
//! (a dropped [`Reload`](crate::controller::Reload), a background
//! revalidation nobody awaits).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use corral_core::QueryKey;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{Instrument, debug, info_span, warn};

use crate::metrics;

const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// One background load: a query key and the load id the cache gave it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoadTask {
    /// Key being loaded.
    pub key: QueryKey,
    /// Load id given by the cache.
    pub id: u64,
}

#[derive(Debug, Default)]
struct OffloadInner {
    slow_after: Option<Duration>,
    tasks: DashMap<LoadTask, JoinHandle<()>>,
}

/// Runs loads on the Tokio runtime and keeps track of the unfinished ones.
#[derive(Clone, Debug, Default)]
pub struct OffloadManager {
    inner: Arc<OffloadInner>,
}

impl OffloadManager {
    /// Creates a manager that never warns about slow loads.
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs a warning for every load running longer than `threshold`.
    /// Slow loads are not cancelled; see
    /// [`CacheConfig::load_timeout`](crate::CacheConfig::load_timeout).
    pub fn warn_slower_than(threshold: Duration) -> Self {
        Self {
            inner: Arc::new(OffloadInner {
                slow_after: Some(threshold),
                tasks: DashMap::new(),
            }),
        }
    }

    /// Spawns `load` for `task`. Must be called within a Tokio runtime.
    pub fn drive<F>(&self, task: LoadTask, load: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let span = info_span!("background_load", key = %task.key, id = task.id);
        let inner = Arc::clone(&self.inner);
        let finished = task.clone();
        metrics::record_background_load(task.key.resource(), true);

        let handle = tokio::spawn(
            async move {
                let started = Instant::now();
                load.await;
                let elapsed = started.elapsed();
                if let Some(threshold) = inner.slow_after
                    && elapsed > threshold
                {
                    warn!(
                        elapsed_ms = elapsed.as_millis() as u64,
                        threshold_ms = threshold.as_millis() as u64,
                        "slow load"
                    );
                }
                inner.tasks.remove(&finished);
                metrics::record_background_load(finished.key.resource(), false);
            }
            .instrument(span),
        );
        debug!(key = %task.key, id = task.id, "load offloaded");
        // The task may already be done; `prune` drops such handles.
        self.inner.tasks.insert(task, handle);
    }

    fn prune(&self) {
        self.inner.tasks.retain(|_, handle| !handle.is_finished());
    }

    /// Number of unfinished loads.
    pub fn in_flight(&self) -> usize {
        self.prune();
        self.inner.tasks.len()
    }

    /// Number of unfinished loads of `resource`.
    pub fn in_flight_for(&self, resource: &str) -> usize {
        self.prune();
        self.inner
            .tasks
            .iter()
            .filter(|entry| entry.key().key.resource() == resource)
            .count()
    }

    /// Stops driving every unfinished load. A load somebody still awaits
    /// keeps running under that caller.
    pub fn abort_all(&self) {
        for entry in self.inner.tasks.iter() {
            entry.value().abort();
        }
    }

    /// Waits until no load is running.
    ///
    /// Sleeps between checks rather than yielding, so a paused test clock
    /// keeps advancing.
    pub async fn wait_idle(&self) {
        while self.in_flight() > 0 {
            tokio::time::sleep(IDLE_POLL_INTERVAL).await;
        }
    }

    /// [`wait_idle`](Self::wait_idle) bounded by `timeout`. Returns whether
    /// every load finished in time.
    pub async fn wait_idle_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.wait_idle()).await.is_ok()
    }
}
