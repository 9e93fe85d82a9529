//! The query cache: stale-while-revalidate storage with request deduplication.
//!
//! A [`QueryCache`] maps [`QueryKey`]s to slots. A slot holds the last good
//! value with its freshness windows and at most one in-flight load. Every
//! caller asking for a key while its load runs joins that load instead of
//! starting another one.
//!
//! Values are stored type-erased; each resource picks its own row type and the
//! cache recovers it on read. Asking for a key with a type other than the one
//! it was loaded with is a [`CacheError::TypeMismatch`].
//!
//! The cache is an explicit object, created once and shared by cloning the
//! handle. No operation holds a map lock across an await.

use std::any::{Any, type_name};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use corral_core::{CacheState, CacheValue, FetchError, QueryKey};
use dashmap::DashMap;
use futures::FutureExt;
use futures::future::{self, BoxFuture, Shared};
use smol_str::SmolStr;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::error::CacheError;
use crate::metrics::{self, LookupStatus};
use crate::offload::{LoadTask, OffloadManager};
use crate::policy::CacheConfig;

type Erased = Arc<dyn Any + Send + Sync>;
type SharedLoad = Shared<BoxFuture<'static, Result<Erased, FetchError>>>;

const EVENT_CAPACITY: usize = 64;

/// Notification published by the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// Entries whose resource starts with `prefix` were invalidated.
    Invalidated {
        /// Resource prefix that was invalidated.
        prefix: SmolStr,
    },
}

/// Result of a non-loading read.
#[derive(Debug)]
pub enum Lookup<T> {
    /// Within the staleness window.
    Fresh(Arc<T>),
    /// Past the staleness window but not expired; should be revalidated.
    Stale(Arc<T>),
    /// Absent or expired.
    Missing,
}

struct InFlight {
    id: u64,
    future: SharedLoad,
}

#[derive(Default)]
struct Slot {
    value: Option<CacheValue<Erased>>,
    in_flight: Option<InFlight>,
    subscribers: usize,
}

impl Slot {
    fn is_evictable(&self, now: Instant) -> bool {
        self.in_flight.is_none()
            && self.subscribers == 0
            && self.value.as_ref().is_none_or(|v| v.is_expired_at(now))
    }
}

struct CacheInner {
    slots: DashMap<QueryKey, Slot>,
    config: CacheConfig,
    offload: OffloadManager,
    events: broadcast::Sender<CacheEvent>,
    load_counter: AtomicU64,
}

impl CacheInner {
    /// Stores the outcome of load `id` unless the slot moved on.
    fn complete(&self, key: &QueryKey, id: u64, result: &Result<Erased, FetchError>) {
        let Some(mut slot) = self.slots.get_mut(key) else {
            return;
        };
        if slot.in_flight.as_ref().is_none_or(|f| f.id != id) {
            debug!(%key, id, "load finished after invalidation, result not stored");
            return;
        }
        slot.in_flight = None;
        match result {
            Ok(data) => {
                if let Some(windows) = self.config.policy_for(key.resource()).windows() {
                    slot.value = Some(CacheValue::fetched_now(
                        data.clone(),
                        windows.stale,
                        windows.expire,
                    ));
                    trace!(%key, "cache entry stored");
                }
            }
            Err(err) => {
                warn!(%key, error = %err, "load failed, cached entry kept");
            }
        }
    }
}

/// Shared, cheaply clonable query cache.
///
/// # Example
///
/// ```no_run
/// use corral::{CacheConfig, QueryCache};
/// use corral_core::{FetchError, QueryKey};
///
/// # async fn run() -> Result<(), corral::CacheError> {
/// let cache = QueryCache::new(CacheConfig::default());
/// let key = QueryKey::new("products", 1, 10)?;
/// let rows = cache
///     .fetch(&key, || async { Ok::<_, FetchError>(vec!["apple", "pear"]) })
///     .await?;
/// assert_eq!(rows.len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<CacheInner>,
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.inner.slots.len())
            .field("config", &self.inner.config)
            .finish()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl QueryCache {
    /// Creates a cache with its own offload manager.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_offload(config, OffloadManager::new())
    }

    /// Creates a cache driving its loads on `offload`.
    pub fn with_offload(config: CacheConfig, offload: OffloadManager) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(CacheInner {
                slots: DashMap::new(),
                config,
                offload,
                events,
                load_counter: AtomicU64::new(0),
            }),
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Offload manager driving the loads.
    pub fn offload(&self) -> &OffloadManager {
        &self.inner.offload
    }

    /// Number of slots, including empty and expired ones.
    pub fn len(&self) -> usize {
        self.inner.slots.len()
    }

    /// Whether the cache has no slots.
    pub fn is_empty(&self) -> bool {
        self.inner.slots.is_empty()
    }

    /// Returns the cached data if present and not expired.
    pub fn get<T>(&self, key: &QueryKey) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let slot = self.inner.slots.get(key)?;
        let value = slot.value.as_ref()?;
        if value.is_expired_at(Instant::now()) {
            return None;
        }
        value.data().clone().downcast::<T>().ok()
    }

    /// Reads `key` without loading, classifying the entry by freshness.
    pub fn lookup<T>(&self, key: &QueryKey) -> Result<Lookup<T>, CacheError>
    where
        T: Send + Sync + 'static,
    {
        let now = Instant::now();
        let found = self.inner.slots.get(key).and_then(|slot| {
            slot.value.as_ref().map(|value| match value.state_at(now) {
                CacheState::Actual(v) => CacheState::Actual(v.data().clone()),
                CacheState::Stale(v) => CacheState::Stale(v.data().clone()),
                CacheState::Expired(v) => CacheState::Expired(v.data().clone()),
            })
        });

        let lookup = match found {
            Some(CacheState::Actual(data)) => Lookup::Fresh(downcast(key, data)?),
            Some(CacheState::Stale(data)) => Lookup::Stale(downcast(key, data)?),
            Some(CacheState::Expired(_)) | None => Lookup::Missing,
        };
        let status = match &lookup {
            Lookup::Fresh(_) => LookupStatus::Hit,
            Lookup::Stale(_) => LookupStatus::Stale,
            Lookup::Missing => LookupStatus::Miss,
        };
        debug!(%key, ?status, "cache lookup");
        metrics::record_lookup(key.resource(), status);
        Ok(lookup)
    }

    /// Returns the cached data, loading it when needed.
    ///
    /// - fresh: the cached data, `loader` is not called
    /// - stale: the cached data, and a background revalidation is started
    ///   (or joined)
    /// - missing or expired: the result of the one in-flight load for `key`
    ///
    /// The lookup happens when `fetch` is called, not when the future is
    /// first polled.
    pub fn fetch<T, F, Fut>(
        &self,
        key: &QueryKey,
        loader: F,
    ) -> BoxFuture<'static, Result<Arc<T>, CacheError>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        match self.lookup::<T>(key) {
            Ok(Lookup::Fresh(data)) => future::ready(Ok(data)).boxed(),
            Ok(Lookup::Stale(data)) => {
                drop(self.load(key, loader));
                future::ready(Ok(data)).boxed()
            }
            Ok(Lookup::Missing) => self.load(key, loader),
            Err(err) => future::ready(Err(err)).boxed(),
        }
    }

    /// Joins the in-flight load of `key` or starts one, regardless of the
    /// freshness of the cached entry.
    ///
    /// The load runs on the offload manager: dropping the returned future does
    /// not cancel it. On success the entry is replaced; on failure it is left
    /// untouched and every caller sharing the load receives the error.
    pub fn load<T, F, Fut>(
        &self,
        key: &QueryKey,
        loader: F,
    ) -> BoxFuture<'static, Result<Arc<T>, CacheError>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        if let Some(shared) = self.join(key) {
            return typed(key.clone(), shared);
        }

        // Build the load outside of any map lock, then install it unless
        // someone else got there first.
        let id = self.inner.load_counter.fetch_add(1, Ordering::Relaxed);
        let shared = self.build_load(key, id, loader());

        let installed = {
            let mut slot = self.inner.slots.entry(key.clone()).or_default();
            match &slot.in_flight {
                Some(existing) => Err(existing.future.clone()),
                None => {
                    slot.in_flight = Some(InFlight {
                        id,
                        future: shared.clone(),
                    });
                    Ok(shared)
                }
            }
        };

        match installed {
            Ok(shared) => {
                debug!(%key, id, "load started");
                let driver = shared.clone();
                self.inner.offload.drive(
                    LoadTask {
                        key: key.clone(),
                        id,
                    },
                    async move {
                        let _ = driver.await;
                    },
                );
                typed(key.clone(), shared)
            }
            Err(existing) => {
                metrics::record_dedup(key.resource());
                typed(key.clone(), existing)
            }
        }
    }

    fn join(&self, key: &QueryKey) -> Option<SharedLoad> {
        let slot = self.inner.slots.get(key)?;
        let in_flight = slot.in_flight.as_ref()?;
        debug!(%key, id = in_flight.id, "joining in-flight load");
        metrics::record_dedup(key.resource());
        Some(in_flight.future.clone())
    }

    fn build_load<T, Fut>(&self, key: &QueryKey, id: u64, load: Fut) -> SharedLoad
    where
        T: Send + Sync + 'static,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let cache = Arc::downgrade(&self.inner);
        let timeout = self.inner.config.load_timeout;
        let key = key.clone();
        async move {
            let started = Instant::now();
            let result = match timeout {
                Some(limit) => tokio::time::timeout(limit, load)
                    .await
                    .unwrap_or(Err(FetchError::Timeout)),
                None => load.await,
            };
            let result = result.map(|data| Arc::new(data) as Erased);
            metrics::record_load(key.resource(), started.elapsed(), result.is_err());
            if let Some(cache) = Weak::upgrade(&cache) {
                cache.complete(&key, id, &result);
            }
            result
        }
        .boxed()
        .shared()
    }

    /// Expires every entry whose resource starts with `prefix`.
    ///
    /// In-flight loads of those entries are detached: callers already waiting
    /// still get their result, but it is not stored, and the next read starts
    /// a new load. Returns the number of slots touched. Subscribers of
    /// [`events`](Self::events) are notified.
    pub fn invalidate(&self, prefix: &str) -> usize {
        let mut count = 0;
        for mut slot in self.inner.slots.iter_mut() {
            if !slot.key().has_prefix(prefix) {
                continue;
            }
            let slot = slot.value_mut();
            let mut touched = slot.in_flight.take().is_some();
            if let Some(value) = slot.value.as_mut() {
                value.expire_now();
                touched = true;
            }
            if touched {
                count += 1;
            }
        }
        debug!(prefix, count, "invalidated");
        metrics::record_invalidation(prefix, count);
        let _ = self.inner.events.send(CacheEvent::Invalidated {
            prefix: SmolStr::new(prefix),
        });
        count
    }

    /// Subscribes to cache notifications.
    pub fn events(&self) -> broadcast::Receiver<CacheEvent> {
        self.inner.events.subscribe()
    }

    /// Marks `key` as in use; its slot is kept by [`evict_expired`](Self::evict_expired)
    /// until the returned guard is dropped.
    pub fn subscribe(&self, key: &QueryKey) -> Subscription {
        self.inner
            .slots
            .entry(key.clone())
            .or_default()
            .subscribers += 1;
        Subscription {
            cache: Arc::downgrade(&self.inner),
            key: key.clone(),
        }
    }

    /// Removes expired or empty slots nobody uses. Returns how many were removed.
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.inner.slots.len();
        self.inner.slots.retain(|_, slot| !slot.is_evictable(now));
        let removed = before.saturating_sub(self.inner.slots.len());
        if removed > 0 {
            debug!(removed, "evicted expired entries");
        }
        removed
    }

    /// Runs [`evict_expired`](Self::evict_expired) every `period` until the
    /// cache is dropped.
    pub fn spawn_janitor(&self, period: Duration) -> JoinHandle<()> {
        let cache = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = cache.upgrade() else {
                    break;
                };
                QueryCache { inner }.evict_expired();
            }
        })
    }
}

/// Guard returned by [`QueryCache::subscribe`].
#[derive(Debug)]
pub struct Subscription {
    cache: Weak<CacheInner>,
    key: QueryKey,
}

impl Subscription {
    /// Key this guard keeps alive.
    pub fn key(&self) -> &QueryKey {
        &self.key
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cache) = self.cache.upgrade()
            && let Some(mut slot) = cache.slots.get_mut(&self.key)
        {
            slot.subscribers = slot.subscribers.saturating_sub(1);
        }
    }
}

fn downcast<T>(key: &QueryKey, data: Erased) -> Result<Arc<T>, CacheError>
where
    T: Send + Sync + 'static,
{
    data.downcast::<T>().map_err(|_| CacheError::TypeMismatch {
        key: SmolStr::new(key.to_string()),
        expected: type_name::<T>(),
    })
}

fn typed<T>(key: QueryKey, shared: SharedLoad) -> BoxFuture<'static, Result<Arc<T>, CacheError>>
where
    T: Send + Sync + 'static,
{
    async move {
        let data = shared.await?;
        downcast(&key, data)
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PolicyConfig;
    use std::sync::atomic::AtomicUsize;

    fn key(page: u32) -> QueryKey {
        QueryKey::new("products", page, 10).unwrap()
    }

    fn counting_loader(
        calls: &Arc<AtomicUsize>,
        value: u32,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<u32, FetchError>> {
        let calls = calls.clone();
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(value)
            }
            .boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_entry_skips_the_loader() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        assert_eq!(*cache.fetch(&key(1), counting_loader(&calls, 1)).await.unwrap(), 1);
        assert_eq!(*cache.fetch(&key(1), counting_loader(&calls, 2)).await.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get::<u32>(&key(1)).as_deref(), Some(&1));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_fetches_share_one_load() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let (a, b) = tokio::join!(
            cache.fetch(&key(1), counting_loader(&calls, 7)),
            cache.fetch(&key(1), counting_loader(&calls, 8)),
        );
        assert_eq!(*a.unwrap(), 7);
        assert_eq!(*b.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_entry_is_served_and_revalidated_once() {
        let config = CacheConfig::new(PolicyConfig::enabled(
            Duration::from_secs(60),
            Duration::from_secs(600),
        ));
        let cache = QueryCache::new(config);
        let calls = Arc::new(AtomicUsize::new(0));
        cache.fetch(&key(1), counting_loader(&calls, 1)).await.unwrap();

        tokio::time::advance(Duration::from_secs(61)).await;
        let first = cache.fetch(&key(1), counting_loader(&calls, 2)).await.unwrap();
        let second = cache.fetch(&key(1), counting_loader(&calls, 3)).await.unwrap();
        assert_eq!((*first, *second), (1, 1));

        cache.offload().wait_idle().await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.get::<u32>(&key(1)).as_deref(), Some(&2));
    }

    #[tokio::test(start_paused = true)]
    async fn invalidation_forces_a_new_load() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        cache.fetch(&key(1), counting_loader(&calls, 1)).await.unwrap();

        let mut events = cache.events();
        assert_eq!(cache.invalidate("products"), 1);
        assert_eq!(
            events.recv().await.unwrap(),
            CacheEvent::Invalidated {
                prefix: "products".into()
            }
        );
        assert!(cache.get::<u32>(&key(1)).is_none());

        let reloaded = cache.fetch(&key(1), counting_loader(&calls, 2)).await.unwrap();
        assert_eq!(*reloaded, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidation_leaves_other_resources_alone() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let users = QueryKey::new("users", 1, 10).unwrap();
        cache.fetch(&key(1), counting_loader(&calls, 1)).await.unwrap();
        cache.fetch(&users, counting_loader(&calls, 2)).await.unwrap();

        cache.invalidate("products");
        assert!(cache.get::<u32>(&key(1)).is_none());
        assert_eq!(cache.get::<u32>(&users).as_deref(), Some(&2));
    }

    #[tokio::test(start_paused = true)]
    async fn load_started_before_invalidation_is_not_stored() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let pending = cache.fetch(&key(1), counting_loader(&calls, 1));
        cache.invalidate("products");

        assert_eq!(*pending.await.unwrap(), 1);
        assert!(cache.get::<u32>(&key(1)).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn failure_keeps_stale_data_and_reaches_every_caller() {
        let config = CacheConfig::new(PolicyConfig::enabled(
            Duration::from_secs(60),
            Duration::from_secs(600),
        ));
        let cache = QueryCache::new(config);
        let calls = Arc::new(AtomicUsize::new(0));
        cache.fetch(&key(1), counting_loader(&calls, 1)).await.unwrap();

        let failing = || async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Err::<u32, _>(FetchError::Network("connection refused".into()))
        };
        let (a, b) = tokio::join!(cache.load(&key(1), failing), cache.load::<u32, _, _>(&key(1), failing));
        let expected = CacheError::Fetch(FetchError::Network("connection refused".into()));
        assert_eq!(a.unwrap_err(), expected);
        assert_eq!(b.unwrap_err(), expected);
        assert_eq!(cache.get::<u32>(&key(1)).as_deref(), Some(&1));
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_policy_never_stores() {
        let cache = QueryCache::new(CacheConfig::default().resource("products", PolicyConfig::Disabled));
        let calls = Arc::new(AtomicUsize::new(0));
        cache.fetch(&key(1), counting_loader(&calls, 1)).await.unwrap();
        cache.fetch(&key(1), counting_loader(&calls, 1)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn type_mismatch_is_reported() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        cache.fetch(&key(1), counting_loader(&calls, 1)).await.unwrap();
        let err = cache.lookup::<String>(&key(1)).unwrap_err();
        assert!(matches!(err, CacheError::TypeMismatch { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn load_timeout_fails_with_timeout() {
        let cache = QueryCache::new(CacheConfig::default().load_timeout(Duration::from_millis(5)));
        let calls = Arc::new(AtomicUsize::new(0));
        let err = cache
            .fetch(&key(1), counting_loader(&calls, 1))
            .await
            .unwrap_err();
        assert_eq!(err, CacheError::Fetch(FetchError::Timeout));
    }

    #[tokio::test(start_paused = true)]
    async fn eviction_spares_subscribed_slots() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        cache.fetch(&key(1), counting_loader(&calls, 1)).await.unwrap();
        cache.fetch(&key(2), counting_loader(&calls, 2)).await.unwrap();
        let guard = cache.subscribe(&key(1));

        tokio::time::advance(Duration::from_secs(601)).await;
        assert_eq!(cache.evict_expired(), 1);
        assert_eq!(cache.len(), 1);

        drop(guard);
        assert_eq!(cache.evict_expired(), 1);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn janitor_evicts_expired_unused_slots() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        cache.fetch(&key(1), counting_loader(&calls, 1)).await.unwrap();
        cache.fetch(&key(2), counting_loader(&calls, 2)).await.unwrap();
        let guard = cache.subscribe(&key(2));
        let janitor = cache.spawn_janitor(Duration::from_secs(1));

        tokio::time::advance(Duration::from_secs(601)).await;
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(cache.len(), 1);

        drop(guard);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(cache.is_empty());
        janitor.abort();
    }
}
