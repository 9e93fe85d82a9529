//! Collection controller: one screen's view of a paginated resource.
//!
//! The controller owns the user-facing query state (page, page size, sort,
//! filters and search), derives a [`QueryKey`] from it and keeps a
//! [`CollectionView`] in sync with the [`QueryCache`].
//!
//! Every action updates the view synchronously and returns a [`Reload`]. The
//! last action wins: a response that arrives for a superseded request is
//! dropped ([`LoadOutcome::Discarded`]). The controller also refetches when
//! the cache reports an invalidation of its resource.
//!
//! ```no_run
//! use std::sync::Arc;
//! use corral::{CollectionController, ControllerConfig, QueryCache};
//! # use corral_core::{CollectionLoader, FetchError, Page, QueryKey};
//! # struct Products;
//! # #[async_trait::async_trait]
//! # impl CollectionLoader<String> for Products {
//! #     async fn load(&self, key: &QueryKey) -> Result<Page<String>, FetchError> {
//! #         Ok(Page::empty(key.page(), key.limit()))
//! #     }
//! # }
//!
//! # async fn run() -> Result<(), corral_core::KeyError> {
//! let cache = QueryCache::default();
//! let products = CollectionController::new(
//!     "products",
//!     cache,
//!     Arc::new(Products),
//!     ControllerConfig::default(),
//! )?;
//! products.load().await;
//! products.on_page_change(2).await;
//! println!("{} rows", products.view().items().len());
//! # Ok(())
//! # }
//! ```

mod reload;
mod states;
pub mod transitions;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use corral_core::{CollectionLoader, KeyError, Page, QueryKey, SortSpec};
use futures::FutureExt;
use futures::future::BoxFuture;
use smol_str::SmolStr;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub use reload::{LoadOutcome, Reload};
pub use states::{CollectionState, CollectionView, ViewState};

use crate::cache::{CacheEvent, Lookup, QueryCache, Subscription};
use crate::debounce::{DEFAULT_DEBOUNCE, Debouncer};
use crate::error::CacheError;

/// Rows per page when none is configured.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Initial settings of a controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Initial rows per page.
    pub page_size: u32,
    /// Quiet period of the search box.
    pub debounce: Duration,
    /// Query parameter carrying the settled search term.
    pub search_param: SmolStr,
    /// Initial sort.
    pub sort: Option<SortSpec>,
    /// Initial filters, e.g. a fixed region.
    pub filters: BTreeMap<SmolStr, SmolStr>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            debounce: DEFAULT_DEBOUNCE,
            search_param: SmolStr::new_static("search"),
            sort: None,
            filters: BTreeMap::new(),
        }
    }
}

impl ControllerConfig {
    /// Sets the initial page size.
    #[must_use]
    pub fn page_size(self, page_size: u32) -> Self {
        Self { page_size, ..self }
    }

    /// Sets the search quiet period.
    #[must_use]
    pub fn debounce(self, debounce: Duration) -> Self {
        Self { debounce, ..self }
    }

    /// Sets the search query parameter.
    #[must_use]
    pub fn search_param(self, search_param: impl Into<SmolStr>) -> Self {
        Self {
            search_param: search_param.into(),
            ..self
        }
    }

    /// Sets the initial sort.
    #[must_use]
    pub fn sort(self, sort: SortSpec) -> Self {
        Self {
            sort: Some(sort),
            ..self
        }
    }

    /// Adds an initial filter.
    #[must_use]
    pub fn filter(mut self, name: impl Into<SmolStr>, value: impl Into<SmolStr>) -> Self {
        let value = value.into();
        if !value.is_empty() {
            self.filters.insert(name.into(), value);
        }
        self
    }
}

struct Inner<T> {
    resource: SmolStr,
    search_param: SmolStr,
    cache: QueryCache,
    loader: Arc<dyn CollectionLoader<T>>,
    view: watch::Sender<CollectionView<T>>,
    subscription: Mutex<Option<Subscription>>,
}

impl<T> Inner<T>
where
    T: Send + Sync + 'static,
{
    /// Applies `change` to the query; if it changed, issues a new request.
    fn update(self: &Arc<Self>, change: impl FnOnce(&mut ViewState, Option<u32>) -> bool) -> Reload {
        let mut issued = None;
        self.view.send_if_modified(|view| {
            let mut query = view.query.clone();
            if !change(&mut query, view.total_pages()) {
                return false;
            }
            match query.query_key(&self.resource, &self.search_param) {
                Ok(key) => {
                    view.query = query;
                    view.key = key.clone();
                    view.request += 1;
                    issued = Some((view.request, key));
                    true
                }
                Err(err) => {
                    warn!(resource = %self.resource, error = %err, "rejected query change");
                    false
                }
            }
        });
        match issued {
            Some((request, key)) => self.start(request, key, false),
            None => Reload::unchanged(),
        }
    }

    /// Issues a new request for the current key.
    fn reissue(self: &Arc<Self>, force: bool) -> Reload {
        let mut issued = None;
        self.view.send_modify(|view| {
            view.request += 1;
            issued = Some((view.request, view.key.clone()));
        });
        match issued {
            Some((request, key)) => self.start(request, key, force),
            None => Reload::unchanged(),
        }
    }

    fn start(self: &Arc<Self>, request: u64, key: QueryKey, force: bool) -> Reload {
        self.track(&key);
        if force {
            self.mark_fetching(request);
        } else {
            match self.cache.lookup::<Page<T>>(&key) {
                Ok(Lookup::Fresh(page)) => return Reload::ready(self.apply(request, Ok(page))),
                Ok(Lookup::Stale(page)) => self.show_stale(request, page),
                Ok(Lookup::Missing) => self.mark_fetching(request),
                Err(err) => return Reload::ready(self.apply(request, Err(err))),
            }
        }

        let load = self.cache.load::<Page<T>, _, _>(&key, self.loader_for(&key));
        let this = Arc::downgrade(self);
        Reload::pending(tokio::spawn(async move {
            let result = load.await;
            match this.upgrade() {
                Some(inner) => inner.apply(request, result),
                None => LoadOutcome::Aborted,
            }
        }))
    }

    fn loader_for(
        &self,
        key: &QueryKey,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<Page<T>, corral_core::FetchError>> + use<T>
    {
        let loader = Arc::clone(&self.loader);
        let key = key.clone();
        move || async move { loader.load(&key).await }.boxed()
    }

    fn track(&self, key: &QueryKey) {
        let mut current = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if current.as_ref().is_some_and(|s| s.key() == key) {
            return;
        }
        *current = Some(self.cache.subscribe(key));
    }

    fn mark_fetching(&self, request: u64) {
        self.view.send_if_modified(|view| {
            if view.request != request {
                return false;
            }
            view.state = view.state.on_fetch(view.data.is_some());
            true
        });
    }

    fn show_stale(&self, request: u64, page: Arc<Page<T>>) {
        self.view.send_if_modified(|view| {
            if view.request != request {
                return false;
            }
            view.data = Some(page);
            view.state = view.state.on_fetch(true);
            true
        });
    }

    /// Applies the result of `request` unless a newer one was issued.
    fn apply(&self, request: u64, result: Result<Arc<Page<T>>, CacheError>) -> LoadOutcome {
        let mut outcome = LoadOutcome::Discarded;
        self.view.send_if_modified(|view| {
            if view.request != request {
                return false;
            }
            match result {
                Ok(page) => {
                    view.data = Some(page);
                    view.state = view.state.on_success();
                    view.last_error = None;
                    outcome = LoadOutcome::Applied;
                }
                Err(err) => {
                    warn!(resource = %self.resource, key = %view.key, error = %err, "fetch failed");
                    view.state = view.state.on_failure(view.data.is_some());
                    view.last_error = Some(err);
                    outcome = LoadOutcome::Failed;
                }
            }
            true
        });
        if outcome == LoadOutcome::Discarded {
            debug!(resource = %self.resource, request, "superseded response discarded");
        }
        outcome
    }

    fn on_invalidated(self: &Arc<Self>) {
        if self.view.borrow().state == CollectionState::Idle {
            return;
        }
        debug!(resource = %self.resource, "refetching after invalidation");
        drop(self.reissue(false));
    }
}

/// State machine of one paginated, searchable, sortable collection.
///
/// Must be created within a tokio runtime. Dropping it stops the search
/// debouncer and the invalidation listener; loads already running complete
/// into the cache.
pub struct CollectionController<T> {
    inner: Arc<Inner<T>>,
    debouncer: Debouncer<String>,
    listeners: Vec<JoinHandle<()>>,
}

impl<T> std::fmt::Debug for CollectionController<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionController")
            .field("resource", &self.inner.resource)
            .field("key", &self.inner.view.borrow().key)
            .finish_non_exhaustive()
    }
}

impl<T> CollectionController<T>
where
    T: Send + Sync + 'static,
{
    /// Creates a controller for `resource`, in the `Idle` state.
    ///
    /// Nothing is fetched until the first action or [`load`](Self::load).
    pub fn new(
        resource: impl Into<SmolStr>,
        cache: QueryCache,
        loader: Arc<dyn CollectionLoader<T>>,
        config: ControllerConfig,
    ) -> Result<Self, KeyError> {
        let resource = resource.into();
        let mut query = ViewState::new(config.page_size);
        query.sort = config.sort;
        query.filters = config.filters;
        let key = query.query_key(&resource, &config.search_param)?;

        let (view, _) = watch::channel(CollectionView::new(query, key));
        let inner = Arc::new(Inner {
            resource,
            search_param: config.search_param,
            cache,
            loader,
            view,
            subscription: Mutex::new(None),
        });

        let debouncer = Debouncer::new(String::new(), config.debounce);
        let listeners = vec![
            Self::listen_search(&inner, debouncer.subscribe()),
            Self::listen_invalidations(&inner),
        ];

        Ok(Self {
            inner,
            debouncer,
            listeners,
        })
    }

    fn listen_search(inner: &Arc<Inner<T>>, mut settled: watch::Receiver<String>) -> JoinHandle<()> {
        let inner = Arc::downgrade(inner);
        tokio::spawn(async move {
            while settled.changed().await.is_ok() {
                let term = settled.borrow_and_update().clone();
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                drop(inner.update(|query, _| query.settle_search(&term)));
            }
        })
    }

    fn listen_invalidations(inner: &Arc<Inner<T>>) -> JoinHandle<()> {
        let mut events = inner.cache.events();
        let inner = Arc::downgrade(inner);
        tokio::spawn(async move {
            loop {
                let prefix = match events.recv().await {
                    Ok(CacheEvent::Invalidated { prefix }) => Some(prefix),
                    Err(RecvError::Lagged(missed)) => {
                        debug!(missed, "cache events lagged, refetching");
                        None
                    }
                    Err(RecvError::Closed) => break,
                };
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                if prefix.is_none_or(|prefix| inner.resource.starts_with(prefix.as_str())) {
                    inner.on_invalidated();
                }
            }
        })
    }

    /// Resource this controller lists.
    pub fn resource(&self) -> &str {
        &self.inner.resource
    }

    /// Snapshot of the current view.
    pub fn view(&self) -> CollectionView<T> {
        self.inner.view.borrow().clone()
    }

    /// Receiver notified on every view change.
    pub fn subscribe(&self) -> watch::Receiver<CollectionView<T>> {
        self.inner.view.subscribe()
    }

    /// Key of the current query.
    pub fn query_key(&self) -> QueryKey {
        self.inner.view.borrow().key.clone()
    }

    /// Fetches the current key, serving it from the cache when fresh.
    pub fn load(&self) -> Reload {
        self.inner.reissue(false)
    }

    /// Fetches the current key from the backend even if cached data is fresh.
    /// Joins a load already in flight for the key.
    pub fn refresh(&self) -> Reload {
        self.inner.reissue(true)
    }

    /// Goes to page `page`, clamped to the known page range. No-op on the
    /// current page.
    pub fn on_page_change(&self, page: u32) -> Reload {
        self.inner
            .update(|query, total_pages| query.go_to_page(page, total_pages))
    }

    /// Goes to the next page, if any.
    pub fn next_page(&self) -> Reload {
        let page = self.inner.view.borrow().query.page;
        self.on_page_change(page.saturating_add(1))
    }

    /// Goes to the previous page, if any.
    pub fn previous_page(&self) -> Reload {
        let page = self.inner.view.borrow().query.page;
        self.on_page_change(page.saturating_sub(1))
    }

    /// Changes the page size and goes back to page 1.
    pub fn on_limit_change(&self, limit: u32) -> Reload {
        self.inner.update(|query, _| query.set_limit(limit))
    }

    /// Sort header click on `field`.
    pub fn on_sort(&self, field: &str) -> Reload {
        self.inner.update(|query, _| query.toggle_sort(field))
    }

    /// Removes the sort.
    pub fn clear_sort(&self) -> Reload {
        self.inner.update(|query, _| query.clear_sort())
    }

    /// Sets a filter (an empty value removes it) and goes back to page 1.
    pub fn set_filter(&self, name: &str, value: &str) -> Reload {
        self.inner.update(|query, _| query.set_filter(name, value))
    }

    /// Removes a filter and goes back to page 1.
    pub fn remove_filter(&self, name: &str) -> Reload {
        self.set_filter(name, "")
    }

    /// Removes every filter and goes back to page 1.
    pub fn clear_filters(&self) -> Reload {
        self.inner.update(|query, _| query.clear_filters())
    }

    /// Search box keystroke.
    ///
    /// The raw term is visible in the view at once; the query follows once
    /// the debouncer settles, and then goes back to page 1.
    pub fn on_search_input(&self, term: impl Into<String>) {
        let term = term.into();
        self.inner.view.send_if_modified(|view| {
            if view.query.search_term == term {
                return false;
            }
            view.query.search_term.clone_from(&term);
            true
        });
        self.debouncer.push(term.trim().to_owned());
    }
}

impl<T> Drop for CollectionController<T> {
    fn drop(&mut self) {
        for listener in &self.listeners {
            listener.abort();
        }
    }
}
