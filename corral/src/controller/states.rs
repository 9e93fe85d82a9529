//! Controller state and the view published to renderers.

use std::collections::BTreeMap;
use std::sync::Arc;

use corral_core::{KeyError, Page, PaginationMetadata, QueryKey, SortSpec};
use smol_str::SmolStr;

use crate::error::CacheError;

/// Lifecycle state of one collection view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CollectionState {
    /// Nothing requested yet.
    #[default]
    Idle,
    /// Fetch in flight, no previous data.
    Loading,
    /// Data present, not fetching.
    Ready,
    /// Data present, a fetch is in flight.
    Refetching,
    /// Fetch failed and there is no data to show.
    Error,
    /// Previous data shown, the latest fetch failed.
    ReadyWithStaleError,
}

impl CollectionState {
    /// Whether a fetch is in flight.
    pub fn is_fetching(self) -> bool {
        matches!(self, CollectionState::Loading | CollectionState::Refetching)
    }

    /// Whether the last fetch failed.
    pub fn is_error(self) -> bool {
        matches!(
            self,
            CollectionState::Error | CollectionState::ReadyWithStaleError
        )
    }
}

/// User-controlled query parameters of one view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    /// 1-based current page.
    pub page: u32,
    /// Rows per page.
    pub limit: u32,
    /// Search box content, updated on every keystroke.
    pub search_term: String,
    /// Settled search term; the only one that reaches the query key.
    pub debounced_search: String,
    /// Active sort column.
    pub sort: Option<SortSpec>,
    /// Active filters. Empty values are never stored.
    pub filters: BTreeMap<SmolStr, SmolStr>,
}

impl ViewState {
    /// First page with `limit` rows, no search, sort or filters.
    pub fn new(limit: u32) -> Self {
        Self {
            page: 1,
            limit,
            search_term: String::new(),
            debounced_search: String::new(),
            sort: None,
            filters: BTreeMap::new(),
        }
    }

    /// Derives the query key of this state.
    ///
    /// Pure: equal inputs always give equal keys. The settled search term is
    /// sent as the filter `search_param`.
    pub fn query_key(&self, resource: &str, search_param: &str) -> Result<QueryKey, KeyError> {
        Ok(QueryKey::new(resource, self.page, self.limit)?
            .with_sort_opt(self.sort.clone())
            .with_filters(self.filters.iter().map(|(k, v)| (k.clone(), v.clone())))
            .with_filter(search_param, self.debounced_search.trim()))
    }
}

/// Everything a renderer needs to draw one collection.
#[derive(Debug)]
pub struct CollectionView<T> {
    /// Lifecycle state.
    pub state: CollectionState,
    /// Query parameters.
    pub query: ViewState,
    /// Key derived from `query`.
    pub key: QueryKey,
    /// Last successfully loaded page, possibly of a previous key.
    pub data: Option<Arc<Page<T>>>,
    /// Error of the last failed fetch, cleared on success.
    pub last_error: Option<CacheError>,
    pub(crate) request: u64,
}

impl<T> Clone for CollectionView<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state,
            query: self.query.clone(),
            key: self.key.clone(),
            data: self.data.clone(),
            last_error: self.last_error.clone(),
            request: self.request,
        }
    }
}

impl<T> CollectionView<T> {
    pub(crate) fn new(query: ViewState, key: QueryKey) -> Self {
        Self {
            state: CollectionState::Idle,
            query,
            key,
            data: None,
            last_error: None,
            request: 0,
        }
    }

    /// Rows to display.
    pub fn items(&self) -> &[T] {
        self.data.as_deref().map_or(&[], |page| page.items.as_slice())
    }

    /// Pagination of the displayed rows.
    pub fn pagination(&self) -> Option<&PaginationMetadata> {
        self.data.as_deref().map(|page| &page.pagination)
    }

    /// Page count of the displayed rows, at least 1, if anything was loaded.
    pub fn total_pages(&self) -> Option<u32> {
        self.pagination().map(|p| p.total_pages.max(1))
    }

    /// A successful load that returned no rows: render "no items found",
    /// not an error.
    pub fn is_empty_result(&self) -> bool {
        self.state == CollectionState::Ready && self.items().is_empty()
    }
}
