//! Query key types and construction.
//!
//! A [`QueryKey`] identifies one specific paginated, filtered and sorted view
//! of a resource. Two keys are equal iff all components compare equal, which
//! is what makes cache hits deterministic.
//!
//! ## Format
//!
//! When displayed, keys follow this format:
//! `{resource}:page={page}&limit={limit}[&sort={field}:{dir}][&{name}={value}...]`
//!
//! ```
//! use corral_core::{QueryKey, SortSpec};
//!
//! let key = QueryKey::new("products", 2, 10)
//!     .unwrap()
//!     .with_sort(SortSpec::asc("title"))
//!     .with_filter("search", "apple");
//! assert_eq!(key.to_string(), "products:page=2&limit=10&sort=title:asc&search=apple");
//! ```
//!
//! ## Performance
//!
//! [`QueryKey`] uses `Arc` internally for cheap cloning - copying a key only
//! increments a reference count. Components use [`SmolStr`] so short names
//! and filter values are stored inline.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::KeyError;

/// Sort direction for one column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending order (smallest first).
    #[default]
    Asc,
    /// Descending order (largest first).
    Desc,
}

impl SortDirection {
    /// Returns the opposite direction.
    #[must_use]
    pub fn flip(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    /// Returns the direction as a query parameter value.
    pub const fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// The single active sort column of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSpec {
    /// Field name as understood by the backend (and by [`Sortable`](crate::Sortable)).
    pub field: SmolStr,
    /// Direction of the sort.
    pub direction: SortDirection,
}

impl SortSpec {
    /// Creates a sort on `field` in the given direction.
    pub fn new(field: impl Into<SmolStr>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// Ascending sort on `field`.
    pub fn asc(field: impl Into<SmolStr>) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    /// Descending sort on `field`.
    pub fn desc(field: impl Into<SmolStr>) -> Self {
        Self::new(field, SortDirection::Desc)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
struct QueryKeyInner {
    resource: SmolStr,
    page: u32,
    limit: u32,
    sort: Option<SortSpec>,
    filters: BTreeMap<SmolStr, SmolStr>,
}

/// Composite identifier of one view of a resource.
///
/// # Example
///
/// ```
/// use corral_core::QueryKey;
///
/// let a = QueryKey::new("users", 1, 10).unwrap().with_filter("region", "north");
/// let b = QueryKey::new("users", 1, 10).unwrap().with_filter("region", "north");
/// assert_eq!(a, b);
/// assert!(a.has_prefix("user"));
/// ```
#[derive(Clone, Debug)]
pub struct QueryKey {
    inner: Arc<QueryKeyInner>,
}

impl PartialEq for QueryKey {
    fn eq(&self, other: &Self) -> bool {
        // Fast path: same Arc pointer
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner == other.inner
    }
}

impl Eq for QueryKey {}

impl Hash for QueryKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.hash(state);
    }
}

impl QueryKey {
    /// Creates a key for `page` of `resource` with `limit` rows per page.
    ///
    /// Fails when the resource name is empty, `page` is 0 or `limit` is 0.
    pub fn new(resource: impl Into<SmolStr>, page: u32, limit: u32) -> Result<Self, KeyError> {
        let resource = resource.into();
        if resource.is_empty() {
            return Err(KeyError::EmptyResource);
        }
        if page == 0 {
            return Err(KeyError::ZeroPage);
        }
        if limit == 0 {
            return Err(KeyError::ZeroLimit);
        }
        Ok(QueryKey {
            inner: Arc::new(QueryKeyInner {
                resource,
                page,
                limit,
                sort: None,
                filters: BTreeMap::new(),
            }),
        })
    }

    /// Key for an unpaginated resource (page 1, limit 1).
    pub fn singleton(resource: impl Into<SmolStr>) -> Result<Self, KeyError> {
        Self::new(resource, 1, 1)
    }

    /// Returns a copy of this key with the given sort.
    #[must_use]
    pub fn with_sort(self, sort: SortSpec) -> Self {
        self.map(|inner| inner.sort = Some(sort))
    }

    /// Returns a copy of this key with an optional sort.
    #[must_use]
    pub fn with_sort_opt(self, sort: Option<SortSpec>) -> Self {
        self.map(|inner| inner.sort = sort)
    }

    /// Returns a copy of this key with one more filter.
    ///
    /// Empty values are dropped: an empty search box and no search box are
    /// the same query.
    #[must_use]
    pub fn with_filter(self, name: impl Into<SmolStr>, value: impl Into<SmolStr>) -> Self {
        let (name, value) = (name.into(), value.into());
        self.map(|inner| {
            if value.is_empty() {
                inner.filters.remove(&name);
            } else {
                inner.filters.insert(name, value);
            }
        })
    }

    /// Returns a copy of this key with all filters from `filters` added.
    #[must_use]
    pub fn with_filters<I, K, V>(self, filters: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<SmolStr>,
        V: Into<SmolStr>,
    {
        filters
            .into_iter()
            .fold(self, |key, (name, value)| key.with_filter(name, value))
    }

    fn map(self, f: impl FnOnce(&mut QueryKeyInner)) -> Self {
        let mut inner = Arc::try_unwrap(self.inner).unwrap_or_else(|arc| (*arc).clone());
        f(&mut inner);
        QueryKey {
            inner: Arc::new(inner),
        }
    }

    /// Resource name (e.g. `"products"`).
    pub fn resource(&self) -> &str {
        &self.inner.resource
    }

    /// 1-based page number.
    pub fn page(&self) -> u32 {
        self.inner.page
    }

    /// Rows per page.
    pub fn limit(&self) -> u32 {
        self.inner.limit
    }

    /// Active sort, if any.
    pub fn sort(&self) -> Option<&SortSpec> {
        self.inner.sort.as_ref()
    }

    /// Active filters in name order.
    pub fn filters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner
            .filters
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Looks up one filter value.
    pub fn filter(&self, name: &str) -> Option<&str> {
        self.inner.filters.get(name).map(SmolStr::as_str)
    }

    /// Whether the resource name starts with `prefix`.
    ///
    /// Invalidation matches on this, ignoring page, sort and filters.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.inner.resource.starts_with(prefix)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:page={}&limit={}",
            self.inner.resource, self.inner.page, self.inner.limit
        )?;
        if let Some(sort) = &self.inner.sort {
            write!(f, "&sort={}:{}", sort.field, sort.direction.as_str())?;
        }
        for (name, value) in &self.inner.filters {
            write!(f, "&{name}={value}")?;
        }
        Ok(())
    }
}
