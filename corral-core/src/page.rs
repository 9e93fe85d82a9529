//! Pages, pagination metadata and the list-response adapter.
//!
//! Backends disagree on how they describe pagination. All of these are valid
//! external shapes and are normalized at the boundary into one canonical
//! [`PaginationMetadata`]:
//!
//! - `{ data, meta: { total, page, limit, totalPage } }`
//! - `{ data, pagination: { total, page, limit, totalPages } }`
//! - `{ data, page, limit }` (no total)
//! - `{ data }` (the whole collection, paginated client-side)

use serde::{Deserialize, Serialize};

use crate::key::QueryKey;
use crate::sort::{Sortable, sort_items};

/// Read-only pagination summary of one fetched page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMetadata {
    /// Total number of rows across all pages.
    pub total: u64,
    /// 1-based page number.
    pub page: u32,
    /// Rows per page.
    pub limit: u32,
    /// Number of pages; 0 for an empty collection.
    pub total_pages: u32,
}

/// One entry of a compact page-number strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLink {
    /// A clickable page number.
    Page(u32),
    /// A gap of omitted pages.
    Ellipsis,
}

impl PaginationMetadata {
    /// Builds metadata from a total row count, deriving the page count.
    pub fn derive(total: u64, page: u32, limit: u32) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            u32::try_from(total.div_ceil(u64::from(limit))).unwrap_or(u32::MAX)
        };
        Self {
            total,
            page,
            limit,
            total_pages,
        }
    }

    /// Whether a later page exists.
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// Whether an earlier page exists.
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    /// 1-based row range shown on this page, `None` when the page is empty.
    ///
    /// Rendered as "Showing {start} to {end} of {total}".
    pub fn showing_range(&self) -> Option<(u64, u64)> {
        if self.total == 0 || self.page == 0 {
            return None;
        }
        let limit = u64::from(self.limit);
        let start = u64::from(self.page - 1) * limit + 1;
        let end = (u64::from(self.page) * limit).min(self.total);
        (start <= end).then_some((start, end))
    }

    /// Compact page strip around the current page.
    ///
    /// With at most five pages every page is listed. Otherwise the first and
    /// last pages are always shown, with the neighbours of the current page
    /// and ellipses for the gaps.
    pub fn page_window(&self) -> Vec<PageLink> {
        const SHOW_MAX: u32 = 5;
        let (page, last) = (self.page, self.total_pages);

        if last <= SHOW_MAX {
            return (1..=last).map(PageLink::Page).collect();
        }

        let mut links = vec![PageLink::Page(1)];
        if page > 3 {
            links.push(PageLink::Ellipsis);
        }
        let start = page.saturating_sub(1).max(2);
        let end = page.saturating_add(1).min(last - 1);
        for n in start..=end {
            links.push(PageLink::Page(n));
        }
        if page.saturating_add(2) < last {
            links.push(PageLink::Ellipsis);
        }
        links.push(PageLink::Page(last));
        links
    }
}

/// A normalized page of rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Rows of this page, in display order.
    pub items: Vec<T>,
    /// Pagination summary.
    pub pagination: PaginationMetadata,
}

impl<T> Page<T> {
    /// Creates a page from rows and metadata.
    pub fn new(items: Vec<T>, pagination: PaginationMetadata) -> Self {
        Self { items, pagination }
    }

    /// A page with no rows.
    pub fn empty(page: u32, limit: u32) -> Self {
        Self::new(Vec::new(), PaginationMetadata::derive(0, page, limit))
    }

    /// Whether the page has no rows.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetaShape {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    total_page: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaginationShape {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    total_pages: Option<u32>,
}

/// A raw list response as sent by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct ListEnvelope<T> {
    /// Rows as returned by the backend.
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    /// Optional status flag.
    #[serde(default)]
    pub success: Option<bool>,
    /// Optional status message.
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    meta: Option<MetaShape>,
    #[serde(default)]
    pagination: Option<PaginationShape>,
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    limit: Option<u32>,
}

impl<T> ListEnvelope<T> {
    /// Wraps bare rows, as if the backend sent `{ data }`.
    pub fn from_rows(data: Vec<T>) -> Self {
        Self {
            data,
            success: None,
            message: None,
            meta: None,
            pagination: None,
            page: None,
            limit: None,
        }
    }

    /// Server-side pagination metadata, if the response carried any.
    pub fn metadata(&self, key: &QueryKey) -> Option<PaginationMetadata> {
        let page_or = |page: Option<u32>| page.filter(|p| *p > 0).unwrap_or(key.page());
        let limit_or = |limit: Option<u32>| limit.filter(|l| *l > 0).unwrap_or(key.limit());

        if let Some(meta) = &self.meta {
            let mut derived = PaginationMetadata::derive(
                meta.total,
                page_or(meta.page),
                limit_or(meta.limit),
            );
            if let Some(total_pages) = meta.total_page {
                derived.total_pages = total_pages;
            }
            return Some(derived);
        }
        if let Some(pagination) = &self.pagination {
            let mut derived = PaginationMetadata::derive(
                pagination.total,
                page_or(pagination.page),
                limit_or(pagination.limit),
            );
            if let Some(total_pages) = pagination.total_pages {
                derived.total_pages = total_pages;
            }
            return Some(derived);
        }
        None
    }
}

impl<T: Sortable> ListEnvelope<T> {
    /// Normalizes the response into the page requested by `key`.
    ///
    /// With server-side metadata the rows are taken as they are. With only
    /// `page`/`limit` echoed back the total is unknown, so it is inferred as
    /// open-ended when the page is full. Without any metadata the backend sent
    /// the whole collection: the rows are sorted by the key's sort and the
    /// requested page is sliced out locally.
    pub fn into_page(self, key: &QueryKey) -> Page<T> {
        if let Some(pagination) = self.metadata(key) {
            return Page::new(self.data, pagination);
        }

        if self.page.is_some() || self.limit.is_some() {
            let page = self.page.filter(|p| *p > 0).unwrap_or(key.page());
            let limit = self.limit.filter(|l| *l > 0).unwrap_or(key.limit());
            let seen = u64::from(page - 1) * u64::from(limit) + self.data.len() as u64;
            let full = self.data.len() as u64 >= u64::from(limit);
            // A full page means there may be more: advertise one more page.
            let total = if full { seen + 1 } else { seen };
            return Page::new(self.data, PaginationMetadata::derive(total, page, limit));
        }

        let mut rows = self.data;
        if let Some(sort) = key.sort() {
            sort_items(&mut rows, sort);
        }
        let total = rows.len() as u64;
        let mut pagination = PaginationMetadata::derive(total, key.page(), key.limit());
        pagination.total_pages = pagination.total_pages.max(1);

        let start = (key.page() as usize - 1).saturating_mul(key.limit() as usize);
        let items = if start >= rows.len() {
            Vec::new()
        } else {
            rows.into_iter()
                .skip(start)
                .take(key.limit() as usize)
                .collect()
        };
        Page::new(items, pagination)
    }
}
