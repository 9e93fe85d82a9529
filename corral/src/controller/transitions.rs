//! Pure transition functions of the collection state machine.
//!
//! ```text
//!  Idle ──fetch──▶ Loading ──ok──▶ Ready ──fetch──▶ Refetching ──ok──▶ Ready
//!                     │                                  │
//!                    err                                err
//!                     ▼                                  ▼
//!                   Error ──fetch──▶ Loading    ReadyWithStaleError ──fetch──▶ Refetching
//! ```
//!
//! Whether a fetch enters `Loading` or `Refetching` depends only on whether
//! there is data to keep showing.

use corral_core::SortSpec;

use super::states::{CollectionState, ViewState};

impl CollectionState {
    /// A fetch was issued.
    #[must_use]
    pub fn on_fetch(self, has_data: bool) -> Self {
        if has_data {
            CollectionState::Refetching
        } else {
            CollectionState::Loading
        }
    }

    /// A fetch delivered data.
    #[must_use]
    pub fn on_success(self) -> Self {
        CollectionState::Ready
    }

    /// A fetch failed.
    #[must_use]
    pub fn on_failure(self, has_data: bool) -> Self {
        if has_data {
            CollectionState::ReadyWithStaleError
        } else {
            CollectionState::Error
        }
    }
}

impl ViewState {
    /// Moves to page `page`, clamped to `[1, total_pages]`. With no known
    /// page count only the lower bound applies.
    ///
    /// Returns `false` when the clamped page is the current one.
    pub fn go_to_page(&mut self, page: u32, total_pages: Option<u32>) -> bool {
        let last = total_pages.map_or(u32::MAX, |total| total.max(1));
        let page = page.clamp(1, last);
        if page == self.page {
            return false;
        }
        self.page = page;
        true
    }

    /// Changes the page size and goes back to the first page.
    pub fn set_limit(&mut self, limit: u32) -> bool {
        if limit == 0 || (limit == self.limit && self.page == 1) {
            return false;
        }
        self.limit = limit;
        self.page = 1;
        true
    }

    /// Sort header click: a new column sorts ascending, the active column
    /// flips direction.
    pub fn toggle_sort(&mut self, field: &str) -> bool {
        self.sort = Some(match self.sort.take() {
            Some(active) if active.field == field => SortSpec {
                direction: active.direction.flip(),
                ..active
            },
            _ => SortSpec::asc(field),
        });
        true
    }

    /// Removes the sort.
    pub fn clear_sort(&mut self) -> bool {
        self.sort.take().is_some()
    }

    /// Sets or (with an empty value) removes a filter, back to page 1.
    pub fn set_filter(&mut self, name: &str, value: &str) -> bool {
        let changed = if value.is_empty() {
            self.filters.remove(name).is_some()
        } else if self.filters.get(name).is_some_and(|v| v.as_str() == value) {
            false
        } else {
            self.filters.insert(name.into(), value.into());
            true
        };
        if changed {
            self.page = 1;
        }
        changed
    }

    /// Removes every filter, back to page 1.
    pub fn clear_filters(&mut self) -> bool {
        if self.filters.is_empty() {
            return false;
        }
        self.filters.clear();
        self.page = 1;
        true
    }

    /// Applies a settled search term, back to page 1.
    pub fn settle_search(&mut self, term: &str) -> bool {
        if self.debounced_search == term {
            return false;
        }
        self.debounced_search = term.to_owned();
        self.page = 1;
        true
    }
}
