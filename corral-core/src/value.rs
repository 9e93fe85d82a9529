//! Cached value types with freshness metadata.
//!
//! A cache entry moves through three time-based states:
//!
//! - **Actual** - fetched less than `stale_after` ago, served as is
//! - **Stale** - still usable but should be refreshed in the background
//! - **Expired** - no longer valid and must be reloaded before use
//!
//! This is what lets the cache serve "stale-while-revalidate": stale data is
//! returned immediately while fresh data is fetched asynchronously.
//!
//! Timestamps use [`tokio::time::Instant`] so tests can drive them with a
//! paused clock.

use std::time::Duration;

use tokio::time::Instant;

/// Freshness of a cached value at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheState<T> {
    /// Fresh data, no refresh needed.
    Actual(T),
    /// Usable data that should be refreshed in the background.
    Stale(T),
    /// Data that must not be served.
    Expired(T),
}

impl<T> CacheState<T> {
    /// Extracts the value regardless of state.
    pub fn into_inner(self) -> T {
        match self {
            CacheState::Actual(v) | CacheState::Stale(v) | CacheState::Expired(v) => v,
        }
    }
}

/// A cached value with its fetch time and freshness deadlines.
///
/// # Example
///
/// ```
/// use corral_core::{CacheState, CacheValue};
/// use std::time::Duration;
///
/// let value = CacheValue::fetched_now("rows", Duration::from_secs(300), Duration::from_secs(600));
/// assert!(matches!(value.clone().cache_state(), CacheState::Actual(_)));
/// assert_eq!(value.data(), &"rows");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheValue<T> {
    data: T,
    fetched_at: Instant,
    stale_at: Instant,
    expire_at: Instant,
}

impl<T> CacheValue<T> {
    /// Creates a value with explicit timestamps.
    ///
    /// `expire_at` is never earlier than `stale_at`.
    pub fn new(data: T, fetched_at: Instant, stale_at: Instant, expire_at: Instant) -> Self {
        CacheValue {
            data,
            fetched_at,
            stale_at,
            expire_at: expire_at.max(stale_at),
        }
    }

    /// Creates a value fetched right now with the given windows.
    pub fn fetched_now(data: T, stale_after: Duration, expire_after: Duration) -> Self {
        let now = Instant::now();
        Self::new(data, now, now + stale_after, now + expire_after)
    }

    /// Returns a reference to the cached data.
    #[inline]
    pub fn data(&self) -> &T {
        &self.data
    }

    /// When the data was fetched.
    #[inline]
    pub fn fetched_at(&self) -> Instant {
        self.fetched_at
    }

    /// When the data becomes stale.
    #[inline]
    pub fn stale_at(&self) -> Instant {
        self.stale_at
    }

    /// When the data expires.
    #[inline]
    pub fn expire_at(&self) -> Instant {
        self.expire_at
    }

    /// Time since the data was fetched.
    pub fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.fetched_at)
    }

    /// Consumes the value and returns the inner data.
    pub fn into_inner(self) -> T {
        self.data
    }

    /// Marks the value expired as of now.
    pub fn expire_now(&mut self) {
        let now = Instant::now();
        self.stale_at = self.stale_at.min(now);
        self.expire_at = self.expire_at.min(now);
    }

    /// Whether the value has expired at `now`.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expire_at <= now
    }

    /// Freshness state at `now`, borrowing the value.
    pub fn state_at(&self, now: Instant) -> CacheState<&Self> {
        if self.expire_at <= now {
            CacheState::Expired(self)
        } else if self.stale_at <= now {
            CacheState::Stale(self)
        } else {
            CacheState::Actual(self)
        }
    }

    /// Freshness state right now, consuming the value.
    pub fn cache_state(self) -> CacheState<Self> {
        let now = Instant::now();
        match self.state_at(now) {
            CacheState::Actual(_) => CacheState::Actual(self),
            CacheState::Stale(_) => CacheState::Stale(self),
            CacheState::Expired(_) => CacheState::Expired(self),
        }
    }
}
