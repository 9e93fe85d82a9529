#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]
//! # corral
//!
//! Managed remote collections for data-heavy dashboards.
//!
//! A screen that lists a paginated backend resource needs the same machinery
//! every time: page/sort/filter state that maps onto a server query, a cache
//! that serves repeated views instantly and revalidates them in the
//! background, a debounced search box, and writes that invalidate whatever
//! they made stale. This crate is that machinery:
//!
//! - [`QueryCache`] - stale-while-revalidate cache keyed by [`QueryKey`], with
//!   one in-flight load per key and prefix invalidation
//! - [`Debouncer`] - trailing-edge debouncing of a changing value
//! - [`CollectionController`] - explicit state machine of one collection view
//! - [`MutationGateway`] - writes that invalidate affected cache entries
//!
//! Transports live elsewhere: see `corral-reqwest` for a REST implementation
//! of [`CollectionLoader`] and [`MutationTransport`].

/// Query cache with request deduplication and prefix invalidation.
pub mod cache;

/// Collection controller state machine.
pub mod controller;

/// Debounced values.
pub mod debounce;

/// Error types for cache reads and mutations.
///
/// - [`CacheError`] - a load failed, or a cached value had another type
/// - [`MutationError`] - validation, rejection or transport failure of a write
pub mod error;

/// Mutation gateway.
pub mod gateway;

/// Metrics collection for cache observability.
///
/// When the `metrics` feature is enabled, this module provides counters for
/// cache hits, misses, stale hits, deduplicated loads, invalidations, failed
/// loads, mutations and loads running in the background.
pub mod metrics;

/// Background driving of loads and revalidations.
pub mod offload;

/// Cache policy configuration.
///
/// Defines [`PolicyConfig`](policy::PolicyConfig) with the staleness and
/// expiry windows of a resource, and [`CacheConfig`](policy::CacheConfig)
/// with per-resource overrides.
pub mod policy;

pub use cache::{CacheEvent, Lookup, QueryCache, Subscription};
pub use controller::{
    CollectionController, CollectionState, CollectionView, ControllerConfig, LoadOutcome, Reload,
    ViewState,
};
pub use debounce::Debouncer;
pub use error::{CacheError, MutationError};
pub use gateway::MutationGateway;
pub use policy::{CacheConfig, EnabledCacheConfig, PolicyConfig};

pub use corral_core::{
    CacheState, CacheValue, CollectionLoader, FetchError, KeyError, Mutation, MutationKind,
    MutationResult, MutationTransport, Page, PaginationMetadata, Payload, QueryKey, SortDirection,
    SortSpec,
};

/// The `corral` prelude.
///
/// ```rust
/// use corral::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        CacheConfig, CollectionController, CollectionLoader, ControllerConfig, MutationGateway,
        MutationTransport, QueryCache, QueryKey,
    };
}
