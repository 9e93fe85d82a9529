#![warn(missing_docs)]
//! # corral-core
//!
//! Core types and traits for Corral, a managed remote collection engine.
//!
//! This crate is **transport-agnostic**: it knows nothing about HTTP or about
//! the cache implementation. It defines the vocabulary that the engine
//! (`corral`), the REST transport (`corral-reqwest`) and the dashboard layer
//! share:
//!
//! - **Identify** one paginated/filtered/sorted view of a resource ([`QueryKey`])
//! - **Track** freshness of cached data ([`CacheValue`], [`CacheState`])
//! - **Normalize** heterogeneous list responses ([`ListEnvelope`], [`Page`])
//! - **Sort** rows client-side with a fixed tie-break policy ([`Sortable`])
//! - **Describe** writes against the backend ([`Mutation`], [`MutationResult`])
//! - **Load** and **mutate** through pluggable transports
//!   ([`CollectionLoader`], [`MutationTransport`])

pub mod error;
pub mod key;
pub mod loader;
pub mod mutation;
pub mod page;
pub mod sort;
pub mod value;

pub use error::{FetchError, KeyError};
pub use key::{QueryKey, SortDirection, SortSpec};
pub use loader::{CollectionLoader, MutationTransport};
pub use mutation::{
    FormPart, ImportFailure, ImportSummary, Mutation, MutationKind, MutationResponse,
    MutationResult, PartValue, Payload,
};
pub use page::{ListEnvelope, Page, PageLink, PaginationMetadata};
pub use smol_str::SmolStr;
pub use sort::{SortValue, Sortable, compare_values, sort_items};
pub use value::{CacheState, CacheValue};
