//! Transport seams: where data comes from and where writes go.
//!
//! The engine never talks to the network itself. A [`CollectionLoader`]
//! fetches one page for a [`QueryKey`]; a [`MutationTransport`] performs a
//! [`Mutation`]. `corral-reqwest` implements both over HTTP, tests implement
//! them in memory.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::key::QueryKey;
use crate::mutation::{Mutation, MutationResponse};
use crate::page::Page;

/// Fetches pages of one resource.
#[async_trait]
pub trait CollectionLoader<T>: Send + Sync {
    /// Loads the page identified by `key`.
    async fn load(&self, key: &QueryKey) -> Result<Page<T>, FetchError>;
}

#[async_trait]
impl<T, L> CollectionLoader<T> for Arc<L>
where
    L: CollectionLoader<T> + ?Sized,
{
    async fn load(&self, key: &QueryKey) -> Result<Page<T>, FetchError> {
        self.as_ref().load(key).await
    }
}

/// Performs writes against the backend.
#[async_trait]
pub trait MutationTransport: Send + Sync {
    /// Executes `mutation` and returns the backend's reply.
    ///
    /// A reply with `success: false` is still `Ok`; only transport-level
    /// failures are errors.
    async fn execute(&self, mutation: &Mutation) -> Result<MutationResponse, FetchError>;
}

#[async_trait]
impl<M> MutationTransport for Arc<M>
where
    M: MutationTransport + ?Sized,
{
    async fn execute(&self, mutation: &Mutation) -> Result<MutationResponse, FetchError> {
        self.as_ref().execute(mutation).await
    }
}
