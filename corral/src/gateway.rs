//! Mutation gateway: writes that keep the cache honest.

use std::collections::HashMap;
use std::sync::Arc;

use corral_core::{Mutation, MutationKind, MutationResult, MutationTransport, Payload};
use serde::Serialize;
use smol_str::SmolStr;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::cache::QueryCache;
use crate::error::MutationError;
use crate::metrics;

/// Performs mutations and invalidates the cached views they affect.
///
/// A successful mutation of `resource` invalidates every cached key of
/// `resource` and of the resources registered as its dependents, before the
/// result is returned. A failed one leaves the cache untouched.
#[derive(Clone)]
pub struct MutationGateway {
    cache: QueryCache,
    transport: Arc<dyn MutationTransport>,
    dependents: HashMap<SmolStr, Vec<SmolStr>>,
}

impl std::fmt::Debug for MutationGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationGateway")
            .field("dependents", &self.dependents)
            .finish_non_exhaustive()
    }
}

impl MutationGateway {
    /// Creates a gateway writing through `transport`.
    pub fn new(cache: QueryCache, transport: Arc<dyn MutationTransport>) -> Self {
        Self {
            cache,
            transport,
            dependents: HashMap::new(),
        }
    }

    /// Declares that mutating `resource` also invalidates `dependents`
    /// (e.g. products invalidate inventory).
    #[must_use]
    pub fn with_dependents<I, S>(mut self, resource: impl Into<SmolStr>, dependents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        self.dependents
            .entry(resource.into())
            .or_default()
            .extend(dependents.into_iter().map(Into::into));
        self
    }

    /// Resources invalidated by a successful mutation of `resource`.
    pub fn affected(&self, resource: &str) -> Vec<SmolStr> {
        let mut affected = vec![SmolStr::new(resource)];
        if let Some(dependents) = self.dependents.get(resource) {
            for dependent in dependents {
                if !affected.contains(dependent) {
                    affected.push(dependent.clone());
                }
            }
        }
        affected
    }

    /// Performs `mutation`.
    ///
    /// Returns [`MutationError::Rejected`] when the backend answers
    /// `success: false` and [`MutationError::Fetch`] when it cannot be
    /// reached; neither invalidates anything.
    pub async fn mutate(&self, mutation: Mutation) -> Result<MutationResult, MutationError> {
        let kind = mutation.kind.as_str();
        let response = match self.transport.execute(&mutation).await {
            Ok(response) => response,
            Err(err) => {
                warn!(resource = %mutation.resource, kind, error = %err, "mutation failed");
                metrics::record_mutation(&mutation.resource, kind, false);
                return Err(err.into());
            }
        };

        if !response.success {
            warn!(resource = %mutation.resource, kind, message = %response.message, "mutation rejected");
            metrics::record_mutation(&mutation.resource, kind, false);
            return Err(MutationError::Rejected {
                message: response.message,
            });
        }

        let affected = self.affected(&mutation.resource);
        for resource in &affected {
            let count = self.cache.invalidate(resource);
            debug!(%resource, count, "invalidated after mutation");
        }
        info!(resource = %mutation.resource, kind, "mutation applied");
        metrics::record_mutation(&mutation.resource, kind, true);

        Ok(MutationResult {
            success: true,
            message: response.message,
            affected,
            data: response.data,
        })
    }

    /// Validates `payload`, then sends it as JSON.
    ///
    /// Invalid input fails with [`MutationError::Validation`] and never
    /// reaches the backend.
    pub async fn mutate_validated<P>(
        &self,
        resource: impl Into<SmolStr>,
        kind: MutationKind,
        payload: &P,
    ) -> Result<MutationResult, MutationError>
    where
        P: Validate + Serialize + Sync,
    {
        payload.validate()?;
        let payload = Payload::json(payload)?;
        self.mutate(Mutation::new(resource, kind, payload)).await
    }
}
