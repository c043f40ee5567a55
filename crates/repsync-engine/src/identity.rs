//! Node identity resolution against the chain registry.

use async_trait::async_trait;
use repsync_core::{NodeIdentity, Result};
use std::sync::Arc;
use tracing::{debug, info};

/// Chain-registry collaborator mapping an endpoint to its on-chain
/// service-provider id.
#[async_trait]
pub trait IdentityRegistry: Send + Sync {
    /// Look up the service-provider id registered for `endpoint`.
    ///
    /// Returns 0 when the endpoint is not (yet) registered; that is an
    /// unresolved state, not an error.
    async fn service_provider_id(&self, endpoint: &str) -> Result<u64>;
}

/// Resolves and caches this node's identity.
///
/// Identity is mutated in exactly one place: a successful non-zero
/// resolution here. Once resolved, [`resolve`](Self::resolve) is a cheap
/// no-op, so callers re-check every cycle without cost.
pub struct IdentityResolver {
    registry: Arc<dyn IdentityRegistry>,
    identity: NodeIdentity,
}

impl IdentityResolver {
    /// Create a resolver seeded with the configured identity state
    #[must_use]
    pub fn new(registry: Arc<dyn IdentityRegistry>, identity: NodeIdentity) -> Self {
        Self { registry, identity }
    }

    /// Current identity state
    #[must_use]
    pub const fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    /// Attempt resolution if still unresolved.
    ///
    /// Returns whether the identity is resolved after the attempt. A
    /// registry answer of 0 leaves the resolver unresolved without error;
    /// a failed registry call propagates and aborts the caller's cycle.
    pub async fn resolve(&mut self) -> Result<bool> {
        if self.identity.is_resolved() {
            return Ok(true);
        }

        let sp_id = self
            .registry
            .service_provider_id(&self.identity.endpoint)
            .await?;

        if sp_id == 0 {
            debug!(endpoint = %self.identity.endpoint, "endpoint not yet registered on chain");
            return Ok(false);
        }

        info!(sp_id, endpoint = %self.identity.endpoint, "resolved service-provider id");
        self.identity.sp_id = sp_id;
        Ok(true)
    }
}
