//! Replica-set synchronization engine.
//!
//! Keeps user content consistent across a primary node and its two
//! secondary replicas. A sequential [`Scheduler`] periodically compares
//! per-user clock values between this node and every secondary (one
//! batched probe per distinct endpoint), and enqueues a [`SyncJob`] for
//! each secondary found behind or unaware of a user. A bounded
//! [`SyncWorkerPool`] dispatches those syncs and polls each target until
//! it converges or a wall-clock timeout passes.
//!
//! There are no per-job retries anywhere: divergence that survives a
//! failed or timed-out job is simply rediscovered by the next cycle.
//!
//! The engine is generic over two collaborators it does not implement:
//! the local [`ClockStore`] (read-only here; clocks advance on the
//! content-ingestion write path) and the chain [`IdentityRegistry`].

mod config;
mod identity;
mod probe;
mod scheduler;
mod worker;

pub use config::EngineConfig;
pub use identity::{IdentityRegistry, IdentityResolver};
pub use probe::{probe_secondaries, ClockStore, RemoteClockMap};
pub use scheduler::{sync_required, Scheduler};
pub use worker::SyncWorkerPool;

pub use repsync_client::NodeClient;
pub use repsync_core::{
    ClockValue, NodeIdentity, Result, SyncError, SyncJob, UserReplicaAssignment, Wallet,
};

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

/// Fully wired sync engine.
pub struct Engine {
    config: EngineConfig,
    client: NodeClient,
    registry: Arc<dyn IdentityRegistry>,
    clock_store: Arc<dyn ClockStore>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Wire an engine from configuration and its two collaborators.
    ///
    /// Fails only on startup-fatal configuration problems.
    pub fn new(
        config: EngineConfig,
        registry: Arc<dyn IdentityRegistry>,
        clock_store: Arc<dyn ClockStore>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            client: NodeClient::new(),
            registry,
            clock_store,
        })
    }

    /// Run the engine.
    ///
    /// Returns immediately when the subsystem is disabled; otherwise
    /// spawns the worker pool and runs scheduler cycles forever.
    pub async fn run(self) {
        if self.config.disabled {
            info!("replica sync engine disabled; staying dormant");
            return;
        }

        let (job_tx, job_rx) = mpsc::channel(self.config.sync_queue_depth);

        let pool = SyncWorkerPool::new(
            self.client.clone(),
            self.config.poll_interval(),
            self.config.convergence_timeout(),
        );
        let _workers = pool.spawn(self.config.max_parallel_sync_workers, job_rx);

        let resolver = IdentityResolver::new(self.registry, self.config.identity());
        let scheduler = Scheduler::new(
            self.client,
            resolver,
            self.clock_store,
            job_tx,
            self.config.directory_endpoint.clone(),
            self.config.inter_cycle_delay(),
        );

        info!(
            workers = self.config.max_parallel_sync_workers,
            endpoint = %self.config.node_endpoint,
            "replica sync engine starting"
        );
        scheduler.run().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct NullRegistry;

    #[async_trait]
    impl IdentityRegistry for NullRegistry {
        async fn service_provider_id(&self, _endpoint: &str) -> Result<u64> {
            Ok(0)
        }
    }

    struct NullClockStore;

    #[async_trait]
    impl ClockStore for NullClockStore {
        async fn local_clock(&self, _wallet: &Wallet) -> Result<Option<ClockValue>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_disabled_engine_stays_dormant() {
        let mut config = EngineConfig::new("", "");
        config.disabled = true;

        let engine =
            Engine::new(config, Arc::new(NullRegistry), Arc::new(NullClockStore)).unwrap();
        // Returns instead of looping forever.
        engine.run().await;
    }

    #[test]
    fn test_bad_config_halts_startup() {
        let config = EngineConfig::new("", "http://disc.example.com");
        let err = Engine::new(config, Arc::new(NullRegistry), Arc::new(NullClockStore))
            .unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }
}
