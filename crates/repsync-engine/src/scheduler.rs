//! The sync scheduler: periodic full reconciliation cycles.
//!
//! One cycle = fetch assignments, probe secondary clocks, decide, enqueue.
//! Cycles are strictly sequential: the next one is scheduled only after
//! the current one finishes (successfully or not), plus a fixed delay.
//! There is no intra-cycle retry — a failed cycle is abandoned and the
//! next full re-evaluation self-heals whatever it left undone.

use crate::identity::IdentityResolver;
use crate::probe::{self, ClockStore};
use repsync_client::NodeClient;
use repsync_core::{ClockValue, Result, SyncError, SyncJob};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Does this secondary need a sync?
///
/// Yes when the secondary has no record of the user, or when the primary
/// has seen more operations than the secondary. An unknown primary next to
/// a known secondary is not treated as divergence.
#[must_use]
pub fn sync_required(primary: Option<ClockValue>, secondary: Option<ClockValue>) -> bool {
    match secondary {
        None => true,
        Some(s) => primary.is_some_and(|p| p > s),
    }
}

/// Orchestrates reconciliation cycles and feeds the worker pool.
pub struct Scheduler {
    client: NodeClient,
    resolver: IdentityResolver,
    clock_store: Arc<dyn ClockStore>,
    job_tx: mpsc::Sender<SyncJob>,
    directory_endpoint: String,
    inter_cycle_delay: Duration,
}

impl Scheduler {
    /// Create a scheduler
    #[must_use]
    pub fn new(
        client: NodeClient,
        resolver: IdentityResolver,
        clock_store: Arc<dyn ClockStore>,
        job_tx: mpsc::Sender<SyncJob>,
        directory_endpoint: impl Into<String>,
        inter_cycle_delay: Duration,
    ) -> Self {
        Self {
            client,
            resolver,
            clock_store,
            job_tx,
            directory_endpoint: directory_endpoint.into(),
            inter_cycle_delay,
        }
    }

    /// Run cycles forever.
    ///
    /// A cycle error is logged and abandoned; the inter-cycle delay starts
    /// counting once the cycle has fully finished, so cycles never
    /// overlap regardless of how long one takes.
    pub async fn run(mut self) {
        loop {
            if let Err(e) = self.run_cycle().await {
                warn!(error = %e, "reconciliation cycle abandoned");
            }
            tokio::time::sleep(self.inter_cycle_delay).await;
        }
    }

    /// One full reconciliation cycle.
    ///
    /// A cycle that performs identity resolution does nothing else that
    /// pass, even when resolution succeeds; reconciliation starts on the
    /// next tick.
    pub async fn run_cycle(&mut self) -> Result<()> {
        if !self.resolver.identity().is_resolved() {
            self.resolver.resolve().await?;
            debug!("identity resolution pass; reconciliation deferred to next cycle");
            return Ok(());
        }

        let node_endpoint = self.resolver.identity().endpoint.clone();
        let assignments = self
            .client
            .directory()
            .assignments(&self.directory_endpoint, &node_endpoint)
            .await?;

        if assignments.is_empty() {
            debug!("no users assigned to this node");
            return Ok(());
        }

        // Full barrier: every distinct secondary is probed before any
        // decision is made.
        let remote_clocks = probe::probe_secondaries(&self.client, &assignments).await;

        let mut enqueued = 0usize;
        for assignment in &assignments {
            let primary_clock = self.clock_store.local_clock(&assignment.wallet).await?;

            for secondary in assignment.secondaries() {
                let secondary_clock = remote_clocks
                    .get(secondary)
                    .and_then(|clocks| clocks.get(&assignment.wallet))
                    .copied();

                if sync_required(primary_clock, secondary_clock) {
                    debug!(
                        wallet = %assignment.wallet,
                        secondary,
                        primary = ?primary_clock,
                        remote = ?secondary_clock,
                        "sync required"
                    );
                    // A primary with no record still forces a sync toward
                    // an unknown secondary; clock 0 stands in as the
                    // convergence target.
                    let job = SyncJob::new(
                        assignment.wallet.clone(),
                        node_endpoint.clone(),
                        secondary,
                        primary_clock.unwrap_or(ClockValue(0)),
                    );
                    self.job_tx
                        .send(job)
                        .await
                        .map_err(|_| SyncError::QueueClosed)?;
                    enqueued += 1;
                }
            }
        }

        info!(
            users = assignments.len(),
            enqueued, "reconciliation cycle complete"
        );
        Ok(())
    }
}
