//! The sync worker pool: bounded-concurrency job execution.

use repsync_client::NodeClient;
use repsync_core::{Result, SyncError, SyncJob};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Executes sync jobs with bounded parallelism.
///
/// N worker tasks share one job channel; the pool size is the only
/// concurrency knob. A job that fails or times out simply ends — the next
/// scheduler cycle rediscovers any divergence still present, which is the
/// system's sole retry mechanism.
pub struct SyncWorkerPool {
    client: NodeClient,
    poll_interval: Duration,
    convergence_timeout: Duration,
}

impl SyncWorkerPool {
    /// Create a pool with the given polling parameters
    #[must_use]
    pub const fn new(
        client: NodeClient,
        poll_interval: Duration,
        convergence_timeout: Duration,
    ) -> Self {
        Self {
            client,
            poll_interval,
            convergence_timeout,
        }
    }

    /// Spawn `workers` tasks consuming from `jobs`.
    ///
    /// Workers run until the sending side of the channel closes.
    #[must_use]
    pub fn spawn(self, workers: usize, jobs: mpsc::Receiver<SyncJob>) -> Vec<JoinHandle<()>> {
        let jobs = Arc::new(Mutex::new(jobs));
        let pool = Arc::new(self);

        (0..workers)
            .map(|worker| {
                let jobs = Arc::clone(&jobs);
                let pool = Arc::clone(&pool);
                tokio::spawn(async move {
                    loop {
                        // Hold the lock only for the receive itself so the
                        // other workers can pull jobs while this one runs.
                        let job = jobs.lock().await.recv().await;
                        let Some(job) = job else { break };

                        match pool.process(&job).await {
                            Ok(()) => {}
                            Err(e) if e.is_defect() => {
                                error!(worker, wallet = %job.wallet, error = %e, "dropping malformed sync job");
                            }
                            Err(e) => {
                                warn!(worker, wallet = %job.wallet, target = %job.target_endpoint, error = %e, "sync job abandoned");
                            }
                        }
                    }
                    debug!(worker, "sync worker shutting down");
                })
            })
            .collect()
    }

    /// Validate, dispatch and monitor one job
    async fn process(&self, job: &SyncJob) -> Result<()> {
        validate(job)?;

        self.client
            .sync()
            .dispatch(&job.target_endpoint, &job.wallet, &job.source_endpoint)
            .await?;

        self.monitor(job).await
    }

    /// Poll the target's sync status until it reports the dispatched clock
    /// value or the wall-clock deadline passes.
    ///
    /// The target is expected to answer with errors mid-sync; those read
    /// as "not yet converged" and polling continues.
    async fn monitor(&self, job: &SyncJob) -> Result<()> {
        let deadline = Instant::now() + self.convergence_timeout;

        loop {
            match self
                .client
                .sync()
                .status(&job.target_endpoint, &job.wallet)
                .await
            {
                Ok(Some(clock)) if clock == job.dispatch_clock => {
                    info!(wallet = %job.wallet, target = %job.target_endpoint, clock = %clock, "secondary converged");
                    return Ok(());
                }
                Ok(clock) => {
                    debug!(wallet = %job.wallet, reported = ?clock, expected = %job.dispatch_clock, "not yet converged");
                }
                Err(e) => {
                    debug!(wallet = %job.wallet, error = %e, "sync status unavailable, still syncing");
                }
            }

            if Instant::now() >= deadline {
                return Err(SyncError::MonitorTimeout {
                    wallet: job.wallet.to_string(),
                    target: job.target_endpoint.clone(),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// Shape-check a job before touching the network.
///
/// A malformed job is a programming defect upstream, not a transient
/// condition, so it is dropped rather than retried.
fn validate(job: &SyncJob) -> Result<()> {
    if job.wallet.is_empty() {
        return Err(SyncError::InvalidJob("empty wallet".into()));
    }
    for (name, endpoint) in [
        ("source endpoint", &job.source_endpoint),
        ("target endpoint", &job.target_endpoint),
    ] {
        url::Url::parse(endpoint)
            .map_err(|e| SyncError::InvalidJob(format!("bad {name} {endpoint:?}: {e}")))?;
    }
    Ok(())
}
