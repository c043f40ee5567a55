//! Engine configuration.

use repsync_core::{NodeIdentity, Result, SyncError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the replica-set sync engine.
///
/// Loadable from a TOML file; every knob except the two endpoints has a
/// default matching production behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// This node's public endpoint, as registered on chain
    pub node_endpoint: String,

    /// Directory service answering "which users have this node as primary"
    pub directory_endpoint: String,

    /// Delegate owner wallet
    #[serde(default)]
    pub delegate_wallet: Option<String>,

    /// Delegate private key
    #[serde(default)]
    pub delegate_key: Option<String>,

    /// Pre-resolved service-provider id. 0 means "resolve from the chain
    /// registry on demand"; a non-zero value skips resolution entirely.
    #[serde(default)]
    pub sp_id: u64,

    /// Address of the external job-queue backend. Opaque to the engine;
    /// handed to the queue transport as-is.
    #[serde(default)]
    pub queue_backend_address: Option<String>,

    /// Maximum sync jobs executing concurrently (default: 10)
    #[serde(default = "default_max_workers")]
    pub max_parallel_sync_workers: usize,

    /// Delay between the end of one scheduler cycle and the start of the
    /// next (milliseconds)
    #[serde(default = "default_inter_cycle_delay")]
    pub inter_cycle_delay_ms: u64,

    /// Interval between convergence polls (milliseconds)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Wall-clock budget for a secondary to reach the dispatched clock
    /// value (milliseconds)
    #[serde(default = "default_convergence_timeout")]
    pub convergence_timeout_ms: u64,

    /// Capacity of the bounded sync-job channel
    #[serde(default = "default_queue_depth")]
    pub sync_queue_depth: usize,

    /// When set, the engine stays dormant. Used by metadata-only nodes
    /// that never hold user content.
    #[serde(default)]
    pub disabled: bool,
}

impl EngineConfig {
    /// Minimal config for the given endpoints with all defaults
    #[must_use]
    pub fn new(node_endpoint: impl Into<String>, directory_endpoint: impl Into<String>) -> Self {
        Self {
            node_endpoint: node_endpoint.into(),
            directory_endpoint: directory_endpoint.into(),
            delegate_wallet: None,
            delegate_key: None,
            sp_id: 0,
            queue_backend_address: None,
            max_parallel_sync_workers: default_max_workers(),
            inter_cycle_delay_ms: default_inter_cycle_delay(),
            poll_interval_ms: default_poll_interval(),
            convergence_timeout_ms: default_convergence_timeout(),
            sync_queue_depth: default_queue_depth(),
            disabled: false,
        }
    }

    /// Load config from a TOML file
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SyncError::Config(format!("failed to read {}: {e}", path.display())))?;
        toml::from_str(&content).map_err(|e| SyncError::Config(e.to_string()))
    }

    /// Check startup-fatal conditions.
    ///
    /// A disabled engine accepts anything; an enabled one needs parseable
    /// node and directory endpoints. This is the only place a
    /// configuration problem halts startup — everything later self-heals
    /// cycle to cycle.
    pub fn validate(&self) -> Result<()> {
        if self.disabled {
            return Ok(());
        }
        for (name, value) in [
            ("node_endpoint", &self.node_endpoint),
            ("directory_endpoint", &self.directory_endpoint),
        ] {
            url::Url::parse(value)
                .map_err(|e| SyncError::Config(format!("invalid {name} {value:?}: {e}")))?;
        }
        Ok(())
    }

    /// Initial identity state derived from configuration
    #[must_use]
    pub fn identity(&self) -> NodeIdentity {
        NodeIdentity {
            sp_id: self.sp_id,
            endpoint: self.node_endpoint.clone(),
            delegate_wallet: self.delegate_wallet.clone(),
            delegate_key: self.delegate_key.clone(),
        }
    }

    /// Delay between scheduler cycles
    #[must_use]
    pub const fn inter_cycle_delay(&self) -> Duration {
        Duration::from_millis(self.inter_cycle_delay_ms)
    }

    /// Convergence poll interval
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Convergence wall-clock timeout
    #[must_use]
    pub const fn convergence_timeout(&self) -> Duration {
        Duration::from_millis(self.convergence_timeout_ms)
    }
}

// Default value functions for serde.
const fn default_max_workers() -> usize {
    10
}

const fn default_inter_cycle_delay() -> u64 {
    20_000
}

const fn default_poll_interval() -> u64 {
    1_000
}

const fn default_convergence_timeout() -> u64 {
    10_000
}

const fn default_queue_depth() -> usize {
    1_024
}
