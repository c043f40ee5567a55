//! Shared data model for replica-set synchronization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user wallet address, normalized to lowercase.
///
/// Clock lookups key on the lowercased form, so normalization happens once
/// at construction instead of at every comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Wallet(String);

impl<'de> Deserialize<'de> for Wallet {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // Normalize on the way in so wire casing never leaks into lookups.
        let raw = String::deserialize(deserializer)?;
        Ok(Self::new(raw))
    }
}

impl Wallet {
    /// Create a wallet address, lowercasing it
    #[must_use]
    pub fn new(addr: impl AsRef<str>) -> Self {
        Self(addr.as_ref().to_lowercase())
    }

    /// The normalized address string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the address is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Wallet {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Per-user, per-node counter of applied content operations.
///
/// Monotonically increasing on each node; never decremented by this
/// subsystem. A node with no record of a user has no clock at all, which
/// is expressed as `Option<ClockValue>` (`None` = unknown) rather than a
/// sentinel value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClockValue(pub u64);

impl ClockValue {
    /// Map a wire-format clock to an optional value.
    ///
    /// Legacy peers encode "no record" as a negative clock; anything
    /// non-negative is a real value.
    #[must_use]
    pub fn from_wire(raw: i64) -> Option<Self> {
        u64::try_from(raw).ok().map(Self)
    }
}

impl std::fmt::Display for ClockValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// This node's resolved on-chain identity.
///
/// Resolved once per process lifetime; `sp_id == 0` means the endpoint is
/// not yet registered with the chain registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeIdentity {
    /// Service-provider id from the chain registry (0 = unregistered)
    pub sp_id: u64,

    /// This node's public endpoint
    pub endpoint: String,

    /// Delegate owner wallet, if configured
    #[serde(default)]
    pub delegate_wallet: Option<String>,

    /// Delegate private key, if configured
    #[serde(default)]
    pub delegate_key: Option<String>,
}

impl NodeIdentity {
    /// Returns true once a non-zero service-provider id is known
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.sp_id != 0
    }
}

/// One user's replica set as seen from this node acting as primary.
///
/// Ephemeral: rebuilt in full every scheduler cycle, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserReplicaAssignment {
    /// The user this assignment belongs to
    pub wallet: Wallet,

    /// First secondary replica endpoint
    pub secondary1: String,

    /// Second secondary replica endpoint
    pub secondary2: String,
}

impl UserReplicaAssignment {
    /// The two secondary endpoints for this user
    pub fn secondaries(&self) -> impl Iterator<Item = &str> {
        [self.secondary1.as_str(), self.secondary2.as_str()].into_iter()
    }
}

/// A unit of work instructing a secondary to pull and apply the primary's
/// current state for one user.
///
/// Consumed exactly once by a worker. Not replayed on failure: divergence
/// still present after a failed or timed-out job is rediscovered by the
/// next scheduler cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncJob {
    /// The user to sync
    pub wallet: Wallet,

    /// Primary endpoint the secondary should pull from
    pub source_endpoint: String,

    /// Secondary endpoint that must converge
    pub target_endpoint: String,

    /// Snapshot of the primary's clock at enqueue time; convergence means
    /// the target reports this value
    pub dispatch_clock: ClockValue,

    /// When the job was enqueued
    pub enqueued_at: DateTime<Utc>,
}

impl SyncJob {
    /// Create a job stamped with the current time
    #[must_use]
    pub fn new(
        wallet: Wallet,
        source_endpoint: impl Into<String>,
        target_endpoint: impl Into<String>,
        dispatch_clock: ClockValue,
    ) -> Self {
        Self {
            wallet,
            source_endpoint: source_endpoint.into(),
            target_endpoint: target_endpoint.into(),
            dispatch_clock,
            enqueued_at: Utc::now(),
        }
    }
}
