use thiserror::Error;

/// Result type alias for sync engine operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that can occur while detecting or repairing replica divergence
#[derive(Error, Debug)]
pub enum SyncError {
    /// Directory query for this node's primary users failed; the current
    /// cycle is abandoned and retried from scratch next cycle.
    #[error("directory query failed: {0}")]
    Directory(String),

    /// Batch clock probe to one secondary failed. Localized: only that
    /// endpoint's users are treated as unknown.
    #[error("clock probe to {endpoint} failed: {message}")]
    ClockProbe {
        /// Secondary endpoint that failed to answer
        endpoint: String,
        /// Underlying failure
        message: String,
    },

    /// Identity resolution against the chain registry failed
    #[error("identity resolution failed: {0}")]
    Identity(String),

    /// A sync job failed shape validation. Defect signal: dropped, never
    /// retried.
    #[error("invalid sync job: {0}")]
    InvalidJob(String),

    /// Sync dispatch to a secondary was rejected or unreachable
    #[error("sync dispatch to {endpoint} failed: {message}")]
    Dispatch {
        /// Target secondary endpoint
        endpoint: String,
        /// Underlying failure
        message: String,
    },

    /// Convergence polling hit its wall-clock deadline before the
    /// secondary reached the dispatched clock value
    #[error("sync of {wallet} to {target} did not converge in time")]
    MonitorTimeout {
        /// Wallet being synced
        wallet: String,
        /// Target secondary endpoint
        target: String,
    },

    /// HTTP transport failure
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// JSON parsing/serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration is invalid or missing required fields
    #[error("configuration error: {0}")]
    Config(String),

    /// The sync job queue was closed while enqueuing
    #[error("sync job queue closed")]
    QueueClosed,
}

impl SyncError {
    /// Returns true if the error aborts the whole scheduler cycle rather
    /// than being localized to one endpoint or job
    #[must_use]
    pub const fn aborts_cycle(&self) -> bool {
        matches!(
            self,
            Self::Directory(_) | Self::Identity(_) | Self::QueueClosed
        )
    }

    /// Returns true if the error indicates a programming defect rather
    /// than a transient condition
    #[must_use]
    pub const fn is_defect(&self) -> bool {
        matches!(self, Self::InvalidJob(_))
    }
}
