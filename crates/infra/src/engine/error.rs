//! Engine lifecycle error types

use tally_domain::TallyError;
use thiserror::Error;

/// Lifecycle-specific errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// `start` was called outside a Tokio runtime
    #[error("No Tokio runtime available to spawn engine tasks")]
    NoRuntime,

    /// The engine was shut down and cannot be restarted
    #[error("Engine already shut down")]
    AlreadyShutDown,

    /// The engine is not running
    #[error("Engine not running")]
    NotRunning,

    /// A background task did not finish within the join timeout
    #[error("Operation timed out after {millis}ms")]
    Timeout { millis: u64 },

    /// A background task panicked or was aborted
    #[error("Task join failed: {0}")]
    TaskJoinFailed(String),
}

impl From<LifecycleError> for TallyError {
    fn from(err: LifecycleError) -> Self {
        Self::Lifecycle(err.to_string())
    }
}

/// Convenience type alias for lifecycle operations
pub type LifecycleResult<T> = Result<T, LifecycleError>;
