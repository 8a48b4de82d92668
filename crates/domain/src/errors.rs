//! Error types used throughout the engine

use thiserror::Error;

use crate::types::MetricKind;

/// Main error type for tally
///
/// None of these conditions is fatal to the observed process: callers on the
/// synchronous path may inspect them, and every other path degrades to a
/// missing or approximate metric.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TallyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// An identity was first observed as one kind and later written as another.
    #[error("Metric '{identity}' is a {found}, not a {expected}")]
    KindMismatch { identity: String, expected: MetricKind, found: MetricKind },

    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TallyError {
    /// Builds a [`TallyError::NotFound`] for an identity that was never observed.
    pub fn unknown_identity(identity: impl Into<String>) -> Self {
        Self::NotFound(format!("metric '{}' has never been observed", identity.into()))
    }
}

/// Result type alias for tally operations
pub type Result<T> = std::result::Result<T, TallyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_mismatch_message_names_both_kinds() {
        let err = TallyError::KindMismatch {
            identity: "requests/handler".into(),
            expected: MetricKind::Gauge,
            found: MetricKind::Counter,
        };
        assert_eq!(err.to_string(), "Metric 'requests/handler' is a counter, not a gauge");
    }

    #[test]
    fn unknown_identity_is_not_found() {
        let err = TallyError::unknown_identity("missing");
        assert!(matches!(err, TallyError::NotFound(ref msg) if msg.contains("missing")));
    }
}
