//! Unit of cross-task communication on the ingestion path

use super::{MetricKey, MetricKind};

/// One fire-and-forget event, queued on a shard and applied by its consumer.
///
/// ```
/// use tally_domain::{MetricKey, MetricKind, Observation};
///
/// let hit = Observation::add(MetricKey::with_suffix("cache", "hit"), 1);
/// assert_eq!(hit.key().identity(), "cache/hit");
/// assert_eq!(hit.kind(), MetricKind::Counter);
/// assert_eq!(Observation::set("depth", 3.0).kind(), MetricKind::Gauge);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// Add `delta` to a counter (negative values decrement).
    Add {
        /// Counter identity.
        key: MetricKey,
        /// Signed increment.
        delta: i64,
    },
    /// Replace a gauge's value.
    Set {
        /// Gauge identity.
        key: MetricKey,
        /// New value.
        value: f64,
    },
}

impl Observation {
    /// Counter increment of `delta` on `key`.
    pub fn add(key: impl Into<MetricKey>, delta: i64) -> Self {
        Self::Add { key: key.into(), delta }
    }

    /// Gauge write of `value` to `key`.
    pub fn set(key: impl Into<MetricKey>, value: f64) -> Self {
        Self::Set { key: key.into(), value }
    }

    /// Identity the observation targets.
    pub fn key(&self) -> &MetricKey {
        match self {
            Self::Add { key, .. } | Self::Set { key, .. } => key,
        }
    }

    /// Kind of metric the observation writes.
    pub fn kind(&self) -> MetricKind {
        match self {
            Self::Add { .. } => MetricKind::Counter,
            Self::Set { .. } => MetricKind::Gauge,
        }
    }
}
