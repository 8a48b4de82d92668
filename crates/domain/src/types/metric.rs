//! Metric kinds and bucket resolution tags

use serde::{Deserialize, Serialize};

use crate::impl_tag_conversions;

/// What an identity accumulates. Fixed at first observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Additive integer accumulator.
    Counter,
    /// Last-write-wins floating value.
    Gauge,
}

impl_tag_conversions!(MetricKind {
    Counter => "counter",
    Gauge => "gauge",
});

/// Granularity of the distribution bucketer.
///
/// - `Low`: 1/2/5 steps per decade.
/// - `Medium`: every single-digit multiple per decade.
/// - `High`: two significant figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Low,
    Medium,
    #[default]
    High,
}

impl_tag_conversions!(Resolution {
    Low => "low",
    Medium => "medium",
    High => "high",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_defaults_to_high() {
        assert_eq!(Resolution::default(), Resolution::High);
    }

    #[test]
    fn resolution_parses_case_insensitively() {
        assert_eq!("LOW".parse::<Resolution>(), Ok(Resolution::Low));
        assert_eq!("Medium".parse::<Resolution>(), Ok(Resolution::Medium));
        assert!("ultra".parse::<Resolution>().is_err());
    }

    #[test]
    fn resolution_serde_uses_lowercase() {
        let json = serde_json::to_string(&Resolution::Medium).unwrap();
        assert_eq!(json, "\"medium\"");
        let parsed: Resolution = serde_json::from_str("\"low\"").unwrap();
        assert_eq!(parsed, Resolution::Low);
    }
}
