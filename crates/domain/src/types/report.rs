//! Report cycle types
//!
//! Rows are produced once per report cycle, under one store lock window, and
//! handed to the log sink and to any registered callbacks.

use std::time::Duration;

use chrono::{DateTime, Local};
use serde::Serialize;

/* -------------------------------------------------------------------------- */
/* Rows */
/* -------------------------------------------------------------------------- */

/// One counter's figures for a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterRow {
    pub identity: String,
    pub value: i64,
    /// Change since the previous report cycle.
    pub delta: i64,
}

/// One gauge's figures for a cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GaugeRow {
    pub identity: String,
    pub value: f64,
    pub delta: f64,
}

/// A derived metric evaluated over two counters.
///
/// `total` combines the operands' current values, `delta` combines their
/// per-cycle changes. Either may be NaN (for instance a ratio over zero).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetaRow {
    pub name: String,
    pub total: f64,
    pub delta: f64,
}

/* -------------------------------------------------------------------------- */
/* Snapshot */
/* -------------------------------------------------------------------------- */

/// Everything one report cycle captured.
#[derive(Debug, Clone, Serialize)]
pub struct ReportSnapshot {
    pub generated_at: DateTime<Local>,
    pub uptime: Duration,
    /// Meta-counter rows sorted by name.
    pub meta: Vec<MetaRow>,
    /// Gauge rows sorted by identity.
    pub gauges: Vec<GaugeRow>,
    /// Counter rows sorted by identity.
    pub counters: Vec<CounterRow>,
    /// Length of the longest identity known to the store.
    pub longest_identity: usize,
}

impl ReportSnapshot {
    pub fn counter(&self, identity: &str) -> Option<&CounterRow> {
        self.counters
            .binary_search_by(|row| row.identity.as_str().cmp(identity))
            .ok()
            .map(|idx| &self.counters[idx])
    }

    pub fn gauge(&self, identity: &str) -> Option<&GaugeRow> {
        self.gauges
            .binary_search_by(|row| row.identity.as_str().cmp(identity))
            .ok()
            .map(|idx| &self.gauges[idx])
    }

    pub fn meta(&self, name: &str) -> Option<&MetaRow> {
        self.meta.iter().find(|row| row.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.meta.is_empty() && self.gauges.is_empty() && self.counters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> ReportSnapshot {
        ReportSnapshot {
            generated_at: Local::now(),
            uptime: Duration::from_secs(5),
            meta: vec![MetaRow { name: "availability".into(), total: 0.97, delta: f64::NAN }],
            gauges: vec![GaugeRow { identity: "load".into(), value: 1.5, delta: 0.5 }],
            counters: vec![
                CounterRow { identity: "a".into(), value: 1, delta: 1 },
                CounterRow { identity: "b/x".into(), value: 7, delta: 2 },
            ],
            longest_identity: 12,
        }
    }

    #[test]
    fn lookups_find_rows() {
        let snap = snapshot();
        assert_eq!(snap.counter("b/x").map(|r| r.value), Some(7));
        assert!(snap.counter("c").is_none());
        assert_eq!(snap.gauge("load").map(|r| r.delta), Some(0.5));
        assert!(snap.meta("availability").is_some_and(|r| r.delta.is_nan()));
        assert!(!snap.is_empty());
    }
}
