//! Meta-counters: report rows derived from two counters
//!
//! A meta-counter is evaluated once per report, inside the snapshot, against
//! the operands' current totals and their baselines from the previous report
//! (before those baselines are advanced). It owns no state of its own.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tally_domain::{MetaRow, MetricKey};
use tracing::debug;

use crate::store::Slot;

/// Combines two counter values into a derived figure.
pub type Combiner = Arc<dyn Fn(i64, i64) -> f64 + Send + Sync>;

/// `a / (a + b)`; `NaN` when both are zero.
///
/// ```
/// use tally_core::meta::ratio_total;
///
/// assert!((ratio_total(97, 3) - 0.97).abs() < 1e-12);
/// assert!(ratio_total(0, 0).is_nan());
/// ```
pub fn ratio_total(a: i64, b: i64) -> f64 {
    let a = a as f64;
    a / (a + b as f64)
}

/// A named derived row over two counter operands
#[derive(Clone)]
pub struct MetaCounter {
    name: String,
    operand_a: MetricKey,
    operand_b: MetricKey,
    combine: Combiner,
}

impl MetaCounter {
    pub fn new<F>(
        name: impl Into<String>,
        operand_a: MetricKey,
        operand_b: MetricKey,
        combine: F,
    ) -> Self
    where
        F: Fn(i64, i64) -> f64 + Send + Sync + 'static,
    {
        Self::with_combiner(name, operand_a, operand_b, Arc::new(combine))
    }

    pub fn with_combiner(
        name: impl Into<String>,
        operand_a: MetricKey,
        operand_b: MetricKey,
        combine: Combiner,
    ) -> Self {
        Self { name: name.into(), operand_a, operand_b, combine }
    }

    /// Ratio meta-counter `a / (a + b)`, the common hit-rate shape.
    pub fn ratio(name: impl Into<String>, operand_a: MetricKey, operand_b: MetricKey) -> Self {
        Self::new(name, operand_a, operand_b, ratio_total)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn operands(&self) -> (&MetricKey, &MetricKey) {
        (&self.operand_a, &self.operand_b)
    }

    /// Computes the row from operand totals and baselines.
    ///
    /// `total = f(a, b)` and `delta = f(a - a_prev, b - b_prev)`. Returns
    /// `None` when either operand is missing or is not a counter.
    pub(crate) fn evaluate(&self, metrics: &HashMap<MetricKey, Slot>) -> Option<MetaRow> {
        let (a, a_prev) = self.operand(metrics, &self.operand_a)?;
        let (b, b_prev) = self.operand(metrics, &self.operand_b)?;
        Some(MetaRow {
            name: self.name.clone(),
            total: (self.combine)(a, b),
            delta: (self.combine)(a.wrapping_sub(a_prev), b.wrapping_sub(b_prev)),
        })
    }

    fn operand(&self, metrics: &HashMap<MetricKey, Slot>, key: &MetricKey) -> Option<(i64, i64)> {
        match metrics.get(key.identity()) {
            Some(Slot::Counter(cell)) => Some(cell.totals()),
            Some(Slot::Gauge(_)) => {
                debug!(meta = %self.name, operand = %key, "Meta operand is a gauge, skipping row");
                None
            }
            None => {
                debug!(
                    meta = %self.name,
                    operand = %key,
                    "Meta operand not recorded yet, skipping row"
                );
                None
            }
        }
    }
}

impl fmt::Debug for MetaCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaCounter")
            .field("name", &self.name)
            .field("operand_a", &self.operand_a)
            .field("operand_b", &self.operand_b)
            .finish_non_exhaustive()
    }
}
