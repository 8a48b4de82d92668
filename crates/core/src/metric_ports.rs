//! Metric ports - seams between the aggregation core and its collaborators
//!
//! The store implements [`MetricRecorder`]; a [`RuntimeMetricsProducer`] is
//! handed a recorder once per report cycle, before the snapshot is taken, so
//! everything it records shows up in that same report.

use tally_domain::MetricKey;

/// Synchronous sink for counter increments and gauge values.
///
/// Recording through this trait applies directly to the store and bypasses
/// the ingestion queues; kind conflicts are logged and dropped.
pub trait MetricRecorder {
    /// Adds `delta` to the counter at `key`, creating it at zero first
    fn record_add(&self, key: MetricKey, delta: i64);

    /// Replaces the gauge at `key`
    fn record_set(&self, key: MetricKey, value: f64);
}

/// Produces process-level metrics right before each report.
///
/// Implementations run on the reporter task and should stay cheap; any
/// closure `Fn(&dyn MetricRecorder)` qualifies.
pub trait RuntimeMetricsProducer: Send + Sync {
    fn produce(&self, recorder: &dyn MetricRecorder);
}

impl<F> RuntimeMetricsProducer for F
where
    F: Fn(&dyn MetricRecorder) + Send + Sync,
{
    fn produce(&self, recorder: &dyn MetricRecorder) {
        self(recorder);
    }
}
