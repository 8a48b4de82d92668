//! Recording, reading and configuration operations on [`Tally`]
//!
//! Two write paths:
//! - async (`incr`, `set_value`, `mark_distribution`, ...): queued on a shard,
//!   never blocks, silently dropped when the queue is full;
//! - sync (`*_sync`): applied to the store on the caller's thread, visible to
//!   the next `read_sync`, never dropped.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tally_core::{
    derive_bucket_label, BucketPolicy, MetaCounter, ReportTemplate, RuntimeMetricsProducer,
};
use tally_domain::{
    CounterRow, GaugeRow, MetricKey, Observation, ReportSnapshot, Resolution, Result, TallyError,
};
use tracing::debug;

use super::Tally;

impl Tally {
    /* ---------------------------------------------------------------------- */
    /* Async counters */
    /* ---------------------------------------------------------------------- */

    pub fn incr(&self, name: &str) {
        self.incr_by_with_suffix(name, "", 1);
    }

    pub fn incr_by(&self, name: &str, delta: i64) {
        self.incr_by_with_suffix(name, "", delta);
    }

    pub fn decr(&self, name: &str) {
        self.incr_by_with_suffix(name, "", -1);
    }

    pub fn incr_with_suffix(&self, name: &str, suffix: &str) {
        self.incr_by_with_suffix(name, suffix, 1);
    }

    pub fn decr_with_suffix(&self, name: &str, suffix: &str) {
        self.incr_by_with_suffix(name, suffix, -1);
    }

    /// Queues `delta` for the counter `name/suffix` (`name` when `suffix` is empty).
    pub fn incr_by_with_suffix(&self, name: &str, suffix: &str, delta: i64) {
        self.inner.shards.submit(Observation::add(MetricKey::with_suffix(name, suffix), delta));
    }

    /* ---------------------------------------------------------------------- */
    /* Sync counters */
    /* ---------------------------------------------------------------------- */

    /// # Errors
    /// `TallyError::KindMismatch` if `name` is a gauge.
    pub fn incr_sync(&self, name: &str) -> Result<()> {
        self.incr_by_sync_with_suffix(name, "", 1)
    }

    /// # Errors
    /// `TallyError::KindMismatch` if `name` is a gauge.
    pub fn incr_by_sync(&self, name: &str, delta: i64) -> Result<()> {
        self.incr_by_sync_with_suffix(name, "", delta)
    }

    /// # Errors
    /// `TallyError::KindMismatch` if the identity is a gauge.
    pub fn incr_sync_with_suffix(&self, name: &str, suffix: &str) -> Result<()> {
        self.incr_by_sync_with_suffix(name, suffix, 1)
    }

    /// # Errors
    /// `TallyError::KindMismatch` if the identity is a gauge.
    pub fn incr_by_sync_with_suffix(&self, name: &str, suffix: &str, delta: i64) -> Result<()> {
        self.store().add(&MetricKey::with_suffix(name, suffix), delta)
    }

    /* ---------------------------------------------------------------------- */
    /* Reads */
    /* ---------------------------------------------------------------------- */

    /// Current total of the counter `identity`; `0` if it was never observed.
    pub fn read_sync(&self, identity: &str) -> i64 {
        self.try_read_sync(identity).unwrap_or_else(|err| {
            debug!(identity, error = %err, "Read of unknown counter");
            0
        })
    }

    /// # Errors
    /// `TallyError::NotFound` if `identity` is not a known counter.
    pub fn try_read_sync(&self, identity: &str) -> Result<i64> {
        self.store().counter_value(identity).ok_or_else(|| TallyError::unknown_identity(identity))
    }

    /// Last value of the gauge `identity`, if any.
    pub fn read_value_sync(&self, identity: &str) -> Option<f64> {
        self.store().gauge_value(identity)
    }

    /* ---------------------------------------------------------------------- */
    /* Gauges */
    /* ---------------------------------------------------------------------- */

    pub fn set_value(&self, name: &str, value: f64) {
        self.set_value_with_suffix(name, "", value);
    }

    pub fn set_value_with_suffix(&self, name: &str, suffix: &str, value: f64) {
        self.inner.shards.submit(Observation::set(MetricKey::with_suffix(name, suffix), value));
    }

    /// # Errors
    /// `TallyError::KindMismatch` if `name` is a counter.
    pub fn set_value_sync(&self, name: &str, value: f64) -> Result<()> {
        self.set_value_sync_with_suffix(name, "", value)
    }

    /// # Errors
    /// `TallyError::KindMismatch` if the identity is a counter.
    pub fn set_value_sync_with_suffix(&self, name: &str, suffix: &str, value: f64) -> Result<()> {
        self.store().set(&MetricKey::with_suffix(name, suffix), value)
    }

    /* ---------------------------------------------------------------------- */
    /* Distributions */
    /* ---------------------------------------------------------------------- */

    /// Buckets `value` with the active policy and queues `+1` on that bucket.
    pub fn mark_distribution(&self, name: &str, value: f64) {
        self.mark_distribution_with_suffix(name, "", value);
    }

    pub fn mark_distribution_with_suffix(&self, name: &str, suffix: &str, value: f64) {
        let label = self.bucket_label(name, value);
        self.incr_by_with_suffix(&label, suffix, 1);
    }

    /// # Errors
    /// `TallyError::KindMismatch` if the bucket identity is a gauge.
    pub fn mark_distribution_sync(&self, name: &str, value: f64) -> Result<()> {
        self.mark_distribution_sync_with_suffix(name, "", value)
    }

    /// # Errors
    /// `TallyError::KindMismatch` if the bucket identity is a gauge.
    pub fn mark_distribution_sync_with_suffix(
        &self,
        name: &str,
        suffix: &str,
        value: f64,
    ) -> Result<()> {
        let label = self.bucket_label(name, value);
        self.incr_by_sync_with_suffix(&label, suffix, 1)
    }

    /// Label `value` would be counted under right now.
    pub fn bucket_label(&self, name: &str, value: f64) -> String {
        derive_bucket_label(name, value, self.inner.shared.policy().as_ref())
    }

    /* ---------------------------------------------------------------------- */
    /* Timing */
    /* ---------------------------------------------------------------------- */

    /// Runs `work` and marks its wall time in seconds as a distribution.
    pub fn record_duration<T>(&self, name: &str, work: impl FnOnce() -> T) -> T {
        self.record_duration_with_suffix(name, "", work)
    }

    pub fn record_duration_with_suffix<T>(
        &self,
        name: &str,
        suffix: &str,
        work: impl FnOnce() -> T,
    ) -> T {
        let started = Instant::now();
        let output = work();
        self.mark_distribution_with_suffix(name, suffix, started.elapsed().as_secs_f64());
        output
    }

    /// Awaits `work` and marks the elapsed seconds as a distribution.
    pub async fn record_duration_async<F>(&self, name: &str, work: F) -> F::Output
    where
        F: Future,
    {
        let started = Instant::now();
        let output = work.await;
        self.mark_distribution(name, started.elapsed().as_secs_f64());
        output
    }

    /* ---------------------------------------------------------------------- */
    /* Meta-counters */
    /* ---------------------------------------------------------------------- */

    /// Registers a derived row `combine(a, b)`; re-registering a name replaces it.
    pub fn register_meta_counter<F>(
        &self,
        name: &str,
        operand_a: impl Into<MetricKey>,
        operand_b: impl Into<MetricKey>,
        combine: F,
    ) where
        F: Fn(i64, i64) -> f64 + Send + Sync + 'static,
    {
        let meta = MetaCounter::new(name, operand_a.into(), operand_b.into(), combine);
        self.store().register_meta(meta);
    }

    /* ---------------------------------------------------------------------- */
    /* Report settings */
    /* ---------------------------------------------------------------------- */

    /// Changes the report cadence; applies from the next wait.
    ///
    /// # Errors
    /// `TallyError::InvalidInput` for a zero interval.
    pub fn set_report_interval(&self, interval: Duration) -> Result<()> {
        if interval.is_zero() {
            return Err(TallyError::InvalidInput("report interval must be non-zero".into()));
        }
        self.inner.shared.settings.write().interval = interval;
        Ok(())
    }

    pub fn report_interval(&self) -> Duration {
        self.inner.shared.settings.read().interval
    }

    /// Replaces the row template used for report lines.
    pub fn set_report_format(&self, template: impl Into<String>) {
        self.inner.shared.settings.write().template = ReportTemplate::new(template);
    }

    pub fn set_report_callback<F>(&self, callback: F)
    where
        F: Fn(&[CounterRow]) + Send + Sync + 'static,
    {
        self.inner.shared.settings.write().counter_callback = Some(Arc::new(callback));
    }

    pub fn set_gauge_report_callback<F>(&self, callback: F)
    where
        F: Fn(&[GaugeRow]) + Send + Sync + 'static,
    {
        self.inner.shared.settings.write().gauge_callback = Some(Arc::new(callback));
    }

    pub fn set_resolution(&self, resolution: Resolution) {
        self.set_bucket_policy(Arc::new(resolution));
    }

    /// Installs a custom bucket strategy for subsequent distribution marks.
    pub fn set_bucket_policy(&self, policy: Arc<dyn BucketPolicy>) {
        self.inner.shared.settings.write().policy = policy;
    }

    /// Installs the producer invoked at the start of every report cycle.
    pub fn set_runtime_producer(&self, producer: Arc<dyn RuntimeMetricsProducer>) {
        self.inner.shared.settings.write().producer = Some(producer);
    }

    /// Runs a report cycle immediately, independent of the timer.
    ///
    /// Blocks while a timer cycle is in progress. From async code, call it
    /// through `tokio::task::spawn_blocking`.
    pub fn log_report_now(&self) -> ReportSnapshot {
        self.inner.shared.report()
    }
}
