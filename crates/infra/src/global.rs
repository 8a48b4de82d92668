//! Process-wide engine
//!
//! Free functions over one lazily initialized [`Tally`]. Only the first
//! `init*` call builds the engine; later calls return the existing handle.
//! Before initialization the recording functions drop their input and
//! `read_sync` returns 0.

use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use tally_core::BucketPolicy;
use tally_domain::{
    CounterRow, GaugeRow, MetricKey, ReportSnapshot, Resolution, Result, TallyConfig,
};
use tracing::debug;

use crate::config;
use crate::engine::{LifecycleError, Tally};

static GLOBAL: OnceCell<Tally> = OnceCell::new();

/// Initializes the process-wide engine from [`config::load`] and starts it.
///
/// # Errors
/// Configuration errors, or `TallyError::Lifecycle` outside a Tokio runtime.
pub fn init() -> Result<&'static Tally> {
    match GLOBAL.get() {
        Some(tally) => ensure_started(tally),
        None => init_with(config::load()?),
    }
}

/// Initializes the process-wide engine from `config` and starts it.
///
/// # Errors
/// `TallyError::Config` for an invalid configuration, `TallyError::Lifecycle`
/// outside a Tokio runtime.
pub fn init_with(config: TallyConfig) -> Result<&'static Tally> {
    let tally = GLOBAL.get_or_try_init(|| Tally::new(&config))?;
    ensure_started(tally)
}

/// Starts an engine left in `Created` by an earlier failed start; a shut-down
/// engine is returned as is.
fn ensure_started(tally: &'static Tally) -> Result<&'static Tally> {
    match tally.start() {
        Ok(()) | Err(LifecycleError::AlreadyShutDown) => Ok(tally),
        Err(err) => Err(err.into()),
    }
}

/// The process-wide engine, if initialized.
pub fn handle() -> Option<&'static Tally> {
    GLOBAL.get()
}

/// Shuts the process-wide engine down.
///
/// # Errors
/// `TallyError::Lifecycle` if it was never initialized or a task failed to stop.
pub async fn shutdown() -> Result<()> {
    let tally = GLOBAL.get().ok_or(LifecycleError::NotRunning)?;
    tally.shutdown().await?;
    Ok(())
}

fn with_engine(operation: &str, f: impl FnOnce(&Tally)) {
    match GLOBAL.get() {
        Some(tally) => f(tally),
        None => debug!(operation, "Global tally not initialized, dropping"),
    }
}

pub fn incr(name: &str) {
    with_engine("incr", |t| t.incr(name));
}

pub fn incr_by(name: &str, delta: i64) {
    with_engine("incr_by", |t| t.incr_by(name, delta));
}

pub fn decr(name: &str) {
    with_engine("decr", |t| t.decr(name));
}

/// # Errors
/// `TallyError::KindMismatch` if `name` is a gauge.
pub fn incr_sync(name: &str) -> Result<()> {
    incr_by_sync(name, 1)
}

/// # Errors
/// `TallyError::KindMismatch` if `name` is a gauge.
pub fn incr_by_sync(name: &str, delta: i64) -> Result<()> {
    match GLOBAL.get() {
        Some(tally) => tally.incr_by_sync(name, delta),
        None => {
            debug!(operation = "incr_by_sync", "Global tally not initialized, dropping");
            Ok(())
        }
    }
}

pub fn read_sync(identity: &str) -> i64 {
    GLOBAL.get().map_or(0, |t| t.read_sync(identity))
}

pub fn set_value(name: &str, value: f64) {
    with_engine("set_value", |t| t.set_value(name, value));
}

/// # Errors
/// `TallyError::KindMismatch` if `name` is a counter.
pub fn set_value_sync(name: &str, value: f64) -> Result<()> {
    match GLOBAL.get() {
        Some(tally) => tally.set_value_sync(name, value),
        None => {
            debug!(operation = "set_value_sync", "Global tally not initialized, dropping");
            Ok(())
        }
    }
}

/// Times `work`; runs it even when the engine is not initialized.
pub fn record_duration<T>(name: &str, work: impl FnOnce() -> T) -> T {
    match GLOBAL.get() {
        Some(tally) => tally.record_duration(name, work),
        None => work(),
    }
}

pub fn mark_distribution(name: &str, value: f64) {
    with_engine("mark_distribution", |t| t.mark_distribution(name, value));
}

pub fn register_meta_counter<F>(
    name: &str,
    operand_a: impl Into<MetricKey>,
    operand_b: impl Into<MetricKey>,
    combine: F,
) where
    F: Fn(i64, i64) -> f64 + Send + Sync + 'static,
{
    with_engine("register_meta_counter", |t| {
        t.register_meta_counter(name, operand_a, operand_b, combine);
    });
}

/// # Errors
/// `TallyError::InvalidInput` for a zero interval.
pub fn set_report_interval(interval: Duration) -> Result<()> {
    GLOBAL.get().map_or(Ok(()), |t| t.set_report_interval(interval))
}

pub fn set_report_format(template: &str) {
    with_engine("set_report_format", |t| t.set_report_format(template));
}

pub fn set_report_callback<F>(callback: F)
where
    F: Fn(&[CounterRow]) + Send + Sync + 'static,
{
    with_engine("set_report_callback", |t| t.set_report_callback(callback));
}

pub fn set_gauge_report_callback<F>(callback: F)
where
    F: Fn(&[GaugeRow]) + Send + Sync + 'static,
{
    with_engine("set_gauge_report_callback", |t| t.set_gauge_report_callback(callback));
}

pub fn set_resolution(resolution: Resolution) {
    with_engine("set_resolution", |t| t.set_resolution(resolution));
}

pub fn set_bucket_policy(policy: Arc<dyn BucketPolicy>) {
    with_engine("set_bucket_policy", |t| t.set_bucket_policy(policy));
}

/// Runs a report cycle now; `None` before initialization.
pub fn log_report_now() -> Option<ReportSnapshot> {
    GLOBAL.get().map(Tally::log_report_now)
}
