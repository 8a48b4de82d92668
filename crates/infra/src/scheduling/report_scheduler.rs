//! Periodic report scheduler.
//!
//! Runs a [`ReportJob`] on a fixed cadence until cancelled. The wait before
//! each cycle is the configured interval minus the time the previous cycle
//! took, so report timestamps do not drift under load. The interval is
//! re-read every cycle, so changing it takes effect after the current wait.
//! Cycles run on the blocking pool, so a slow cycle never stalls a runtime
//! worker.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use tally_infra::scheduling::{spawn_report_loop, ReportJob};
//! use tokio_util::sync::CancellationToken;
//!
//! struct Heartbeat;
//!
//! impl ReportJob for Heartbeat {
//!     fn interval(&self) -> Duration {
//!         Duration::from_secs(10)
//!     }
//!
//!     fn run_cycle(&self) {
//!         tracing::info!("still alive");
//!     }
//! }
//!
//! # async fn example() {
//! let cancel = CancellationToken::new();
//! let handle = spawn_report_loop(&tokio::runtime::Handle::current(), Arc::new(Heartbeat), cancel.clone());
//! // ... application runs ...
//! cancel.cancel();
//! let _ = handle.await;
//! # }
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// Work performed once per report cycle.
pub trait ReportJob: Send + Sync + 'static {
    /// Target time between the starts of two cycles.
    fn interval(&self) -> Duration;

    /// Execute one cycle. Runs on a blocking thread and may block.
    fn run_cycle(&self);
}

/// Spawns the report loop on `runtime`; it exits when `cancel` fires.
pub fn spawn_report_loop(
    runtime: &Handle,
    job: Arc<dyn ReportJob>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    runtime.spawn(report_loop(job, cancel))
}

#[instrument(skip_all)]
async fn report_loop(job: Arc<dyn ReportJob>, cancel: CancellationToken) {
    let mut last_cycle = Duration::ZERO;
    loop {
        let interval = job.interval();
        let wait = interval.saturating_sub(last_cycle);
        if wait.is_zero() {
            warn!(
                interval_ms = interval.as_millis() as u64,
                cycle_ms = last_cycle.as_millis() as u64,
                "Report cycle overran its interval"
            );
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("Report loop cancelled");
                break;
            }
            () = tokio::time::sleep(wait) => {}
        }

        let started = Instant::now();
        let cycle = Arc::clone(&job);
        if let Err(err) = tokio::task::spawn_blocking(move || cycle.run_cycle()).await {
            warn!(error = %err, "Report cycle failed");
        }
        last_cycle = started.elapsed();
        debug!(cycle_ms = last_cycle.as_millis() as u64, "Report cycle finished");
    }
}
