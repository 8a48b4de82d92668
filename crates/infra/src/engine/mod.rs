//! Engine handle
//!
//! [`Tally`] ties the store, the ingestion shards and the report loop
//! together behind one cloneable handle. Lifecycle:
//!
//! - `Created`: observations may be recorded (queued ones wait for start)
//! - `Running`: shard consumers and the reporter are live
//! - `ShutDown`: queues are drained and closed; the synchronous API and
//!   manual reports keep working, further async observations are dropped
//!
//! # Example
//!
//! ```no_run
//! use tally_infra::Tally;
//!
//! # async fn example() -> tally_domain::Result<()> {
//! let tally = Tally::new(&tally_domain::TallyConfig::default())?;
//! tally.start()?;
//!
//! tally.incr("requests");
//! tally.incr_sync("critical_writes")?;
//! tally.mark_distribution("latency", 0.042);
//!
//! tally.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
mod operations;
mod reporting;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tally_core::{MetricStore, ReportTemplate, RuntimeMetricsProducer};
use tally_domain::{impl_tag_conversions, Result, TallyConfig};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

pub use error::{LifecycleError, LifecycleResult};
pub use reporting::{CounterCallback, GaugeCallback};

use crate::ingest::ShardSet;
use crate::runtime::ProcessMetricsProducer;
use crate::scheduling::spawn_report_loop;
use reporting::{EngineShared, Settings};

/// Engine lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    Created,
    Running,
    ShutDown,
}

impl_tag_conversions!(EngineStatus {
    Created => "created",
    Running => "running",
    ShutDown => "shut_down",
});

#[derive(Debug)]
struct Lifecycle {
    status: EngineStatus,
    cancellation: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

#[derive(Debug)]
struct Inner {
    shared: Arc<EngineShared>,
    shards: ShardSet,
    lifecycle: Mutex<Lifecycle>,
    shutdown_timeout: Duration,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let lifecycle = self.lifecycle.get_mut();
        if lifecycle.status == EngineStatus::Running {
            warn!("Tally engine dropped while running; cancelling tasks");
            lifecycle.cancellation.cancel();
        }
    }
}

/// Cloneable handle to one aggregation engine
#[derive(Debug, Clone)]
pub struct Tally {
    inner: Arc<Inner>,
}

impl Default for Tally {
    fn default() -> Self {
        Self::from_config(&TallyConfig::default())
    }
}

impl Tally {
    /// Builds an engine from `config`; call [`Tally::start`] to spawn its tasks.
    ///
    /// # Errors
    /// Returns `TallyError::Config` if the configuration is invalid.
    pub fn new(config: &TallyConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_config(config))
    }

    fn from_config(config: &TallyConfig) -> Self {
        let producer: Option<Arc<dyn RuntimeMetricsProducer>> = if config.runtime_metrics {
            Some(Arc::new(ProcessMetricsProducer::new()))
        } else {
            None
        };
        let settings = Settings {
            interval: config.report_interval(),
            template: config
                .report_template
                .as_deref()
                .map_or_else(ReportTemplate::default, ReportTemplate::new),
            policy: Arc::new(config.resolution),
            counter_callback: None,
            gauge_callback: None,
            producer,
        };

        let store = Arc::new(MetricStore::new());
        Self {
            inner: Arc::new(Inner {
                shared: Arc::new(EngineShared::new(store, settings)),
                shards: ShardSet::new(config.shards, config.queue_capacity),
                lifecycle: Mutex::new(Lifecycle {
                    status: EngineStatus::Created,
                    cancellation: CancellationToken::new(),
                    handles: Vec::new(),
                }),
                shutdown_timeout: config.shutdown_timeout(),
            }),
        }
    }

    /// Starts the engine on the current Tokio runtime.
    ///
    /// Calling it again while running is a no-op.
    ///
    /// # Errors
    /// `LifecycleError::NoRuntime` outside a runtime,
    /// `LifecycleError::AlreadyShutDown` after shutdown.
    pub fn start(&self) -> LifecycleResult<()> {
        let runtime = Handle::try_current().map_err(|_| LifecycleError::NoRuntime)?;
        self.start_on(&runtime)
    }

    /// Starts the engine, spawning its tasks on `runtime`.
    ///
    /// # Errors
    /// `LifecycleError::AlreadyShutDown` after shutdown.
    #[instrument(skip_all)]
    pub fn start_on(&self, runtime: &Handle) -> LifecycleResult<()> {
        let mut lifecycle = self.inner.lifecycle.lock();
        match lifecycle.status {
            EngineStatus::Running => {
                debug!("Tally engine already running");
                return Ok(());
            }
            EngineStatus::ShutDown => return Err(LifecycleError::AlreadyShutDown),
            EngineStatus::Created => {}
        }

        let cancel = lifecycle.cancellation.clone();
        let mut handles = self
            .inner
            .shards
            .spawn_consumers(runtime, &self.inner.shared.store, &cancel)
            .ok_or_else(|| LifecycleError::TaskJoinFailed("shard receivers already taken".into()))?;
        handles.push(spawn_report_loop(runtime, self.inner.shared.clone(), cancel));

        lifecycle.handles = handles;
        lifecycle.status = EngineStatus::Running;
        info!(
            shards = self.inner.shards.len(),
            interval_secs = self.inner.shared.settings.read().interval.as_secs(),
            "Tally engine started"
        );
        Ok(())
    }

    /// Stops every background task, draining queued observations first.
    ///
    /// Idempotent. An engine that was never started drains its queues inline.
    ///
    /// # Errors
    /// `LifecycleError::Timeout` or `LifecycleError::TaskJoinFailed` if a task
    /// fails to finish; the remaining tasks are still awaited.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> LifecycleResult<()> {
        let handles = {
            let mut lifecycle = self.inner.lifecycle.lock();
            match lifecycle.status {
                EngineStatus::ShutDown => return Ok(()),
                EngineStatus::Created => {
                    lifecycle.status = EngineStatus::ShutDown;
                    let drained = self.inner.shards.drain_unstarted(&self.inner.shared.store);
                    info!(drained, "Tally engine shut down before start");
                    return Ok(());
                }
                EngineStatus::Running => {}
            }
            lifecycle.status = EngineStatus::ShutDown;
            lifecycle.cancellation.cancel();
            std::mem::take(&mut lifecycle.handles)
        };

        let join_timeout = self.inner.shutdown_timeout;
        let mut outcome = Ok(());
        for handle in handles {
            let result = match tokio::time::timeout(join_timeout, handle).await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(err)) => {
                    warn!(error = %err, "Engine task failed");
                    Err(LifecycleError::TaskJoinFailed(err.to_string()))
                }
                Err(_) => {
                    warn!(
                        timeout_ms = join_timeout.as_millis() as u64,
                        "Engine task did not stop in time"
                    );
                    Err(LifecycleError::Timeout { millis: join_timeout.as_millis() as u64 })
                }
            };
            if outcome.is_ok() {
                outcome = result;
            }
        }

        info!("Tally engine shut down");
        outcome
    }

    pub fn status(&self) -> EngineStatus {
        self.inner.lifecycle.lock().status
    }

    pub fn is_running(&self) -> bool {
        self.status() == EngineStatus::Running
    }

    pub fn shard_count(&self) -> usize {
        self.inner.shards.len()
    }

    fn store(&self) -> &MetricStore {
        &self.inner.shared.store
    }
}
