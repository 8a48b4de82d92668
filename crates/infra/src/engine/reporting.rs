//! Report cycle
//!
//! One cycle: run the runtime producer, snapshot and rebase the store, log
//! the rendered lines, then hand rows to the callbacks. Cycles are serialized
//! so the lines of two reports never interleave; callbacks run after that
//! window closes and may call back into the engine.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tally_core::{render_report, BucketPolicy, MetricStore, ReportTemplate, RuntimeMetricsProducer};
use tally_domain::constants::REPORT_LOG_TARGET;
use tally_domain::{CounterRow, GaugeRow, ReportSnapshot};
use tracing::{debug, info};

use crate::scheduling::ReportJob;

/// Receives the sorted counter rows of every report.
pub type CounterCallback = Arc<dyn Fn(&[CounterRow]) + Send + Sync>;
/// Receives the sorted gauge rows of every report.
pub type GaugeCallback = Arc<dyn Fn(&[GaugeRow]) + Send + Sync>;

/// Runtime-adjustable engine settings
pub(crate) struct Settings {
    pub(crate) interval: Duration,
    pub(crate) template: ReportTemplate,
    pub(crate) policy: Arc<dyn BucketPolicy>,
    pub(crate) counter_callback: Option<CounterCallback>,
    pub(crate) gauge_callback: Option<GaugeCallback>,
    pub(crate) producer: Option<Arc<dyn RuntimeMetricsProducer>>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("interval", &self.interval)
            .field("template", &self.template)
            .field("policy", &self.policy)
            .field("counter_callback", &self.counter_callback.is_some())
            .field("gauge_callback", &self.gauge_callback.is_some())
            .field("producer", &self.producer.is_some())
            .finish()
    }
}

/// State shared between the engine handle and the reporter task
#[derive(Debug)]
pub(crate) struct EngineShared {
    pub(crate) store: Arc<MetricStore>,
    pub(crate) settings: RwLock<Settings>,
    cycle: Mutex<()>,
}

impl EngineShared {
    pub(crate) fn new(store: Arc<MetricStore>, settings: Settings) -> Self {
        Self { store, settings: RwLock::new(settings), cycle: Mutex::new(()) }
    }

    pub(crate) fn policy(&self) -> Arc<dyn BucketPolicy> {
        Arc::clone(&self.settings.read().policy)
    }

    /// Runs one full report cycle and returns what it captured.
    pub(crate) fn report(&self) -> ReportSnapshot {
        let (producer, template, counter_callback, gauge_callback) = {
            let settings = self.settings.read();
            (
                settings.producer.clone(),
                settings.template.clone(),
                settings.counter_callback.clone(),
                settings.gauge_callback.clone(),
            )
        };

        let snapshot = {
            let _cycle = self.cycle.lock();
            if let Some(producer) = producer {
                producer.produce(self.store.as_ref());
            }
            let snapshot = self.store.snapshot_and_rebase();
            for line in render_report(&snapshot, &template) {
                info!(target: REPORT_LOG_TARGET, "{line}");
            }
            snapshot
        };

        if let Some(callback) = counter_callback {
            callback(&snapshot.counters);
        }
        if let Some(callback) = gauge_callback {
            callback(&snapshot.gauges);
        }

        debug!(
            counters = snapshot.counters.len(),
            gauges = snapshot.gauges.len(),
            meta = snapshot.meta.len(),
            "Report cycle complete"
        );
        snapshot
    }
}

impl ReportJob for EngineShared {
    fn interval(&self) -> Duration {
        self.settings.read().interval
    }

    fn run_cycle(&self) {
        self.report();
    }
}
