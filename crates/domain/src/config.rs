//! Engine configuration
//!
//! Every field has a default, so a partial TOML/JSON document (or none at all)
//! produces a usable configuration. Loading from files and environment
//! variables lives in `tally-infra`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_QUEUE_CAPACITY, DEFAULT_REPORT_INTERVAL_SECS, DEFAULT_SHARDS,
    DEFAULT_SHUTDOWN_TIMEOUT_MS,
};
use crate::errors::{Result, TallyError};
use crate::impl_tag_conversions;
use crate::types::Resolution;

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TallyConfig {
    /// Number of ingestion shards (queue + consumer task pairs)
    pub shards: usize,
    /// Capacity of each shard's bounded queue
    pub queue_capacity: usize,
    /// Seconds between periodic reports
    pub report_interval_secs: u64,
    /// Initial bucket resolution for distributions
    pub resolution: Resolution,
    /// Optional row template, see `ReportTemplate`
    pub report_template: Option<String>,
    /// Install the process runtime-metrics producer
    pub runtime_metrics: bool,
    /// Join timeout applied to each background task on shutdown
    pub shutdown_timeout_ms: u64,
    pub logging: LoggingConfig,
}

impl Default for TallyConfig {
    fn default() -> Self {
        Self {
            shards: DEFAULT_SHARDS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            report_interval_secs: DEFAULT_REPORT_INTERVAL_SECS,
            resolution: Resolution::default(),
            report_template: None,
            runtime_metrics: false,
            shutdown_timeout_ms: DEFAULT_SHUTDOWN_TIMEOUT_MS,
            logging: LoggingConfig::default(),
        }
    }
}

impl TallyConfig {
    /// Checks the invariants the engine relies on.
    ///
    /// # Errors
    /// Returns `TallyError::Config` for a zero shard count, queue capacity or
    /// report interval.
    pub fn validate(&self) -> Result<()> {
        if self.shards == 0 {
            return Err(TallyError::Config("shards must be greater than zero".into()));
        }
        if self.queue_capacity == 0 {
            return Err(TallyError::Config("queue_capacity must be greater than zero".into()));
        }
        if self.report_interval_secs == 0 {
            return Err(TallyError::Config(
                "report_interval_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

/// Output format of the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    #[default]
    Compact,
    Json,
}

impl_tag_conversions!(LogFormat {
    Pretty => "pretty",
    Compact => "compact",
    Json => "json",
});

/// Logging subscriber settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset (e.g. `info`, `tally=debug`)
    pub level: String,
    pub format: LogFormat,
    /// Include the event target (report lines use `tally::report`)
    pub target: bool,
    pub thread_names: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::default(),
            target: true,
            thread_names: false,
        }
    }
}
