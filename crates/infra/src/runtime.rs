//! Process runtime metrics
//!
//! [`ProcessMetricsProducer`] samples `/proc/self/status` once per report
//! cycle and records:
//! - gauges `0_process_vm_rss_bytes`, `0_process_vm_hwm_bytes`,
//!   `0_process_vm_size_bytes`, `0_process_threads`
//! - counters `0_process_voluntary_ctxt_switches` and
//!   `0_process_nonvoluntary_ctxt_switches`, advanced by the kernel's
//!   cumulative value minus the previous sample
//!
//! all under the `process-runtime` suffix. Platforms without procfs publish
//! nothing.

use std::collections::HashMap;

use parking_lot::Mutex;
use tally_core::{MetricRecorder, RuntimeMetricsProducer};
use tally_domain::constants::{RUNTIME_PREFIX, RUNTIME_SUFFIX};
use tally_domain::MetricKey;
use tracing::debug;

const STATUS_PATH: &str = "/proc/self/status";

/// `(status field, metric name, multiplier)`
const GAUGE_FIELDS: [(&str, &str, f64); 4] = [
    ("VmRSS", "process_vm_rss_bytes", 1024.0),
    ("VmHWM", "process_vm_hwm_bytes", 1024.0),
    ("VmSize", "process_vm_size_bytes", 1024.0),
    ("Threads", "process_threads", 1.0),
];

/// `(status field, metric name)`
const COUNTER_FIELDS: [(&str, &str); 2] = [
    ("voluntary_ctxt_switches", "process_voluntary_ctxt_switches"),
    ("nonvoluntary_ctxt_switches", "process_nonvoluntary_ctxt_switches"),
];

/// Samples process figures from procfs
#[derive(Debug, Default)]
pub struct ProcessMetricsProducer {
    last_counters: Mutex<HashMap<&'static str, i64>>,
}

impl ProcessMetricsProducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the figures found in `status` (the text of a procfs status file).
    pub fn record_status(&self, status: &str, recorder: &dyn MetricRecorder) {
        let fields = parse_status(status);

        for (field, name, multiplier) in GAUGE_FIELDS {
            if let Some(raw) = fields.get(field) {
                recorder.record_set(runtime_key(name), *raw as f64 * multiplier);
            }
        }

        let mut last = self.last_counters.lock();
        for (field, name) in COUNTER_FIELDS {
            if let Some(&total) = fields.get(field) {
                let previous = last.insert(name, total).unwrap_or(0);
                recorder.record_add(runtime_key(name), total - previous);
            }
        }
    }
}

impl RuntimeMetricsProducer for ProcessMetricsProducer {
    fn produce(&self, recorder: &dyn MetricRecorder) {
        match std::fs::read_to_string(STATUS_PATH) {
            Ok(status) => self.record_status(&status, recorder),
            Err(err) => debug!(path = STATUS_PATH, error = %err, "Process status unavailable"),
        }
    }
}

fn runtime_key(name: &str) -> MetricKey {
    MetricKey::with_suffix(format!("{RUNTIME_PREFIX}{name}"), RUNTIME_SUFFIX)
}

/// Extracts the leading integer of each `Key:\tvalue [unit]` line.
fn parse_status(status: &str) -> HashMap<&str, i64> {
    status
        .lines()
        .filter_map(|line| {
            let (key, rest) = line.split_once(':')?;
            let value = rest.split_whitespace().next()?.parse().ok()?;
            Some((key.trim(), value))
        })
        .collect()
}
