//! Engine constants
//!
//! Centralized location for the defaults and fixed tables shared by every
//! tally crate.

// Ingestion defaults
pub const DEFAULT_SHARDS: usize = 10;
pub const DEFAULT_QUEUE_CAPACITY: usize = 100_000;

// Reporter defaults
pub const DEFAULT_REPORT_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 5_000;

/// Separator between a metric name and its suffix in an identity.
pub const SUFFIX_SEPARATOR: char = '/';

// Report layout
pub const IDENTITY_COLUMN_PADDING: usize = 12;
pub const VALUE_COLUMN_WIDTH: usize = 20;
pub const DEFAULT_REPORT_TEMPLATE: &str = "{name}  {value} {delta}";
pub const REPORT_LOG_TARGET: &str = "tally::report";

// Distribution labels
pub const ZERO_BUCKET: &str = " [zero]";
pub const OUT_OF_RANGE_BUCKET: &str = "out-of-range";
/// Sorts below the femto prefix `a`.
pub const UNDERFLOW_SORT_PREFIX: &str = "0";
/// Sorts above the peta-roll-up prefix `j`.
pub const OVERFLOW_SORT_PREFIX: &str = "z";

/// Suffix attached to figures published by the process runtime producer.
pub const RUNTIME_SUFFIX: &str = "process-runtime";
/// Prefix that sorts runtime figures ahead of application metrics.
pub const RUNTIME_PREFIX: &str = "0_";
