//! # Tally Core
//!
//! Synchronous aggregation logic - no async runtime, no I/O.
//!
//! This crate contains:
//! - The metric store with per-report baselines
//! - Meta-counters derived from pairs of counters
//! - The log-scale distribution bucketer
//! - Report rendering
//! - Port traits for runtime producers and direct recording
//!
//! ## Architecture Principles
//! - Only depends on `tally-domain`
//! - Queues, tasks and the reporter loop live in `tally-infra`
//! - Everything here is callable from plain threads

pub mod distribution;
pub mod meta;
pub mod report;
pub mod store;

// Ports
pub mod metric_ports;

pub use distribution::{derive_bucket_label, BucketPolicy, Scale};
pub use meta::{ratio_total, Combiner, MetaCounter};
pub use metric_ports::{MetricRecorder, RuntimeMetricsProducer};
pub use report::{render_report, ReportTemplate};
pub use store::MetricStore;
