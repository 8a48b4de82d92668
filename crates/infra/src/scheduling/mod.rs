//! Scheduling infrastructure for the periodic report
//!
//! The report loop follows the engine's runtime rules:
//! - Join handles for spawned tasks are returned to the owner
//! - Cancellation token support
//! - Structured tracing for every cycle

pub mod report_scheduler;

pub use report_scheduler::{spawn_report_loop, ReportJob};
