//! # Tally Infrastructure
//!
//! Runtime wiring for the aggregation engine.
//!
//! This crate contains:
//! - Sharded ingestion queues and their consumer tasks
//! - The periodic report scheduler
//! - The [`Tally`] engine handle and its lifecycle
//! - A process-wide handle with free functions
//! - The procfs runtime-metrics producer
//! - Configuration loading and tracing subscriber setup
//!
//! ## Architecture
//! - Builds on the synchronous logic in `tally-core`
//! - Contains all async and I/O code (Tokio tasks, files, environment)

pub mod callsite;
pub mod config;
pub mod engine;
pub mod global;
pub mod ingest;
pub mod logging;
pub mod runtime;
pub mod scheduling;

// Re-export commonly used items
pub use callsite::CallsiteExt;
pub use engine::{EngineStatus, LifecycleError, Tally};
pub use runtime::ProcessMetricsProducer;
