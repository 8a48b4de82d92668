//! # Tally Domain
//!
//! Plain data shared by every tally crate.
//!
//! This crate contains:
//! - Metric identities, kinds and ingestion messages
//! - Report rows and snapshots
//! - Engine configuration structures
//! - The error type and Result alias
//!
//! ## Architecture
//! - No dependencies on other tally crates
//! - No locking, no I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
