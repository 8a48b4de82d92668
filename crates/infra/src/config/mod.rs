//! Configuration loading
//!
//! Loads [`tally_domain::TallyConfig`] from files and environment variables.

pub mod loader;

// Re-export commonly used items
pub use loader::{load, load_from_env, load_from_file, probe_config_paths};
