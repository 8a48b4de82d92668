//! Configuration loader
//!
//! Loads engine configuration from files and environment variables.
//!
//! ## Loading Strategy
//! 1. Probes the standard locations for a config file
//! 2. Falls back to defaults when none exists
//! 3. Overlays environment variables on top
//! 4. Validates the result
//!
//! ## Environment Variables
//! - `TALLY_SHARDS`: Number of ingestion shards
//! - `TALLY_QUEUE_CAPACITY`: Capacity of each shard queue
//! - `TALLY_REPORT_INTERVAL_SECS`: Report cadence in seconds
//! - `TALLY_RESOLUTION`: Bucket resolution (`low`, `medium`, `high`)
//! - `TALLY_REPORT_TEMPLATE`: Row template for report lines
//! - `TALLY_RUNTIME_METRICS`: Install the process runtime producer (true/false)
//! - `TALLY_LOG_LEVEL`: Default tracing filter directive
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./tally.toml` or `./tally.json` (current working directory)
//! 2. `./config/tally.toml` or `./config/tally.json`
//! 3. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use tally_domain::{Resolution, Result, TallyConfig, TallyError};

const CONFIG_FILE_NAMES: [&str; 4] =
    ["tally.toml", "tally.json", "config/tally.toml", "config/tally.json"];

/// Load configuration with the full fallback strategy
///
/// # Errors
/// Returns `TallyError::Config` if a probed file cannot be parsed, an
/// environment variable holds an invalid value, or the merged configuration
/// fails validation.
pub fn load() -> Result<TallyConfig> {
    let base = match probe_config_paths() {
        Some(path) => load_from_file(Some(path))?,
        None => {
            tracing::debug!("No config file found, using defaults");
            TallyConfig::default()
        }
    };

    let config = apply_env_overrides(base)?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from defaults plus environment variables only
///
/// # Errors
/// Returns `TallyError::Config` for unparsable variables or an invalid result.
pub fn load_from_env() -> Result<TallyConfig> {
    let config = apply_env_overrides(TallyConfig::default())?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `TallyError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid or unsupported
pub fn load_from_file(path: Option<PathBuf>) -> Result<TallyConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(TallyError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            TallyError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| TallyError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content, by file extension
fn parse_config(contents: &str, path: &Path) -> Result<TallyConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| TallyError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| TallyError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(TallyError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the standard locations for a configuration file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(CONFIG_FILE_NAMES.iter().map(|name| cwd.join(name)));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(CONFIG_FILE_NAMES.iter().map(|name| exe_dir.join(name)));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

/// Overlay `TALLY_*` environment variables onto `config`
fn apply_env_overrides(mut config: TallyConfig) -> Result<TallyConfig> {
    if let Some(shards) = env_parse::<usize>("TALLY_SHARDS")? {
        config.shards = shards;
    }
    if let Some(capacity) = env_parse::<usize>("TALLY_QUEUE_CAPACITY")? {
        config.queue_capacity = capacity;
    }
    if let Some(interval) = env_parse::<u64>("TALLY_REPORT_INTERVAL_SECS")? {
        config.report_interval_secs = interval;
    }
    if let Some(resolution) = env_parse::<Resolution>("TALLY_RESOLUTION")? {
        config.resolution = resolution;
    }
    if let Some(template) = env_var("TALLY_REPORT_TEMPLATE") {
        config.report_template = Some(template);
    }
    config.runtime_metrics = env_bool("TALLY_RUNTIME_METRICS", config.runtime_metrics);
    if let Some(level) = env_var("TALLY_LOG_LEVEL") {
        config.logging.level = level;
    }
    Ok(config)
}

/// Get an optional environment variable
fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Parse an optional environment variable
///
/// # Errors
/// Returns `TallyError::Config` if the variable is set but does not parse.
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_var(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| TallyError::Config(format!("Invalid value for {key}: {e}")))
        })
        .transpose()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
