//! Call-site qualified recording
//!
//! Convenience wrapper that suffixes a metric with the caller's source
//! location (`<file stem>:<line>`), resolved at compile time through
//! `#[track_caller]`.

use std::panic::Location;
use std::path::Path;

use crate::engine::Tally;

/// Suffix for `location`: file stem and line, e.g. `handler:42`.
pub fn callsite_suffix(location: &Location<'_>) -> String {
    let file = location.file();
    let stem = Path::new(file).file_stem().and_then(|s| s.to_str()).unwrap_or(file);
    format!("{stem}:{}", location.line())
}

/// Recording helpers keyed by the caller's location
pub trait CallsiteExt {
    #[track_caller]
    fn incr_here(&self, name: &str);

    #[track_caller]
    fn incr_by_here(&self, name: &str, delta: i64);

    #[track_caller]
    fn set_value_here(&self, name: &str, value: f64);
}

impl CallsiteExt for Tally {
    #[track_caller]
    fn incr_here(&self, name: &str) {
        self.incr_with_suffix(name, &callsite_suffix(Location::caller()));
    }

    #[track_caller]
    fn incr_by_here(&self, name: &str, delta: i64) {
        self.incr_by_with_suffix(name, &callsite_suffix(Location::caller()), delta);
    }

    #[track_caller]
    fn set_value_here(&self, name: &str, value: f64) {
        self.set_value_with_suffix(name, &callsite_suffix(Location::caller()), value);
    }
}
