//! Domain types
//!
//! - [`key`]: metric identities
//! - [`metric`]: metric kinds and resolution tags
//! - [`observation`]: ingestion messages
//! - [`report`]: per-cycle report rows and snapshots

pub mod key;
pub mod metric;
pub mod observation;
pub mod report;

pub use key::MetricKey;
pub use metric::{MetricKind, Resolution};
pub use observation::Observation;
pub use report::{CounterRow, GaugeRow, MetaRow, ReportSnapshot};
