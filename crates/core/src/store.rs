//! Metric store
//!
//! Holds every counter and gauge together with its baseline from the previous
//! report, plus the registered meta-counters.
//!
//! Locking:
//! - counter increments on an existing identity take the read lock and apply
//!   an atomic add, so consumers on different shards do not serialize;
//! - first-time inserts and gauge writes take the write lock;
//! - [`MetricStore::snapshot_and_rebase`] takes the write lock for the whole
//!   read-compute-rebase window, so no increment can fall between the value a
//!   report prints and the baseline it stores.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;

use chrono::Local;
use parking_lot::RwLock;
use tally_domain::{
    CounterRow, GaugeRow, MetricKey, MetricKind, Observation, ReportSnapshot, Result, TallyError,
};
use tracing::{debug, warn};

use crate::meta::MetaCounter;
use crate::metric_ports::MetricRecorder;

/* -------------------------------------------------------------------------- */
/* Slots */
/* -------------------------------------------------------------------------- */

#[derive(Debug)]
pub(crate) struct CounterCell {
    current: AtomicI64,
    previous: i64,
}

impl CounterCell {
    fn new() -> Self {
        Self { current: AtomicI64::new(0), previous: 0 }
    }

    /// `(current, previous)`
    pub(crate) fn totals(&self) -> (i64, i64) {
        (self.current.load(Ordering::Relaxed), self.previous)
    }
}

#[derive(Debug)]
pub(crate) struct GaugeCell {
    current: f64,
    previous: f64,
}

#[derive(Debug)]
pub(crate) enum Slot {
    Counter(CounterCell),
    Gauge(GaugeCell),
}

impl Slot {
    fn kind(&self) -> MetricKind {
        match self {
            Self::Counter(_) => MetricKind::Counter,
            Self::Gauge(_) => MetricKind::Gauge,
        }
    }
}

#[derive(Debug, Default)]
struct StoreState {
    metrics: HashMap<MetricKey, Slot>,
    meta: BTreeMap<String, MetaCounter>,
    longest_identity: usize,
}

impl StoreState {
    fn note_identity(&mut self, identity: &str) {
        self.longest_identity = self.longest_identity.max(identity.len());
    }
}

fn mismatch(key: &MetricKey, expected: MetricKind, found: MetricKind) -> TallyError {
    TallyError::KindMismatch { identity: key.identity().to_owned(), expected, found }
}

/* -------------------------------------------------------------------------- */
/* Store */
/* -------------------------------------------------------------------------- */

/// Shared aggregation state
#[derive(Debug)]
pub struct MetricStore {
    state: RwLock<StoreState>,
    started_at: Instant,
}

impl Default for MetricStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricStore {
    /// Empty store with no meta-counters.
    pub fn new() -> Self {
        Self { state: RwLock::new(StoreState::default()), started_at: Instant::now() }
    }

    /// Adds `delta` to the counter at `key`, creating it at zero if needed.
    ///
    /// # Errors
    /// `TallyError::KindMismatch` if the identity is already a gauge.
    pub fn add(&self, key: &MetricKey, delta: i64) -> Result<()> {
        {
            let state = self.state.read();
            match state.metrics.get(key.identity()) {
                Some(Slot::Counter(cell)) => {
                    // ordered against snapshots by the store lock
                    cell.current.fetch_add(delta, Ordering::Relaxed);
                    return Ok(());
                }
                Some(slot) => return Err(mismatch(key, MetricKind::Counter, slot.kind())),
                None => {}
            }
        }

        let mut state = self.state.write();
        if !state.metrics.contains_key(key.identity()) {
            state.note_identity(key.identity());
            state.metrics.insert(key.clone(), Slot::Counter(CounterCell::new()));
        }
        // another writer may have inserted between the two locks
        match state.metrics.get_mut(key.identity()) {
            Some(Slot::Counter(cell)) => {
                *cell.current.get_mut() = cell.current.get_mut().wrapping_add(delta);
                Ok(())
            }
            Some(slot) => Err(mismatch(key, MetricKind::Counter, slot.kind())),
            None => Err(TallyError::Internal(format!("counter '{key}' vanished on insert"))),
        }
    }

    /// Replaces the gauge at `key`, creating it if needed.
    ///
    /// # Errors
    /// `TallyError::KindMismatch` if the identity is already a counter.
    pub fn set(&self, key: &MetricKey, value: f64) -> Result<()> {
        let mut state = self.state.write();
        match state.metrics.get_mut(key.identity()) {
            Some(Slot::Gauge(cell)) => {
                cell.current = value;
                Ok(())
            }
            Some(slot) => Err(mismatch(key, MetricKind::Gauge, slot.kind())),
            None => {
                state.note_identity(key.identity());
                state
                    .metrics
                    .insert(key.clone(), Slot::Gauge(GaugeCell { current: value, previous: 0.0 }));
                Ok(())
            }
        }
    }

    /// Applies one queued observation.
    ///
    /// # Errors
    /// See [`MetricStore::add`] and [`MetricStore::set`].
    pub fn apply(&self, observation: &Observation) -> Result<()> {
        match observation {
            Observation::Add { key, delta } => self.add(key, *delta),
            Observation::Set { key, value } => self.set(key, *value),
        }
    }

    /// Current total of a counter, or `None` if unknown or not a counter.
    pub fn counter_value(&self, identity: &str) -> Option<i64> {
        match self.state.read().metrics.get(identity)? {
            Slot::Counter(cell) => Some(cell.totals().0),
            Slot::Gauge(_) => None,
        }
    }

    /// Last value written to a gauge, or `None` if unknown or not a gauge.
    pub fn gauge_value(&self, identity: &str) -> Option<f64> {
        match self.state.read().metrics.get(identity)? {
            Slot::Gauge(cell) => Some(cell.current),
            Slot::Counter(_) => None,
        }
    }

    /// Kind fixed by the first write to `identity`, if any.
    pub fn kind_of(&self, identity: &str) -> Option<MetricKind> {
        self.state.read().metrics.get(identity).map(Slot::kind)
    }

    /// Number of distinct identities (counters and gauges).
    pub fn len(&self) -> usize {
        self.state.read().metrics.len()
    }

    /// True before the first identity is recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registers (or replaces, by name) a meta-counter.
    pub fn register_meta(&self, meta: MetaCounter) {
        let mut state = self.state.write();
        state.note_identity(meta.name());
        if let Some(previous) = state.meta.insert(meta.name().to_owned(), meta) {
            debug!(meta = previous.name(), "Replaced meta-counter");
        }
    }

    /// Names of the registered meta-counters.
    pub fn meta_names(&self) -> Vec<String> {
        self.state.read().meta.keys().cloned().collect()
    }

    /// Captures every row for a report and advances all baselines.
    ///
    /// Meta rows are computed first, against the baselines of the previous
    /// report. Gauge and counter rows are sorted by identity.
    pub fn snapshot_and_rebase(&self) -> ReportSnapshot {
        let mut guard = self.state.write();
        let StoreState { metrics, meta, longest_identity } = &mut *guard;

        let meta_rows = meta.values().filter_map(|counter| counter.evaluate(metrics)).collect();

        let mut gauges = Vec::new();
        let mut counters = Vec::new();
        for (key, slot) in metrics.iter_mut() {
            match slot {
                Slot::Counter(cell) => {
                    let value = *cell.current.get_mut();
                    counters.push(CounterRow {
                        identity: key.identity().to_owned(),
                        value,
                        delta: value.wrapping_sub(cell.previous),
                    });
                    cell.previous = value;
                }
                Slot::Gauge(cell) => {
                    gauges.push(GaugeRow {
                        identity: key.identity().to_owned(),
                        value: cell.current,
                        delta: cell.current - cell.previous,
                    });
                    cell.previous = cell.current;
                }
            }
        }
        gauges.sort_unstable_by(|a, b| a.identity.cmp(&b.identity));
        counters.sort_unstable_by(|a, b| a.identity.cmp(&b.identity));

        ReportSnapshot {
            generated_at: Local::now(),
            uptime: self.started_at.elapsed(),
            meta: meta_rows,
            gauges,
            counters,
            longest_identity: *longest_identity,
        }
    }
}

impl MetricRecorder for MetricStore {
    fn record_add(&self, key: MetricKey, delta: i64) {
        if let Err(err) = self.add(&key, delta) {
            warn!(error = %err, "Dropped counter increment");
        }
    }

    fn record_set(&self, key: MetricKey, value: f64) {
        if let Err(err) = self.set(&key, value) {
            warn!(error = %err, "Dropped gauge value");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn counters_accumulate_and_start_at_zero() {
        let store = MetricStore::new();
        let key = MetricKey::new("requests");
        store.add(&key, 3).unwrap();
        store.add(&key, -1).unwrap();
        assert_eq!(store.counter_value("requests"), Some(2));
        assert_eq!(store.kind_of("requests"), Some(MetricKind::Counter));
    }

    #[test]
    fn gauges_keep_last_write() {
        let store = MetricStore::new();
        let key = MetricKey::with_suffix("temp", "rack1");
        store.set(&key, 21.5).unwrap();
        store.set(&key, 19.0).unwrap();
        assert_eq!(store.gauge_value("temp/rack1"), Some(19.0));
        assert_eq!(store.counter_value("temp/rack1"), None);
    }

    #[test]
    fn identity_keeps_its_first_kind() {
        let store = MetricStore::new();
        let key = MetricKey::new("x");
        store.add(&key, 1).unwrap();

        let err = store.set(&key, 2.0).unwrap_err();
        assert_eq!(
            err,
            TallyError::KindMismatch {
                identity: "x".into(),
                expected: MetricKind::Gauge,
                found: MetricKind::Counter,
            }
        );
        assert_eq!(store.counter_value("x"), Some(1));

        let key = MetricKey::new("y");
        store.set(&key, 2.0).unwrap();
        assert!(store.add(&key, 1).is_err());
        assert_eq!(store.gauge_value("y"), Some(2.0));
    }

    #[test]
    fn snapshot_reports_deltas_and_rebases() {
        let store = MetricStore::new();
        let hits = MetricKey::new("hits");
        let load = MetricKey::new("load");

        store.add(&hits, 5).unwrap();
        store.set(&load, 2.0).unwrap();
        let first = store.snapshot_and_rebase();
        assert_eq!(first.counter("hits").map(|r| (r.value, r.delta)), Some((5, 5)));
        assert_eq!(first.gauge("load").map(|r| (r.value, r.delta)), Some((2.0, 2.0)));

        store.add(&hits, 2).unwrap();
        store.set(&load, 1.5).unwrap();
        let second = store.snapshot_and_rebase();
        assert_eq!(second.counter("hits").map(|r| (r.value, r.delta)), Some((7, 2)));
        assert_eq!(second.gauge("load").map(|r| (r.value, r.delta)), Some((1.5, -0.5)));

        let third = store.snapshot_and_rebase();
        assert_eq!(third.counter("hits").map(|r| r.delta), Some(0));
    }

    #[test]
    fn snapshot_rows_are_sorted() {
        let store = MetricStore::new();
        for name in ["zeta", "alpha", "mid"] {
            store.add(&MetricKey::new(name), 1).unwrap();
            store.set(&MetricKey::with_suffix(name, "g"), 1.0).unwrap();
        }
        let snapshot = store.snapshot_and_rebase();
        let counters: Vec<_> = snapshot.counters.iter().map(|r| r.identity.as_str()).collect();
        assert_eq!(counters, ["alpha", "mid", "zeta"]);
        let gauges: Vec<_> = snapshot.gauges.iter().map(|r| r.identity.as_str()).collect();
        assert_eq!(gauges, ["alpha/g", "mid/g", "zeta/g"]);
        assert_eq!(snapshot.longest_identity, "alpha/g".len());
    }

    #[test]
    fn meta_rows_use_previous_baselines() {
        let store = MetricStore::new();
        let hit = MetricKey::new("cache_hit");
        let miss = MetricKey::new("cache_miss");
        store.register_meta(MetaCounter::ratio("hit_rate", hit.clone(), miss.clone()));

        store.add(&hit, 97).unwrap();
        store.add(&miss, 3).unwrap();
        let first = store.snapshot_and_rebase();
        let row = first.meta("hit_rate").unwrap();
        assert!((row.total - 0.97).abs() < 1e-12);
        assert!((row.delta - 0.97).abs() < 1e-12);

        let second = store.snapshot_and_rebase();
        let row = second.meta("hit_rate").unwrap();
        assert!((row.total - 0.97).abs() < 1e-12);
        assert!(row.delta.is_nan());
    }

    #[test]
    fn meta_row_skipped_until_operands_exist() {
        let store = MetricStore::new();
        store.register_meta(MetaCounter::ratio("r", MetricKey::new("a"), MetricKey::new("b")));
        store.add(&MetricKey::new("a"), 1).unwrap();
        assert!(store.snapshot_and_rebase().meta.is_empty());

        store.set(&MetricKey::new("b"), 1.0).unwrap();
        assert!(store.snapshot_and_rebase().meta.is_empty());
        assert_eq!(store.meta_names(), ["r"]);
    }

    #[test]
    fn recorder_logs_and_drops_mismatches() {
        let store = MetricStore::new();
        store.record_add(MetricKey::new("m"), 4);
        store.record_set(MetricKey::new("m"), 1.0);
        store.record_set(MetricKey::new("g"), 8.0);
        assert_eq!(store.counter_value("m"), Some(4));
        assert_eq!(store.gauge_value("g"), Some(8.0));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn concurrent_increments_are_exact() {
        const THREADS: usize = 8;
        const PER_THREAD: i64 = 10_000;

        let store = Arc::new(MetricStore::new());
        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let shared = MetricKey::new("shared");
                    let own = MetricKey::with_suffix("own", t.to_string());
                    for _ in 0..PER_THREAD {
                        store.add(&shared, 1).unwrap();
                        store.add(&own, 1).unwrap();
                    }
                })
            })
            .collect();

        // snapshots taken mid-flight must never lose increments
        let mut reported = 0;
        for _ in 0..50 {
            reported += store.snapshot_and_rebase().counter("shared").map_or(0, |r| r.delta);
        }
        for handle in handles {
            handle.join().unwrap();
        }
        reported += store.snapshot_and_rebase().counter("shared").map_or(0, |r| r.delta);

        assert_eq!(reported, THREADS as i64 * PER_THREAD);
        assert_eq!(store.counter_value("shared"), Some(THREADS as i64 * PER_THREAD));
        assert_eq!(store.counter_value("own/3"), Some(PER_THREAD));
    }
}
