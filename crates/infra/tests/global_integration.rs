//! Integration test for the process-wide engine
//!
//! Kept to a single test: the global handle lives for the whole test binary.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use tally_domain::{Resolution, TallyConfig};
use tally_infra::{global, EngineStatus};

#[tokio::test(flavor = "multi_thread")]
async fn global_engine_lifecycle() {
    assert!(global::handle().is_none());
    global::incr("before_init");
    assert_eq!(global::read_sync("before_init"), 0);
    assert!(global::log_report_now().is_none());
    assert!(global::shutdown().await.is_err());

    let config = TallyConfig { shards: 2, ..Default::default() };
    let first = global::init_with(config).expect("first init");
    let again = global::init_with(TallyConfig { shards: 7, ..Default::default() })
        .expect("later init returns the existing engine");
    assert!(std::ptr::eq(first, again));
    assert_eq!(again.shard_count(), 2);
    assert_eq!(first.status(), EngineStatus::Running);

    global::incr_sync("jobs").expect("counter path");
    global::incr_by_sync("jobs", 2).expect("counter path");
    global::set_value_sync("depth", 4.0).expect("gauge path");
    assert_eq!(global::read_sync("jobs"), 3);

    global::set_resolution(Resolution::Low);
    global::register_meta_counter("jobs_share", "jobs", "other", |a, b| a as f64 / (a + b).max(1) as f64);
    global::incr_sync("other").expect("counter path");

    let seen = Arc::new(AtomicI64::new(0));
    {
        let seen = Arc::clone(&seen);
        global::set_report_callback(move |rows| {
            let total = rows.iter().filter(|r| r.identity == "jobs").map(|r| r.value).sum::<i64>();
            seen.store(total, Ordering::SeqCst);
        });
    }

    let value = global::record_duration("work", || 7);
    assert_eq!(value, 7);
    global::incr("queued");
    global::mark_distribution("size", 2113.0);

    global::shutdown().await.expect("shutdown drains");
    assert_eq!(global::read_sync("queued"), 1);
    assert_eq!(global::read_sync("sizeg[002k-5k]"), 1);

    let snapshot = global::log_report_now().expect("initialized");
    assert_eq!(seen.load(Ordering::SeqCst), 3);
    assert_eq!(snapshot.gauge("depth").map(|r| r.value), Some(4.0));
    assert!((snapshot.meta("jobs_share").expect("meta row").total - 0.75).abs() < 1e-12);

    // a shut-down global engine is not rebuilt
    assert!(global::init().is_ok());
    assert_eq!(global::handle().map(|t| t.status()), Some(EngineStatus::ShutDown));
}
