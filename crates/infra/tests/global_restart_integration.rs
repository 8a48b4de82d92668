//! Integration test for starting the process-wide engine after a failed start
//!
//! Lives in its own binary: the global handle outlasts every test in a file.

use std::time::Duration;

use tally_domain::TallyConfig;
use tally_infra::{global, EngineStatus};

#[test]
fn init_starts_engine_left_created_by_failed_start() {
    // no runtime on this thread, so the engine is built but cannot start
    let first = global::init_with(TallyConfig { shards: 1, ..Default::default() });
    assert!(first.is_err());
    assert_eq!(global::handle().map(|t| t.status()), Some(EngineStatus::Created));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("runtime builds");

    runtime.block_on(async {
        let tally = global::init().expect("init starts the existing engine");
        assert_eq!(tally.status(), EngineStatus::Running);

        global::incr("delivered");
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(global::read_sync("delivered"), 1);

        global::shutdown().await.expect("shutdown succeeds");
    });
}
