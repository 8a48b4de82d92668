//! Sharded ingestion
//!
//! A fixed set of bounded queues, each drained by one consumer task that
//! applies observations to the shared [`MetricStore`]. Producers pick a shard
//! at random per call, never by identity, so a single hot metric still
//! spreads over every shard.
//!
//! Enqueueing never blocks: a full (or closed) queue drops the observation.
//!
//! On cancellation a consumer closes its queue, applies every message that
//! was already queued and exits. Observations submitted afterwards are
//! dropped.

use std::sync::Arc;

use parking_lot::Mutex;
use rand::Rng;
use tally_core::MetricStore;
use tally_domain::Observation;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Queue senders plus the receivers waiting for their consumer tasks
#[derive(Debug)]
pub struct ShardSet {
    senders: Vec<mpsc::Sender<Observation>>,
    receivers: Mutex<Option<Vec<mpsc::Receiver<Observation>>>>,
}

impl ShardSet {
    /// `shards` and `capacity` must be non-zero (see `TallyConfig::validate`).
    pub fn new(shards: usize, capacity: usize) -> Self {
        let (senders, receivers) =
            (0..shards.max(1)).map(|_| mpsc::channel(capacity.max(1))).unzip();
        Self { senders, receivers: Mutex::new(Some(receivers)) }
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    /// Queues `observation` on a random shard.
    ///
    /// Returns `false` when the observation was dropped (queue full or
    /// ingestion shut down). Callers on the fire-and-forget path ignore it.
    pub fn submit(&self, observation: Observation) -> bool {
        let shard = rand::thread_rng().gen_range(0..self.senders.len());
        match self.senders[shard].try_send(observation) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                trace!(shard, identity = %dropped.key(), "Shard queue full, dropping observation");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Spawns one consumer task per shard on `runtime`.
    ///
    /// Returns `None` if the receivers were already handed out.
    pub fn spawn_consumers(
        &self,
        runtime: &Handle,
        store: &Arc<MetricStore>,
        cancel: &CancellationToken,
    ) -> Option<Vec<JoinHandle<()>>> {
        let receivers = self.receivers.lock().take()?;
        let handles = receivers
            .into_iter()
            .enumerate()
            .map(|(shard, rx)| {
                let store = Arc::clone(store);
                let cancel = cancel.clone();
                runtime.spawn(consume(shard, rx, store, cancel))
            })
            .collect();
        Some(handles)
    }

    /// Closes queues that never got a consumer and applies what they hold.
    ///
    /// Used when the engine shuts down without ever starting.
    pub fn drain_unstarted(&self, store: &MetricStore) -> usize {
        let Some(receivers) = self.receivers.lock().take() else {
            return 0;
        };
        receivers.into_iter().map(|mut rx| drain(&mut rx, store)).sum()
    }
}

async fn consume(
    shard: usize,
    mut rx: mpsc::Receiver<Observation>,
    store: Arc<MetricStore>,
    cancel: CancellationToken,
) {
    debug!(shard, "Shard consumer started");
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            message = rx.recv() => match message {
                Some(observation) => apply(&store, &observation),
                None => break,
            },
        }
    }

    let drained = drain(&mut rx, &store);
    debug!(shard, drained, "Shard consumer stopped");
}

fn drain(rx: &mut mpsc::Receiver<Observation>, store: &MetricStore) -> usize {
    rx.close();
    let mut drained = 0;
    while let Ok(observation) = rx.try_recv() {
        apply(store, &observation);
        drained += 1;
    }
    drained
}

fn apply(store: &MetricStore, observation: &Observation) {
    if let Err(err) = store.apply(observation) {
        warn!(error = %err, "Dropped queued observation");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tally_domain::MetricKey;

    use super::*;

    #[test]
    fn full_queue_drops_without_blocking() {
        let shards = ShardSet::new(1, 2);
        assert!(shards.submit(Observation::add("a", 1)));
        assert!(shards.submit(Observation::add("a", 1)));
        assert!(!shards.submit(Observation::add("a", 1)));

        let store = MetricStore::new();
        assert_eq!(shards.drain_unstarted(&store), 2);
        assert_eq!(store.counter_value("a"), Some(2));

        // queues are closed once drained
        assert!(!shards.submit(Observation::add("a", 1)));
        assert_eq!(shards.drain_unstarted(&store), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn consumers_apply_and_drain_on_cancel() {
        let shards = ShardSet::new(4, 1_024);
        let store = Arc::new(MetricStore::new());
        let cancel = CancellationToken::new();
        let handles = shards
            .spawn_consumers(&Handle::current(), &store, &cancel)
            .expect("receivers available");
        assert_eq!(handles.len(), 4);
        assert!(shards.spawn_consumers(&Handle::current(), &store, &cancel).is_none());

        let key = MetricKey::with_suffix("jobs", "ingest");
        for _ in 0..1_000 {
            assert!(shards.submit(Observation::add(key.clone(), 1)));
        }
        assert!(shards.submit(Observation::set("depth", 3.0)));

        cancel.cancel();
        for handle in handles {
            tokio::time::timeout(Duration::from_secs(5), handle)
                .await
                .expect("consumer exits")
                .expect("consumer does not panic");
        }

        assert_eq!(store.counter_value("jobs/ingest"), Some(1_000));
        assert_eq!(store.gauge_value("depth"), Some(3.0));
        assert!(!shards.submit(Observation::add(key, 1)));
    }
}
