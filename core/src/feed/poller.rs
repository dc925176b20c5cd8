//! Fixed-cadence polling task that owns the [`FeedReconciler`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::warn;

use super::FeedReconciler;
use super::FeedSnapshot;
use super::ListingSource;

/// Read side of the poller. Dropping the handle does not stop the task; call
/// [`FeedPollerHandle::shutdown`] or cancel the token passed at spawn time.
#[derive(Debug)]
pub struct FeedPollerHandle {
    snapshots: watch::Receiver<FeedSnapshot>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl FeedPollerHandle {
    /// A fresh receiver; every reader gets its own.
    pub fn subscribe(&self) -> watch::Receiver<FeedSnapshot> {
        self.snapshots.clone()
    }

    pub fn current(&self) -> FeedSnapshot {
        self.snapshots.borrow().clone()
    }

    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(err) = self.task.await {
            warn!("feed poller ended abnormally: {err}");
        }
    }
}

/// Spawns the single writer of the feed state.
///
/// Polls once immediately, then every `interval`. A poll is awaited inside
/// the loop, so a slow endpoint delays the next tick instead of overlapping
/// it. Failures are logged and the cadence continues.
pub fn spawn_feed_poller(
    source: Arc<dyn ListingSource>,
    interval: Duration,
    cancel: CancellationToken,
) -> FeedPollerHandle {
    let (tx, rx) = watch::channel(FeedSnapshot::default());
    let task = tokio::spawn(run_poll_loop(
        FeedReconciler::new(),
        source,
        interval,
        tx,
        cancel.clone(),
    ));
    FeedPollerHandle {
        snapshots: rx,
        cancel,
        task,
    }
}

async fn run_poll_loop(
    mut reconciler: FeedReconciler,
    source: Arc<dyn ListingSource>,
    interval: Duration,
    tx: watch::Sender<FeedSnapshot>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let result = tokio::select! {
            _ = cancel.cancelled() => break,
            result = reconciler.poll(source.as_ref()) => result,
        };

        match result {
            Ok(outcome) if outcome.changed() => {
                tx.send_replace(reconciler.snapshot().clone());
            }
            Ok(_) => {}
            Err(err) if err.is_malformed() => debug!("no update this cycle: {err}"),
            Err(err) => warn!("feed poll failed: {err}"),
        }
    }
    debug!("feed poller stopped");
}
