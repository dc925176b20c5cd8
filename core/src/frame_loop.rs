//! Cancellable per-frame loops.
//!
//! A frame loop is the kiosk's stand-in for a display's "call me next frame"
//! primitive: it emits [`FrameTick`]s at a fixed cadence until it is
//! cancelled or, for bounded loops, until its time limit has passed. Each
//! restart bumps a generation number so ticks that were already queued for a
//! superseded loop can be recognised and dropped by the receiver.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::trace;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameLoopKind {
    /// Bounded loop that drives captions and the scroll.
    Presentation,
    /// Unbounded loop that redraws the age-based reveal.
    Reveal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameTick {
    pub kind: FrameLoopKind,
    pub generation: u64,
    /// Set on the last tick of a bounded loop.
    pub last: bool,
}

/// Owner of at most one running loop of a given kind.
#[derive(Debug)]
pub struct FrameLoopSlot {
    kind: FrameLoopKind,
    generation: u64,
    running: Option<CancellationToken>,
    parent: CancellationToken,
}

impl FrameLoopSlot {
    /// Loops started from this slot are children of `parent`, so cancelling
    /// the parent tears all of them down.
    pub fn new(kind: FrameLoopKind, parent: CancellationToken) -> Self {
        Self {
            kind,
            generation: 0,
            running: None,
            parent,
        }
    }

    pub fn kind(&self) -> FrameLoopKind {
        self.kind
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }

    /// Cancels the current loop (if any) and starts a new one. Returns the
    /// generation stamped on the new loop's ticks.
    pub fn start(
        &mut self,
        interval: Duration,
        limit: Option<Duration>,
        tx: UnboundedSender<FrameTick>,
    ) -> u64 {
        self.stop();
        self.generation += 1;
        let token = self.parent.child_token();
        self.running = Some(token.clone());
        tokio::spawn(run_frame_loop(
            self.kind,
            self.generation,
            interval,
            limit,
            tx,
            token,
        ));
        self.generation
    }

    pub fn stop(&mut self) {
        if let Some(token) = self.running.take() {
            token.cancel();
        }
    }

    /// True when `tick` belongs to the loop this slot currently owns.
    pub fn accepts(&self, tick: FrameTick) -> bool {
        tick.kind == self.kind && tick.generation == self.generation && self.running.is_some()
    }
}

impl Drop for FrameLoopSlot {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_frame_loop(
    kind: FrameLoopKind,
    generation: u64,
    interval: Duration,
    limit: Option<Duration>,
    tx: UnboundedSender<FrameTick>,
    cancel: CancellationToken,
) {
    let started = Instant::now();
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        let last = limit.is_some_and(|limit| started.elapsed() >= limit);
        let tick = FrameTick {
            kind,
            generation,
            last,
        };
        if tx.send(tick).is_err() || last {
            break;
        }
    }
    trace!(?kind, generation, "frame loop finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn bounded_loop_ends_with_last_tick_after_limit() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut slot = FrameLoopSlot::new(FrameLoopKind::Presentation, CancellationToken::new());
        let started = Instant::now();
        slot.start(
            Duration::from_millis(16),
            Some(Duration::from_millis(100)),
            tx,
        );

        let mut ticks = Vec::new();
        while let Some(tick) = rx.recv().await {
            ticks.push(tick);
        }

        let last = ticks.last().copied();
        assert_eq!(last.map(|t| t.last), Some(true));
        assert_eq!(ticks.iter().filter(|t| t.last).count(), 1);
        assert!(started.elapsed() >= Duration::from_millis(100));
        assert!(ticks.iter().all(|t| slot.accepts(*t)));
    }

    #[tokio::test(start_paused = true)]
    async fn restart_supersedes_previous_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut slot = FrameLoopSlot::new(FrameLoopKind::Reveal, CancellationToken::new());
        let first = slot.start(Duration::from_millis(10), None, tx.clone());
        let stale = rx.recv().await;
        assert_eq!(stale.map(|t| t.generation), Some(first));

        let second = slot.start(Duration::from_millis(10), None, tx);
        assert_eq!(second, first + 1);
        assert!(!slot.accepts(FrameTick {
            kind: FrameLoopKind::Reveal,
            generation: first,
            last: false,
        }));

        tokio::time::sleep(Duration::from_millis(55)).await;
        while let Ok(tick) = rx.try_recv() {
            if tick.generation == first {
                continue;
            }
            assert_eq!(tick.generation, second);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn parent_cancellation_stops_loops() {
        let parent = CancellationToken::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut slot = FrameLoopSlot::new(FrameLoopKind::Reveal, parent.clone());
        slot.start(Duration::from_millis(10), None, tx);
        assert!(slot.is_running());

        parent.cancel();
        assert!(!slot.is_running());
        tokio::time::sleep(Duration::from_millis(50)).await;
        while rx.try_recv().is_ok() {}
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_drops_ticks_for_the_slot() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut slot = FrameLoopSlot::new(FrameLoopKind::Presentation, CancellationToken::new());
        let generation = slot.start(Duration::from_millis(10), None, tx);
        slot.stop();
        assert!(!slot.accepts(FrameTick {
            kind: FrameLoopKind::Presentation,
            generation,
            last: false,
        }));
    }
}
