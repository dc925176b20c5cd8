//! Presentation timeline scheduler.
//!
//! Everything the arrival sequence shows is a pure function of the time
//! elapsed since the timeline was armed for the current featured item:
//! the caption, the scroll offset, and the two gates. Nothing here is
//! stored between frames except the arm instant and the captured scroll
//! extent.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;

use crate::config::TimelineConfig;
use crate::record::ImageRecord;
use crate::scroll::ScrollProfile;

/// Half-open `[start_ms, end_ms)` window during which `text` is shown.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionWindow {
    pub start_ms: u64,
    pub end_ms: u64,
    pub text: String,
}

impl CaptionWindow {
    fn contains(&self, elapsed_ms: u64) -> bool {
        self.start_ms <= elapsed_ms && elapsed_ms < self.end_ms
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TimelinePhase {
    /// Nothing is featured yet.
    Idle,
    /// Armed, before the first caption window.
    Scrolling,
    Captioned(String),
    /// The sequence finished but the featured image is still held back.
    RevealGated,
    Settled,
}

/// Everything a surface needs to draw one frame of the sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct TimelineFrame {
    pub elapsed: Duration,
    pub phase: TimelinePhase,
    pub caption: Option<String>,
    pub scroll_offset: f64,
    pub history_visible: bool,
    pub reveal_open: bool,
    /// True while the bounded presentation loop should keep ticking.
    pub animating: bool,
}

impl TimelineFrame {
    pub fn idle() -> Self {
        Self {
            elapsed: Duration::ZERO,
            phase: TimelinePhase::Idle,
            caption: None,
            scroll_offset: 0.0,
            history_visible: false,
            reveal_open: false,
            animating: false,
        }
    }

    /// Scroll offset rounded to whole terminal rows.
    pub fn scroll_rows(&self) -> u32 {
        let rows = self.scroll_offset.round();
        if rows.is_nan() || rows <= 0.0 {
            0
        } else if rows >= f64::from(u32::MAX) {
            u32::MAX
        } else {
            rows as u32
        }
    }
}

#[derive(Debug)]
struct ArmedCycle {
    id: Arc<str>,
    armed_at: Instant,
    start_extent: f64,
}

#[derive(Debug)]
pub struct PresentationTimeline {
    duration: Duration,
    reveal_gate: Duration,
    profile: ScrollProfile,
    captions: Vec<CaptionWindow>,
    armed: Option<ArmedCycle>,
}

impl PresentationTimeline {
    pub fn new(config: &TimelineConfig) -> Self {
        Self {
            duration: config.duration(),
            reveal_gate: config.reveal_gate(),
            profile: config.scroll_profile,
            captions: config.captions.clone(),
            armed: None,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Arms the timeline for `featured` at `now`, capturing `start_extent`
    /// as the scroll distance for the whole cycle.
    ///
    /// Returns `false` without touching the current cycle when there is
    /// nothing featured or when `featured` is the item already armed.
    pub fn arm(&mut self, featured: Option<&ImageRecord>, start_extent: f64, now: Instant) -> bool {
        let Some(featured) = featured else {
            return false;
        };
        if self
            .armed
            .as_ref()
            .is_some_and(|cycle| *cycle.id == *featured.id())
        {
            return false;
        }
        debug!(id = featured.id(), start_extent, "arming presentation timeline");
        self.armed = Some(ArmedCycle {
            id: featured.shared_id(),
            armed_at: now,
            start_extent,
        });
        true
    }

    pub fn armed_for(&self) -> Option<&str> {
        self.armed.as_ref().map(|cycle| &*cycle.id)
    }

    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        self.armed
            .as_ref()
            .map(|cycle| now.saturating_duration_since(cycle.armed_at))
    }

    /// Instant at which the scroll and captions finish.
    pub fn scroll_deadline(&self) -> Option<Instant> {
        self.armed
            .as_ref()
            .map(|cycle| cycle.armed_at + self.duration)
    }

    /// Instant at which the reveal gate opens.
    pub fn gate_deadline(&self) -> Option<Instant> {
        self.armed
            .as_ref()
            .map(|cycle| cycle.armed_at + self.reveal_gate)
    }

    pub fn frame(&self, now: Instant) -> TimelineFrame {
        let Some(cycle) = self.armed.as_ref() else {
            return TimelineFrame::idle();
        };
        let elapsed = now.saturating_duration_since(cycle.armed_at);
        let caption = caption_at(&self.captions, elapsed, self.duration).map(str::to_string);
        TimelineFrame {
            elapsed,
            phase: phase_at(&self.captions, elapsed, self.duration, self.reveal_gate),
            caption,
            scroll_offset: self.profile.offset(cycle.start_extent, elapsed, self.duration),
            history_visible: elapsed >= self.duration,
            reveal_open: elapsed >= self.reveal_gate,
            animating: elapsed < self.duration,
        }
    }
}

/// The caption for `elapsed`, if any. Always `None` once `duration` has passed.
pub fn caption_at(captions: &[CaptionWindow], elapsed: Duration, duration: Duration) -> Option<&str> {
    if elapsed >= duration {
        return None;
    }
    let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    captions
        .iter()
        .find(|window| window.contains(elapsed_ms))
        .map(|window| window.text.as_str())
}

pub fn phase_at(
    captions: &[CaptionWindow],
    elapsed: Duration,
    duration: Duration,
    reveal_gate: Duration,
) -> TimelinePhase {
    if elapsed >= reveal_gate {
        return TimelinePhase::Settled;
    }
    if elapsed >= duration {
        return TimelinePhase::RevealGated;
    }
    match caption_at(captions, elapsed, duration) {
        Some(text) => TimelinePhase::Captioned(text.to_string()),
        None => TimelinePhase::Scrolling,
    }
}
