//! Scroll motion profiles for the arrival animation.
//!
//! The presentation starts at the bottom of the scrollable content and
//! travels back to the top over a fixed duration. The distance is captured
//! once when the timeline is armed; content that grows mid-animation does not
//! stretch it.

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

/// Share of the duration spent accelerating in [`ScrollProfile::AccelerateCruise`].
const ACCELERATION_SHARE: f64 = 0.3;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScrollProfile {
    /// Fast start, cubic deceleration into the top.
    #[default]
    EaseOutCubic,
    /// Cubic acceleration for the first 30% of the run, then constant speed.
    AccelerateCruise,
}

impl ScrollProfile {
    /// Fraction of the total distance covered at `progress` (0..=1).
    pub fn travelled(self, progress: f64) -> f64 {
        let t = if progress.is_nan() {
            0.0
        } else {
            progress.clamp(0.0, 1.0)
        };
        match self {
            ScrollProfile::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
            ScrollProfile::AccelerateCruise => {
                let a = ACCELERATION_SHARE;
                // Peak speed chosen so the distance is exactly 1 at t = 1.
                let peak = 1.0 / (1.0 - 2.0 * a / 3.0);
                let covered = if t <= a {
                    peak * t.powi(3) / (3.0 * a * a)
                } else {
                    peak * a / 3.0 + peak * (t - a)
                };
                covered.min(1.0)
            }
        }
    }

    /// Offset from the top at `elapsed`, starting from `start_extent` and
    /// reaching exactly zero once `elapsed >= duration`.
    pub fn offset(self, start_extent: f64, elapsed: Duration, duration: Duration) -> f64 {
        if !start_extent.is_finite() || start_extent <= 0.0 || elapsed >= duration {
            return 0.0;
        }
        let progress = elapsed.as_secs_f64() / duration.as_secs_f64();
        (start_extent * (1.0 - self.travelled(progress))).clamp(0.0, start_extent)
    }
}
