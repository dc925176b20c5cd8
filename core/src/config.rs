//! Kiosk configuration.
//!
//! Every field has a default matching the reference kiosk, so an empty file
//! (or no file at all) is a valid configuration:
//!
//! ```toml
//! [feed]
//! endpoint = "https://example.com/list-screenshots"
//! poll_interval_ms = 60000
//!
//! [timeline]
//! duration_ms = 10000
//! reveal_gate_ms = 13000
//! scroll_profile = "accelerate-cruise"
//!
//! [[timeline.captions]]
//! start_ms = 1000
//! end_ms = 3000
//! text = "Establishing link..."
//! ```

use std::path::Path;
use std::time::Duration;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::error::ConfigError;
use crate::scroll::ScrollProfile;
use crate::timeline::CaptionWindow;

pub const DEFAULT_LISTING_ENDPOINT: &str =
    "https://us-central1-voyager2025-471802.cloudfunctions.net/list-screenshots";

/// 2025-09-11T21:00:00Z, launch of the reference mission.
const DEFAULT_MISSION_EPOCH_SECS: i64 = 1_757_624_400;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KioskConfig {
    pub feed: FeedConfig,
    pub timeline: TimelineConfig,
    pub reveal: RevealConfig,
    pub mission: MissionConfig,
    pub surface: SurfaceConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeedConfig {
    pub endpoint: String,
    pub poll_interval_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_LISTING_ENDPOINT.to_string(),
            poll_interval_ms: 60_000,
            request_timeout_ms: 30_000,
        }
    }
}

impl FeedConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimelineConfig {
    /// Length of the scroll and caption sequence.
    pub duration_ms: u64,
    /// Elapsed time at which the featured image may be mounted.
    pub reveal_gate_ms: u64,
    pub scroll_profile: ScrollProfile,
    pub captions: Vec<CaptionWindow>,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        let caption = |start_ms, end_ms, text: &str| CaptionWindow {
            start_ms,
            end_ms,
            text: text.to_string(),
        };
        Self {
            duration_ms: 10_000,
            reveal_gate_ms: 13_000,
            scroll_profile: ScrollProfile::default(),
            captions: vec![
                caption(1_000, 3_000, "Establishing link..."),
                caption(3_000, 5_000, "Receiving transmission..."),
                caption(5_000, 7_000, "Synchronizing mission time..."),
                caption(7_000, 10_000, "Connection established: Internet Voyager"),
            ],
        }
    }
}

impl TimelineConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    pub fn reveal_gate(&self) -> Duration {
        Duration::from_millis(self.reveal_gate_ms)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RevealConfig {
    /// Capture age at which the image is fully revealed.
    pub window_ms: u64,
    /// Cells per side; the grid is square.
    pub grid_size: u16,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            window_ms: 60 * 60 * 1000,
            grid_size: 60,
        }
    }
}

impl RevealConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MissionConfig {
    pub epoch: DateTime<Utc>,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            epoch: DateTime::from_timestamp(DEFAULT_MISSION_EPOCH_SECS, 0).unwrap_or_default(),
        }
    }
}

/// Knobs for the rendering surface.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SurfaceConfig {
    pub presentation_fps: u16,
    pub reveal_fps: u16,
    pub history_columns: u16,
    pub thumbnail_concurrency: usize,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            presentation_fps: 30,
            reveal_fps: 4,
            history_columns: 4,
            thumbnail_concurrency: 2,
        }
    }
}

impl SurfaceConfig {
    pub fn presentation_frame_interval(&self) -> Duration {
        frame_interval(self.presentation_fps)
    }

    pub fn reveal_frame_interval(&self) -> Duration {
        frame_interval(self.reveal_fps)
    }
}

fn frame_interval(fps: u16) -> Duration {
    Duration::from_secs_f64(1.0 / f64::from(fps.max(1)))
}

impl KioskConfig {
    /// Loads `path` if given, otherwise the defaults. The result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml_str(&raw)?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feed.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("feed.endpoint is empty".to_string()));
        }
        if self.feed.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "feed.poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.timeline.duration_ms == 0 {
            return Err(ConfigError::Invalid(
                "timeline.duration_ms must be positive".to_string(),
            ));
        }
        if self.reveal.window_ms == 0 {
            return Err(ConfigError::Invalid(
                "reveal.window_ms must be positive".to_string(),
            ));
        }
        if self.reveal.grid_size == 0 {
            return Err(ConfigError::Invalid(
                "reveal.grid_size must be positive".to_string(),
            ));
        }
        if self.surface.history_columns == 0 {
            return Err(ConfigError::Invalid(
                "surface.history_columns must be positive".to_string(),
            ));
        }

        let mut previous_end = 0;
        for window in &self.timeline.captions {
            if window.start_ms >= window.end_ms {
                return Err(ConfigError::Invalid(format!(
                    "caption {:?} has an empty window [{}, {})",
                    window.text, window.start_ms, window.end_ms
                )));
            }
            if window.start_ms < previous_end {
                return Err(ConfigError::Invalid(format!(
                    "caption {:?} overlaps or precedes the previous window",
                    window.text
                )));
            }
            previous_end = window.end_ms;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn defaults_are_valid_and_match_reference() {
        let config = KioskConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.feed.poll_interval(), Duration::from_secs(60));
        assert_eq!(config.timeline.duration(), Duration::from_secs(10));
        assert_eq!(config.timeline.reveal_gate(), Duration::from_secs(13));
        assert_eq!(config.reveal.window(), Duration::from_secs(3600));
        assert_eq!(
            config.mission.epoch.to_rfc3339(),
            "2025-09-11T21:00:00+00:00"
        );
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = KioskConfig::from_toml_str(
            r#"
            [feed]
            endpoint = "http://localhost:8080/list"

            [timeline]
            scroll_profile = "accelerate-cruise"
            "#,
        );
        let config = match config {
            Ok(config) => config,
            Err(err) => panic!("config should parse: {err}"),
        };
        assert_eq!(config.feed.endpoint, "http://localhost:8080/list");
        assert_eq!(config.feed.poll_interval_ms, 60_000);
        assert_eq!(config.timeline.scroll_profile, ScrollProfile::AccelerateCruise);
        assert_eq!(config.timeline.captions.len(), 4);
    }

    #[test]
    fn overlapping_captions_are_rejected() {
        let mut config = KioskConfig::default();
        config.timeline.captions[1].start_ms = 2_500;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = KioskConfig::from_toml_str("[feed]\npoll_every = 3\n");
        assert!(matches!(err, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let mut file = match tempfile::NamedTempFile::new() {
            Ok(file) => file,
            Err(err) => panic!("tempfile: {err}"),
        };
        let written = writeln!(file, "[reveal]\ngrid_size = 10\n");
        assert!(written.is_ok());

        let config = KioskConfig::load(Some(file.path()));
        assert_eq!(config.map(|c| c.reveal.grid_size).ok(), Some(10));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = KioskConfig::load(Some(Path::new("/definitely/not/here.toml")));
        assert!(matches!(err, Err(ConfigError::Read { .. })));
    }
}
