//! Capture timestamps embedded in resource identifiers.
//!
//! An identifier such as `https://host/bucket/shot_20250911_210000_01.png`
//! carries its capture instant in the final path segment as
//! `_YYYYMMDD_HHMMSS_` (UTC). Identifiers without that marker are valid; they
//! simply have an unknown age.

use std::sync::OnceLock;

use chrono::DateTime;
use chrono::NaiveDate;
use chrono::NaiveTime;
use chrono::Utc;
use regex_lite::Regex;

#[allow(clippy::expect_used)]
fn capture_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"_(\d{8})_(\d{6})_").expect("valid capture timestamp regex"))
}

/// Final `/`-separated segment of an identifier.
pub fn file_name(id: &str) -> &str {
    id.rsplit('/').next().unwrap_or(id)
}

/// Parses the capture instant out of `id`.
///
/// Returns `None` when the marker is missing or does not name a real
/// calendar instant (month 13, 25 o'clock, ...).
pub fn parse_capture_timestamp(id: &str) -> Option<DateTime<Utc>> {
    let captures = capture_regex().captures(file_name(id))?;
    let date = captures.get(1)?.as_str();
    let time = captures.get(2)?.as_str();

    let date = NaiveDate::from_ymd_opt(
        date[0..4].parse().ok()?,
        date[4..6].parse().ok()?,
        date[6..8].parse().ok()?,
    )?;
    let time = NaiveTime::from_hms_opt(
        time[0..2].parse().ok()?,
        time[2..4].parse().ok()?,
        time[4..6].parse().ok()?,
    )?;
    Some(date.and_time(time).and_utc())
}

/// `YYYY-MM-DD HH:MM:SS` for display, or an empty string for unknown ages.
pub fn format_capture_timestamp(captured_at: Option<DateTime<Utc>>) -> String {
    captured_at
        .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}
