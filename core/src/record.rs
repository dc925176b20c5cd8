use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use chrono::DateTime;
use chrono::Utc;

use crate::timestamp::file_name;
use crate::timestamp::format_capture_timestamp;
use crate::timestamp::parse_capture_timestamp;

/// One image of the feed: an opaque identifier plus the capture instant
/// embedded in it, if any. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ImageRecord {
    id: Arc<str>,
    captured_at: Option<DateTime<Utc>>,
}

impl ImageRecord {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        let id = id.into();
        let captured_at = parse_capture_timestamp(&id);
        Self { id, captured_at }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn shared_id(&self) -> Arc<str> {
        Arc::clone(&self.id)
    }

    pub fn file_name(&self) -> &str {
        file_name(&self.id)
    }

    pub fn captured_at(&self) -> Option<DateTime<Utc>> {
        self.captured_at
    }

    /// Display label for tiles; empty when the capture time is unknown.
    pub fn capture_label(&self) -> String {
        format_capture_timestamp(self.captured_at)
    }

    /// Order used to find the newest item of a listing: file name first,
    /// then the full identifier so that equal names stay deterministic.
    pub fn listing_order(&self, other: &Self) -> Ordering {
        self.file_name()
            .cmp(other.file_name())
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl fmt::Display for ImageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}
