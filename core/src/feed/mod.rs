//! Feed reconciliation.
//!
//! The reconciler turns a sequence of full listings into a stable view for
//! the presentation: one featured item plus a history that only ever grows at
//! the front, one item per detected change. It never re-sorts what it already
//! holds; the embedded capture timestamps play no part in ordering.

use std::collections::HashSet;
use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::ImageRecord;
use crate::error::FeedError;

pub mod poller;

/// Anything that can produce the current full listing of identifiers.
#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch_listing(&self) -> Result<Vec<String>, FeedError>;
}

/// Previously featured images, newest arrival first. Identifiers are unique.
#[derive(Clone, Debug, Default)]
pub struct History {
    entries: VecDeque<ImageRecord>,
    ids: HashSet<Arc<str>>,
}

impl History {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ImageRecord> {
        self.entries.get(index)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &ImageRecord> + '_ {
        self.entries.iter()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(ImageRecord::id).collect()
    }

    /// Returns `false` (and leaves history untouched) for a duplicate.
    fn push_front(&mut self, record: ImageRecord) -> bool {
        if !self.ids.insert(record.shared_id()) {
            return false;
        }
        self.entries.push_front(record);
        true
    }

    fn push_back(&mut self, record: ImageRecord) -> bool {
        if !self.ids.insert(record.shared_id()) {
            return false;
        }
        self.entries.push_back(record);
        true
    }
}

impl PartialEq for History {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for History {}

/// The reconciler's working state, handed out to readers as an owned clone.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeedSnapshot {
    featured: Option<ImageRecord>,
    history: History,
    revision: u64,
}

impl FeedSnapshot {
    pub fn featured(&self) -> Option<&ImageRecord> {
        self.featured.as_ref()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Bumped on every state change; zero until the first listing lands.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_empty(&self) -> bool {
        self.featured.is_none()
    }
}

/// What a single listing did to the snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The listing had no usable identifiers.
    Empty,
    /// Newest item is already featured.
    Unchanged,
    /// First usable listing.
    Initialized {
        featured: ImageRecord,
        history_len: usize,
    },
    /// A newer item took over; the previous one moved to the front of history.
    Advanced {
        featured: ImageRecord,
        evicted: ImageRecord,
    },
    /// The listing's newest item sorts below the featured one (it was removed
    /// upstream). Nothing changes.
    Regressed {
        featured: ImageRecord,
        fetched_newest: ImageRecord,
    },
}

impl ReconcileOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, Self::Initialized { .. } | Self::Advanced { .. })
    }
}

#[derive(Debug, Default)]
pub struct FeedReconciler {
    snapshot: FeedSnapshot,
}

impl FeedReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> &FeedSnapshot {
        &self.snapshot
    }

    /// Fetches one listing from `source` and applies it.
    #[tracing::instrument(level = "debug", skip_all, fields(revision = self.snapshot.revision))]
    pub async fn poll(&mut self, source: &dyn ListingSource) -> Result<ReconcileOutcome, FeedError> {
        let files = source.fetch_listing().await?;
        let outcome = self.apply_listing(files);
        match &outcome {
            ReconcileOutcome::Empty => debug!("listing had no identifiers"),
            ReconcileOutcome::Unchanged => debug!("newest item unchanged"),
            ReconcileOutcome::Initialized {
                featured,
                history_len,
            } => info!(%featured, history_len, "feed initialized"),
            ReconcileOutcome::Advanced { featured, evicted } => {
                info!(%featured, %evicted, "new featured item")
            }
            ReconcileOutcome::Regressed {
                featured,
                fetched_newest,
            } => warn!(%featured, %fetched_newest, "listing regressed; keeping featured item"),
        }
        Ok(outcome)
    }

    /// Applies a full listing to the snapshot.
    pub fn apply_listing<I, S>(&mut self, files: I) -> ReconcileOutcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut sorted = sorted_listing(files);
        if sorted.is_empty() {
            return ReconcileOutcome::Empty;
        }
        let newest = sorted.remove(0);

        let Some(current) = self.snapshot.featured.as_ref() else {
            let mut history = History::default();
            for record in sorted {
                history.push_back(record);
            }
            let history_len = history.len();
            self.snapshot.history = history;
            self.snapshot.featured = Some(newest.clone());
            self.snapshot.revision += 1;
            return ReconcileOutcome::Initialized {
                featured: newest,
                history_len,
            };
        };

        if current.id() == newest.id() {
            return ReconcileOutcome::Unchanged;
        }
        if newest.listing_order(current).is_lt() {
            return ReconcileOutcome::Regressed {
                featured: current.clone(),
                fetched_newest: newest,
            };
        }

        // Everything in history sorts below the featured item, so the newcomer
        // cannot already be there. The rest of the listing is ignored.
        let evicted = current.clone();
        self.snapshot.history.push_front(evicted.clone());
        self.snapshot.featured = Some(newest.clone());
        self.snapshot.revision += 1;
        ReconcileOutcome::Advanced {
            featured: newest,
            evicted,
        }
    }
}

/// Unique, non-empty identifiers, newest first.
fn sorted_listing<I, S>(files: I) -> Vec<ImageRecord>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut records: Vec<ImageRecord> = files
        .into_iter()
        .filter_map(|file| {
            let file = file.as_ref().trim();
            if file.is_empty() || !seen.insert(file.to_string()) {
                return None;
            }
            Some(ImageRecord::new(file))
        })
        .collect();
    records.sort_by(|a, b| b.listing_order(a));
    records
}
