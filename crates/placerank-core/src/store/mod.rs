mod visits;

pub use visits::VisitStore;
pub(crate) use visits::write_snapshot;

use crate::frecency::PROVISIONAL_FRECENCY;
use placerank_types::{Link, Visit};
use serde::{Deserialize, Serialize};

/// Snapshot format version
pub(crate) const SNAPSHOT_VERSION: u32 = 1;

/// Everything history knows about one url.
///
/// Created on the first visit, mutated on each later one, destroyed by
/// removal or a full clear. `frecency` is derived from `visits` and is only
/// `PROVISIONAL_FRECENCY` between insertion and the first recompute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlRecord {
    pub url: String,

    /// Title of the most recently recorded visit
    #[serde(default)]
    pub title: String,

    /// Ordered by `visit_time`, oldest first
    #[serde(default)]
    pub visits: Vec<Visit>,

    #[serde(default = "provisional")]
    pub frecency: i64,

    #[serde(default)]
    pub last_visit_time: i64,
}

fn provisional() -> i64 {
    PROVISIONAL_FRECENCY
}

impl UrlRecord {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: String::new(),
            visits: Vec::new(),
            frecency: PROVISIONAL_FRECENCY,
            last_visit_time: 0,
        }
    }

    /// Insert a visit keeping time order. Visits with equal times keep
    /// insertion order. The visit's title becomes the record title.
    pub fn push_visit(&mut self, visit: Visit) {
        let at = self
            .visits
            .partition_point(|existing| existing.visit_time <= visit.visit_time);
        self.title.clone_from(&visit.title);
        self.last_visit_time = if self.visits.is_empty() {
            visit.visit_time
        } else {
            self.last_visit_time.max(visit.visit_time)
        };
        self.visits.insert(at, visit);
    }

    #[must_use]
    pub fn visit_count(&self) -> usize {
        self.visits.len()
    }

    #[must_use]
    pub fn to_link(&self) -> Link {
        Link {
            url: self.url.clone(),
            title: self.title.clone(),
            frecency: self.frecency,
            last_visit_time: self.last_visit_time,
        }
    }

    /// Restore ordering invariants on data read from disk
    fn normalize(&mut self) {
        self.visits.sort_by_key(|visit| visit.visit_time);
        self.last_visit_time = self.visits.last().map_or(0, |visit| visit.visit_time);
    }
}

/// On-disk history snapshot (used by `load`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySnapshot {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub saved_at: i64,
    #[serde(default)]
    pub records: Vec<UrlRecord>,
}

/// Borrowing variant of `HistorySnapshot` for serialization in `save`
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HistorySnapshotRef<'a> {
    pub version: u32,
    pub saved_at: i64,
    pub records: Vec<&'a UrlRecord>,
}

fn default_version() -> u32 {
    SNAPSHOT_VERSION
}
