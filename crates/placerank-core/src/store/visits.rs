use super::{HistorySnapshot, HistorySnapshotRef, SNAPSHOT_VERSION, UrlRecord};
use crate::Result;
use placerank_types::Visit;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::Path;
use tracing::{debug, info, warn};

/// Prior state of the records a mutation touched, for rollback
pub(crate) type Backup = Vec<(String, Option<UrlRecord>)>;

/// Append-only visit storage keyed by url
#[derive(Debug, Default)]
pub struct VisitStore {
    records: HashMap<String, UrlRecord>,
    /// Total visit rows across all records
    rows: usize,
}

impl VisitStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot. A missing or unparseable file yields an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("History snapshot not found at {}", path.display());
            return Ok(Self::new());
        }

        debug!("Loading history snapshot from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        let snapshot: HistorySnapshot = match serde_json::from_str(&content) {
            Ok(s) => s,
            Err(e) => {
                warn!(
                    "Failed to parse history snapshot: {} (at line {}, column {})",
                    e,
                    e.line(),
                    e.column()
                );
                return Ok(Self::new());
            }
        };

        if snapshot.version != SNAPSHOT_VERSION {
            warn!(
                "History snapshot version {} differs from {}, loading anyway",
                snapshot.version, SNAPSHOT_VERSION
            );
        }

        let mut store = Self::new();
        for record in snapshot.records {
            if record.visits.is_empty() {
                continue;
            }
            store.rows += record.visits.len();
            match store.records.entry(record.url.clone()) {
                Entry::Occupied(mut slot) => {
                    warn!("Merging duplicate history entry for {}", record.url);
                    let existing = slot.get_mut();
                    existing.visits.extend(record.visits);
                    existing.title = record.title;
                }
                Entry::Vacant(slot) => {
                    slot.insert(record);
                }
            }
        }
        for record in store.records.values_mut() {
            record.normalize();
        }

        info!(
            "Loaded history snapshot ({} urls, {} visits)",
            store.records.len(),
            store.rows
        );
        Ok(store)
    }

    /// Write a snapshot, replacing the file atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the file cannot be written.
    pub fn save(&self, path: &Path, saved_at: i64) -> Result<()> {
        let content = self.encode(saved_at)?;
        write_snapshot(path, &content)?;
        debug!("Saved {} history records to {}", self.records.len(), path.display());
        Ok(())
    }

    /// Serialize the snapshot, records sorted by url
    pub(crate) fn encode(&self, saved_at: i64) -> Result<String> {
        let mut records: Vec<&UrlRecord> = self.records.values().collect();
        records.sort_by(|a, b| a.url.cmp(&b.url));

        let snapshot = HistorySnapshotRef {
            version: SNAPSHOT_VERSION,
            saved_at,
            records,
        };
        Ok(serde_json::to_string(&snapshot)?)
    }

    #[must_use]
    pub fn get(&self, url: &str) -> Option<&UrlRecord> {
        self.records.get(url)
    }

    pub(crate) fn get_mut(&mut self, url: &str) -> Option<&mut UrlRecord> {
        self.records.get_mut(url)
    }

    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        self.records.contains_key(url)
    }

    /// Number of distinct urls
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Total visit rows across all urls
    #[must_use]
    pub fn count(&self) -> usize {
        self.rows
    }

    pub fn records(&self) -> impl Iterator<Item = &UrlRecord> {
        self.records.values()
    }

    pub(crate) fn records_mut(&mut self) -> impl Iterator<Item = &mut UrlRecord> {
        self.records.values_mut()
    }

    /// Capture the current state of `urls` so a failed mutation can be undone.
    /// Each url appears once.
    pub(crate) fn backup<'a>(&self, urls: impl IntoIterator<Item = &'a str>) -> Backup {
        let mut backup: Backup = Vec::new();
        for url in urls {
            if backup.iter().all(|(seen, _)| seen != url) {
                backup.push((url.to_string(), self.records.get(url).cloned()));
            }
        }
        backup
    }

    /// Append already-validated visits. Returns the affected urls in first-seen
    /// order, each listed once.
    pub(crate) fn append(&mut self, visits: Vec<Visit>) -> Vec<String> {
        let mut affected: Vec<String> = Vec::new();
        for visit in visits {
            if !affected.contains(&visit.url) {
                affected.push(visit.url.clone());
            }
            self.records
                .entry(visit.url.clone())
                .or_insert_with(|| UrlRecord::new(visit.url.clone()))
                .push_visit(visit);
            self.rows += 1;
        }
        affected
    }

    pub(crate) fn remove(&mut self, url: &str) -> Option<UrlRecord> {
        let record = self.records.remove(url)?;
        self.rows -= record.visits.len();
        Some(record)
    }

    /// Remove every record, handing them back for rollback
    pub(crate) fn take_all(&mut self) -> HashMap<String, UrlRecord> {
        self.rows = 0;
        std::mem::take(&mut self.records)
    }

    pub(crate) fn restore(&mut self, backup: Backup) {
        for (url, previous) in backup {
            if let Some(current) = self.records.remove(&url) {
                self.rows -= current.visits.len();
            }
            if let Some(record) = previous {
                self.rows += record.visits.len();
                self.records.insert(url, record);
            }
        }
    }

    pub(crate) fn restore_all(&mut self, records: HashMap<String, UrlRecord>) {
        self.rows = records.values().map(UrlRecord::visit_count).sum();
        self.records = records;
    }
}

/// Replace `path` with `content` through a sibling temp file. Blocking.
pub(crate) fn write_snapshot(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
