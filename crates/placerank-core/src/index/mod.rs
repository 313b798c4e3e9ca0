//! Ranked projection of history for top-sites queries.
//!
//! Every eligible record is ranked; the visible index is the first
//! `capacity` entries of that ranking. Keeping the tail ranked means a
//! removal promotes the next url without rereading the store.

use crate::link_checker::LinkChecker;
use placerank_types::Link;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

/// Sort key: frecency descending, then last visit descending, then url ascending
#[derive(Debug, Clone, PartialEq, Eq)]
struct RankKey {
    frecency: i64,
    last_visit_time: i64,
    url: String,
}

impl RankKey {
    fn of(link: &Link) -> Self {
        Self {
            frecency: link.frecency,
            last_visit_time: link.last_visit_time,
            url: link.url.clone(),
        }
    }
}

impl Ord for RankKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .frecency
            .cmp(&self.frecency)
            .then_with(|| other.last_visit_time.cmp(&self.last_visit_time))
            .then_with(|| self.url.cmp(&other.url))
    }
}

impl PartialOrd for RankKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone)]
pub struct LinkIndex {
    capacity: usize,
    checker: LinkChecker,
    ranked: BTreeSet<RankKey>,
    links: HashMap<String, Link>,
}

impl LinkIndex {
    /// A zero capacity is treated as one
    #[must_use]
    pub fn new(capacity: usize, checker: LinkChecker) -> Self {
        Self {
            capacity: capacity.max(1),
            checker,
            ranked: BTreeSet::new(),
            links: HashMap::new(),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of visible entries (at most `capacity`)
    #[must_use]
    pub fn len(&self) -> usize {
        self.ranked.len().min(self.capacity)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    /// Insert or reposition a link. Ineligible urls are never indexed;
    /// returns whether the link is ranked afterwards.
    pub fn upsert(&mut self, link: Link) -> bool {
        if !self.checker.is_eligible(&link.url) {
            self.remove(&link.url);
            return false;
        }
        if let Some(previous) = self.links.get(&link.url) {
            self.ranked.remove(&RankKey::of(previous));
        }
        self.ranked.insert(RankKey::of(&link));
        self.links.insert(link.url.clone(), link);
        true
    }

    pub fn remove(&mut self, url: &str) -> Option<Link> {
        let link = self.links.remove(url)?;
        self.ranked.remove(&RankKey::of(&link));
        Some(link)
    }

    pub fn clear(&mut self) {
        self.ranked.clear();
        self.links.clear();
    }

    /// Replace the whole ranking
    pub fn rebuild(&mut self, links: impl IntoIterator<Item = Link>) {
        self.clear();
        for link in links {
            self.upsert(link);
        }
    }

    #[must_use]
    pub fn get(&self, url: &str) -> Option<&Link> {
        self.links.get(url)
    }

    /// Zero-based position among visible entries
    #[must_use]
    pub fn rank_of(&self, url: &str) -> Option<usize> {
        let key = RankKey::of(self.links.get(url)?);
        let rank = self.ranked.range(..&key).count();
        (rank < self.capacity).then_some(rank)
    }

    /// The best `min(limit, capacity)` links in rank order
    #[must_use]
    pub fn top(&self, limit: usize) -> Vec<Link> {
        self.ranked
            .iter()
            .take(limit.min(self.capacity))
            .filter_map(|key| self.links.get(&key.url).cloned())
            .collect()
    }
}
