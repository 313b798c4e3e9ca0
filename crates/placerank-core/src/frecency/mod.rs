//! Frecency scoring.
//!
//! A url's frecency blends how often and how recently it was visited. Only the
//! `sampleSize` most recent visits are scored individually; each earns
//! `bonus(transition) * weight(age bucket) / 100` points. The sample average is
//! scaled back up by the total visit count:
//!
//! `frecency = ceil(visit_count * sum(points) / sampled)`
//!
//! Scores depend on the reference time, so the same visits rank lower as they
//! age. `decay_all` on the service re-scores everything against the clock.

use crate::clock::age_in_days;
use crate::config::FrecencyConfig;
use crate::store::UrlRecord;
use placerank_types::{TransitionKind, Visit};

/// Frecency of a record whose visits have not been scored yet
pub const PROVISIONAL_FRECENCY: i64 = -1;

#[derive(Debug, Clone, Default)]
pub struct FrecencyEngine {
    config: FrecencyConfig,
}

impl FrecencyEngine {
    #[must_use]
    pub fn new(config: FrecencyConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &FrecencyConfig {
        &self.config
    }

    /// Bonus for a transition kind. Negative settings count as zero.
    #[must_use]
    pub fn transition_bonus(&self, kind: TransitionKind) -> u64 {
        let c = &self.config;
        let bonus = match kind {
            TransitionKind::Link => c.link_visit_bonus,
            TransitionKind::Typed => c.typed_visit_bonus,
            TransitionKind::Bookmark => c.bookmark_visit_bonus,
            TransitionKind::Embed => c.embed_visit_bonus,
            TransitionKind::RedirectPermanent => c.perm_redirect_visit_bonus,
            TransitionKind::RedirectTemporary => c.temp_redirect_visit_bonus,
            TransitionKind::Download => c.download_visit_bonus,
            TransitionKind::FramedLink => c.framed_link_visit_bonus,
            TransitionKind::Reload => c.reload_visit_bonus,
        };
        bonus.max(0).unsigned_abs()
    }

    /// Percentage weight for a visit of the given age
    #[must_use]
    pub fn bucket_weight(&self, age_days: i64) -> u64 {
        let c = &self.config;
        let weight = if age_days <= c.first_bucket_cutoff {
            c.first_bucket_weight
        } else if age_days <= c.second_bucket_cutoff {
            c.second_bucket_weight
        } else if age_days <= c.third_bucket_cutoff {
            c.third_bucket_weight
        } else if age_days <= c.fourth_bucket_cutoff {
            c.fourth_bucket_weight
        } else {
            c.default_bucket_weight
        };
        weight.max(0).unsigned_abs()
    }

    /// Points for one visit, in hundredths
    fn visit_points(&self, visit: &Visit, now: i64) -> u64 {
        self.transition_bonus(visit.transition)
            .saturating_mul(self.bucket_weight(age_in_days(visit.visit_time, now)))
    }

    /// Score a visit history ordered oldest first.
    #[must_use]
    pub fn compute(&self, visits: &[Visit], now: i64) -> i64 {
        if visits.is_empty() {
            return 0;
        }

        let sample_start = visits.len().saturating_sub(self.config.sample_size.max(1));
        let sample = &visits[sample_start..];

        let points: u64 = sample
            .iter()
            .map(|visit| self.visit_points(visit, now))
            .fold(0, u64::saturating_add);
        if points == 0 {
            return 0;
        }

        let visit_count = visits.len() as u64;
        let sampled = sample.len() as u64;
        let score = visit_count.saturating_mul(points).div_ceil(sampled * 100);
        i64::try_from(score).unwrap_or(i64::MAX)
    }

    /// Re-score a record in place and return the new frecency.
    pub fn recompute(&self, record: &mut UrlRecord, now: i64) -> i64 {
        record.frecency = self.compute(&record.visits, now);
        record.frecency
    }
}
