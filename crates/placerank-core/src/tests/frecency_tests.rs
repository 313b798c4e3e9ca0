//! Tests for frecency scoring and aging
//!
//! Tests the frecency engine including:
//! - Transition weighting (typed > link > bookmark > redirects)
//! - Growth with visit count and decay with visit age
//! - Recompute through the history façade

use super::fixtures::*;
use crate::frecency::FrecencyEngine;
use crate::{TransitionKind, Visit, VisitInput};
use proptest::prelude::*;

fn visit_at(transition: TransitionKind, visit_time: i64) -> Visit {
    Visit {
        url: "https://example.com/".into(),
        title: "Example".into(),
        visit_time,
        transition,
        referrer: None,
    }
}

#[test]
fn test_transition_weighting_order() {
    let engine = FrecencyEngine::default();
    let score = |kind| engine.compute(&[visit_at(kind, NOW)], NOW);

    assert!(score(TransitionKind::Typed) > score(TransitionKind::Link));
    assert!(score(TransitionKind::Link) > score(TransitionKind::Bookmark));
    assert!(score(TransitionKind::Bookmark) > score(TransitionKind::RedirectTemporary));
    assert_eq!(score(TransitionKind::Embed), 0);
}

#[test]
fn test_older_visits_score_lower() {
    let engine = FrecencyEngine::default();
    let fresh = engine.compute(&[visit_at(TransitionKind::Link, NOW)], NOW);
    let week_old = engine.compute(&[visit_at(TransitionKind::Link, NOW - 7 * DAY)], NOW);
    let ancient = engine.compute(&[visit_at(TransitionKind::Link, NOW - 365 * DAY)], NOW);

    assert_eq!(fresh, 100);
    assert_eq!(week_old, 70);
    assert_eq!(ancient, 10);
}

#[test]
fn test_mixed_history_counts_every_visit() {
    let engine = FrecencyEngine::default();
    // typed today (2000) + link at 20 days (50): 2 * 2050 / 2
    let visits = [
        visit_at(TransitionKind::Link, NOW - 20 * DAY),
        visit_at(TransitionKind::Typed, NOW),
    ];
    assert_eq!(engine.compute(&visits, NOW), 2050);
}

#[tokio::test]
async fn test_service_scores_with_explicit_times() {
    let (service, _clock) = memory_service();
    service
        .add_visits([
            VisitInput::new("https://old/").visit_time(NOW - 40 * DAY),
            VisitInput::new("https://new/").visit_time(NOW),
        ])
        .await
        .unwrap();

    assert_eq!(service.get_link("https://old/").await.unwrap().frecency, 30);
    assert_eq!(service.get_link("https://new/").await.unwrap().frecency, 100);
}

#[tokio::test]
async fn test_decay_lowers_ranking_of_stale_urls() {
    let (service, clock) = memory_service();
    service
        .add_visit(VisitInput::new("https://stale/").visit_time(NOW - 3 * DAY))
        .await
        .unwrap();
    service
        .add_visit(VisitInput::new("https://fresh/").visit_time(NOW))
        .await
        .unwrap();

    clock.advance_days(2);
    service.decay_all().await.unwrap();

    let stale = service.get_link("https://stale/").await.unwrap();
    let fresh = service.get_link("https://fresh/").await.unwrap();
    assert_eq!(stale.frecency, 70);
    assert_eq!(fresh.frecency, 100);

    let top = service.get_top_frecent_sites(None).await;
    assert_eq!(top[0].url, "https://fresh/");
}

proptest! {
    #[test]
    fn prop_aging_never_raises_frecency(
        ages in proptest::collection::vec(0i64..400, 1..20),
        kinds in proptest::collection::vec(proptest::sample::select(TransitionKind::ALL.to_vec()), 20),
        elapsed_days in 0i64..400,
    ) {
        let engine = FrecencyEngine::default();
        let mut visits: Vec<Visit> = ages
            .iter()
            .zip(&kinds)
            .map(|(age, kind)| visit_at(*kind, NOW - age * DAY))
            .collect();
        visits.sort_by_key(|v| v.visit_time);

        let before = engine.compute(&visits, NOW);
        let after = engine.compute(&visits, NOW + elapsed_days * DAY);
        prop_assert!(after <= before, "{after} > {before}");
        prop_assert!(after >= 0);
    }

    #[test]
    fn prop_more_same_kind_visits_never_lower_frecency(
        count in 1usize..30,
        kind in proptest::sample::select(TransitionKind::ALL.to_vec()),
    ) {
        let engine = FrecencyEngine::default();
        let visits: Vec<Visit> = (0..=count)
            .map(|i| visit_at(kind, NOW - i64::try_from(count - i).unwrap()))
            .collect();

        let fewer = engine.compute(&visits[1..], NOW);
        let more = engine.compute(&visits, NOW);
        prop_assert!(more >= fewer, "{more} < {fewer}");
    }
}
