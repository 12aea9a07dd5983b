// tests/discovery_run.rs
mod common;

use common::*;
use fintech_radar::discovery::select::Strategy;
use fintech_radar::discovery::types::RawRecord;
use fintech_radar::discovery::whitelist::TopicWhitelist;
use fintech_radar::state::MemoryStore;
use fintech_radar::{DedupState, Discovery, RadarError};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn two_bucket_whitelist() -> TopicWhitelist {
    TopicWhitelist::from_labels(["Neobanks", "Payroll software"])
}

#[tokio::test]
async fn round_robin_scenario_picks_one_per_bucket_and_wraps() {
    let wl = two_bucket_whitelist();
    let catalog = StaticCatalog(vec![
        post("A", &["Neobanks"], 50),
        post("B", &["Payroll software"], 80),
        post("C", &["Gaming"], 200),
    ]);
    let store = MemoryStore::default();
    let publisher = RecordingPublisher::default();
    let engine = Discovery::new(&catalog, &store, &publisher, &wl);

    let summary = engine
        .run(&params(Strategy::RoundRobin, 2, false))
        .await
        .unwrap();

    assert_eq!(summary.fetched, 3);
    assert_eq!(summary.normalized, 3);
    assert_eq!(summary.dropped.off_topic, 1);
    assert_eq!(summary.filtered, 2);
    assert_eq!(summary.scored, 2);
    assert_eq!(summary.selected, 2);
    assert_eq!(publisher.ids(), vec!["A", "B"]);
    assert!(summary.state_saved);

    let state = store.snapshot();
    assert_eq!(state.rr_cursor, 0);
    assert!(state.is_seen("A") && state.is_seen("B"));
    assert!(!state.is_seen("C"));
}

#[tokio::test]
async fn seen_id_is_excluded_even_with_top_score() {
    let wl = two_bucket_whitelist();
    let catalog = StaticCatalog(vec![
        post("star", &["Neobanks"], 10_000),
        post("plain", &["Neobanks"], 3),
    ]);
    let mut seeded = DedupState::default();
    seeded.mark_seen(["star"]);
    let store = MemoryStore::new(seeded);
    let publisher = RecordingPublisher::default();
    let engine = Discovery::new(&catalog, &store, &publisher, &wl);

    let summary = engine
        .run(&params(Strategy::RoundRobin, 1, false))
        .await
        .unwrap();

    assert_eq!(summary.dropped.already_seen, 1);
    assert_eq!(publisher.ids(), vec!["plain"]);
}

#[tokio::test]
async fn no_eligible_candidates_is_not_an_error() {
    let wl = two_bucket_whitelist();
    let catalog = StaticCatalog(vec![post("g", &["Gaming"], 900)]);
    let store = MemoryStore::new(DedupState {
        rr_cursor: 1,
        ..Default::default()
    });
    let publisher = RecordingPublisher::default();
    let engine = Discovery::new(&catalog, &store, &publisher, &wl);

    let summary = engine
        .run(&params(Strategy::RoundRobin, 1, false))
        .await
        .unwrap();

    assert_eq!(summary.selected, 0);
    assert!(summary.picks.is_empty());
    assert!(!summary.state_saved);
    assert_eq!(store.save_count(), 0);
    assert_eq!(store.snapshot().rr_cursor, 1);
    assert!(publisher.ids().is_empty());
}

#[tokio::test]
async fn dry_run_never_mutates_state() {
    let wl = two_bucket_whitelist();
    let catalog = StaticCatalog(vec![
        post("A", &["Neobanks"], 50),
        post("B", &["Payroll software"], 80),
    ]);
    let store = MemoryStore::default();
    let publisher = RecordingPublisher::default();
    let engine = Discovery::new(&catalog, &store, &publisher, &wl);

    for strategy in [Strategy::RoundRobin, Strategy::Random] {
        let summary = engine.run(&params(strategy, 2, true)).await.unwrap();
        assert_eq!(summary.selected, 2);
        assert_eq!(summary.delivered, 0);
        assert!(summary.picks.iter().all(|p| p.outcome.starts_with("skipped")));
    }

    assert_eq!(store.save_count(), 0);
    assert_eq!(store.snapshot(), DedupState::default());
    assert!(publisher.calls.lock().unwrap().iter().all(|(_, dry)| *dry));
}

#[tokio::test]
async fn catalog_failure_aborts_without_side_effects() {
    let wl = two_bucket_whitelist();
    let store = MemoryStore::default();
    let publisher = RecordingPublisher::default();
    let engine = Discovery::new(&DownCatalog, &store, &publisher, &wl);

    let err = engine
        .run(&params(Strategy::RoundRobin, 1, false))
        .await
        .unwrap_err();

    assert!(matches!(err, RadarError::CatalogUnavailable(_)));
    assert_eq!(store.save_count(), 0);
    assert!(publisher.ids().is_empty());
}

#[tokio::test]
async fn persistence_failure_is_reported_after_publish() {
    let wl = two_bucket_whitelist();
    let catalog = StaticCatalog(vec![post("A", &["Neobanks"], 5)]);
    let store = MemoryStore::failing(DedupState::default());
    let publisher = RecordingPublisher::default();
    let engine = Discovery::new(&catalog, &store, &publisher, &wl);

    let summary = engine
        .run(&params(Strategy::RoundRobin, 1, false))
        .await
        .unwrap();

    assert_eq!(summary.delivered, 1);
    assert_eq!(publisher.ids(), vec!["A"]);
    assert!(!summary.state_saved);
    assert!(summary.state_error.is_some());
    assert_eq!(summary.rr_cursor_after, summary.rr_cursor_before);
}

#[tokio::test]
async fn publish_failure_is_counted_and_run_completes() {
    let wl = two_bucket_whitelist();
    let catalog = StaticCatalog(vec![post("A", &["Neobanks"], 5)]);
    let store = MemoryStore::default();
    let publisher = RecordingPublisher::failing();
    let engine = Discovery::new(&catalog, &store, &publisher, &wl);

    let summary = engine
        .run(&params(Strategy::RoundRobin, 1, false))
        .await
        .unwrap();

    assert_eq!(summary.publish_failures, 1);
    assert!(summary.picks[0].outcome.contains("channel down"));
    assert!(summary.state_saved);
}

#[tokio::test]
async fn malformed_and_duplicate_records_are_dropped_and_counted() {
    let wl = two_bucket_whitelist();
    let mut no_date = post("nd", &["Neobanks"], 5);
    no_date.created_at = None;
    let catalog = StaticCatalog(vec![
        RawRecord::default(),
        no_date,
        post("A", &["Neobanks"], 5),
        post("A", &["Neobanks"], 99),
    ]);
    let store = MemoryStore::default();
    let publisher = RecordingPublisher::default();
    let engine = Discovery::new(&catalog, &store, &publisher, &wl);

    let summary = engine
        .run(&params(Strategy::RoundRobin, 5, true))
        .await
        .unwrap();

    assert_eq!(summary.fetched, 4);
    assert_eq!(summary.malformed, 2);
    assert_eq!(summary.duplicates, 1);
    assert_eq!(summary.normalized, 1);
    assert_eq!(summary.selected, 1);
}

#[tokio::test]
async fn round_robin_rotates_through_every_bucket_before_repeating() {
    let wl = TopicWhitelist::from_labels(["Neobanks", "Investing", "Tax preparation", "Payroll software"]);
    // Two candidates per bucket so every run has a choice in every bucket.
    let mut records = Vec::new();
    for (i, topic) in ["Neobanks", "Investing", "Tax preparation", "Payroll software"]
        .iter()
        .enumerate()
    {
        records.push(post(&format!("{i}a"), &[topic], 10));
        records.push(post(&format!("{i}b"), &[topic], 5));
    }
    let catalog = StaticCatalog(records);
    let store = MemoryStore::new(DedupState {
        rr_cursor: 2,
        ..Default::default()
    });
    let publisher = RecordingPublisher::default();
    let engine = Discovery::new(&catalog, &store, &publisher, &wl);

    for _ in 0..wl.len() {
        engine
            .run(&params(Strategy::RoundRobin, 1, false))
            .await
            .unwrap();
    }

    // Starting at bucket 2, then 3, 0, 1: every bucket once, best first.
    assert_eq!(publisher.ids(), vec!["2a", "3a", "0a", "1a"]);
    assert_eq!(store.snapshot().rr_cursor, 2);
}

#[tokio::test]
async fn round_robin_is_deterministic_for_identical_inputs() {
    let wl = TopicWhitelist::finance_default();
    let records = vec![
        post("x", &["Investing", "Neobanks"], 7),
        post("y", &["Investing"], 7),
        post("z", &["Tax preparation"], 1),
    ];
    let mut picks = Vec::new();
    for _ in 0..2 {
        let catalog = StaticCatalog(records.clone());
        let store = MemoryStore::new(DedupState {
            rr_cursor: 3,
            ..Default::default()
        });
        let publisher = RecordingPublisher::default();
        let engine = Discovery::new(&catalog, &store, &publisher, &wl);
        engine
            .run(&params(Strategy::RoundRobin, 3, false))
            .await
            .unwrap();
        picks.push((publisher.ids(), store.snapshot().rr_cursor));
    }
    assert_eq!(picks[0], picks[1]);
}

#[tokio::test]
async fn random_strategy_leaves_cursor_alone() {
    let wl = two_bucket_whitelist();
    let catalog = StaticCatalog(vec![
        post("A", &["Neobanks"], 50),
        post("B", &["Payroll software"], 80),
    ]);
    let store = MemoryStore::new(DedupState {
        rr_cursor: 1,
        ..Default::default()
    });
    let publisher = RecordingPublisher::default();
    let engine = Discovery::new(&catalog, &store, &publisher, &wl);
    let mut rng = StdRng::seed_from_u64(11);

    let summary = engine
        .run_with_rng(&params(Strategy::Random, 5, false), &mut rng)
        .await
        .unwrap();

    assert_eq!(summary.selected, 2);
    let state = store.snapshot();
    assert_eq!(state.rr_cursor, 1);
    assert_eq!(state.seen_ids.len(), 2);
}

#[tokio::test]
async fn selections_never_repeat_across_runs() {
    let wl = two_bucket_whitelist();
    let catalog = StaticCatalog(vec![
        post("A", &["Neobanks"], 50),
        post("B", &["Neobanks"], 40),
        post("C", &["Payroll software"], 30),
    ]);
    let store = MemoryStore::default();
    let publisher = RecordingPublisher::default();
    let engine = Discovery::new(&catalog, &store, &publisher, &wl);

    for _ in 0..5 {
        let before = store.snapshot();
        let summary = engine
            .run(&params(Strategy::RoundRobin, 1, false))
            .await
            .unwrap();
        for p in &summary.picks {
            assert!(!before.is_seen(&p.id));
        }
    }
    let mut ids = publisher.ids();
    ids.sort();
    assert_eq!(ids, vec!["A", "B", "C"]);
}

#[tokio::test]
async fn rotation_survives_a_reordered_whitelist() {
    let catalog = StaticCatalog(vec![
        post("n", &["Neobanks"], 5),
        post("i", &["Investing"], 5),
        post("t", &["Tax preparation"], 5),
    ]);
    let store = MemoryStore::default();
    let publisher = RecordingPublisher::default();

    let first = TopicWhitelist::from_labels(["Neobanks", "Investing", "Tax preparation"]);
    Discovery::new(&catalog, &store, &publisher, &first)
        .run(&params(Strategy::RoundRobin, 1, false))
        .await
        .unwrap();
    assert_eq!(store.snapshot().last_topic.as_deref(), Some("neobanks"));

    // Same topics, new order: the bucket after "neobanks" is now "tax-preparation".
    let reordered = TopicWhitelist::from_labels(["Investing", "Neobanks", "Tax preparation"]);
    let summary = Discovery::new(&catalog, &store, &publisher, &reordered)
        .run(&params(Strategy::RoundRobin, 1, false))
        .await
        .unwrap();
    assert_eq!(summary.rr_cursor_before, 2);
    assert_eq!(publisher.ids(), vec!["n", "t"]);
    assert_eq!(store.snapshot().last_topic.as_deref(), Some("tax-preparation"));
}

