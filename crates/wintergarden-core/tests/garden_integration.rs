//! Integration tests for the garden API.
//!
//! These drive the public surface end to end against real SQLite
//! databases, with a scripted random source so flower draws and
//! caterpillars are predictable.

use std::collections::VecDeque;

use proptest::prelude::*;
use wintergarden_core::bot::{AccessPolicy, InboundMessage, Reply, Router};
use wintergarden_core::reward::{ADVANCED_FLOWERS, BASE_FLOWERS};
use wintergarden_core::{
    Chance, Config, Database, Garden, IncrementOutcome, IncrementRequest, ProgressEngine,
    RecordStore, RequestGuard, RewardPolicy,
};

/// Caterpillars and flower indices from fixed queues; defaults when empty.
#[derive(Default)]
struct Script {
    caterpillars: VecDeque<bool>,
    picks: VecDeque<usize>,
}

impl Chance for Script {
    fn hit(&mut self, _probability: f64) -> bool {
        self.caterpillars.pop_front().unwrap_or(false)
    }

    fn pick(&mut self, len: usize) -> usize {
        self.picks.pop_front().unwrap_or(0) % len
    }
}

fn garden_with(script: Script) -> Garden<Database, Script> {
    let engine = ProgressEngine::new(Database::open_memory().unwrap(), RewardPolicy::default(), script);
    Garden::new(engine, RequestGuard::default())
}

fn request(user_id: i64, name: &str, amount: u64, request_id: i64) -> IncrementRequest {
    IncrementRequest {
        user_id,
        display_name: name.to_string(),
        amount,
        request_id,
    }
}

fn applied(outcome: IncrementOutcome) -> wintergarden_core::IncrementSummary {
    match outcome {
        IncrementOutcome::Applied(summary) => summary,
        IncrementOutcome::Duplicate => panic!("request unexpectedly treated as duplicate"),
    }
}

#[test]
fn test_threshold_crossing_scenario() {
    let garden = garden_with(Script::default());
    garden.store().ensure_user(1, "Anna").unwrap();
    garden.store().adjust_stitches(1, 480).unwrap();

    let summary = applied(garden.increment(&request(1, "Anna", 30, 1)).unwrap());
    assert_eq!(summary.stitches, 510);
    assert_eq!(summary.flowers_granted, 1);
    assert_eq!(summary.bouquet.len(), 1);
    assert!(BASE_FLOWERS.contains(&summary.bouquet[0].as_str()));
}

#[test]
fn test_leaderboard_ties_keep_insertion_order() {
    let garden = garden_with(Script::default());
    for (id, name, amount) in [(1, "a", 50), (2, "b", 200), (3, "c", 200), (4, "d", 10)] {
        garden.increment(&request(id, name, amount, id)).unwrap();
    }

    let top = garden.leaderboard(Some(3)).unwrap();
    let names: Vec<_> = top.iter().map(|r| r.display_name.as_str()).collect();
    assert_eq!(names, vec!["b", "c", "a"]);
    assert_eq!(top[0].stitch_count, 200);
    assert_eq!(top[2].stitch_count, 50);
}

#[test]
fn test_replay_applies_once() {
    let garden = garden_with(Script::default());
    applied(garden.increment(&request(1, "Anna", 25, 77)).unwrap());
    assert_eq!(
        garden.increment(&request(1, "Anna", 25, 77)).unwrap(),
        IncrementOutcome::Duplicate
    );
    assert_eq!(garden.user(1).unwrap().unwrap().record.stitch_count, 25);
}

#[test]
fn test_caterpillar_across_boundary_keeps_flowers() {
    let garden = garden_with(Script {
        caterpillars: VecDeque::from([false, true]),
        picks: VecDeque::new(),
    });
    applied(garden.increment(&request(1, "Anna", 520, 1)).unwrap());

    let summary = applied(garden.increment(&request(1, "Anna", 10, 2)).unwrap());
    assert!(summary.caterpillar);
    assert_eq!(summary.stitches, 430);
    assert_eq!(summary.flowers_granted, 0);
    assert_eq!(summary.bouquet.len(), 1);
    assert_eq!(garden.user(1).unwrap().unwrap().record.caterpillar_count, 1);
}

#[test]
fn test_rare_flowers_only_after_ten() {
    // Ten draws of the last base slot, then two of the last overall slot.
    let garden = garden_with(Script {
        caterpillars: VecDeque::new(),
        picks: std::iter::repeat(4).take(10).chain([7, 7]).collect(),
    });
    let summary = applied(garden.increment(&request(1, "Anna", 6000, 1)).unwrap());

    assert_eq!(summary.flowers_granted, 12);
    let (common, rare) = summary.bouquet.split_at(10);
    assert!(common.iter().all(|f| BASE_FLOWERS.contains(&f.as_str())));
    assert!(rare.iter().all(|f| ADVANCED_FLOWERS.contains(&f.as_str())));
}

#[test]
fn test_reset_forgets_everyone() {
    let garden = garden_with(Script::default());
    applied(garden.increment(&request(1, "Anna", 900, 1)).unwrap());
    applied(garden.increment(&request(2, "Boris", 30, 2)).unwrap());

    garden.reset_all().unwrap();
    assert!(garden.user(1).unwrap().is_none());
    assert!(garden.user(2).unwrap().is_none());
    assert!(garden.leaderboard(None).unwrap().is_empty());
    assert!(garden.full_export().unwrap().rows.is_empty());
}

#[test]
fn test_file_backed_garden_survives_reopen() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut config = Config::default();
    config.storage.database_path = Some(dir.path().join("garden.db"));

    {
        let garden = Garden::from_config(&config).unwrap();
        garden.store().ensure_user(3, "Vera").unwrap();
        garden.store().adjust_stitches(3, 1200).unwrap();
        garden.store().append_flower(3, "🌹").unwrap();
    }

    let garden = Garden::from_config(&config).unwrap();
    let profile = garden.user(3).unwrap().unwrap();
    assert_eq!(profile.record.stitch_count, 1200);
    assert_eq!(profile.bouquet, vec!["🌹"]);
}

#[test]
fn test_router_round_trip_from_json_lines() {
    let garden = garden_with(Script::default());
    let router = Router::new(
        garden,
        AccessPolicy {
            allowed_chat_id: Some(-5),
            admin_id: None,
            bot_username: None,
        },
    );

    let line = r#"{"message_id": 10, "chat_id": -5, "user_id": 8, "first_name": "Lena", "text": "/add 500"}"#;
    let message: InboundMessage = serde_json::from_str(line).unwrap();
    let reply = router.handle(&message).unwrap();
    let json = serde_json::to_value(&reply).unwrap();
    assert_eq!(json["kind"], "text");
    assert_eq!(json["chat_id"], -5);

    match reply {
        Reply::Text { text, .. } => assert!(text.contains("Lena, you now have 500 stitches")),
        other => panic!("unexpected reply {other:?}"),
    }
}

proptest! {
    #[test]
    fn calm_increments_sum_exactly(amounts in proptest::collection::vec(1u64..2_000, 1..40)) {
        let garden = garden_with(Script::default());
        for (i, amount) in amounts.iter().enumerate() {
            let summary = applied(garden.increment(&request(1, "Anna", *amount, i as i64)).unwrap());
            prop_assert!(!summary.caterpillar);
        }

        let total: u64 = amounts.iter().sum();
        let profile = garden.user(1).unwrap().unwrap();
        prop_assert_eq!(profile.record.stitch_count, total);
        prop_assert_eq!(profile.bouquet.len() as u64, total / 500);
    }
}
