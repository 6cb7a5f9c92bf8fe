//! Integration tests for the scorekeeper
//!
//! These tests drive the engine and leaderboard together against a shared
//! store, covering full match flows and failure handling.

mod fixtures;

use fixtures::*;
use scorekeeper::{
    InMemoryMatchStore, LeaderboardMetric, MatchRecord, MatchStore, ScorekeeperError, Stage,
};
use std::sync::Arc;

fn in_memory() -> Arc<InMemoryMatchStore> {
    Arc::new(InMemoryMatchStore::new())
}

#[tokio::test]
async fn test_head_to_head_flow() {
    let store = in_memory();
    let (engine, leaderboard) = create_test_system(store.clone());

    let summary = engine
        .record_match(&MatchRecord::new(ORG, false, vec![1], vec![2]))
        .await
        .unwrap();

    let winner = summary.participant(1).unwrap();
    let loser = summary.participant(2).unwrap();
    assert!(winner.value_delta() > 0.0);
    assert!((winner.value_delta() + loser.value_delta()).abs() < 1e-9);
    assert!(winner.new_deviation <= winner.old_deviation);

    let board = leaderboard
        .top_x(ORG, LeaderboardMetric::Rating, 10)
        .await
        .unwrap();
    assert_eq!(board.len(), 2);
    assert_eq!(board[0].entity_id, 1);
    assert_eq!(board[0].rank, 1);
    assert_eq!(board[1].entity_id, 2);
    assert_eq!(board[1].rank, 2);
}

#[tokio::test]
async fn test_team_matches_feed_every_leaderboard() {
    let store = in_memory();
    let (engine, leaderboard) = create_test_system(store.clone());

    engine
        .record_match(&MatchRecord::new(ORG, false, vec![1, 2], vec![3, 4]))
        .await
        .unwrap();
    engine
        .record_match(&MatchRecord::new(ORG, false, vec![1, 3], vec![2, 4]))
        .await
        .unwrap();
    engine
        .record_match(&MatchRecord::new(ORG, true, vec![1], vec![4]))
        .await
        .unwrap();

    let wins = leaderboard.get_top_x(ORG, "wins", 4).await.unwrap();
    assert_eq!(wins[0].entity_id, 1);
    assert_eq!(wins[0].metric_value, 2.0);

    let played = leaderboard
        .get_top_x(ORG, "matches-played", 4)
        .await
        .unwrap();
    assert_eq!(played[0].entity_id, 1);
    assert_eq!(played[0].metric_value, 3.0);
    assert_eq!(played[1].entity_id, 4);
    assert_eq!(played[1].metric_value, 3.0);

    // Entity 4 lost twice but the closing draw reset its streak
    let losing = leaderboard.get_top_x(ORG, "loss-streak", 1).await.unwrap();
    assert_eq!(losing[0].entity_id, 2);
    assert_eq!(losing[0].metric_value, 1.0);

    // The draw ended entity 1's run of wins
    let streaks = leaderboard.get_top_x(ORG, "win-streak", 4).await.unwrap();
    assert!(streaks.iter().all(|e| e.entity_id != 1 || e.metric_value == 0.0));

    let ratio = leaderboard
        .get_top_x(ORG, "win-loss-ratio", 4)
        .await
        .unwrap();
    assert_eq!(ratio[0].entity_id, 1);
    assert_eq!(ratio[0].metric_value, 2.0);

    let ratings = leaderboard.get_top_x(ORG, "rating", 4).await.unwrap();
    assert_eq!(ratings[0].entity_id, 1);
    assert_eq!(ratings.last().unwrap().entity_id, 4);
}

#[tokio::test]
async fn test_organizations_are_isolated() {
    let store = in_memory();
    let (engine, leaderboard) = create_test_system(store.clone());

    engine
        .record_match(&MatchRecord::new(ORG, false, vec![1], vec![2]))
        .await
        .unwrap();
    engine
        .record_match(&MatchRecord::new(ORG + 1, false, vec![2], vec![1]))
        .await
        .unwrap();

    let first = leaderboard.get_top_x(ORG, "wins", 1).await.unwrap();
    let second = leaderboard.get_top_x(ORG + 1, "wins", 1).await.unwrap();
    assert_eq!(first[0].entity_id, 1);
    assert_eq!(second[0].entity_id, 2);
    assert_eq!(store.rating_count(ORG).unwrap(), 2);
    assert_eq!(store.rating_count(ORG + 1).unwrap(), 2);
}

#[tokio::test]
async fn test_empty_losing_roster_changes_nothing() {
    let store = Arc::new(InMemoryMatchStore::with_rows(
        seeded_ratings(&[(1, 1500.0, 200.0), (2, 1500.0, 200.0)]),
        Vec::new(),
    ));
    let (engine, _) = create_test_system(store.clone());
    let before = snapshot(store.as_ref(), ORG).await;

    let err = engine
        .record_match(&MatchRecord::new(ORG, false, vec![1, 2], vec![]))
        .await
        .unwrap_err();

    assert!(matches!(err, ScorekeeperError::Validation { .. }));
    assert_eq!(snapshot(store.as_ref(), ORG).await, before);
}

#[tokio::test]
async fn test_commit_failure_leaves_rows_untouched() {
    let store = Arc::new(FlakyStore::new(InMemoryMatchStore::with_rows(
        seeded_ratings(&[(1, 1600.0, 120.0), (2, 1400.0, 120.0)]),
        Vec::new(),
    )));
    let (engine, _) = create_test_system(store.clone());
    let before = snapshot(store.as_ref(), ORG).await;

    store.fail_commits(1);
    let err = engine
        .record_match(&MatchRecord::new(ORG, false, vec![2], vec![1]))
        .await
        .unwrap_err();

    match err {
        ScorekeeperError::Persistence { stage, .. } => assert_eq!(stage, Stage::CommitBatch),
        other => panic!("Unexpected error: {:?}", other),
    }
    assert_eq!(store.commit_count(), 0);
    assert_eq!(snapshot(store.as_ref(), ORG).await, before);

    // The same match goes through once the store recovers
    engine
        .record_match(&MatchRecord::new(ORG, false, vec![2], vec![1]))
        .await
        .unwrap();
    assert_eq!(store.commit_count(), 1);
}

#[tokio::test]
async fn test_read_failure_aborts_match_without_commit() {
    let store = Arc::new(FlakyStore::new(InMemoryMatchStore::new()));
    let (engine, _) = create_test_system(store.clone());

    store.fail_reads(1);
    let err = engine
        .record_match(&MatchRecord::new(ORG, false, vec![1], vec![2]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ScorekeeperError::Persistence {
            stage: Stage::LoadRatings,
            ..
        }
    ));
    assert_eq!(store.commit_count(), 0);
}

#[tokio::test]
async fn test_leaderboard_retries_transient_reads() {
    let store = Arc::new(FlakyStore::new(InMemoryMatchStore::new()));
    let (engine, leaderboard) = create_test_system(store.clone());

    engine
        .record_match(&MatchRecord::new(ORG, false, vec![1], vec![2]))
        .await
        .unwrap();

    store.fail_reads(2);
    let board = leaderboard.get_top_x(ORG, "wins", 2).await.unwrap();
    assert_eq!(board[0].entity_id, 1);

    store.fail_reads(3);
    let err = leaderboard.get_top_x(ORG, "wins", 2).await.unwrap_err();
    assert!(matches!(
        err,
        ScorekeeperError::Persistence {
            stage: Stage::QueryLeaderboard,
            ..
        }
    ));
}

#[tokio::test]
async fn test_deviation_stays_within_bounds() {
    let store = in_memory();
    let (engine, _) = create_test_system(store.clone());
    let config = test_config().rating;

    for round in 0..60u64 {
        let (winner, loser) = if round % 3 == 0 { (1, 2) } else { (2, 1) };
        engine
            .record_match(&MatchRecord::new(ORG, round % 7 == 0, vec![winner], vec![loser]))
            .await
            .unwrap();
    }

    let (ratings, statistics) = snapshot(store.as_ref(), ORG).await;
    for rating in &ratings {
        assert!(rating.deviation >= config.deviation_floor);
        assert!(rating.deviation <= config.deviation_ceiling);
        assert!(rating.value.is_finite());
    }
    for stat in &statistics {
        assert_eq!(stat.matches_played, 60);
        assert_eq!(stat.wins + stat.losses + stat.draws, 60);
        assert!(stat.win_streak == 0 || stat.loss_streak == 0);
    }
}

#[tokio::test]
async fn test_equal_draw_keeps_values() {
    let store = Arc::new(InMemoryMatchStore::with_rows(
        seeded_ratings(&[(1, 1700.0, 90.0), (2, 1700.0, 90.0)]),
        Vec::new(),
    ));
    let (engine, _) = create_test_system(store.clone());

    let summary = engine
        .record_match(&MatchRecord::new(ORG, true, vec![1], vec![2]))
        .await
        .unwrap();

    for update in &summary.participants {
        assert!(update.value_delta().abs() < 1e-9);
        assert_eq!(update.statistic.draws, 1);
        assert_eq!(update.statistic.win_streak, 0);
        assert_eq!(update.statistic.loss_streak, 0);
    }
}

#[tokio::test]
async fn test_leaderboard_ties_and_size_limits() {
    let store = in_memory();
    let (engine, leaderboard) = create_test_system(store.clone());

    // Entities 3 and 2 both end with one win; 1 has two
    engine
        .record_match(&MatchRecord::new(ORG, false, vec![1], vec![4]))
        .await
        .unwrap();
    engine
        .record_match(&MatchRecord::new(ORG, false, vec![1], vec![4]))
        .await
        .unwrap();
    engine
        .record_match(&MatchRecord::new(ORG, false, vec![3], vec![4]))
        .await
        .unwrap();
    engine
        .record_match(&MatchRecord::new(ORG, false, vec![2], vec![4]))
        .await
        .unwrap();

    let board = leaderboard.get_top_x(ORG, "wins", 3).await.unwrap();
    let ids: Vec<_> = board.iter().map(|e| e.entity_id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(
        board.iter().map(|e| e.rank).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );

    // More than exist returns everyone
    assert_eq!(leaderboard.get_top_x(ORG, "wins", 50).await.unwrap().len(), 4);

    assert!(matches!(
        leaderboard.get_top_x(ORG, "wins", 51).await,
        Err(ScorekeeperError::Validation { .. })
    ));
    assert!(matches!(
        leaderboard.get_top_x(ORG, "wins", 0).await,
        Err(ScorekeeperError::Validation { .. })
    ));
    assert!(matches!(
        leaderboard.get_top_x(ORG, "elo", 3).await,
        Err(ScorekeeperError::Validation { .. })
    ));

    // Reads are idempotent
    let again = leaderboard.get_top_x(ORG, "wins", 3).await.unwrap();
    assert_eq!(again, board);
}

#[tokio::test]
async fn test_top_x_among_subset() {
    let store = in_memory();
    let (engine, leaderboard) = create_test_system(store.clone());

    for loser in 2..=5 {
        engine
            .record_match(&MatchRecord::new(ORG, false, vec![1], vec![loser]))
            .await
            .unwrap();
    }

    let board = leaderboard
        .top_x_among(ORG, LeaderboardMetric::MatchesPlayed, 5, &[3, 5, 9])
        .await
        .unwrap();
    let ids: Vec<_> = board.iter().map(|e| e.entity_id).collect();
    assert_eq!(ids, vec![3, 5]);
}

#[tokio::test]
async fn test_store_rows_track_versions() {
    let store = in_memory();
    let (engine, _) = create_test_system(store.clone());

    for _ in 0..3 {
        engine
            .record_match(&MatchRecord::new(ORG, false, vec![1], vec![2]))
            .await
            .unwrap();
    }

    let ratings = store.load_ratings(ORG, &[1, 2]).await.unwrap();
    let statistics = store.load_statistics(ORG, &[1, 2]).await.unwrap();
    assert_eq!(ratings[&1].version, 3);
    assert_eq!(statistics[&2].version, 3);
    assert_eq!(statistics[&2].loss_streak, 3);
}
