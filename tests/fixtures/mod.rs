//! Test fixtures and failure-injecting stores for integration testing

#![allow(dead_code)]

use async_trait::async_trait;
use scorekeeper::config::{AppConfig, LeaderboardSettings};
use scorekeeper::error::StoreResult;
use scorekeeper::store::{CommitReceipt, MatchBatch};
use scorekeeper::{
    EntityId, InMemoryMatchStore, Leaderboard, MatchEngine, MatchStore, OrganizationId, Rating,
    Statistic, StoreError,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const ORG: OrganizationId = 1;

/// Store wrapper that fails a configurable number of commits or reads
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: InMemoryMatchStore,
    failing_commits: AtomicUsize,
    failing_reads: AtomicUsize,
    commits: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: InMemoryMatchStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    /// Fail the next `n` commits
    pub fn fail_commits(&self, n: usize) {
        self.failing_commits.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` reads with a transient error
    pub fn fail_reads(&self, n: usize) {
        self.failing_reads.store(n, Ordering::SeqCst);
    }

    /// Number of commits that reached the inner store
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn read_failure(&self) -> StoreResult<()> {
        if Self::take_failure(&self.failing_reads) {
            return Err(StoreError::Unavailable {
                message: "injected read failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl MatchStore for FlakyStore {
    async fn load_ratings(
        &self,
        organization_id: OrganizationId,
        entity_ids: &[EntityId],
    ) -> StoreResult<HashMap<EntityId, Rating>> {
        self.read_failure()?;
        self.inner.load_ratings(organization_id, entity_ids).await
    }

    async fn load_statistics(
        &self,
        organization_id: OrganizationId,
        entity_ids: &[EntityId],
    ) -> StoreResult<HashMap<EntityId, Statistic>> {
        self.read_failure()?;
        self.inner.load_statistics(organization_id, entity_ids).await
    }

    async fn commit_batch(&self, batch: MatchBatch) -> StoreResult<CommitReceipt> {
        if Self::take_failure(&self.failing_commits) {
            return Err(StoreError::Backend(anyhow::anyhow!(
                "injected commit failure"
            )));
        }
        self.commits.fetch_add(1, Ordering::SeqCst);
        self.inner.commit_batch(batch).await
    }

    async fn list_ratings(&self, organization_id: OrganizationId) -> StoreResult<Vec<Rating>> {
        self.read_failure()?;
        self.inner.list_ratings(organization_id).await
    }

    async fn list_statistics(
        &self,
        organization_id: OrganizationId,
    ) -> StoreResult<Vec<Statistic>> {
        self.read_failure()?;
        self.inner.list_statistics(organization_id).await
    }
}

/// Ratings seeded at the given value and deviation
pub fn seeded_ratings(entries: &[(EntityId, f64, f64)]) -> Vec<Rating> {
    entries
        .iter()
        .map(|&(entity_id, value, deviation)| Rating::new(ORG, entity_id, value, deviation))
        .collect()
}

/// Default configuration without retry delays
pub fn test_config() -> AppConfig {
    AppConfig {
        leaderboard: LeaderboardSettings {
            read_retry_delay_ms: 0,
            ..LeaderboardSettings::default()
        },
        ..AppConfig::default()
    }
}

/// Engine and leaderboard sharing one store
pub fn create_test_system(store: Arc<dyn MatchStore>) -> (MatchEngine, Leaderboard) {
    let config = test_config();
    let engine = MatchEngine::from_config(store.clone(), &config).expect("engine");
    let leaderboard = Leaderboard::new(store, config.leaderboard).expect("leaderboard");
    (engine, leaderboard)
}

/// Full copy of an organization's rows, sorted by entity
pub async fn snapshot(
    store: &dyn MatchStore,
    organization_id: OrganizationId,
) -> (Vec<Rating>, Vec<Statistic>) {
    let mut ratings = store.list_ratings(organization_id).await.expect("ratings");
    let mut statistics = store
        .list_statistics(organization_id)
        .await
        .expect("statistics");
    ratings.sort_by_key(|r| r.entity_id);
    statistics.sort_by_key(|s| s.entity_id);
    (ratings, statistics)
}
