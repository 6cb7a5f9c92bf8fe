//! Persistence interface for ratings and statistics
//!
//! This module defines what the engine and leaderboard need from storage,
//! together with an in-memory implementation used by the CLI and tests.

use crate::error::{StoreError, StoreResult};
use crate::types::{EntityId, OrganizationId, Rating, Statistic};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// All rows changed by one match, written as a unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchBatch {
    pub organization_id: OrganizationId,
    /// Updated ratings. `version` holds the version the row was loaded at.
    pub ratings: Vec<Rating>,
    /// Updated statistics. `version` holds the version the row was loaded at.
    pub statistics: Vec<Statistic>,
}

impl MatchBatch {
    /// Receipt a fully applied commit of this batch must produce
    pub fn expected_receipt(&self) -> CommitReceipt {
        CommitReceipt {
            ratings_written: self.ratings.len(),
            statistics_written: self.statistics.len(),
        }
    }
}

/// What a commit reports it wrote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReceipt {
    pub ratings_written: usize,
    pub statistics_written: usize,
}

/// Trait for rating and statistic storage operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Get the ratings that exist for the given entities
    async fn load_ratings(
        &self,
        organization_id: OrganizationId,
        entity_ids: &[EntityId],
    ) -> StoreResult<HashMap<EntityId, Rating>>;

    /// Get the statistics that exist for the given entities
    async fn load_statistics(
        &self,
        organization_id: OrganizationId,
        entity_ids: &[EntityId],
    ) -> StoreResult<HashMap<EntityId, Statistic>>;

    /// Write every row of the batch, or none of them.
    ///
    /// A row whose stored version differs from the one in the batch fails
    /// the whole commit with [`StoreError::Conflict`].
    async fn commit_batch(&self, batch: MatchBatch) -> StoreResult<CommitReceipt>;

    /// Snapshot of all ratings of an organization
    async fn list_ratings(&self, organization_id: OrganizationId) -> StoreResult<Vec<Rating>>;

    /// Snapshot of all statistics of an organization
    async fn list_statistics(
        &self,
        organization_id: OrganizationId,
    ) -> StoreResult<Vec<Statistic>>;
}

#[derive(Debug, Clone, Default)]
struct OrganizationRows {
    ratings: HashMap<EntityId, Rating>,
    statistics: HashMap<EntityId, Statistic>,
}

/// In-memory match storage.
///
/// Both row kinds live behind a single lock, so a batch becomes visible to
/// readers all at once.
#[derive(Debug, Default)]
pub struct InMemoryMatchStore {
    organizations: RwLock<HashMap<OrganizationId, OrganizationRows>>,
}

impl InMemoryMatchStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding existing rows, e.g. restored from a snapshot
    pub fn with_rows(ratings: Vec<Rating>, statistics: Vec<Statistic>) -> Self {
        let mut organizations: HashMap<OrganizationId, OrganizationRows> = HashMap::new();
        for rating in ratings {
            organizations
                .entry(rating.organization_id)
                .or_default()
                .ratings
                .insert(rating.entity_id, rating);
        }
        for stat in statistics {
            organizations
                .entry(stat.organization_id)
                .or_default()
                .statistics
                .insert(stat.entity_id, stat);
        }

        Self {
            organizations: RwLock::new(organizations),
        }
    }

    /// Number of rating rows in an organization
    pub fn rating_count(&self, organization_id: OrganizationId) -> StoreResult<usize> {
        let organizations = self.read_guard()?;
        Ok(organizations
            .get(&organization_id)
            .map(|rows| rows.ratings.len())
            .unwrap_or(0))
    }

    fn read_guard(
        &self,
    ) -> StoreResult<std::sync::RwLockReadGuard<'_, HashMap<OrganizationId, OrganizationRows>>>
    {
        self.organizations
            .read()
            .map_err(|_| StoreError::Backend(anyhow::anyhow!("Failed to acquire store read lock")))
    }

    fn write_guard(
        &self,
    ) -> StoreResult<std::sync::RwLockWriteGuard<'_, HashMap<OrganizationId, OrganizationRows>>>
    {
        self.organizations
            .write()
            .map_err(|_| StoreError::Backend(anyhow::anyhow!("Failed to acquire store write lock")))
    }
}

#[async_trait]
impl MatchStore for InMemoryMatchStore {
    async fn load_ratings(
        &self,
        organization_id: OrganizationId,
        entity_ids: &[EntityId],
    ) -> StoreResult<HashMap<EntityId, Rating>> {
        let organizations = self.read_guard()?;

        let mut result = HashMap::new();
        if let Some(rows) = organizations.get(&organization_id) {
            for entity_id in entity_ids {
                if let Some(rating) = rows.ratings.get(entity_id) {
                    result.insert(*entity_id, rating.clone());
                }
            }
        }

        Ok(result)
    }

    async fn load_statistics(
        &self,
        organization_id: OrganizationId,
        entity_ids: &[EntityId],
    ) -> StoreResult<HashMap<EntityId, Statistic>> {
        let organizations = self.read_guard()?;

        let mut result = HashMap::new();
        if let Some(rows) = organizations.get(&organization_id) {
            for entity_id in entity_ids {
                if let Some(stat) = rows.statistics.get(entity_id) {
                    result.insert(*entity_id, stat.clone());
                }
            }
        }

        Ok(result)
    }

    async fn commit_batch(&self, batch: MatchBatch) -> StoreResult<CommitReceipt> {
        let mut organizations = self.write_guard()?;
        let rows = organizations.entry(batch.organization_id).or_default();

        // Check every version before touching anything
        for rating in &batch.ratings {
            let stored = rows.ratings.get(&rating.entity_id).map(|r| r.version);
            if stored.unwrap_or(0) != rating.version {
                return Err(StoreError::Conflict {
                    entity_id: rating.entity_id,
                });
            }
        }
        for stat in &batch.statistics {
            let stored = rows.statistics.get(&stat.entity_id).map(|s| s.version);
            if stored.unwrap_or(0) != stat.version {
                return Err(StoreError::Conflict {
                    entity_id: stat.entity_id,
                });
            }
        }

        let receipt = batch.expected_receipt();
        for mut rating in batch.ratings {
            rating.version += 1;
            rows.ratings.insert(rating.entity_id, rating);
        }
        for mut stat in batch.statistics {
            stat.version += 1;
            rows.statistics.insert(stat.entity_id, stat);
        }

        Ok(receipt)
    }

    async fn list_ratings(&self, organization_id: OrganizationId) -> StoreResult<Vec<Rating>> {
        let organizations = self.read_guard()?;
        Ok(organizations
            .get(&organization_id)
            .map(|rows| rows.ratings.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn list_statistics(
        &self,
        organization_id: OrganizationId,
    ) -> StoreResult<Vec<Statistic>> {
        let organizations = self.read_guard()?;
        Ok(organizations
            .get(&organization_id)
            .map(|rows| rows.statistics.values().cloned().collect())
            .unwrap_or_default())
    }
}
