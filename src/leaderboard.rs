//! Leaderboard queries
//!
//! Rankings are computed in-process from a snapshot of an organization's
//! rows. Entries are ordered by metric value, highest first, and entities
//! with equal values by ascending ID.

use crate::config::{LeaderboardSettings, MAX_LEADERBOARD_SIZE};
use crate::error::{Result, ScorekeeperError, Stage};
use crate::metrics::EngineMetrics;
use crate::store::MatchStore;
use crate::types::{EntityId, LeaderboardEntry, LeaderboardMetric, OrganizationId};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Order `values` and keep the first `x`
pub fn rank_entries(mut values: Vec<(EntityId, f64)>, x: usize) -> Vec<LeaderboardEntry> {
    values.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    values.truncate(x);

    values
        .into_iter()
        .enumerate()
        .map(|(i, (entity_id, metric_value))| LeaderboardEntry {
            entity_id,
            metric_value,
            rank: i + 1,
        })
        .collect()
}

/// Read-only leaderboard over a match store
pub struct Leaderboard {
    store: Arc<dyn MatchStore>,
    settings: LeaderboardSettings,
    metrics: Option<Arc<EngineMetrics>>,
}

impl Leaderboard {
    /// Create a new leaderboard
    pub fn new(store: Arc<dyn MatchStore>, settings: LeaderboardSettings) -> Result<Self> {
        if settings.max_size == 0 || settings.max_size > MAX_LEADERBOARD_SIZE {
            return Err(ScorekeeperError::Configuration {
                message: format!(
                    "leaderboard max size must be between 1 and {}",
                    MAX_LEADERBOARD_SIZE
                ),
            });
        }

        Ok(Self {
            store,
            settings,
            metrics: None,
        })
    }

    /// Report served queries to `metrics`
    pub fn with_metrics(mut self, metrics: Arc<EngineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Top `x` entities for a metric given by its request token
    /// (`wins`, `win-streak`, `loss-streak`, `win-loss-ratio`, `rating`,
    /// `matches-played`).
    pub async fn get_top_x(
        &self,
        organization_id: OrganizationId,
        metric: &str,
        x: usize,
    ) -> Result<Vec<LeaderboardEntry>> {
        let metric: LeaderboardMetric = metric.parse()?;
        self.top_x(organization_id, metric, x).await
    }

    /// Top `x` entities of an organization by `metric`.
    ///
    /// Asking for more entities than exist returns all of them.
    pub async fn top_x(
        &self,
        organization_id: OrganizationId,
        metric: LeaderboardMetric,
        x: usize,
    ) -> Result<Vec<LeaderboardEntry>> {
        self.validate_size(x)?;

        let values = self.load_metric_values(organization_id, metric).await?;
        let entries = rank_entries(values, x);
        self.served(organization_id, metric, &entries);
        Ok(entries)
    }

    /// Like [`Leaderboard::top_x`], restricted to `entity_ids`
    pub async fn top_x_among(
        &self,
        organization_id: OrganizationId,
        metric: LeaderboardMetric,
        x: usize,
        entity_ids: &[EntityId],
    ) -> Result<Vec<LeaderboardEntry>> {
        self.validate_size(x)?;

        let wanted: HashSet<EntityId> = entity_ids.iter().copied().collect();
        let values = self
            .load_metric_values(organization_id, metric)
            .await?
            .into_iter()
            .filter(|(entity_id, _)| wanted.contains(entity_id))
            .collect();
        let entries = rank_entries(values, x);
        self.served(organization_id, metric, &entries);
        Ok(entries)
    }

    fn validate_size(&self, x: usize) -> Result<()> {
        if x == 0 || x > self.settings.max_size {
            return Err(ScorekeeperError::Validation {
                reason: format!(
                    "leaderboard size must be between 1 and {}, got {}",
                    self.settings.max_size, x
                ),
            });
        }
        Ok(())
    }

    fn served(
        &self,
        organization_id: OrganizationId,
        metric: LeaderboardMetric,
        entries: &[LeaderboardEntry],
    ) {
        info!(
            organization_id,
            metric = %metric,
            entries = entries.len(),
            "Leaderboard served"
        );
        if let Some(metrics) = &self.metrics {
            metrics.leaderboard_served(metric);
        }
    }

    /// Metric value of every eligible entity, retrying transient read failures
    async fn load_metric_values(
        &self,
        organization_id: OrganizationId,
        metric: LeaderboardMetric,
    ) -> Result<Vec<(EntityId, f64)>> {
        let mut attempt = 0;
        loop {
            match self.read_metric_values(organization_id, metric).await {
                Ok(values) => return Ok(values),
                Err(e) if e.is_retryable() && attempt < self.settings.read_retry_attempts => {
                    attempt += 1;
                    warn!(
                        organization_id,
                        metric = %metric,
                        attempt,
                        "Retrying leaderboard read: {}", e
                    );
                    tokio::time::sleep(self.settings.read_retry_delay()).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn read_metric_values(
        &self,
        organization_id: OrganizationId,
        metric: LeaderboardMetric,
    ) -> Result<Vec<(EntityId, f64)>> {
        if metric.reads_ratings() {
            let ratings = self
                .store
                .list_ratings(organization_id)
                .await
                .map_err(ScorekeeperError::persistence(Stage::QueryLeaderboard))?;
            return Ok(ratings
                .into_iter()
                .map(|rating| (rating.entity_id, rating.value))
                .collect());
        }

        let statistics = self
            .store
            .list_statistics(organization_id)
            .await
            .map_err(ScorekeeperError::persistence(Stage::QueryLeaderboard))?;
        Ok(statistics
            .iter()
            .filter_map(|stat| {
                metric
                    .statistic_value(stat)
                    .map(|value| (stat.entity_id, value))
            })
            .collect())
    }
}
