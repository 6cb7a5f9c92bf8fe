//! Match recording engine
//!
//! `MatchEngine::record_match` is the only write path for ratings and
//! statistics. For one match it loads every participant's rows, averages both
//! sides, applies the rating and statistic updates and writes all changed rows
//! in a single batch.

use crate::config::{AppConfig, EngineSettings, RatingConfig};
use crate::error::{Result, ScorekeeperError, Stage};
use crate::metrics::EngineMetrics;
use crate::rating::{build_period_outcomes, team_average, GlickoRatingModel, TeamOutcomeMode};
use crate::statistic::apply_match_result;
use crate::store::{MatchBatch, MatchStore};
use crate::types::{
    EntityId, MatchRecord, MatchResult, MatchSummary, OrganizationId, ParticipantUpdate, Rating,
    Statistic,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

/// What to do with a participant that has no rating or statistic row yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingEntityPolicy {
    /// Start the participant from the configured default rating
    #[default]
    CreateDefault,
    /// Fail the match with a not-found error
    Reject,
}

impl fmt::Display for MissingEntityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingEntityPolicy::CreateDefault => write!(f, "create-default"),
            MissingEntityPolicy::Reject => write!(f, "reject"),
        }
    }
}

impl FromStr for MissingEntityPolicy {
    type Err = ScorekeeperError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "create-default" => Ok(MissingEntityPolicy::CreateDefault),
            "reject" => Ok(MissingEntityPolicy::Reject),
            other => Err(ScorekeeperError::Configuration {
                message: format!("unknown missing entity policy: {}", other),
            }),
        }
    }
}

/// Striped locks over (organization, entity) pairs.
///
/// Stripes are always taken in ascending order, so two matches can never
/// wait on each other in a cycle.
#[derive(Debug)]
struct ParticipantLocks {
    stripes: Vec<Mutex<()>>,
}

impl ParticipantLocks {
    fn new(stripes: usize) -> Self {
        Self {
            stripes: (0..stripes.max(1)).map(|_| Mutex::new(())).collect(),
        }
    }

    fn stripe_of(&self, organization_id: OrganizationId, entity_id: EntityId) -> usize {
        let mut hasher = DefaultHasher::new();
        (organization_id, entity_id).hash(&mut hasher);
        (hasher.finish() % self.stripes.len() as u64) as usize
    }

    async fn acquire(
        &self,
        organization_id: OrganizationId,
        entity_ids: &[EntityId],
    ) -> Vec<MutexGuard<'_, ()>> {
        let mut indices: Vec<usize> = entity_ids
            .iter()
            .map(|entity_id| self.stripe_of(organization_id, *entity_id))
            .collect();
        indices.sort_unstable();
        indices.dedup();

        let mut guards = Vec::with_capacity(indices.len());
        for index in indices {
            guards.push(self.stripes[index].lock().await);
        }
        guards
    }
}

/// Check both rosters before anything is loaded
fn validate_rosters(record: &MatchRecord) -> Result<()> {
    if record.winning_entity_ids.is_empty() {
        return Err(ScorekeeperError::Validation {
            reason: "winning roster is empty".to_string(),
        });
    }
    if record.losing_entity_ids.is_empty() {
        return Err(ScorekeeperError::Validation {
            reason: "losing roster is empty".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for entity_id in record.participants() {
        if !seen.insert(entity_id) {
            return Err(ScorekeeperError::Validation {
                reason: format!("entity {} appears more than once in the match", entity_id),
            });
        }
    }

    Ok(())
}

/// Engine that records matches and owns every rating/statistic mutation
pub struct MatchEngine {
    store: Arc<dyn MatchStore>,
    model: GlickoRatingModel,
    team_outcomes: TeamOutcomeMode,
    missing_entity_policy: MissingEntityPolicy,
    locks: ParticipantLocks,
    metrics: Option<Arc<EngineMetrics>>,
}

impl MatchEngine {
    /// Create a new engine over `store`
    pub fn new(
        store: Arc<dyn MatchStore>,
        rating: RatingConfig,
        settings: &EngineSettings,
    ) -> Result<Self> {
        if settings.lock_stripes == 0 {
            return Err(ScorekeeperError::Configuration {
                message: "lock_stripes must be greater than 0".to_string(),
            });
        }

        let team_outcomes = rating.team_outcomes;
        Ok(Self {
            store,
            model: GlickoRatingModel::new(rating)?,
            team_outcomes,
            missing_entity_policy: settings.missing_entity_policy,
            locks: ParticipantLocks::new(settings.lock_stripes),
            metrics: None,
        })
    }

    /// Create an engine from the application configuration
    pub fn from_config(store: Arc<dyn MatchStore>, config: &AppConfig) -> Result<Self> {
        Self::new(store, config.rating.clone(), &config.engine)
    }

    /// Report outcomes to `metrics`
    pub fn with_metrics(mut self, metrics: Arc<EngineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn model(&self) -> &GlickoRatingModel {
        &self.model
    }

    /// Record one match.
    ///
    /// Either every participant's rating and statistic is updated, or none
    /// is. Matches sharing a participant are applied one after another;
    /// matches with disjoint participants proceed independently.
    pub async fn record_match(&self, record: &MatchRecord) -> Result<MatchSummary> {
        let started = Instant::now();
        let result = self.record_match_locked(record).await;

        match &result {
            Ok(summary) => {
                info!(
                    organization_id = record.organization_id,
                    draw = record.draw,
                    participants = summary.participants.len(),
                    "Match recorded"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_match_committed(
                        record.draw,
                        summary.participants.len(),
                        started.elapsed(),
                    );
                }
            }
            Err(e) => {
                match e {
                    ScorekeeperError::Consistency { .. } => {
                        error!(organization_id = record.organization_id, "{}", e)
                    }
                    _ => warn!(
                        organization_id = record.organization_id,
                        "Failed to record match: {}", e
                    ),
                }
                if let Some(metrics) = &self.metrics {
                    metrics.record_match_failed(e);
                }
            }
        }

        result
    }

    async fn record_match_locked(&self, record: &MatchRecord) -> Result<MatchSummary> {
        validate_rosters(record)?;

        let organization_id = record.organization_id;
        let participants = record.participants();
        let _guards = self.locks.acquire(organization_id, &participants).await;

        let mut ratings = self
            .store
            .load_ratings(organization_id, &participants)
            .await
            .map_err(ScorekeeperError::persistence(Stage::LoadRatings))?;
        let mut statistics = self
            .store
            .load_statistics(organization_id, &participants)
            .await
            .map_err(ScorekeeperError::persistence(Stage::LoadStatistics))?;

        let winners = self.resolve_roster(
            organization_id,
            &record.winning_entity_ids,
            &mut ratings,
            &mut statistics,
        )?;
        let losers = self.resolve_roster(
            organization_id,
            &record.losing_entity_ids,
            &mut ratings,
            &mut statistics,
        )?;

        let winner_average = team_average(winners.iter().map(|(rating, _)| rating))?;
        let loser_average = team_average(losers.iter().map(|(rating, _)| rating))?;

        let winner_result = record.winner_result();
        let loser_result = winner_result.mirrored();
        let winner_outcomes = build_period_outcomes(
            self.team_outcomes,
            winner_result,
            winner_average,
            loser_average,
        );
        let loser_outcomes = build_period_outcomes(
            self.team_outcomes,
            loser_result,
            loser_average,
            winner_average,
        );

        let mut batch = MatchBatch {
            organization_id,
            ratings: Vec::with_capacity(participants.len()),
            statistics: Vec::with_capacity(participants.len()),
        };
        let mut updates = Vec::with_capacity(participants.len());

        let sides = [
            (winners, winner_result, &winner_outcomes),
            (losers, loser_result, &loser_outcomes),
        ];
        let now = Utc::now();
        for (roster, result, outcomes) in sides {
            for (rating, stat) in roster {
                let mut new_rating = self.model.apply_rating_update(&rating, outcomes);
                new_rating.updated_at = now;
                let mut new_stat = apply_match_result(&stat, result);
                new_stat.updated_at = now;

                debug!(
                    organization_id,
                    entity_id = rating.entity_id,
                    result = %result,
                    value = %format!("{:.2} -> {:.2}", rating.value, new_rating.value),
                    deviation = %format!("{:.2} -> {:.2}", rating.deviation, new_rating.deviation),
                    "Participant updated"
                );

                updates.push(participant_update(&rating, &new_rating, &new_stat, result));
                batch.ratings.push(new_rating);
                batch.statistics.push(new_stat);
            }
        }

        let expected = batch.expected_receipt();
        let receipt = self
            .store
            .commit_batch(batch)
            .await
            .map_err(ScorekeeperError::persistence(Stage::CommitBatch))?;

        if receipt != expected {
            return Err(ScorekeeperError::Consistency {
                message: format!(
                    "organization {}: expected {} ratings and {} statistics written, storage reported {} and {}",
                    organization_id,
                    expected.ratings_written,
                    expected.statistics_written,
                    receipt.ratings_written,
                    receipt.statistics_written
                ),
            });
        }

        Ok(MatchSummary {
            organization_id,
            draw: record.draw,
            participants: updates,
        })
    }

    /// Pair every roster member with its rows, applying the missing entity policy
    fn resolve_roster(
        &self,
        organization_id: OrganizationId,
        roster: &[EntityId],
        ratings: &mut HashMap<EntityId, Rating>,
        statistics: &mut HashMap<EntityId, Statistic>,
    ) -> Result<Vec<(Rating, Statistic)>> {
        roster
            .iter()
            .map(|&entity_id| -> Result<(Rating, Statistic)> {
                let rating = match ratings.remove(&entity_id) {
                    Some(rating) => rating,
                    None => self.missing_row(organization_id, entity_id, Stage::LoadRatings, || {
                        self.model.default_rating(organization_id, entity_id)
                    })?,
                };
                let stat = match statistics.remove(&entity_id) {
                    Some(stat) => stat,
                    None => self.missing_row(organization_id, entity_id, Stage::LoadStatistics, || {
                        Statistic::new(organization_id, entity_id)
                    })?,
                };
                Ok((rating, stat))
            })
            .collect()
    }

    fn missing_row<T>(
        &self,
        organization_id: OrganizationId,
        entity_id: EntityId,
        stage: Stage,
        create: impl FnOnce() -> T,
    ) -> Result<T> {
        match self.missing_entity_policy {
            MissingEntityPolicy::CreateDefault => {
                debug!(organization_id, entity_id, %stage, "Creating default row");
                Ok(create())
            }
            MissingEntityPolicy::Reject => Err(ScorekeeperError::NotFound {
                organization_id,
                entity_id,
                stage,
            }),
        }
    }
}

fn participant_update(
    old: &Rating,
    new: &Rating,
    statistic: &Statistic,
    result: MatchResult,
) -> ParticipantUpdate {
    ParticipantUpdate {
        entity_id: old.entity_id,
        result,
        old_value: old.value,
        new_value: new.value,
        old_deviation: old.deviation,
        new_deviation: new.deviation,
        statistic: statistic.clone(),
    }
}
