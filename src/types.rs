//! Common types used throughout the rating engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skillratings::glicko::GlickoRating;
use skillratings::Outcomes;
use std::fmt;
use std::str::FromStr;

/// Identifier of a rated entity (a user or a team member)
pub type EntityId = u64;

/// Identifier of the organization that scopes every rating row
pub type OrganizationId = u64;

/// Result of a single match from one participant's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchResult {
    Win,
    Loss,
    Draw,
}

impl MatchResult {
    /// The same match seen from the other side
    pub fn mirrored(self) -> Self {
        match self {
            MatchResult::Win => MatchResult::Loss,
            MatchResult::Loss => MatchResult::Win,
            MatchResult::Draw => MatchResult::Draw,
        }
    }
}

impl From<MatchResult> for Outcomes {
    fn from(result: MatchResult) -> Self {
        match result {
            MatchResult::Win => Outcomes::WIN,
            MatchResult::Loss => Outcomes::LOSS,
            MatchResult::Draw => Outcomes::DRAW,
        }
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchResult::Win => write!(f, "win"),
            MatchResult::Loss => write!(f, "loss"),
            MatchResult::Draw => write!(f, "draw"),
        }
    }
}

/// Skill estimate of one entity inside one organization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub entity_id: EntityId,
    pub organization_id: OrganizationId,
    /// Skill estimate
    pub value: f64,
    /// Uncertainty of `value`, kept within the configured floor and ceiling
    pub deviation: f64,
    /// Optimistic concurrency version, bumped on every committed write
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Rating {
    /// Create a fresh, never-persisted rating row
    pub fn new(
        organization_id: OrganizationId,
        entity_id: EntityId,
        value: f64,
        deviation: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            entity_id,
            organization_id,
            value,
            deviation,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// The (value, deviation) pair as the rating model sees it
    pub fn glicko(&self) -> GlickoRating {
        GlickoRating {
            rating: self.value,
            deviation: self.deviation,
        }
    }
}

/// One observed result against a (possibly virtual) opponent.
/// Not persisted; it is the unit consumed by the rating update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub opponent_value: f64,
    pub opponent_deviation: f64,
    pub result: MatchResult,
}

impl MatchOutcome {
    pub fn new(opponent: TeamAverage, result: MatchResult) -> Self {
        Self {
            opponent_value: opponent.value,
            opponent_deviation: opponent.deviation,
            result,
        }
    }
}

/// Arithmetic mean of one side's ratings, standing in as a single virtual opponent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeamAverage {
    pub value: f64,
    pub deviation: f64,
}

/// Win/loss/streak counters of one entity inside one organization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistic {
    pub entity_id: EntityId,
    pub organization_id: OrganizationId,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub matches_played: u32,
    pub win_loss_ratio: f64,
    pub win_streak: u32,
    pub loss_streak: u32,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Statistic {
    /// Create an empty statistic row for an entity's first match
    pub fn new(organization_id: OrganizationId, entity_id: EntityId) -> Self {
        let now = Utc::now();
        Self {
            entity_id,
            organization_id,
            wins: 0,
            losses: 0,
            draws: 0,
            matches_played: 0,
            win_loss_ratio: 0.0,
            win_streak: 0,
            loss_streak: 0,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Ranking criterion accepted by the leaderboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LeaderboardMetric {
    Wins,
    WinStreak,
    LossStreak,
    WinLossRatio,
    Rating,
    MatchesPlayed,
}

impl LeaderboardMetric {
    pub const ALL: [LeaderboardMetric; 6] = [
        LeaderboardMetric::Wins,
        LeaderboardMetric::WinStreak,
        LeaderboardMetric::LossStreak,
        LeaderboardMetric::WinLossRatio,
        LeaderboardMetric::Rating,
        LeaderboardMetric::MatchesPlayed,
    ];

    /// Request token for this metric
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaderboardMetric::Wins => "wins",
            LeaderboardMetric::WinStreak => "win-streak",
            LeaderboardMetric::LossStreak => "loss-streak",
            LeaderboardMetric::WinLossRatio => "win-loss-ratio",
            LeaderboardMetric::Rating => "rating",
            LeaderboardMetric::MatchesPlayed => "matches-played",
        }
    }

    /// Whether the metric is read from rating rows rather than statistic rows
    pub fn reads_ratings(&self) -> bool {
        matches!(self, LeaderboardMetric::Rating)
    }

    /// Value of this metric for a statistic row. `Rating` is not a statistic metric.
    pub fn statistic_value(&self, stat: &Statistic) -> Option<f64> {
        match self {
            LeaderboardMetric::Wins => Some(stat.wins as f64),
            LeaderboardMetric::WinStreak => Some(stat.win_streak as f64),
            LeaderboardMetric::LossStreak => Some(stat.loss_streak as f64),
            LeaderboardMetric::WinLossRatio => Some(stat.win_loss_ratio),
            LeaderboardMetric::MatchesPlayed => Some(stat.matches_played as f64),
            LeaderboardMetric::Rating => None,
        }
    }
}

impl fmt::Display for LeaderboardMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeaderboardMetric {
    type Err = crate::error::ScorekeeperError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        LeaderboardMetric::ALL
            .into_iter()
            .find(|metric| metric.as_str() == token)
            .ok_or_else(|| crate::error::ScorekeeperError::Validation {
                reason: format!("unrecognized leaderboard metric: {:?}", token),
            })
    }
}

/// One row of a leaderboard response. Produced per query, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub entity_id: EntityId,
    pub metric_value: f64,
    /// 1-based position in the response
    pub rank: usize,
}

/// A recorded match as handed to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub organization_id: OrganizationId,
    #[serde(default)]
    pub draw: bool,
    pub winning_entity_ids: Vec<EntityId>,
    pub losing_entity_ids: Vec<EntityId>,
}

impl MatchRecord {
    pub fn new(
        organization_id: OrganizationId,
        draw: bool,
        winning_entity_ids: Vec<EntityId>,
        losing_entity_ids: Vec<EntityId>,
    ) -> Self {
        Self {
            organization_id,
            draw,
            winning_entity_ids,
            losing_entity_ids,
        }
    }

    /// Result for members of the winning roster
    pub fn winner_result(&self) -> MatchResult {
        if self.draw {
            MatchResult::Draw
        } else {
            MatchResult::Win
        }
    }

    /// All participants, winners first
    pub fn participants(&self) -> Vec<EntityId> {
        self.winning_entity_ids
            .iter()
            .chain(self.losing_entity_ids.iter())
            .copied()
            .collect()
    }
}

/// Before/after view of one participant, returned by `record_match`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantUpdate {
    pub entity_id: EntityId,
    pub result: MatchResult,
    pub old_value: f64,
    pub new_value: f64,
    pub old_deviation: f64,
    pub new_deviation: f64,
    pub statistic: Statistic,
}

impl ParticipantUpdate {
    pub fn value_delta(&self) -> f64 {
        self.new_value - self.old_value
    }
}

/// Everything `record_match` changed for one match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSummary {
    pub organization_id: OrganizationId,
    pub draw: bool,
    pub participants: Vec<ParticipantUpdate>,
}

impl MatchSummary {
    pub fn participant(&self, entity_id: EntityId) -> Option<&ParticipantUpdate> {
        self.participants.iter().find(|p| p.entity_id == entity_id)
    }
}
