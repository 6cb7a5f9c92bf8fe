//! Glicko rating model
//!
//! Ratings are updated once per match with a rating period built from the
//! match's outcomes. The heavy lifting is done by the Glicko implementation
//! of the skillratings crate; this module adds the deviation bounds and the
//! rule that an update never increases a rating's deviation.

use crate::config::RatingConfig;
use crate::error::Result;
use crate::types::{EntityId, MatchOutcome, OrganizationId, Rating};
use skillratings::glicko::{glicko_rating_period, GlickoConfig, GlickoRating};
use skillratings::Outcomes;

/// Glicko rating model with bounded deviation
#[derive(Debug, Clone)]
pub struct GlickoRatingModel {
    config: RatingConfig,
    glicko_config: GlickoConfig,
}

impl GlickoRatingModel {
    /// Create a new rating model
    pub fn new(config: RatingConfig) -> Result<Self> {
        config.validate()?;

        // No inactivity decay: a rating period may only shrink the deviation.
        let glicko_config = GlickoConfig { c: 0.0 };

        Ok(Self {
            config,
            glicko_config,
        })
    }

    /// Rating given to an entity on its first match
    pub fn default_rating(&self, organization_id: OrganizationId, entity_id: EntityId) -> Rating {
        Rating::new(
            organization_id,
            entity_id,
            self.config.initial_value,
            self.config.initial_deviation,
        )
    }

    /// Clamp a deviation into `[deviation_floor, deviation_ceiling]`
    pub fn clamp_deviation(&self, deviation: f64) -> f64 {
        deviation.clamp(self.config.deviation_floor, self.config.deviation_ceiling)
    }

    /// Apply one rating period to `rating`.
    ///
    /// Pure: timestamps and versions are left for the caller to stamp. An
    /// empty period only re-clamps the deviation.
    pub fn apply_rating_update(&self, rating: &Rating, outcomes: &[MatchOutcome]) -> Rating {
        let mut updated = rating.clone();
        let deviation = self.clamp_deviation(rating.deviation);
        updated.deviation = deviation;

        if outcomes.is_empty() {
            return updated;
        }

        let player = updated.glicko();
        let results: Vec<(GlickoRating, Outcomes)> = outcomes
            .iter()
            .map(|outcome| {
                (
                    GlickoRating {
                        rating: outcome.opponent_value,
                        deviation: outcome.opponent_deviation,
                    },
                    outcome.result.into(),
                )
            })
            .collect();

        let next = glicko_rating_period(&player, &results, &self.glicko_config);

        updated.value = next.rating;
        updated.deviation = self.clamp_deviation(next.deviation.min(deviation));
        updated
    }
}
