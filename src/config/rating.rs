//! Rating model configuration

use crate::error::{Result, ScorekeeperError};
use crate::rating::team::TeamOutcomeMode;
use serde::{Deserialize, Serialize};

/// Parameters of the rating model and team aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    /// Skill estimate given to an entity on its first match
    pub initial_value: f64,
    /// Uncertainty given to an entity on its first match
    pub initial_deviation: f64,
    /// Lowest deviation an update may produce
    pub deviation_floor: f64,
    /// Highest deviation a rating may carry
    pub deviation_ceiling: f64,
    /// How each participant's rating period is assembled for a match
    pub team_outcomes: TeamOutcomeMode,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            initial_value: 1500.0,
            initial_deviation: 350.0,
            deviation_floor: 30.0,
            deviation_ceiling: 350.0,
            team_outcomes: TeamOutcomeMode::default(),
        }
    }
}

impl RatingConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        let values = [
            ("initial_value", self.initial_value),
            ("initial_deviation", self.initial_deviation),
            ("deviation_floor", self.deviation_floor),
            ("deviation_ceiling", self.deviation_ceiling),
        ];
        for (name, value) in values {
            if !value.is_finite() {
                return Err(ScorekeeperError::Configuration {
                    message: format!("{} must be finite", name),
                });
            }
        }

        if self.deviation_floor <= 0.0 {
            return Err(ScorekeeperError::Configuration {
                message: "Deviation floor must be positive".to_string(),
            });
        }

        if self.deviation_floor > self.deviation_ceiling {
            return Err(ScorekeeperError::Configuration {
                message: "Deviation floor must not exceed the ceiling".to_string(),
            });
        }

        if self.initial_deviation < self.deviation_floor
            || self.initial_deviation > self.deviation_ceiling
        {
            return Err(ScorekeeperError::Configuration {
                message: format!(
                    "Initial deviation {} must lie within [{}, {}]",
                    self.initial_deviation, self.deviation_floor, self.deviation_ceiling
                ),
            });
        }

        Ok(())
    }
}
