//! Team aggregation
//!
//! A side with several members is treated as one virtual opponent whose
//! value and deviation are the arithmetic means of its members. This module
//! also decides which outcomes go into each participant's rating period.

use crate::error::{Result, ScorekeeperError};
use crate::types::{MatchOutcome, MatchResult, Rating, TeamAverage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the rating period of a match participant is assembled.
///
/// `Mirrored` adds an outcome against the participant's own side. Between
/// equally rated sides that outcome exactly cancels the one against the
/// opponents, so a winner would not gain value. `OpponentOnly` keeps the
/// winner's gain strictly positive and the exchange zero-sum for
/// symmetric sides, and is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TeamOutcomeMode {
    /// One outcome: own result against the opposing side's average
    #[default]
    OpponentOnly,
    /// Two outcomes: own result against the opposing side's average plus the
    /// mirrored result against the participant's own side's average
    Mirrored,
}

impl fmt::Display for TeamOutcomeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeamOutcomeMode::OpponentOnly => write!(f, "opponent-only"),
            TeamOutcomeMode::Mirrored => write!(f, "mirrored"),
        }
    }
}

impl FromStr for TeamOutcomeMode {
    type Err = ScorekeeperError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "opponent-only" => Ok(TeamOutcomeMode::OpponentOnly),
            "mirrored" => Ok(TeamOutcomeMode::Mirrored),
            other => Err(ScorekeeperError::Configuration {
                message: format!("unknown team outcome mode: {}", other),
            }),
        }
    }
}

/// Arithmetic mean of a roster's values and deviations.
///
/// An empty roster is a validation error; there is no meaningful virtual
/// opponent for it.
pub fn team_average<'a, I>(roster: I) -> Result<TeamAverage>
where
    I: IntoIterator<Item = &'a Rating>,
{
    let mut count = 0usize;
    let mut total_value = 0.0;
    let mut total_deviation = 0.0;

    for rating in roster {
        count += 1;
        total_value += rating.value;
        total_deviation += rating.deviation;
    }

    if count == 0 {
        return Err(ScorekeeperError::Validation {
            reason: "cannot average an empty roster".to_string(),
        });
    }

    Ok(TeamAverage {
        value: total_value / count as f64,
        deviation: total_deviation / count as f64,
    })
}

/// Outcomes fed to the rating update of one participant.
///
/// `own_result` is the participant's result, `own_side` the average of the
/// participant's roster and `opposing_side` the average of the other roster.
pub fn build_period_outcomes(
    mode: TeamOutcomeMode,
    own_result: MatchResult,
    own_side: TeamAverage,
    opposing_side: TeamAverage,
) -> Vec<MatchOutcome> {
    match mode {
        TeamOutcomeMode::OpponentOnly => vec![MatchOutcome::new(opposing_side, own_result)],
        TeamOutcomeMode::Mirrored => vec![
            MatchOutcome::new(opposing_side, own_result),
            MatchOutcome::new(own_side, own_result.mirrored()),
        ],
    }
}
