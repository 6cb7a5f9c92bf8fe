//! Win/loss/draw counters and streak tracking
//!
//! A statistic row is updated incrementally, once per match and in match
//! order. Applying a result twice or out of order corrupts the streak state
//! and cannot be undone here.

use crate::types::{MatchResult, Statistic};

/// Ratio of wins to losses, dividing by at least one loss.
///
/// An entity without losses therefore ranks by its win count.
pub fn win_loss_ratio(wins: u32, losses: u32) -> f64 {
    wins as f64 / losses.max(1) as f64
}

/// Apply one match result to `stat`. Pure: the caller stamps timestamps.
pub fn apply_match_result(stat: &Statistic, result: MatchResult) -> Statistic {
    let mut updated = stat.clone();
    updated.matches_played = updated.matches_played.saturating_add(1);

    match result {
        MatchResult::Win => {
            updated.wins = updated.wins.saturating_add(1);
            updated.win_streak = updated.win_streak.saturating_add(1);
            updated.loss_streak = 0;
        }
        MatchResult::Loss => {
            updated.losses = updated.losses.saturating_add(1);
            updated.loss_streak = updated.loss_streak.saturating_add(1);
            updated.win_streak = 0;
        }
        MatchResult::Draw => {
            updated.draws = updated.draws.saturating_add(1);
            updated.win_streak = 0;
            updated.loss_streak = 0;
        }
    }

    updated.win_loss_ratio = win_loss_ratio(updated.wins, updated.losses);
    updated
}
