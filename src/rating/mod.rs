//! Rating model and team aggregation
//!
//! This module provides the Glicko rating update with bounded deviation and
//! the pure helpers that turn a team match into per-participant rating
//! periods.

pub mod glicko;
pub mod team;

// Re-export commonly used types
pub use glicko::GlickoRatingModel;
pub use team::{build_period_outcomes, team_average, TeamOutcomeMode};
