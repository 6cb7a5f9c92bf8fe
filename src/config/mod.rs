//! Configuration management for the scorekeeper
//!
//! This module handles configuration loading from environment variables and
//! TOML files, validation, and default values.

pub mod app;
pub mod rating;

// Re-export commonly used types
pub use app::{
    validate_config, AppConfig, EngineSettings, LeaderboardSettings, ServiceSettings,
    MAX_LEADERBOARD_SIZE,
};
pub use rating::RatingConfig;
