//! Main application configuration
//!
//! This module defines the top-level configuration of the scorekeeper,
//! including environment variable and TOML file loading and validation.

use crate::config::RatingConfig;
use crate::engine::MissingEntityPolicy;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Largest leaderboard a single query may request
pub const MAX_LEADERBOARD_SIZE: usize = 50;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub rating: RatingConfig,
    pub engine: EngineSettings,
    pub leaderboard: LeaderboardSettings,
}

/// Service-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Match recording settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// What to do with a participant that has no rows yet
    pub missing_entity_policy: MissingEntityPolicy,
    /// Number of lock stripes used to serialize matches sharing participants
    pub lock_stripes: usize,
}

/// Leaderboard query settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderboardSettings {
    /// Upper bound of `x` in a top-x query
    pub max_size: usize,
    /// Extra attempts for a leaderboard read that failed transiently
    pub read_retry_attempts: u32,
    /// Delay between read attempts in milliseconds
    pub read_retry_delay_ms: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "scorekeeper".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            missing_entity_policy: MissingEntityPolicy::CreateDefault,
            lock_stripes: 64,
        }
    }
}

impl Default for LeaderboardSettings {
    fn default() -> Self {
        Self {
            max_size: MAX_LEADERBOARD_SIZE,
            read_retry_attempts: 2,
            read_retry_delay_ms: 25,
        }
    }
}

impl LeaderboardSettings {
    /// Get retry delay as Duration
    pub fn read_retry_delay(&self) -> Duration {
        Duration::from_millis(self.read_retry_delay_ms)
    }
}

/// Parse an environment variable into `target` if it is set
fn override_from_env<T: std::str::FromStr>(name: &str, target: &mut T) -> Result<()> {
    if let Ok(raw) = env::var(name) {
        *target = raw
            .parse()
            .map_err(|_| anyhow!("Invalid {} value: {}", name, raw))?;
    }
    Ok(())
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: AppConfig = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        // Service settings
        override_from_env("SERVICE_NAME", &mut self.service.name)?;
        override_from_env("LOG_LEVEL", &mut self.service.log_level)?;

        // Rating settings
        override_from_env("RATING_INITIAL_VALUE", &mut self.rating.initial_value)?;
        override_from_env("RATING_INITIAL_DEVIATION", &mut self.rating.initial_deviation)?;
        override_from_env("RATING_DEVIATION_FLOOR", &mut self.rating.deviation_floor)?;
        override_from_env("RATING_DEVIATION_CEILING", &mut self.rating.deviation_ceiling)?;
        override_from_env("RATING_TEAM_OUTCOMES", &mut self.rating.team_outcomes)?;

        // Engine settings
        override_from_env(
            "ENGINE_MISSING_ENTITY_POLICY",
            &mut self.engine.missing_entity_policy,
        )?;
        override_from_env("ENGINE_LOCK_STRIPES", &mut self.engine.lock_stripes)?;

        // Leaderboard settings
        override_from_env("LEADERBOARD_MAX_SIZE", &mut self.leaderboard.max_size)?;
        override_from_env(
            "LEADERBOARD_READ_RETRY_ATTEMPTS",
            &mut self.leaderboard.read_retry_attempts,
        )?;
        override_from_env(
            "LEADERBOARD_READ_RETRY_DELAY_MS",
            &mut self.leaderboard.read_retry_delay_ms,
        )?;

        Ok(())
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.name.is_empty() {
        return Err(anyhow!("Service name cannot be empty"));
    }

    config.rating.validate()?;

    if config.engine.lock_stripes == 0 {
        return Err(anyhow!("Engine lock stripes must be greater than 0"));
    }

    if config.leaderboard.max_size == 0 || config.leaderboard.max_size > MAX_LEADERBOARD_SIZE {
        return Err(anyhow!(
            "Leaderboard max size must be between 1 and {}",
            MAX_LEADERBOARD_SIZE
        ));
    }

    Ok(())
}
