//! Error types for the rating engine
//!
//! The engine and leaderboard return [`ScorekeeperError`]; persistence
//! collaborators report [`StoreError`], which the engine wraps together with
//! the stage it failed in.

use crate::types::{EntityId, OrganizationId};
use std::fmt;

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ScorekeeperError>;

/// Result type returned by persistence collaborators
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Step of an operation an error was raised in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    LoadRatings,
    LoadStatistics,
    CommitBatch,
    QueryLeaderboard,
}

impl Stage {
    /// Read stages are safe to retry; commits are not
    pub fn is_read(&self) -> bool {
        !matches!(self, Stage::CommitBatch)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::LoadRatings => write!(f, "load ratings"),
            Stage::LoadStatistics => write!(f, "load statistics"),
            Stage::CommitBatch => write!(f, "commit batch"),
            Stage::QueryLeaderboard => write!(f, "query leaderboard"),
        }
    }
}

/// Errors raised by the storage collaborator
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage unavailable: {message}")]
    Unavailable { message: String },

    #[error("row for entity {entity_id} was modified concurrently")]
    Conflict { entity_id: EntityId },

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl StoreError {
    /// Transient failures that a read may be retried after
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable { .. })
    }
}

/// Custom error types for rating, statistic and leaderboard operations
#[derive(Debug, thiserror::Error)]
pub enum ScorekeeperError {
    #[error("Validation failed: {reason}")]
    Validation { reason: String },

    #[error("Entity {entity_id} not found in organization {organization_id} during {stage}")]
    NotFound {
        organization_id: OrganizationId,
        entity_id: EntityId,
        stage: Stage,
    },

    #[error("Persistence failure during {stage}: {source}")]
    Persistence {
        stage: Stage,
        #[source]
        source: StoreError,
    },

    #[error("Inconsistent batch commit: {message}")]
    Consistency { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl ScorekeeperError {
    pub(crate) fn persistence(stage: Stage) -> impl FnOnce(StoreError) -> Self {
        move |source| ScorekeeperError::Persistence { stage, source }
    }

    /// Only failed reads may be retried. Retrying a mutation could apply a
    /// match twice.
    pub fn is_retryable(&self) -> bool {
        match self {
            ScorekeeperError::Persistence { stage, source } => {
                stage.is_read() && source.is_transient()
            }
            _ => false,
        }
    }

    /// Short label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ScorekeeperError::Validation { .. } => "validation",
            ScorekeeperError::NotFound { .. } => "not_found",
            ScorekeeperError::Persistence { .. } => "persistence",
            ScorekeeperError::Consistency { .. } => "consistency",
            ScorekeeperError::Configuration { .. } => "configuration",
        }
    }
}
