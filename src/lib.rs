//! Scorekeeper - rating, statistic and leaderboard engine
//!
//! This crate turns recorded head-to-head and team matches into Glicko
//! ratings, win/loss/streak statistics and per-organization leaderboards.
//! Storage is supplied by the caller through the [`store::MatchStore`] trait.

pub mod config;
pub mod engine;
pub mod error;
pub mod leaderboard;
pub mod metrics;
pub mod rating;
pub mod statistic;
pub mod store;
pub mod types;

// Re-export commonly used types and traits
pub use error::{Result, ScorekeeperError, Stage, StoreError};
pub use types::*;

// Re-export key components
pub use engine::{MatchEngine, MissingEntityPolicy};
pub use leaderboard::Leaderboard;
pub use store::{InMemoryMatchStore, MatchStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
