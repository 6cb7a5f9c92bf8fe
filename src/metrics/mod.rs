//! Metrics for the scorekeeper
//!
//! This module provides Prometheus counters and timings for match recording
//! and leaderboard queries.

pub mod collector;

pub use collector::EngineMetrics;
