//! Metrics collection using Prometheus
//!
//! Counters and timings for match recording and leaderboard queries.

use crate::error::ScorekeeperError;
use crate::types::LeaderboardMetric;
use anyhow::Result;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

/// Metrics collector for the engine and leaderboard
#[derive(Clone)]
pub struct EngineMetrics {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Matches committed, by kind (decisive or draw)
    pub matches_recorded_total: IntCounterVec,

    /// Failed `record_match` calls, by error kind
    pub record_failures_total: IntCounterVec,

    /// Rating/statistic rows updated
    pub participants_updated_total: IntCounter,

    /// Leaderboard queries served, by metric
    pub leaderboard_queries_total: IntCounterVec,

    /// Time spent in `record_match`
    pub record_duration_seconds: Histogram,
}

impl EngineMetrics {
    /// Create a new metrics collector with its own registry
    pub fn new() -> Result<Self> {
        Self::with_registry(Arc::new(Registry::new()))
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let matches_recorded_total = IntCounterVec::new(
            Opts::new(
                "scorekeeper_matches_recorded_total",
                "Total matches recorded",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(matches_recorded_total.clone()))?;

        let record_failures_total = IntCounterVec::new(
            Opts::new(
                "scorekeeper_record_failures_total",
                "Total failed match recordings",
            ),
            &["error"],
        )?;
        registry.register(Box::new(record_failures_total.clone()))?;

        let participants_updated_total = IntCounter::new(
            "scorekeeper_participants_updated_total",
            "Total participant rows updated",
        )?;
        registry.register(Box::new(participants_updated_total.clone()))?;

        let leaderboard_queries_total = IntCounterVec::new(
            Opts::new(
                "scorekeeper_leaderboard_queries_total",
                "Total leaderboard queries served",
            ),
            &["metric"],
        )?;
        registry.register(Box::new(leaderboard_queries_total.clone()))?;

        let record_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "scorekeeper_record_duration_seconds",
                "Time spent recording a match",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        )?;
        registry.register(Box::new(record_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            matches_recorded_total,
            record_failures_total,
            participants_updated_total,
            leaderboard_queries_total,
            record_duration_seconds,
        })
    }

    pub fn record_match_committed(&self, draw: bool, participants: usize, elapsed: Duration) {
        let kind = if draw { "draw" } else { "decisive" };
        self.matches_recorded_total.with_label_values(&[kind]).inc();
        self.participants_updated_total.inc_by(participants as u64);
        self.record_duration_seconds.observe(elapsed.as_secs_f64());
    }

    pub fn record_match_failed(&self, error: &ScorekeeperError) {
        self.record_failures_total
            .with_label_values(&[error.kind()])
            .inc();
    }

    pub fn leaderboard_served(&self, metric: LeaderboardMetric) {
        self.leaderboard_queries_total
            .with_label_values(&[metric.as_str()])
            .inc();
    }

    /// Encode all metrics in the Prometheus text format
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
