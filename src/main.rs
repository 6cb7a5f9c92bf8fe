//! Command line entry point for the scorekeeper
//!
//! Replays a file of recorded matches against an in-memory store and prints
//! the resulting leaderboard, or validates a configuration file.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scorekeeper::config::AppConfig;
use scorekeeper::metrics::EngineMetrics;
use scorekeeper::{InMemoryMatchStore, Leaderboard, MatchEngine, MatchRecord, MatchStore};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

/// Scorekeeper - match ratings, statistics and leaderboards
#[derive(Parser)]
#[command(
    name = "scorekeeper",
    version,
    about = "Rating, statistic and leaderboard engine for head-to-head and team matches"
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record every match of a JSON-lines file in order, then print a leaderboard
    Replay {
        /// File with one match record per line
        #[arg(value_name = "FILE")]
        matches: PathBuf,

        /// Leaderboard metric
        #[arg(short, long, default_value = "rating")]
        metric: String,

        /// Number of leaderboard entries
        #[arg(short, long, default_value = "10")]
        top: usize,

        /// Organization to print the leaderboard for
        #[arg(long, default_value = "1")]
        organization: u64,

        /// Also print Prometheus metrics
        #[arg(long)]
        metrics: bool,
    },
    /// Validate the configuration and exit
    CheckConfig,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Load configuration from file or environment and apply CLI overrides
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::from_env()?,
    };

    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    scorekeeper::config::validate_config(&config)?;
    Ok(config)
}

fn read_matches(path: &Path) -> Result<Vec<MatchRecord>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;

    let mut records = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: MatchRecord = serde_json::from_str(&line)
            .with_context(|| format!("Invalid match record on line {}", index + 1))?;
        records.push(record);
    }

    Ok(records)
}

async fn replay(
    config: &AppConfig,
    matches: &Path,
    metric: &str,
    top: usize,
    organization: u64,
    print_metrics: bool,
) -> Result<()> {
    let records = read_matches(matches)?;
    info!("Replaying {} matches from {}", records.len(), matches.display());

    let metrics = Arc::new(EngineMetrics::new()?);
    let store: Arc<dyn MatchStore> = Arc::new(InMemoryMatchStore::new());
    let engine = MatchEngine::from_config(store.clone(), config)?.with_metrics(metrics.clone());
    let leaderboard =
        Leaderboard::new(store, config.leaderboard.clone())?.with_metrics(metrics.clone());

    let mut rejected = 0usize;
    for (index, record) in records.iter().enumerate() {
        if let Err(e) = engine.record_match(record).await {
            // Rejected matches leave no trace; keep going with the rest
            error!("Match {} rejected: {}", index + 1, e);
            rejected += 1;
        }
    }
    info!(
        "Recorded {} matches, rejected {}",
        records.len() - rejected,
        rejected
    );

    let entries = leaderboard.get_top_x(organization, metric, top).await?;
    println!("{}", serde_json::to_string_pretty(&entries)?);

    if print_metrics {
        print!("{}", metrics.render()?);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {:#}", e);
        std::process::exit(1);
    });

    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    match args.command {
        Command::CheckConfig => {
            info!("Configuration validation successful");
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        Command::Replay {
            matches,
            metric,
            top,
            organization,
            metrics,
        } => replay(&config, &matches, &metric, top, organization, metrics).await,
    }
}
