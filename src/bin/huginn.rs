//! huginn — mine log patterns from JSON-lines files through the cache.
//!
//! Each file is split into batches which are resolved through the same
//! [`PatternGateway`](huginn::PatternGateway) a tool handler would use.
//! Patterns are printed as one JSON object per batch, followed by a final
//! `{"stats": ...}` line with the cache snapshot.

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;

use huginn::config::Config;
use huginn::{Huginn, LogRecord, PatternGateway, TemplateMiner};

/// Huginn log pattern miner
#[derive(Parser)]
#[command(name = "huginn")]
#[command(version)]
#[command(about = "Group similar log lines into cached patterns")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, env = "HUGINN_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Mine patterns from JSON-lines log files
    Patterns {
        /// Files to read (one JSON log record per line)
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Caller scope used to isolate cached results
        #[arg(short, long, default_value = "")]
        scope: String,
        /// Records per batch
        #[arg(short, long, default_value_t = 500)]
        batch_size: usize,
        /// Resolve every batch this many times (exercises the cache)
        #[arg(short, long, default_value_t = 1)]
        repeat: usize,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = Config::load_or_default(args.config.as_deref())?;

    match args.command {
        Command::Config => {
            print!("{}", toml::to_string(&config)?);
        }
        Command::Patterns {
            files,
            scope,
            batch_size,
            repeat,
        } => {
            let gateway = build_gateway(&config)?;
            let result = run_patterns(&gateway, &files, &scope, batch_size.max(1), repeat);
            gateway.shutdown().await;
            result?;
        }
    }

    Ok(())
}

/// Build a [`PatternGateway`] from configuration.
fn build_gateway(config: &Config) -> huginn::Result<PatternGateway> {
    let mut miner = TemplateMiner::new();
    if let Some(n) = config.gateway.max_patterns {
        miner = miner.max_patterns(n);
    }

    Huginn::builder()
        .cache(config.cache_config())
        .min_batch_size(config.gateway.min_batch_size)
        .miner(Arc::new(miner))
        .build()
}

fn run_patterns(
    gateway: &PatternGateway,
    files: &[PathBuf],
    scope: &str,
    batch_size: usize,
    repeat: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for path in files {
        let records = read_records(path)?;
        info!(file = %path.display(), records = records.len(), "loaded log file");

        for (index, batch) in records.chunks(batch_size).enumerate() {
            let mut patterns = gateway.patterns(batch, scope)?;
            for _ in 1..repeat {
                patterns = gateway.patterns(batch, scope)?;
            }
            let line = json!({
                "file": path.display().to_string(),
                "batch": index,
                "records": batch.len(),
                "patterns": patterns.as_ref(),
            });
            writeln!(out, "{line}")?;
        }
    }

    writeln!(out, "{}", json!({ "stats": gateway.stats() }))?;
    Ok(())
}

fn read_records(path: &Path) -> huginn::Result<Vec<LogRecord>> {
    LogRecord::read_json_lines(BufReader::new(File::open(path)?))
}
