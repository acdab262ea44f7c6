//! QUADVOTE Node - single-process host for the voting engine.
//!
//! Reads JSON requests from stdin, one per line, and writes one JSON response
//! per line to stdout. Logs go to stderr.

pub mod commands;
pub mod config;
pub mod node;
pub mod telemetry;

use clap::Parser;
use std::path::PathBuf;
use tokio::io::{stdin, stdout, BufReader};
use tracing::{error, info};

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "quadvote-node")]
#[command(about = "QUADVOTE Node - quadratic voting over a credit ledger")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// Config file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Data directory
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Owner account (overrides config)
    #[arg(long, env = "QUADVOTE_OWNER")]
    owner: Option<String>,

    /// Log level
    #[arg(short, long)]
    log_level: Option<String>,

    /// Emit JSON log lines
    #[arg(long)]
    json_logs: bool,

    /// Keep state in memory only
    #[arg(long)]
    no_persist: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load or create config
    let mut config = match &args.config {
        Some(path) => config::NodeConfig::from_file(path)?,
        None => config::NodeConfig::default(),
    };

    // Override with CLI args
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(owner) = args.owner {
        config.owner = owner;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if args.json_logs {
        config.logging.json = true;
    }
    if args.no_persist {
        config.persist = false;
    }

    config.validate()?;

    telemetry::init_telemetry(&config.logging.level, config.logging.json)?;

    match &args.config {
        Some(path) => info!("Loaded configuration from: {:?}", path),
        None => info!("Using default configuration"),
    }
    info!("Configuration:");
    info!("  Name: {}", config.name);
    info!("  Owner: {}", config.owner);
    info!("  Data dir: {:?}", config.data_dir);
    info!("  Persist: {}", config.persist);
    info!("  Genesis accounts: {}", config.genesis.len());

    let node = node::GovernanceNode::new(config)?;

    if let Err(e) = node.run(BufReader::new(stdin()), stdout()).await {
        error!("Node error: {}", e);
        return Err(e);
    }

    info!("QUADVOTE node shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_args() {
        let args = Args::parse_from([
            "quadvote-node",
            "--data-dir", "/tmp/qv",
            "--log-level", "debug",
            "--no-persist",
        ]);

        assert_eq!(args.data_dir, Some(PathBuf::from("/tmp/qv")));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.no_persist);
        assert!(!args.json_logs);
        assert!(args.config.is_none());
    }
}
