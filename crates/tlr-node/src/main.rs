//! Trustline relay node: entry point.
//!
//! Loads a snapshot and event log into the in-memory network mirror, then
//! answers JSON-line route queries from stdin on stdout.

// Node internals are also driven directly by tests.
#![allow(dead_code)]

mod config;
mod ingest;
mod node;
mod query;

use clap::Parser;
use std::path::PathBuf;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

use config::TlrConfig;
use node::TlrNode;

/// Trustline Relay Node
#[derive(Parser, Debug)]
#[command(name = "tlr-node", version, about = "Trustline relay routing node")]
struct Args {
    /// Path to the configuration file (TOML).
    #[arg(short, long, default_value = "tlr.toml")]
    config: PathBuf,

    /// Override the snapshot file.
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Override the event log file.
    #[arg(long)]
    events: Option<PathBuf>,

    /// Override the capacity imbalance fee divisor.
    #[arg(long)]
    fee_divisor: Option<u64>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Generate a default config file and exit.
    #[arg(long)]
    init: bool,
}

fn init_tracing(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // stdout carries responses, so logs go to stderr.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Handle --init flag
    if args.init {
        init_tracing(args.log_level.as_deref().unwrap_or("info"), "text");
        let config = TlrConfig::default();
        config.save(&args.config)?;
        tracing::info!(path = %args.config.display(), "wrote default config");
        return Ok(());
    }

    // Load configuration
    let mut config = TlrConfig::load(&args.config)?;

    // Apply CLI overrides
    if let Some(snapshot) = args.snapshot {
        config.ingest.snapshot_path = Some(snapshot);
    }
    if let Some(events) = args.events {
        config.ingest.events_path = Some(events);
    }
    if let Some(divisor) = args.fee_divisor {
        config.network.capacity_imbalance_fee_divisor = divisor;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    init_tracing(&config.logging.level, &config.logging.format);
    tracing::info!("Trustline relay node v{}", env!("CARGO_PKG_VERSION"));

    let mut node = TlrNode::new(config)?;
    node.start().await?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        tracing::info!("received shutdown signal");
    };

    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    tokio::select! {
        result = node.serve(stdin, stdout) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "query loop error");
            }
        }
        _ = shutdown => {
            tracing::info!("initiating graceful shutdown");
        }
    }

    node.shutdown().await?;
    tracing::info!("relay node exited cleanly");
    Ok(())
}
