//! # Point Cloud Bridge CLI
//!
//! Command-line entry point.
//!
//! Provides:
//! - Configuration loading and validation
//! - Bridge orchestration and lifecycle management
//! - Graceful shutdown handling

mod cli;
mod commands;
mod error;
mod pipeline;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use observability::{LogFormat, ObservabilityConfig};

use cli::{Cli, Commands};
use commands::{run_bridge, run_info, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(&cli)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "pointcloud-bridge starting"
    );

    let result = match &cli.command {
        Commands::Run(args) => run_bridge(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Initialize logging based on CLI options
fn init_logging(cli: &Cli) -> Result<()> {
    let log_format = match cli.log_format {
        cli::LogFormat::Json => LogFormat::Json,
        cli::LogFormat::Pretty => LogFormat::Pretty,
        cli::LogFormat::Compact => LogFormat::Compact,
    };

    observability::init_with_config(
        ObservabilityConfig {
            log_format,
            quiet: cli.quiet,
            ..Default::default()
        }
        .with_verbosity(cli.verbose),
    )
}
