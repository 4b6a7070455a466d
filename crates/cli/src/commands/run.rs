//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::commands::{info::print_config_summary, load_config};
use crate::pipeline::{Bridge, BridgeRunConfig};

/// Execute the `run` command
pub async fn run_bridge(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    let config = load_config(&args.config, args.channel.as_deref())
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    info!(
        channel = %config.channel(),
        source = config.source.kind(),
        poll_hz = config.render.poll_hz,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    let run_config = BridgeRunConfig {
        bridge: config,
        max_frames: if args.max_frames == 0 {
            None
        } else {
            Some(args.max_frames)
        },
        timeout: if args.timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(args.timeout))
        },
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    };

    info!("Starting bridge...");
    let stats = Bridge::new(run_config)
        .run(shutdown_signal())
        .await
        .context("Bridge execution failed")?;

    info!(
        frames_rendered = stats.render.frames_rendered,
        frames_published = stats.ingestion.frames_published,
        duration_secs = stats.duration.as_secs_f64(),
        fps = format!("{:.2}", stats.fps()),
        "Bridge completed"
    );
    stats.print_summary();

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
