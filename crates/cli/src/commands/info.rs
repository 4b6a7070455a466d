//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{BridgeConfig, SourceConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::commands::load_config;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    transport: TransportInfo,
    source: SourceConfig,
    render: RenderInfo,
}

#[derive(Serialize)]
struct TransportInfo {
    channel: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    bot_config_file: Option<String>,
}

#[derive(Serialize)]
struct RenderInfo {
    poll_hz: f64,
    poll_interval_ms: f64,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let config = load_config(&args.config, None)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&config);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_summary(&config);
    }

    Ok(())
}

fn build_config_info(config: &BridgeConfig) -> ConfigInfo {
    ConfigInfo {
        version: format!("{:?}", config.version),
        transport: TransportInfo {
            channel: config.transport.channel.clone(),
            bot_config_file: config
                .transport
                .bot_config_file
                .as_ref()
                .map(|p| p.display().to_string()),
        },
        source: config.source.clone(),
        render: RenderInfo {
            poll_hz: config.render.poll_hz,
            poll_interval_ms: config.render.poll_interval().as_secs_f64() * 1000.0,
        },
    }
}

/// Human-readable configuration summary, shared with `run --dry-run`
pub(crate) fn print_config_summary(config: &BridgeConfig) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║              Point Cloud Bridge Configuration                ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📡 Transport");
    println!("   ├─ Version: {:?}", config.version);
    println!("   ├─ Channel: {}", config.transport.channel);
    match &config.transport.bot_config_file {
        Some(path) => println!("   └─ Bot config: {}", path.display()),
        None => println!("   └─ Bot config: (none)"),
    }

    println!("\n📥 Source ({})", config.source.kind());
    match &config.source {
        SourceConfig::Mock(mock) => {
            println!("   ├─ Frequency: {} Hz", mock.frequency_hz);
            println!("   ├─ Points per frame: {}", mock.points_per_frame);
            println!("   ├─ Rings: {}", mock.rings);
            if mock.invalid_every > 0 {
                println!("   └─ Invalid point every: {}", mock.invalid_every);
            } else {
                println!("   └─ Invalid points: none");
            }
        }
        SourceConfig::Replay(replay) => {
            println!("   ├─ Path: {}", replay.path.display());
            println!("   ├─ Speed: {}x", replay.speed);
            println!("   └─ Loop: {}", replay.loop_playback);
        }
    }

    println!("\n🖥️  Render");
    println!("   └─ Poll rate: {} Hz", config.render.poll_hz);

    println!();
}
