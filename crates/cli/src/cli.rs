//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Point Cloud Bridge - LiDAR message to renderable frame bridge
#[derive(Parser, Debug)]
#[command(
    name = "pointcloud-bridge",
    author,
    version,
    about = "Point cloud transport-to-render bridge",
    long_about = "Subscribes to a point cloud channel, filters and repacks every frame for \n\
                  rendering, and hands the latest frame to a render loop through a \n\
                  single-slot cache."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "POINTCLOUD_BRIDGE_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "POINTCLOUD_BRIDGE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the bridge
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "bridge.toml",
        env = "POINTCLOUD_BRIDGE_CONFIG"
    )]
    pub config: PathBuf,

    /// Override the subscribed channel from configuration
    #[arg(long, env = "POINTCLOUD_BRIDGE_CHANNEL")]
    pub channel: Option<String>,

    /// Stop after this many rendered frames (0 = unlimited)
    #[arg(long, default_value = "0", env = "POINTCLOUD_BRIDGE_MAX_FRAMES")]
    pub max_frames: u64,

    /// Run timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "POINTCLOUD_BRIDGE_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "POINTCLOUD_BRIDGE_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "bridge.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "bridge.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
