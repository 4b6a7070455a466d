//! # Observability
//!
//! Tracing and Prometheus metrics for the point cloud bridge.
//!
//! ## Features
//!
//! - Tracing initialization (JSON/Pretty/Compact)
//! - Prometheus metrics export
//! - Ingestion and cache recorders, render-side summary aggregation
//!
//! ## Example
//!
//! ```ignore
//! observability::init_with_config(ObservabilityConfig::default().with_verbosity(1))?;
//!
//! let frame = ingestion::convert(&raw);
//! observability::record_frame_converted("VELODYNE", frame.len(), raw.len() - frame.len());
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// Re-exports
pub use crate::metrics::{
    record_conversion_latency_ms, record_decode_error, record_frame_converted,
    record_frame_copied, record_frame_published, record_message_received, FrameMetricsAggregator,
    MetricsSummary, RunningStats, StatsSummary,
};

/// Observability configuration
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Log format
    pub log_format: LogFormat,
    /// Prometheus port (None = disabled)
    pub metrics_port: Option<u16>,
    /// Log level used when RUST_LOG is unset
    pub default_log_level: String,
    /// Ignore RUST_LOG and only emit warnings and errors
    pub quiet: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            metrics_port: None,
            default_log_level: "info".to_string(),
            quiet: false,
        }
    }
}

impl ObservabilityConfig {
    /// Map a `-v` count onto a default level
    pub fn with_verbosity(mut self, verbose: u8) -> Self {
        self.default_log_level = match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
        .to_string();
        self
    }

    fn env_filter(&self) -> EnvFilter {
        if self.quiet {
            return EnvFilter::new("warn");
        }
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_log_level))
    }
}

/// Log format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON structured logging
    #[default]
    Json,
    /// Human-readable
    Pretty,
    /// Compact single line
    Compact,
}

/// Install the global tracing subscriber and, if a port is set, the
/// Prometheus exporter.
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let fmt_layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        init_metrics_only(port)?;
    }

    tracing::debug!(
        log_format = ?config.log_format,
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );

    Ok(())
}

/// Install only the Prometheus exporter on `0.0.0.0:port`
pub fn init_metrics_only(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .with_context(|| format!("Failed to install Prometheus recorder on port {port}"))?;

    tracing::info!(port, "Prometheus metrics endpoint initialized");
    Ok(())
}
