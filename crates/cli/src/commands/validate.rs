//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{BridgeConfig, SourceConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;
use crate::commands::load_config;

/// Poll rates above this are unlikely to be displayable
const MAX_SENSIBLE_POLL_HZ: f64 = 240.0;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    channel: String,
    source: &'static str,
    poll_hz: f64,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    match load_config(&args.config, None) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    channel: config.transport.channel.clone(),
                    source: config.source.kind(),
                    poll_hz: config.render.poll_hz,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &BridgeConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    match &config.transport.bot_config_file {
        None => warnings.push(
            "transport.bot_config_file not set - using transport defaults".to_string(),
        ),
        Some(path) if !path.exists() => warnings.push(format!(
            "transport.bot_config_file '{}' does not exist",
            path.display()
        )),
        Some(_) => {}
    }

    if config.render.poll_hz > MAX_SENSIBLE_POLL_HZ {
        warnings.push(format!(
            "render.poll_hz {} is above {} Hz - most polls will find no new frame",
            config.render.poll_hz, MAX_SENSIBLE_POLL_HZ
        ));
    }

    match &config.source {
        SourceConfig::Mock(mock) => {
            if mock.invalid_every == 1 {
                warnings.push(
                    "source.invalid_every = 1 - every mock point is invalid, frames will be empty"
                        .to_string(),
                );
            }
            if mock.frequency_hz > config.render.poll_hz {
                warnings.push(format!(
                    "source.frequency_hz {} exceeds render.poll_hz {} - frames will be skipped",
                    mock.frequency_hz, config.render.poll_hz
                ));
            }
        }
        SourceConfig::Replay(replay) => {
            if !replay.path.join(ingestion::INDEX_FILE).exists() {
                warnings.push(format!(
                    "replay recording '{}' has no {}",
                    replay.path.display(),
                    ingestion::INDEX_FILE
                ));
            }
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Channel: {}", summary.channel);
            println!("  Source: {}", summary.source);
            println!("  Poll rate: {} Hz", summary.poll_hz);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
