//! Configuration validation
//!
//! Rules:
//! - channel name is non-empty and contains no whitespace
//! - mock frequency_hz has a period in [1ns, 1h], points_per_frame > 0, rings > 0
//! - replay speed > 0, replay path non-empty
//! - render poll_hz has a period in [1ns, 1h]

use contracts::{
    rate_period, BridgeConfig, ContractError, MockSourceConfig, ReplaySourceConfig, SourceConfig,
    MAX_RATE_PERIOD,
};

/// Validate a BridgeConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &BridgeConfig) -> Result<(), ContractError> {
    validate_channel(config)?;
    validate_source(config)?;
    validate_render(config)?;
    Ok(())
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// A rate must map onto a usable timer period
fn validate_rate(field: &str, hz: f64) -> Result<(), ContractError> {
    if rate_period(hz).is_none() {
        return Err(ContractError::config_validation(
            field,
            format!(
                "{} must be > 0 with a period between 1ns and {}s, got {}",
                field.rsplit('.').next().unwrap_or(field),
                MAX_RATE_PERIOD.as_secs(),
                hz
            ),
        ));
    }
    Ok(())
}

fn validate_channel(config: &BridgeConfig) -> Result<(), ContractError> {
    let channel = &config.transport.channel;
    if channel.is_empty() {
        return Err(ContractError::config_validation(
            "transport.channel",
            "channel cannot be empty",
        ));
    }
    if channel.chars().any(char::is_whitespace) {
        return Err(ContractError::config_validation(
            "transport.channel",
            format!("channel '{}' must not contain whitespace", channel),
        ));
    }
    Ok(())
}

fn validate_source(config: &BridgeConfig) -> Result<(), ContractError> {
    match &config.source {
        SourceConfig::Mock(mock) => validate_mock(mock),
        SourceConfig::Replay(replay) => validate_replay(replay),
    }
}

fn validate_mock(mock: &MockSourceConfig) -> Result<(), ContractError> {
    validate_rate("source.frequency_hz", mock.frequency_hz)?;
    if mock.points_per_frame == 0 {
        return Err(ContractError::config_validation(
            "source.points_per_frame",
            "points_per_frame must be > 0",
        ));
    }
    if mock.rings == 0 {
        return Err(ContractError::config_validation(
            "source.rings",
            "rings must be > 0",
        ));
    }
    Ok(())
}

fn validate_replay(replay: &ReplaySourceConfig) -> Result<(), ContractError> {
    if replay.path.as_os_str().is_empty() {
        return Err(ContractError::config_validation(
            "source.path",
            "replay path cannot be empty",
        ));
    }
    if !is_positive(replay.speed) {
        return Err(ContractError::config_validation(
            "source.speed",
            format!("speed must be > 0, got {}", replay.speed),
        ));
    }
    Ok(())
}

fn validate_render(config: &BridgeConfig) -> Result<(), ContractError> {
    validate_rate("render.poll_hz", config.render.poll_hz)
}
