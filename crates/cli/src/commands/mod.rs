//! Command implementations.

mod info;
mod run;
mod validate;

pub use info::run_info;
pub use run::run_bridge;
pub use validate::run_validate;

use std::path::Path;

use contracts::BridgeConfig;
use tracing::info;

use crate::error::{CliError, Result};

/// Load a configuration file, apply an optional channel override, and
/// re-validate the result.
pub(crate) fn load_config(path: &Path, channel: Option<&str>) -> Result<BridgeConfig> {
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()));
    }

    let mut config = config_loader::ConfigLoader::load_from_path(path)?;

    if let Some(channel) = channel {
        info!(channel, "Overriding channel from CLI");
        config.transport.channel = channel.to_string();
        config_loader::ConfigLoader::validate(&config)?;
    }

    Ok(config)
}
