//! BridgeConfig - Config Loader output
//!
//! Describes one bridge instance: which channel to subscribe to, where the
//! messages come from, and how often the render side polls for new frames.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Transport subscription settings
    #[serde(default)]
    pub transport: TransportConfig,

    /// Message source
    #[serde(default)]
    pub source: SourceConfig,

    /// Render-side polling
    #[serde(default)]
    pub render: RenderConfig,
}

/// Transport subscription settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Channel carrying point cloud messages
    #[serde(default = "default_channel")]
    pub channel: String,

    /// Robot configuration file handed to the transport (optional)
    #[serde(default)]
    pub bot_config_file: Option<PathBuf>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            channel: default_channel(),
            bot_config_file: None,
        }
    }
}

fn default_channel() -> String {
    "VELODYNE".to_string()
}

/// Where point cloud messages come from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Synthetic Velodyne-style sweeps
    Mock(MockSourceConfig),
    /// Recorded messages played back from disk
    Replay(ReplaySourceConfig),
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::Mock(MockSourceConfig::default())
    }
}

impl SourceConfig {
    /// Short label for logs and summaries
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Mock(_) => "mock",
            Self::Replay(_) => "replay",
        }
    }
}

/// Mock source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockSourceConfig {
    /// Sweep rate (Hz), must be > 0
    #[serde(default = "default_frequency_hz")]
    pub frequency_hz: f64,

    /// Points per sweep
    #[serde(default = "default_points_per_frame")]
    pub points_per_frame: u32,

    /// Number of laser rings
    #[serde(default = "default_rings")]
    pub rings: u16,

    /// Every n-th point gets a NaN coordinate (0 = never)
    #[serde(default)]
    pub invalid_every: u32,
}

impl Default for MockSourceConfig {
    fn default() -> Self {
        Self {
            frequency_hz: default_frequency_hz(),
            points_per_frame: default_points_per_frame(),
            rings: default_rings(),
            invalid_every: 0,
        }
    }
}

fn default_frequency_hz() -> f64 {
    10.0
}

fn default_points_per_frame() -> u32 {
    28_800
}

fn default_rings() -> u16 {
    32
}

/// Replay source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaySourceConfig {
    /// Recording directory (contains `messages.jsonl`)
    pub path: PathBuf,

    /// Playback speed multiplier (1.0 = recorded pace)
    #[serde(default = "default_speed")]
    pub speed: f64,

    /// Restart from the beginning when the recording ends
    #[serde(default)]
    pub loop_playback: bool,
}

fn default_speed() -> f64 {
    1.0
}

/// Render-side polling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// How often the render loop copies out the latest frame (Hz)
    #[serde(default = "default_poll_hz")]
    pub poll_hz: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            poll_hz: default_poll_hz(),
        }
    }
}

fn default_poll_hz() -> f64 {
    30.0
}

impl RenderConfig {
    /// Interval between render polls, clamped to `[1ns, MAX_RATE_PERIOD]`
    pub fn poll_interval(&self) -> Duration {
        clamped_rate_period(self.poll_hz)
    }
}

/// Longest period a configured rate may describe
pub const MAX_RATE_PERIOD: Duration = Duration::from_secs(3600);

/// Period of a rate in Hz.
///
/// `None` unless the period is representable, non-zero and no longer than
/// [`MAX_RATE_PERIOD`].
pub fn rate_period(hz: f64) -> Option<Duration> {
    if !(hz.is_finite() && hz > 0.0) {
        return None;
    }
    Duration::try_from_secs_f64(1.0 / hz)
        .ok()
        .filter(|period| !period.is_zero() && *period <= MAX_RATE_PERIOD)
}

/// Like [`rate_period`], but saturates instead of failing.
///
/// Rates too fast for a 1ns period map to 1ns; slow, zero or NaN rates map to
/// [`MAX_RATE_PERIOD`].
pub fn clamped_rate_period(hz: f64) -> Duration {
    rate_period(hz).unwrap_or_else(|| {
        if hz.is_finite() && hz > 1.0 {
            Duration::from_nanos(1)
        } else {
            MAX_RATE_PERIOD
        }
    })
}

impl BridgeConfig {
    /// Configuration with default transport, mock source and render settings
    pub fn with_channel(channel: impl Into<String>) -> Self {
        Self {
            version: ConfigVersion::V1,
            transport: TransportConfig {
                channel: channel.into(),
                bot_config_file: None,
            },
            source: SourceConfig::default(),
            render: RenderConfig::default(),
        }
    }

    /// Channel name the adapter subscribes to
    pub fn channel(&self) -> &str {
        &self.transport.channel
    }
}
