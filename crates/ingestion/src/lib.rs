//! # Ingestion
//!
//! Point cloud ingestion: transport payload in, renderable frame out.
//!
//! Responsibilities:
//! - Decode the point cloud wire format (`decode_message`)
//! - Read x/y/z/intensity/ring out of the self-describing point records
//! - Filter non-finite points and repack for rendering (`convert`)
//! - Publish into the latest-frame cache (`PointCloudAdapter`)
//! - Provide mock and replay message sources
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{build_source, PointCloudAdapter};
//! use frame_cache::LatestFrameCache;
//!
//! let cache = Arc::new(LatestFrameCache::new());
//! let adapter = Arc::new(PointCloudAdapter::new(config.channel(), cache.clone()));
//!
//! let source = build_source(&config)?;
//! adapter.attach(source.as_ref());
//! ```

mod adapter;
mod convert;
mod error;
mod extract;
mod metrics;
mod mock;
mod pacing;
mod replay;
mod wire;

use contracts::{BridgeConfig, MessageSource, SourceConfig};

// Re-exports
pub use adapter::PointCloudAdapter;
pub use convert::convert;
pub use error::{IngestionError, Result};
pub use extract::to_raw_frame;
pub use metrics::{IngestionMetrics, MetricsSnapshot};
pub use mock::{synthetic_sweep, xyzir_message, MockPointCloudSource, XYZIR_POINT_STEP};
pub use replay::{RecordedMessage, ReplaySource, INDEX_FILE};
pub use wire::{decode_message, encode_message, POINT_CLOUD_FINGERPRINT};

/// Build the message source selected by `config.source`
pub fn build_source(config: &BridgeConfig) -> Result<Box<dyn MessageSource>> {
    let channel = config.channel();
    match &config.source {
        SourceConfig::Mock(mock) => Ok(Box::new(MockPointCloudSource::new(channel, mock.clone()))),
        SourceConfig::Replay(replay) => Ok(Box::new(ReplaySource::load(channel, replay)?)),
    }
}
