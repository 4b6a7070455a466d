//! # Frame Cache
//!
//! Single-slot "latest frame wins" handoff between the ingestion callback
//! thread and the render loop.
//!
//! - Writers hand over a fully built `RenderableFrame` with [`LatestFrameCache::publish`].
//! - Readers receive a deep copy with [`LatestFrameCache::copy_out`], or use a
//!   [`FrameReader`] to copy only when a newer frame has been published.
//!
//! There is no queue: a publish that lands before the reader polls replaces
//! the previous frame, which is never observed.
//!
//! ```ignore
//! let cache = Arc::new(LatestFrameCache::new());
//! cache.publish(frame, utime);
//!
//! let mut reader = FrameReader::new(cache.clone());
//! if let Some(frame) = reader.poll() {
//!     upload(frame.position_bytes());
//! }
//! ```

mod cache;
mod reader;

pub use cache::{CacheStats, LatestFrameCache};
pub use reader::FrameReader;
