//! Render-side reader

use std::sync::Arc;

use contracts::RenderableFrame;
use tracing::trace;

use crate::cache::LatestFrameCache;

/// Owns a render-side copy of the cached frame and refreshes it on demand.
///
/// Each `poll` copies the cache into the reader's own buffer; the frame is
/// handed back only when its timestamp differs from the last one returned.
#[derive(Debug)]
pub struct FrameReader {
    cache: Arc<LatestFrameCache>,
    frame: RenderableFrame,
    last_utime: i64,
    last_publishes: u64,
}

impl FrameReader {
    pub fn new(cache: Arc<LatestFrameCache>) -> Self {
        Self {
            cache,
            frame: RenderableFrame::empty(),
            last_utime: 0,
            last_publishes: 0,
        }
    }

    /// Copy out the cached frame if a new one was published since the last poll
    pub fn poll(&mut self) -> Option<&RenderableFrame> {
        // Cheap peek first so an idle render tick does not copy.
        if self.cache.utime() == self.last_utime {
            return None;
        }

        let utime = self.cache.copy_out(&mut self.frame);
        if utime == self.last_utime {
            return None;
        }

        trace!(utime, points = self.frame.len(), "new frame for render");
        self.last_utime = utime;
        Some(&self.frame)
    }

    /// Publishes since the previous call that were overwritten unseen.
    ///
    /// Call once per frame returned by [`poll`](Self::poll).
    pub fn take_skipped(&mut self) -> u64 {
        let publishes = self.cache.stats().publishes();
        let skipped = publishes
            .saturating_sub(self.last_publishes)
            .saturating_sub(1);
        self.last_publishes = publishes;
        skipped
    }

    /// Most recently copied frame (empty before the first successful poll)
    pub fn frame(&self) -> &RenderableFrame {
        &self.frame
    }

    /// Timestamp of [`frame`](Self::frame)
    pub fn utime(&self) -> i64 {
        self.last_utime
    }
}
