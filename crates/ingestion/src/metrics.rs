//! Ingestion counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Ingestion metrics, shared between the adapter and whoever reports on it
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Messages delivered on the subscribed channel
    pub messages_received: AtomicU64,

    /// Messages that failed decoding or field extraction
    pub decode_errors: AtomicU64,

    /// Frames handed to the cache
    pub frames_published: AtomicU64,

    /// Points seen before filtering
    pub points_received: AtomicU64,

    /// Points dropped for non-finite coordinates
    pub points_dropped: AtomicU64,
}

impl IngestionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one converted and published frame
    pub fn record_published(&self, points_in: usize, points_out: usize) {
        self.frames_published.fetch_add(1, Ordering::Relaxed);
        self.points_received
            .fetch_add(points_in as u64, Ordering::Relaxed);
        self.points_dropped
            .fetch_add(points_in.saturating_sub(points_out) as u64, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            frames_published: self.frames_published.load(Ordering::Relaxed),
            points_received: self.points_received.load(Ordering::Relaxed),
            points_dropped: self.points_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`IngestionMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub messages_received: u64,
    pub decode_errors: u64,
    pub frames_published: u64,
    pub points_received: u64,
    pub points_dropped: u64,
}

impl MetricsSnapshot {
    /// Fraction of received points dropped by the filter, in percent
    pub fn drop_rate(&self) -> f64 {
        if self.points_received == 0 {
            0.0
        } else {
            self.points_dropped as f64 / self.points_received as f64 * 100.0
        }
    }
}
