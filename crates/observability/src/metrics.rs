//! Bridge metrics
//!
//! Prometheus-facing recorders for the ingestion and cache paths, plus an
//! in-memory aggregator used for the end-of-run summary.

use contracts::RenderableFrame;
use metrics::{counter, gauge, histogram};

/// Record an inbound transport message
pub fn record_message_received(channel: &str, bytes: usize) {
    counter!(
        "pointcloud_bridge_messages_received_total",
        "channel" => channel.to_string()
    )
    .increment(1);
    histogram!("pointcloud_bridge_message_bytes").record(bytes as f64);
}

/// Record a message that failed wire decoding or field extraction
pub fn record_decode_error(channel: &str) {
    counter!(
        "pointcloud_bridge_decode_errors_total",
        "channel" => channel.to_string()
    )
    .increment(1);
}

/// Record the outcome of one filter/convert pass
///
/// # Example
///
/// ```ignore
/// let frame = convert(&raw);
/// observability::record_frame_converted("VELODYNE", frame.len(), raw.len() - frame.len());
/// ```
pub fn record_frame_converted(channel: &str, valid_points: usize, dropped_points: usize) {
    counter!(
        "pointcloud_bridge_points_valid_total",
        "channel" => channel.to_string()
    )
    .increment(valid_points as u64);

    if dropped_points > 0 {
        counter!(
            "pointcloud_bridge_points_dropped_total",
            "channel" => channel.to_string()
        )
        .increment(dropped_points as u64);
    }

    histogram!("pointcloud_bridge_frame_points").record(valid_points as f64);
}

/// Record a publish into the latest-frame cache
pub fn record_frame_published(utime: i64) {
    counter!("pointcloud_bridge_frames_published_total").increment(1);
    gauge!("pointcloud_bridge_last_published_utime").set(utime as f64);
}

/// Record a copy-out from the latest-frame cache
pub fn record_frame_copied(points: usize) {
    counter!("pointcloud_bridge_frames_copied_total").increment(1);
    gauge!("pointcloud_bridge_copied_frame_points").set(points as f64);
}

/// Record decode + convert latency for one message
pub fn record_conversion_latency_ms(latency_ms: f64) {
    histogram!("pointcloud_bridge_conversion_latency_ms").record(latency_ms);
}

/// Render-side frame statistics
///
/// Aggregated in memory so the CLI can print a summary at the end of a run.
#[derive(Debug, Clone, Default)]
pub struct FrameMetricsAggregator {
    /// Frames seen by the render side
    pub frames_rendered: u64,

    /// Published frames the render side never saw (overwritten before a poll)
    pub frames_skipped: u64,

    /// Frames that arrived with zero valid points
    pub empty_frames: u64,

    /// Points per rendered frame
    pub points_stats: RunningStats,

    /// Time between consecutive rendered frames (ms, from source utime)
    pub frame_gap_stats: RunningStats,

    last_utime: Option<i64>,
}

impl FrameMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one rendered frame.
    ///
    /// `skipped` is the number of publishes that happened since the previous
    /// rendered frame and were overwritten unseen.
    pub fn update(&mut self, frame: &RenderableFrame, utime: i64, skipped: u64) {
        self.frames_rendered += 1;
        self.frames_skipped += skipped;

        if frame.is_empty() {
            self.empty_frames += 1;
        }
        self.points_stats.push(frame.len() as f64);

        if let Some(last) = self.last_utime {
            self.frame_gap_stats.push((utime - last) as f64 / 1000.0);
        }
        self.last_utime = Some(utime);
    }

    /// Build a summary report
    pub fn summary(&self) -> MetricsSummary {
        let seen = self.frames_rendered + self.frames_skipped;
        MetricsSummary {
            frames_rendered: self.frames_rendered,
            frames_skipped: self.frames_skipped,
            empty_frames: self.empty_frames,
            skip_rate: if seen > 0 {
                self.frames_skipped as f64 / seen as f64 * 100.0
            } else {
                0.0
            },
            points_per_frame: StatsSummary::from(&self.points_stats),
            frame_gap_ms: StatsSummary::from(&self.frame_gap_stats),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Metrics summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub frames_rendered: u64,
    pub frames_skipped: u64,
    pub empty_frames: u64,
    pub skip_rate: f64,
    pub points_per_frame: StatsSummary,
    pub frame_gap_ms: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Render Metrics Summary ===")?;
        writeln!(f, "Frames rendered: {}", self.frames_rendered)?;
        writeln!(
            f,
            "Frames skipped: {} ({:.2}%)",
            self.frames_skipped, self.skip_rate
        )?;
        writeln!(f, "Empty frames: {}", self.empty_frames)?;
        writeln!(f, "Points per frame: {}", self.points_per_frame)?;
        writeln!(f, "Frame gap (ms): {}", self.frame_gap_ms)?;
        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
