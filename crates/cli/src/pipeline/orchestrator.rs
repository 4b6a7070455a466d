//! Bridge orchestrator - wires source, adapter, cache and render loop.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::BridgeConfig;
use frame_cache::{FrameReader, LatestFrameCache};
use ingestion::{IngestionMetrics, PointCloudAdapter};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::BridgeStats;
use crate::error::{CliError, Result};

/// Run configuration
#[derive(Debug, Clone)]
pub struct BridgeRunConfig {
    /// Loaded bridge configuration
    pub bridge: BridgeConfig,

    /// Maximum number of rendered frames (None = unlimited)
    pub max_frames: Option<u64>,

    /// Run timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Why the render loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    MaxFrames,
    Timeout,
    Shutdown,
    SourceFinished,
}

/// Main bridge orchestrator
pub struct Bridge {
    config: BridgeRunConfig,
}

impl Bridge {
    pub fn new(config: BridgeRunConfig) -> Self {
        Self { config }
    }

    /// Run until `shutdown` resolves, the frame limit or timeout is hit, or
    /// a finite source runs dry.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<BridgeStats> {
        let start_time = Instant::now();
        let bridge = &self.config.bridge;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)
                .map_err(|e| CliError::metrics(port, e.to_string()))?;
            info!("Metrics endpoint available on port {}", port);
        }

        let cache = Arc::new(LatestFrameCache::new());
        let ingestion_metrics = Arc::new(IngestionMetrics::new());
        let adapter = Arc::new(PointCloudAdapter::with_metrics(
            bridge.channel(),
            cache.clone(),
            ingestion_metrics.clone(),
        ));

        let source = ingestion::build_source(bridge)
            .map_err(|e| CliError::source(bridge.source.kind(), e))?;
        info!(
            channel = %bridge.channel(),
            source = bridge.source.kind(),
            poll_hz = bridge.render.poll_hz,
            "Starting point cloud bridge"
        );
        adapter.attach(source.as_ref());

        let mut stats = BridgeStats::default();
        let reason = self.render_loop(&cache, &*source, &mut stats, shutdown).await;
        info!(?reason, "Render loop finished");

        info!("Shutting down bridge...");
        source.stop();

        stats.ingestion = ingestion_metrics.snapshot();
        stats.cache_publishes = cache.stats().publishes();
        stats.cache_copies = cache.stats().copies();
        stats.duration = start_time.elapsed();

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            fps = format!("{:.2}", stats.fps()),
            "Bridge shutdown complete"
        );

        Ok(stats)
    }

    /// Poll the cache at `render.poll_hz` and account for every new frame
    async fn render_loop(
        &self,
        cache: &Arc<LatestFrameCache>,
        source: &dyn contracts::MessageSource,
        stats: &mut BridgeStats,
        shutdown: impl Future<Output = ()>,
    ) -> StopReason {
        let mut reader = FrameReader::new(cache.clone());
        let mut ticker = tokio::time::interval(self.config.bridge.render.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let timeout = self.config.timeout;
        let deadline = async move {
            match timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(deadline);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = &mut deadline => {
                    warn!(timeout_secs = timeout.map(|t| t.as_secs()), "Bridge timed out");
                    return StopReason::Timeout;
                }
                _ = &mut shutdown => {
                    warn!("Received shutdown signal, stopping bridge...");
                    return StopReason::Shutdown;
                }
            }

            if reader.poll().is_none() {
                if source.is_listening() {
                    continue;
                }
                // The last publish may land between the poll and the check
                if reader.poll().is_none() {
                    info!("Source finished");
                    return StopReason::SourceFinished;
                }
            }

            let skipped = reader.take_skipped();
            stats.render.update(reader.frame(), reader.utime(), skipped);
            debug!(
                utime = reader.utime(),
                points = reader.frame().len(),
                skipped,
                "Frame rendered"
            );

            if let Some(max) = self.config.max_frames {
                if stats.render.frames_rendered >= max {
                    info!(frames = stats.render.frames_rendered, "Reached max frames limit");
                    return StopReason::MaxFrames;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{MessageHandler, MessageSource, MockSourceConfig, RenderableFrame, SourceConfig};
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Publishes its final frame from inside `is_listening`, right after the
    /// render loop's poll came back empty.
    struct LastFrameSource {
        cache: Arc<LatestFrameCache>,
        published: AtomicBool,
    }

    impl MessageSource for LastFrameSource {
        fn channel(&self) -> &str {
            "VELODYNE"
        }

        fn subscribe(&self, _handler: MessageHandler) {}

        fn stop(&self) {}

        fn is_listening(&self) -> bool {
            if !self.published.swap(true, Ordering::SeqCst) {
                self.cache.publish(RenderableFrame::empty(), 42);
            }
            false
        }
    }

    fn mock_config(max_frames: Option<u64>, timeout: Option<Duration>) -> BridgeRunConfig {
        let mut bridge = BridgeConfig::with_channel("VELODYNE");
        bridge.source = SourceConfig::Mock(MockSourceConfig {
            frequency_hz: 50.0,
            points_per_frame: 256,
            rings: 16,
            invalid_every: 4,
        });
        bridge.render.poll_hz = 100.0;
        BridgeRunConfig {
            bridge,
            max_frames,
            timeout,
            metrics_port: None,
        }
    }

    #[tokio::test]
    async fn test_mock_run_until_max_frames() {
        let bridge = Bridge::new(mock_config(Some(3), Some(Duration::from_secs(10))));
        let stats = bridge.run(std::future::pending()).await.unwrap();

        assert_eq!(stats.render.frames_rendered, 3);
        assert!(stats.ingestion.frames_published >= 3);
        assert_eq!(stats.ingestion.decode_errors, 0);
        // Every 4th point is invalid
        assert_eq!(
            stats.ingestion.points_dropped * 4,
            stats.ingestion.points_received
        );
        assert!((stats.render.points_stats.mean() - 192.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_shutdown_signal_stops_run() {
        let bridge = Bridge::new(mock_config(None, None));
        let stats = bridge
            .run(tokio::time::sleep(Duration::from_millis(100)))
            .await
            .unwrap();

        assert!(stats.duration >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_timeout_stops_run() {
        let bridge = Bridge::new(mock_config(None, Some(Duration::from_millis(100))));
        let stats = bridge.run(std::future::pending()).await.unwrap();
        assert!(stats.duration >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_final_frame_rendered_before_source_finished() {
        let bridge = Bridge::new(mock_config(None, Some(Duration::from_secs(5))));
        let cache = Arc::new(LatestFrameCache::new());
        let source = LastFrameSource {
            cache: cache.clone(),
            published: AtomicBool::new(false),
        };

        let mut stats = BridgeStats::default();
        let reason = bridge
            .render_loop(&cache, &source, &mut stats, std::future::pending())
            .await;

        assert_eq!(reason, StopReason::SourceFinished);
        assert_eq!(stats.render.frames_rendered, 1);
    }
}
