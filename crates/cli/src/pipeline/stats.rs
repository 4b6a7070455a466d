//! Bridge run statistics.

use std::time::Duration;

use ingestion::MetricsSnapshot;
use observability::FrameMetricsAggregator;

/// Statistics from a bridge run
#[derive(Debug, Clone, Default)]
pub struct BridgeStats {
    /// Ingestion-side counters at shutdown
    pub ingestion: MetricsSnapshot,

    /// Frames published into the cache
    pub cache_publishes: u64,

    /// Copy-outs served by the cache
    pub cache_copies: u64,

    /// Render-side frame statistics
    pub render: FrameMetricsAggregator,

    /// Total duration of the run
    pub duration: Duration,
}

impl BridgeStats {
    /// Rendered frames per second
    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.render.frames_rendered as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Bridge Statistics                         ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Frames rendered: {}", self.render.frames_rendered);
        println!("   └─ Render FPS: {:.2}", self.fps());

        let ingestion = &self.ingestion;
        println!("\n📥 Ingestion");
        println!("   ├─ Messages received: {}", ingestion.messages_received);
        println!("   ├─ Decode errors: {}", ingestion.decode_errors);
        println!("   ├─ Frames published: {}", ingestion.frames_published);
        println!("   ├─ Points received: {}", ingestion.points_received);
        println!(
            "   └─ Points dropped: {} ({:.2}%)",
            ingestion.points_dropped,
            ingestion.drop_rate()
        );

        println!("\n🗃️  Frame Cache");
        println!("   ├─ Publishes: {}", self.cache_publishes);
        println!("   └─ Copies: {}", self.cache_copies);

        let summary = self.render.summary();
        println!("\n📈 Render");
        println!(
            "   ├─ Frames skipped: {} ({:.2}%)",
            summary.frames_skipped, summary.skip_rate
        );
        println!("   ├─ Empty frames: {}", summary.empty_frames);
        println!("   ├─ Points per frame: {}", summary.points_per_frame);
        println!("   └─ Frame gap (ms): {}", summary.frame_gap_ms);

        println!();
    }
}
