//! Point cloud adapter
//!
//! Subscription wiring: payload in, published frame out.

use std::sync::Arc;
use std::time::Instant;

use contracts::{ChannelName, MessageHandler, MessageSource};
use frame_cache::LatestFrameCache;
use tracing::{debug, info, instrument, trace, warn};

use crate::convert::convert;
use crate::error::Result;
use crate::extract::to_raw_frame;
use crate::metrics::IngestionMetrics;
use crate::wire::decode_message;

/// Decodes point cloud messages from one channel and publishes the converted
/// frames into a [`LatestFrameCache`].
pub struct PointCloudAdapter {
    channel: ChannelName,
    cache: Arc<LatestFrameCache>,
    metrics: Arc<IngestionMetrics>,
}

impl PointCloudAdapter {
    pub fn new(channel: impl Into<ChannelName>, cache: Arc<LatestFrameCache>) -> Self {
        Self::with_metrics(channel, cache, Arc::new(IngestionMetrics::new()))
    }

    pub fn with_metrics(
        channel: impl Into<ChannelName>,
        cache: Arc<LatestFrameCache>,
        metrics: Arc<IngestionMetrics>,
    ) -> Self {
        Self {
            channel: channel.into(),
            cache,
            metrics,
        }
    }

    pub fn channel(&self) -> &ChannelName {
        &self.channel
    }

    pub fn cache(&self) -> &Arc<LatestFrameCache> {
        &self.cache
    }

    pub fn metrics(&self) -> &Arc<IngestionMetrics> {
        &self.metrics
    }

    /// Transport callback.
    ///
    /// Messages for other channels are ignored. A payload that fails to decode
    /// is counted and logged; nothing is published for it.
    pub fn on_message(&self, payload: &[u8], channel: &str) {
        if !self.channel.matches(channel) {
            trace!(channel, subscribed = %self.channel, "ignoring message for other channel");
            return;
        }

        self.metrics.record_received();
        observability::record_message_received(channel, payload.len());

        if let Err(e) = self.process(payload) {
            self.metrics.record_decode_error();
            observability::record_decode_error(channel);
            warn!(channel, bytes = payload.len(), error = %e, "dropping undecodable point cloud");
        }
    }

    /// Decode, convert and publish one payload, returning the published timestamp
    pub fn process(&self, payload: &[u8]) -> Result<i64> {
        let started = Instant::now();

        let msg = decode_message(payload)?;
        let raw = to_raw_frame(&msg)?;
        let frame = convert(&raw);

        let utime = raw.utime;
        let (points_in, points_out) = (raw.len(), frame.len());
        self.cache.publish(frame, utime);

        self.metrics.record_published(points_in, points_out);
        observability::record_frame_converted(
            self.channel.as_str(),
            points_out,
            points_in - points_out,
        );
        observability::record_conversion_latency_ms(started.elapsed().as_secs_f64() * 1000.0);
        debug!(
            utime,
            points = points_out,
            dropped = points_in - points_out,
            "published point cloud frame"
        );

        Ok(utime)
    }

    /// Transport callback bound to this adapter
    pub fn handler(self: &Arc<Self>) -> MessageHandler {
        let adapter = Arc::clone(self);
        Arc::new(move |payload: &[u8], channel: &str| adapter.on_message(payload, channel))
    }

    /// Subscribe to `source`
    #[instrument(name = "adapter_attach", skip_all, fields(channel = %self.channel))]
    pub fn attach(self: &Arc<Self>, source: &dyn MessageSource) {
        if !self.channel.matches(source.channel()) {
            warn!(
                source_channel = source.channel(),
                "source publishes on a different channel; its messages will be ignored"
            );
        }
        source.subscribe(self.handler());
        info!("point cloud adapter attached");
    }
}

impl std::fmt::Debug for PointCloudAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PointCloudAdapter")
            .field("channel", &self.channel)
            .field("metrics", &self.metrics.snapshot())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{RawPoint, RenderableFrame};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use crate::mock::xyzir_message;
    use crate::wire::encode_message;

    fn adapter() -> Arc<PointCloudAdapter> {
        Arc::new(PointCloudAdapter::new(
            "VELODYNE",
            Arc::new(LatestFrameCache::new()),
        ))
    }

    fn payload(utime: i64, points: &[RawPoint]) -> Vec<u8> {
        encode_message(&xyzir_message(utime, points)).to_vec()
    }

    /// Source that delivers whatever the test pushes through it
    #[derive(Default)]
    struct ManualSource {
        handler: Mutex<Option<MessageHandler>>,
        listening: AtomicBool,
    }

    impl ManualSource {
        fn push(&self, payload: &[u8], channel: &str) {
            if let Some(handler) = self.handler.lock().unwrap().as_ref() {
                handler(payload, channel);
            }
        }
    }

    impl MessageSource for ManualSource {
        fn channel(&self) -> &str {
            "VELODYNE"
        }

        fn subscribe(&self, handler: MessageHandler) {
            if self.listening.swap(true, Ordering::SeqCst) {
                return;
            }
            *self.handler.lock().unwrap() = Some(handler);
        }

        fn stop(&self) {
            self.listening.store(false, Ordering::SeqCst);
        }

        fn is_listening(&self) -> bool {
            self.listening.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn test_message_is_published() {
        let adapter = adapter();
        let points = [
            RawPoint::new(1.0, 2.0, 3.0, 10.0, 5),
            RawPoint::new(f32::NAN, 0.0, 0.0, 99.0, 7),
            RawPoint::new(4.0, 5.0, 6.0, 20.0, 6),
        ];

        adapter.on_message(&payload(1000, &points), "VELODYNE");

        let mut dest = RenderableFrame::empty();
        assert_eq!(adapter.cache().copy_out(&mut dest), 1000);
        assert_eq!(dest.positions, vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        assert_eq!(dest.ring, vec![5, 6]);

        let snapshot = adapter.metrics().snapshot();
        assert_eq!(snapshot.messages_received, 1);
        assert_eq!(snapshot.frames_published, 1);
        assert_eq!(snapshot.points_dropped, 1);
    }

    #[test]
    fn test_decode_failure_does_not_publish() {
        let adapter = adapter();
        adapter.on_message(&payload(1000, &[RawPoint::new(1.0, 1.0, 1.0, 0.0, 0)]), "VELODYNE");

        adapter.on_message(b"not a point cloud", "VELODYNE");

        let mut dest = RenderableFrame::empty();
        assert_eq!(adapter.cache().copy_out(&mut dest), 1000);
        assert_eq!(dest.len(), 1);
        let snapshot = adapter.metrics().snapshot();
        assert_eq!(snapshot.decode_errors, 1);
        assert_eq!(snapshot.frames_published, 1);
    }

    #[test]
    fn test_other_channel_ignored() {
        let adapter = adapter();
        adapter.on_message(&payload(1000, &[]), "CAMERA");

        assert_eq!(adapter.cache().utime(), 0);
        assert_eq!(adapter.metrics().snapshot().messages_received, 0);
    }

    #[test]
    fn test_empty_cloud_is_published() {
        let adapter = adapter();
        assert_eq!(adapter.process(&payload(500, &[])).unwrap(), 500);

        let (frame, utime) = adapter.cache().latest();
        assert_eq!(utime, 500);
        assert!(frame.is_empty());
    }

    #[test]
    fn test_attach() {
        let adapter = adapter();
        let source = ManualSource::default();

        adapter.attach(&source);
        assert!(source.is_listening());

        source.push(&payload(10, &[RawPoint::new(1.0, 1.0, 1.0, 1.0, 1)]), "VELODYNE");
        source.push(&payload(20, &[RawPoint::new(2.0, 2.0, 2.0, 2.0, 2)]), "VELODYNE");

        let (frame, utime) = adapter.cache().latest();
        assert_eq!(utime, 20);
        assert_eq!(frame.positions, vec![[2.0, 2.0, 2.0]]);
    }
}
