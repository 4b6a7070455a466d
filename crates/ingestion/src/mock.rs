//! Mock point cloud source
//!
//! Synthesizes a spinning multi-ring LiDAR for running the bridge without a
//! live transport.

use std::f32::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use bytes::{BufMut, BytesMut};
use contracts::{
    clamped_rate_period, ChannelName, MessageHandler, MessageSource, MockSourceConfig,
    PointCloudMessage, PointField, PointFieldType, RawPoint,
};
use tracing::{debug, info, trace};

use crate::pacing::{join_source_thread, sleep_while_listening};
use crate::wire::encode_message;

/// Bytes per point in the PointXYZIR layout
pub const XYZIR_POINT_STEP: u32 = 32;

/// Elevation span of the synthetic sensor, in degrees
const LOWER_ELEVATION_DEG: f32 = -30.67;
const UPPER_ELEVATION_DEG: f32 = 10.67;

/// Build a little-endian PointXYZIR message.
///
/// Layout per point: x, y, z `f32` at 0/4/8, intensity `f32` at 16, ring `u16`
/// at 20, padded to 32 bytes.
pub fn xyzir_message(utime: i64, points: &[RawPoint]) -> PointCloudMessage {
    let mut data = BytesMut::with_capacity(points.len() * XYZIR_POINT_STEP as usize);
    for point in points {
        let [x, y, z] = point.position;
        data.put_f32_le(x);
        data.put_f32_le(y);
        data.put_f32_le(z);
        data.put_bytes(0, 4);
        data.put_f32_le(point.intensity);
        data.put_u16_le(point.ring);
        data.put_bytes(0, 10);
    }

    PointCloudMessage {
        utime,
        frame_id: "velodyne".to_string(),
        height: 1,
        width: points.len() as u32,
        fields: vec![
            PointField::new("x", 0, PointFieldType::Float32),
            PointField::new("y", 4, PointFieldType::Float32),
            PointField::new("z", 8, PointFieldType::Float32),
            PointField::new("intensity", 16, PointFieldType::Float32),
            PointField::new("ring", 20, PointFieldType::Uint16),
        ],
        is_bigendian: false,
        point_step: XYZIR_POINT_STEP,
        row_step: XYZIR_POINT_STEP * points.len() as u32,
        data: data.freeze(),
        is_dense: false,
    }
}

/// Points of synthetic sweep number `seq`.
///
/// Points are emitted column by column, `rings` points per column. When
/// `invalid_every` is non-zero every `invalid_every`-th point gets a NaN x.
pub fn synthetic_sweep(config: &MockSourceConfig, seq: u64) -> Vec<RawPoint> {
    let n = config.points_per_frame as usize;
    let rings = config.rings.max(1) as usize;
    let columns = n.div_ceil(rings).max(1);
    let phase = (seq % 360) as f32 * TAU / 360.0;

    (0..n)
        .map(|i| {
            let ring = i % rings;
            let column = i / rings;

            let azimuth = column as f32 / columns as f32 * TAU + phase;
            let elevation_deg = if rings > 1 {
                LOWER_ELEVATION_DEG
                    + ring as f32 * (UPPER_ELEVATION_DEG - LOWER_ELEVATION_DEG) / (rings - 1) as f32
            } else {
                0.0
            };
            let elevation = elevation_deg.to_radians();
            let range = 10.0 + 2.0 * (3.0 * azimuth).sin();

            let mut x = range * elevation.cos() * azimuth.cos();
            if config.invalid_every > 0 && (i + 1) % config.invalid_every as usize == 0 {
                x = f32::NAN;
            }

            RawPoint {
                position: [
                    x,
                    range * elevation.cos() * azimuth.sin(),
                    range * elevation.sin(),
                ],
                intensity: ((ring * 8 + column) % 256) as f32,
                ring: ring as u16,
            }
        })
        .collect()
}

fn wall_clock_micros() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as i64)
        .unwrap_or(0)
}

/// Mock point cloud source
///
/// Publishes encoded PointXYZIR sweeps from a background thread.
pub struct MockPointCloudSource {
    channel: ChannelName,
    config: MockSourceConfig,
    listening: Arc<AtomicBool>,
    thread_handle: Mutex<Option<JoinHandle<()>>>,
}

impl MockPointCloudSource {
    pub fn new(channel: impl Into<ChannelName>, config: MockSourceConfig) -> Self {
        Self {
            channel: channel.into(),
            config,
            listening: Arc::new(AtomicBool::new(false)),
            thread_handle: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &MockSourceConfig {
        &self.config
    }
}

impl MessageSource for MockPointCloudSource {
    fn channel(&self) -> &str {
        self.channel.as_str()
    }

    fn subscribe(&self, handler: MessageHandler) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let listening = self.listening.clone();
        let channel = self.channel.clone();
        let config = self.config.clone();
        let interval = clamped_rate_period(config.frequency_hz);

        let handle = thread::spawn(move || {
            info!(
                channel = %channel,
                frequency_hz = config.frequency_hz,
                points_per_frame = config.points_per_frame,
                "mock point cloud source started"
            );

            let mut seq: u64 = 0;
            let mut last_utime = 0i64;
            let mut next_tick = Instant::now();

            while listening.load(Ordering::Relaxed) {
                // Strictly increasing even if the wall clock steps back
                let utime = wall_clock_micros().max(last_utime + 1);
                last_utime = utime;

                let points = synthetic_sweep(&config, seq);
                let payload = encode_message(&xyzir_message(utime, &points));
                trace!(seq, utime, bytes = payload.len(), "mock sweep");
                handler(&payload[..], channel.as_str());
                seq += 1;

                next_tick += interval;
                let now = Instant::now();
                if next_tick > now {
                    sleep_while_listening(&listening, next_tick - now);
                } else {
                    next_tick = now;
                }
            }

            debug!(channel = %channel, sweeps = seq, "mock point cloud source stopped");
        });

        *self
            .thread_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);

        let handle = self
            .thread_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            // stop() may be called from inside the handler
            if handle.thread().id() != thread::current().id() {
                join_source_thread(handle, &self.channel);
            }
        }
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}

impl Drop for MockPointCloudSource {
    fn drop(&mut self) {
        self.stop();
    }
}
