//! # Integration Tests
//!
//! Cross-crate end-to-end tests.
//!
//! Covers:
//! - Configuration -> source -> adapter -> cache -> reader
//! - Replay of a recorded session, including corrupt payloads
//! - Concurrent publish/copy-out through the real mock source

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
        let frame = contracts::RenderableFrame::empty();
        assert!(frame.is_consistent());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::path::Path;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        BridgeConfig, RawPoint, RenderableFrame, ReplaySourceConfig, SourceConfig,
    };
    use frame_cache::{FrameReader, LatestFrameCache};
    use ingestion::{
        build_source, convert, encode_message, to_raw_frame, xyzir_message, PointCloudAdapter,
        RecordedMessage, ReplaySource, INDEX_FILE,
    };
    use rand::Rng;

    const MOCK_CONFIG: &str = r#"
[transport]
channel = "VELODYNE"

[source]
kind = "mock"
frequency_hz = 50.0
points_per_frame = 640
rings = 32
invalid_every = 10

[render]
poll_hz = 100.0
"#;

    fn random_points(rng: &mut impl Rng, n: usize) -> Vec<RawPoint> {
        (0..n)
            .map(|_| {
                let x = if rng.random_bool(0.1) {
                    f32::NAN
                } else {
                    rng.random_range(-50.0..50.0)
                };
                RawPoint::new(
                    x,
                    rng.random_range(-50.0..50.0),
                    rng.random_range(-2.0..5.0),
                    rng.random_range(0.0..255.0),
                    rng.random_range(0..32),
                )
            })
            .collect()
    }

    fn write_recording(dir: &Path, payloads: &[(i64, Vec<u8>)]) {
        std::fs::create_dir_all(dir.join("data")).unwrap();
        let mut index = String::new();
        for (i, (utime, payload)) in payloads.iter().enumerate() {
            let data_file = format!("data/{i:06}.bin");
            std::fs::write(dir.join(&data_file), payload).unwrap();
            let record = RecordedMessage {
                channel: "VELODYNE".to_string(),
                utime: *utime,
                data_file,
            };
            index.push_str(&serde_json::to_string(&record).unwrap());
            index.push('\n');
        }
        std::fs::write(dir.join(INDEX_FILE), index).unwrap();
    }

    fn replay_config(dir: &Path) -> BridgeConfig {
        let mut config = BridgeConfig::with_channel("VELODYNE");
        config.source = SourceConfig::Replay(ReplaySourceConfig {
            path: dir.to_path_buf(),
            speed: 100.0,
            loop_playback: false,
        });
        config
    }

    /// End-to-end test: MockPointCloudSource -> PointCloudAdapter -> LatestFrameCache -> FrameReader
    #[tokio::test]
    async fn test_e2e_mock_bridge() {
        let config = ConfigLoader::load_from_str(MOCK_CONFIG, ConfigFormat::Toml).unwrap();

        let cache = Arc::new(LatestFrameCache::new());
        let adapter = Arc::new(PointCloudAdapter::new(config.channel(), cache.clone()));
        let source = build_source(&config).unwrap();
        adapter.attach(source.as_ref());

        let mut reader = FrameReader::new(cache.clone());
        let mut ticker = tokio::time::interval(config.render.poll_interval());
        let mut rendered = Vec::new();

        let collect = async {
            while rendered.len() < 3 {
                ticker.tick().await;
                if reader.poll().is_some() {
                    rendered.push((reader.frame().clone(), reader.utime()));
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(5), collect)
            .await
            .expect("no frames rendered within 5s");
        source.stop();

        for (frame, utime) in &rendered {
            assert!(*utime > 0);
            assert!(frame.is_consistent());
            // Every 10th point is invalid and must be gone
            assert_eq!(frame.len(), 576);
            assert!(frame.positions.iter().flatten().all(|c| c.is_finite()));
            assert!(frame.ring.iter().all(|&r| r < 32));
        }
        assert!(rendered.windows(2).all(|w| w[0].1 < w[1].1));

        let snapshot = adapter.metrics().snapshot();
        assert_eq!(snapshot.decode_errors, 0);
        assert!(snapshot.frames_published >= 3);
        assert_eq!(snapshot.points_dropped * 10, snapshot.points_received);
    }

    /// Replay: the cache ends up holding exactly the converted last frame
    #[test]
    fn test_e2e_replay_latest_frame() {
        let mut rng = rand::rng();
        let frames: Vec<(i64, Vec<RawPoint>)> = (1..=4)
            .map(|i| (i * 100_000, random_points(&mut rng, 200)))
            .collect();
        let payloads: Vec<(i64, Vec<u8>)> = frames
            .iter()
            .map(|(utime, points)| (*utime, encode_message(&xyzir_message(*utime, points)).to_vec()))
            .collect();

        let dir = tempfile::tempdir().unwrap();
        write_recording(dir.path(), &payloads);

        let cache = Arc::new(LatestFrameCache::new());
        let adapter = Arc::new(PointCloudAdapter::new("VELODYNE", cache.clone()));
        let config = replay_config(dir.path());
        let source = match &config.source {
            SourceConfig::Replay(replay) => ReplaySource::load("VELODYNE", replay).unwrap(),
            _ => unreachable!(),
        };
        adapter.attach(&source);
        source.join();

        let (last_utime, last_points) = frames.last().unwrap();
        let expected = convert(&contracts::RawFrame::new(*last_utime, last_points.clone()));

        let mut dest = RenderableFrame::empty();
        assert_eq!(cache.copy_out(&mut dest), *last_utime);
        assert_eq!(dest, expected);
        assert_eq!(adapter.metrics().snapshot().frames_published, 4);
        assert_eq!(cache.stats().publishes(), 4);
    }

    /// A corrupt payload in the middle of a stream is skipped; the cache keeps
    /// the previous frame until the next good one.
    #[test]
    fn test_e2e_replay_with_corrupt_payload() {
        let good = |utime: i64| {
            encode_message(&xyzir_message(utime, &[RawPoint::new(1.0, 2.0, 3.0, 4.0, 5)])).to_vec()
        };
        let mut truncated = good(200);
        truncated.truncate(truncated.len() / 2);

        let dir = tempfile::tempdir().unwrap();
        write_recording(dir.path(), &[(100, good(100)), (200, truncated), (300, good(300))]);

        let cache = Arc::new(LatestFrameCache::new());
        let adapter = Arc::new(PointCloudAdapter::new("VELODYNE", cache.clone()));
        let source = build_source(&replay_config(dir.path())).unwrap();
        adapter.attach(source.as_ref());

        // Wait for the replay thread to finish
        for _ in 0..500 {
            if !source.is_listening() {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        source.stop();

        let snapshot = adapter.metrics().snapshot();
        assert_eq!(snapshot.messages_received, 3);
        assert_eq!(snapshot.decode_errors, 1);
        assert_eq!(snapshot.frames_published, 2);
        assert_eq!(cache.utime(), 300);
    }

    /// Messages whose fields do not fit the point record are rejected without
    /// touching the cache.
    #[test]
    fn test_e2e_field_overrun_not_published() {
        let cache = Arc::new(LatestFrameCache::new());
        let adapter = PointCloudAdapter::new("VELODYNE", cache.clone());

        let mut msg = xyzir_message(10, &[RawPoint::new(1.0, 1.0, 1.0, 1.0, 1)]);
        msg.point_step = 8;
        adapter.on_message(&encode_message(&msg), "VELODYNE");

        assert_eq!(cache.utime(), 0);
        assert_eq!(adapter.metrics().decode_errors.load(Ordering::Relaxed), 1);
        assert!(to_raw_frame(&msg).is_err());
    }

    /// Reader copies never mix two publishes while the mock source is writing
    #[test]
    fn test_e2e_concurrent_copy_out_is_whole() {
        let config = ConfigLoader::load_from_str(MOCK_CONFIG, ConfigFormat::Toml).unwrap();
        let cache = Arc::new(LatestFrameCache::new());
        let adapter = Arc::new(PointCloudAdapter::new(config.channel(), cache.clone()));
        let source = build_source(&config).unwrap();
        adapter.attach(source.as_ref());

        let mut dest = RenderableFrame::empty();
        let mut last = 0;
        let deadline = std::time::Instant::now() + Duration::from_millis(300);
        while std::time::Instant::now() < deadline {
            let utime = cache.copy_out(&mut dest);
            assert!(utime >= last);
            last = utime;
            assert!(dest.is_consistent());
            if utime > 0 {
                assert_eq!(dest.len(), 576);
                assert!(dest
                    .verts
                    .point_ids()
                    .enumerate()
                    .all(|(i, id)| id == i as i64));
            }
        }
        source.stop();
        assert!(last > 0);
    }
}
