//! Replay source - play back a recorded session
//!
//! A recording directory holds a `messages.jsonl` index plus one binary file
//! per message:
//!
//! ```text
//! recording/
//! ├── messages.jsonl     {"channel": "VELODYNE", "utime": 1700000000000000, "data_file": "data/000001.bin"}
//! └── data/
//!     └── 000001.bin     wire-encoded payload
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use contracts::{ChannelName, MessageHandler, MessageSource, ReplaySourceConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{IngestionError, Result};
use crate::pacing::{join_source_thread, sleep_while_listening};

/// Index file name inside a recording directory
pub const INDEX_FILE: &str = "messages.jsonl";

/// One line of the recording index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedMessage {
    pub channel: String,
    pub utime: i64,
    /// Payload path, relative to the recording directory
    pub data_file: String,
}

/// Replays one channel of a recording at its original pacing
pub struct ReplaySource {
    channel: ChannelName,
    root: PathBuf,
    records: Arc<[RecordedMessage]>,
    speed: f64,
    loop_playback: bool,
    listening: Arc<AtomicBool>,
    thread_handle: Mutex<Option<JoinHandle<()>>>,
}

impl ReplaySource {
    /// Load the index of `config.path`, keeping only records for `channel`
    pub fn load(channel: impl Into<ChannelName>, config: &ReplaySourceConfig) -> Result<Self> {
        let channel = channel.into();
        let root = config.path.clone();
        let records = read_index(&root, &channel)?;

        info!(
            channel = %channel,
            path = %root.display(),
            records = records.len(),
            "loaded replay recording"
        );

        Ok(Self {
            channel,
            root,
            records: records.into(),
            speed: config.speed,
            loop_playback: config.loop_playback,
            listening: Arc::new(AtomicBool::new(false)),
            thread_handle: Mutex::new(None),
        })
    }

    /// Number of records that will be replayed per pass
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Wait for the playback thread to finish on its own
    pub fn join(&self) {
        let handle = self
            .thread_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            join_source_thread(handle, &self.channel);
        }
    }
}

fn read_index(root: &Path, channel: &ChannelName) -> Result<Vec<RecordedMessage>> {
    let index_path = root.join(INDEX_FILE);
    let file = File::open(&index_path)
        .map_err(|e| IngestionError::replay(&index_path, format!("cannot open index: {e}")))?;

    let mut records = Vec::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: RecordedMessage = serde_json::from_str(&line).map_err(|e| {
            IngestionError::replay(&index_path, format!("line {}: {e}", line_no + 1))
        })?;
        if channel.matches(&record.channel) {
            records.push(record);
        }
    }

    // Stable, so records sharing a timestamp keep their file order
    records.sort_by_key(|r| r.utime);
    Ok(records)
}

/// Time from the first record to `record`, scaled by playback speed.
///
/// Saturates at `Duration::MAX` when the scaled gap is not representable.
fn playback_offset(first: i64, record: i64, speed: f64) -> Duration {
    let micros = record.saturating_sub(first).max(0) as f64;
    Duration::try_from_secs_f64(micros / 1e6 / speed).unwrap_or(Duration::MAX)
}

impl MessageSource for ReplaySource {
    fn channel(&self) -> &str {
        self.channel.as_str()
    }

    fn subscribe(&self, handler: MessageHandler) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let listening = self.listening.clone();
        let channel = self.channel.clone();
        let records = self.records.clone();
        let root = self.root.clone();
        let speed = if self.speed.is_finite() && self.speed > 0.0 {
            self.speed
        } else {
            1.0
        };
        let loop_playback = self.loop_playback;

        let handle = thread::spawn(move || {
            debug!(channel = %channel, "replay thread started");

            'playback: loop {
                let Some(first) = records.first() else {
                    warn!(channel = %channel, "no records to replay");
                    break;
                };
                let start_time = Instant::now();

                for record in records.iter() {
                    if !listening.load(Ordering::Relaxed) {
                        debug!(channel = %channel, "replay stopped");
                        break 'playback;
                    }

                    let target = playback_offset(first.utime, record.utime, speed);
                    let elapsed = start_time.elapsed();
                    if target > elapsed && !sleep_while_listening(&listening, target - elapsed) {
                        debug!(channel = %channel, "replay stopped");
                        break 'playback;
                    }

                    let path = root.join(&record.data_file);
                    match std::fs::read(&path) {
                        Ok(payload) => handler(&payload[..], &record.channel),
                        Err(e) => {
                            warn!(path = %path.display(), error = %e, "failed to read payload file")
                        }
                    }
                }

                if !loop_playback {
                    info!(channel = %channel, "replay completed");
                    break;
                }

                debug!(channel = %channel, "looping replay");
            }

            listening.store(false, Ordering::SeqCst);
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
            if handle.thread().id() != thread::current().id() {
                join_source_thread(handle, &self.channel);
            }
        }
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}

impl Drop for ReplaySource {
    fn drop(&mut self) {
        self.stop();
    }
}
