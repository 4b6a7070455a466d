//! Pacing and shutdown helpers for source threads

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use contracts::ChannelName;
use tracing::warn;

/// Longest single sleep before `listening` is checked again
const SLICE: Duration = Duration::from_millis(20);

/// Sleep for `duration`, waking early once `listening` clears.
///
/// Returns whether the source is still listening.
pub(crate) fn sleep_while_listening(listening: &AtomicBool, duration: Duration) -> bool {
    let deadline = Instant::now().checked_add(duration);
    loop {
        if !listening.load(Ordering::Relaxed) {
            return false;
        }
        let remaining = match deadline {
            Some(deadline) => deadline.saturating_duration_since(Instant::now()),
            None => SLICE,
        };
        if remaining.is_zero() {
            return true;
        }
        thread::sleep(remaining.min(SLICE));
    }
}

/// Join a source thread, logging if it panicked.
///
/// Returns whether the thread exited cleanly.
pub(crate) fn join_source_thread(handle: JoinHandle<()>, channel: &ChannelName) -> bool {
    match handle.join() {
        Ok(()) => true,
        Err(_) => {
            warn!(channel = %channel, "source thread panicked");
            false
        }
    }
}
