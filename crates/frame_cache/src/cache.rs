//! Latest-frame cache

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::RenderableFrame;
use tracing::{instrument, trace};

/// Slot contents: the most recently published frame and its source timestamp
#[derive(Debug)]
struct CacheSlot {
    frame: Arc<RenderableFrame>,
    utime: i64,
}

impl Default for CacheSlot {
    fn default() -> Self {
        Self {
            frame: Arc::new(RenderableFrame::empty()),
            utime: 0,
        }
    }
}

/// Single-slot frame cache.
///
/// `publish` and `copy_out` take the same lock, so a reader always sees one
/// whole frame together with the timestamp it was published with.
#[derive(Debug, Default)]
pub struct LatestFrameCache {
    slot: Mutex<CacheSlot>,
    stats: CacheStats,
}

impl LatestFrameCache {
    /// Empty cache: placeholder frame with zero points, timestamp 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached frame.
    ///
    /// The previous frame is dropped once the last outstanding [`latest`]
    /// snapshot referencing it goes away.
    ///
    /// [`latest`]: Self::latest
    #[instrument(name = "frame_cache_publish", level = "trace", skip(self, frame), fields(points = frame.len()))]
    pub fn publish(&self, frame: RenderableFrame, utime: i64) {
        let frame = Arc::new(frame);
        let previous = {
            let mut slot = self.lock();
            slot.utime = utime;
            std::mem::replace(&mut slot.frame, frame)
        };
        // Deallocate outside the lock
        drop(previous);

        self.stats.publishes.fetch_add(1, Ordering::Relaxed);
        observability::record_frame_published(utime);
    }

    /// Deep-copy the cached frame into `dest` and return its timestamp.
    ///
    /// `dest` keeps its allocations where they are large enough.
    #[instrument(name = "frame_cache_copy_out", level = "trace", skip_all)]
    pub fn copy_out(&self, dest: &mut RenderableFrame) -> i64 {
        let utime = {
            let slot = self.lock();
            dest.clone_from(&slot.frame);
            slot.utime
        };

        self.stats.copies.fetch_add(1, Ordering::Relaxed);
        observability::record_frame_copied(dest.len());
        trace!(utime, points = dest.len(), "frame copied out");
        utime
    }

    /// Shared snapshot of the cached frame and its timestamp.
    ///
    /// The snapshot is immutable and stays valid after later publishes.
    pub fn latest(&self) -> (Arc<RenderableFrame>, i64) {
        let slot = self.lock();
        (Arc::clone(&slot.frame), slot.utime)
    }

    /// Timestamp of the cached frame, 0 before the first publish
    pub fn utime(&self) -> i64 {
        self.lock().utime
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    // The slot is only ever replaced wholesale, so a panic while holding the
    // lock cannot leave it half-written.
    fn lock(&self) -> MutexGuard<'_, CacheSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Publish/copy counters
#[derive(Debug, Default)]
pub struct CacheStats {
    publishes: AtomicU64,
    copies: AtomicU64,
}

impl CacheStats {
    /// Total frames published
    pub fn publishes(&self) -> u64 {
        self.publishes.load(Ordering::Relaxed)
    }

    /// Total copy-outs served
    pub fn copies(&self) -> u64 {
        self.copies.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::VertexCells;
    use rand::Rng;
    use std::thread;

    /// Frame whose every value encodes `tag`, so a mixed frame is detectable
    fn tagged_frame(tag: u32, n: usize) -> RenderableFrame {
        RenderableFrame {
            positions: vec![[tag as f32; 3]; n],
            intensity: vec![tag as f32; n],
            ring: vec![tag; n],
            verts: VertexCells::with_count(n),
        }
    }

    fn assert_uniform(frame: &RenderableFrame, utime: i64) {
        assert!(frame.is_consistent());
        let tag = utime as u32;
        assert!(frame.ring.iter().all(|&r| r == tag), "mixed frame at {utime}");
        assert!(frame.intensity.iter().all(|&i| i == tag as f32));
        assert!(frame.positions.iter().all(|p| p[0] == tag as f32));
    }

    #[test]
    fn test_empty_before_first_publish() {
        let cache = LatestFrameCache::new();
        let mut dest = tagged_frame(9, 4);

        let utime = cache.copy_out(&mut dest);

        assert_eq!(utime, 0);
        assert!(dest.is_empty());
        assert!(dest.is_consistent());
        assert_eq!(cache.utime(), 0);
    }

    #[test]
    fn test_publish_then_copy_out() {
        let cache = LatestFrameCache::new();
        let frame = RenderableFrame {
            positions: vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]],
            intensity: vec![7.0, 8.0],
            ring: vec![1, 2],
            verts: VertexCells::with_count(2),
        };

        cache.publish(frame.clone(), 1000);

        let mut dest = RenderableFrame::empty();
        assert_eq!(cache.copy_out(&mut dest), 1000);
        assert_eq!(dest, frame);
    }

    #[test]
    fn test_latest_wins() {
        let cache = LatestFrameCache::new();
        cache.publish(tagged_frame(1, 3), 1000);
        cache.publish(tagged_frame(2, 5), 2000);

        let mut dest = RenderableFrame::empty();
        assert_eq!(cache.copy_out(&mut dest), 2000);
        assert_eq!(dest.len(), 5);
        assert_eq!(dest.ring, vec![2; 5]);
    }

    #[test]
    fn test_repeated_copy_out_is_stable() {
        let cache = LatestFrameCache::new();
        cache.publish(tagged_frame(3, 10), 3000);

        let mut a = RenderableFrame::empty();
        let mut b = RenderableFrame::empty();
        assert_eq!(cache.copy_out(&mut a), 3000);
        assert_eq!(cache.copy_out(&mut b), 3000);
        assert_eq!(a, b);
    }

    #[test]
    fn test_copy_is_independent_of_slot() {
        let cache = LatestFrameCache::new();
        cache.publish(tagged_frame(4, 2), 4000);

        let mut dest = RenderableFrame::empty();
        cache.copy_out(&mut dest);
        dest.ring[0] = 99;
        dest.positions.push([0.0; 3]);

        let mut again = RenderableFrame::empty();
        cache.copy_out(&mut again);
        assert_eq!(again, tagged_frame(4, 2));
    }

    #[test]
    fn test_copy_out_shrinks_destination() {
        let cache = LatestFrameCache::new();
        cache.publish(tagged_frame(5, 2), 5000);

        let mut dest = tagged_frame(0, 100);
        cache.copy_out(&mut dest);
        assert_eq!(dest.len(), 2);
        assert!(dest.is_consistent());
    }

    #[test]
    fn test_latest_snapshot_survives_publish() {
        let cache = LatestFrameCache::new();
        cache.publish(tagged_frame(6, 3), 6000);

        let (snapshot, utime) = cache.latest();
        cache.publish(tagged_frame(7, 1), 7000);

        assert_eq!(utime, 6000);
        assert_eq!(snapshot.len(), 3);
        assert_eq!(cache.utime(), 7000);
    }

    #[test]
    fn test_stats() {
        let cache = LatestFrameCache::new();
        cache.publish(tagged_frame(1, 1), 1);
        cache.publish(tagged_frame(2, 1), 2);

        let mut dest = RenderableFrame::empty();
        cache.copy_out(&mut dest);

        assert_eq!(cache.stats().publishes(), 2);
        assert_eq!(cache.stats().copies(), 1);
    }

    #[test]
    fn test_recovers_from_poisoned_lock() {
        let cache = Arc::new(LatestFrameCache::new());
        cache.publish(tagged_frame(8, 2), 8000);

        let poisoner = Arc::clone(&cache);
        let result = thread::spawn(move || {
            let _guard = poisoner.slot.lock().unwrap();
            panic!("poison the slot");
        })
        .join();
        assert!(result.is_err());
        assert!(cache.slot.is_poisoned());

        let mut dest = RenderableFrame::empty();
        assert_eq!(cache.copy_out(&mut dest), 8000);
        cache.publish(tagged_frame(9, 1), 9000);
        assert_eq!(cache.utime(), 9000);
    }

    #[test]
    fn test_concurrent_publish_and_copy_never_tears() {
        let cache = Arc::new(LatestFrameCache::new());
        const PUBLISHES: i64 = 500;

        let writer = {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                let mut rng = rand::rng();
                for utime in 1..=PUBLISHES {
                    let n = rng.random_range(0..64);
                    cache.publish(tagged_frame(utime as u32, n), utime);
                }
            })
        };

        let readers: Vec<_> = (0..3)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    let mut dest = RenderableFrame::empty();
                    let mut last = 0;
                    for _ in 0..2000 {
                        let utime = cache.copy_out(&mut dest);
                        // Timestamps never go backwards for a single reader
                        assert!(utime >= last);
                        last = utime;
                        if utime > 0 {
                            assert_uniform(&dest, utime);
                        } else {
                            assert!(dest.is_empty());
                        }
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }

        let mut dest = RenderableFrame::empty();
        assert_eq!(cache.copy_out(&mut dest), PUBLISHES);
    }
}
