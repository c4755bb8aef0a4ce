//! LRU-K page replacement.
//!
//! LRU-K evicts the frame whose *backward k-distance* is largest: the
//! time since the k-th most recent access, or +inf for frames accessed
//! fewer than k times. Among the +inf frames, the one with the earliest
//! overall access wins, which is classical LRU. Compared to plain LRU
//! this resists one-shot scans flushing the hot set: a page must prove
//! itself with k references before its recency protects it.

use std::collections::{BTreeSet, HashMap, VecDeque};

use parking_lot::Mutex;

use super::frame::FrameId;

/// Per-frame replacement state.
struct FrameEntry {
    /// Timestamps of the most recent accesses, at most `k` retained.
    /// Front is the oldest retained, i.e. the k-th most recent once the
    /// frame has k accesses.
    history: VecDeque<u64>,
    /// Total number of recorded accesses.
    accesses: u64,
    /// Whether this frame may be chosen as a victim.
    evictable: bool,
}

/// Mutable state behind the replacer's latch.
struct ReplacerInner {
    /// Logical clock, bumped on every recorded access.
    current_timestamp: u64,
    /// Number of tracked frames currently evictable.
    evictable_count: usize,
    entries: HashMap<FrameId, FrameEntry>,
    /// Frames with fewer than `k` accesses (+inf backward k-distance).
    /// Front = most recent arrival; victims are taken from the back.
    probation: VecDeque<FrameId>,
    /// Frames with at least `k` accesses, ordered by the k-th most
    /// recent access timestamp. The smallest key is the next victim.
    mature: BTreeSet<(u64, FrameId)>,
}

impl ReplacerInner {
    /// Chooses and untracks the best victim, if any frame is evictable.
    fn evict(&mut self) -> Option<FrameId> {
        if self.evictable_count == 0 {
            return None;
        }

        // +inf frames first, oldest arrival first.
        let victim = self
            .probation
            .iter()
            .rev()
            .copied()
            .find(|f| self.entries[f].evictable);
        if let Some(frame_id) = victim {
            self.probation.retain(|f| *f != frame_id);
            self.entries.remove(&frame_id);
            self.evictable_count -= 1;
            return Some(frame_id);
        }

        // Then the frame with the oldest k-th-most-recent access.
        let victim = self
            .mature
            .iter()
            .copied()
            .find(|(_, f)| self.entries[f].evictable);
        if let Some(key) = victim {
            self.mature.remove(&key);
            self.entries.remove(&key.1);
            self.evictable_count -= 1;
            return Some(key.1);
        }

        None
    }
}

/// LRU-K replacer for buffer pool frames.
///
/// Tracks access histories and evictability per frame and selects
/// eviction victims by maximum backward k-distance. The capacity and `k`
/// are fixed at construction; the live count reported by [`len`] is the
/// number of tracked frames currently evictable.
///
/// The replacer has its own latch and never calls back into the buffer
/// pool, so the pool may invoke it while holding the pool latch.
///
/// [`len`]: LruKReplacer::len
pub struct LruKReplacer {
    k: usize,
    capacity: usize,
    inner: Mutex<ReplacerInner>,
}

impl LruKReplacer {
    /// Creates a replacer able to track up to `capacity` frames.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or `k` is zero.
    pub fn new(capacity: usize, k: usize) -> Self {
        assert!(capacity > 0, "capacity must be > 0");
        assert!(k >= 1, "k must be >= 1");
        Self {
            k,
            capacity,
            inner: Mutex::new(ReplacerInner {
                current_timestamp: 0,
                evictable_count: 0,
                entries: HashMap::with_capacity(capacity),
                probation: VecDeque::new(),
                mature: BTreeSet::new(),
            }),
        }
    }

    /// Returns the `k` this replacer was built with.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Returns the fixed capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Records an access to `frame_id` at the next timestamp.
    ///
    /// A frame seen for the first time enters tracking as evictable. If
    /// tracking is already at capacity, a victim is evicted first to make
    /// room (the buffer pool normally guarantees room; this is a
    /// backstop).
    ///
    /// # Panics
    ///
    /// Panics if `frame_id` is out of range for this replacer.
    pub fn record_access(&self, frame_id: FrameId) {
        assert!(
            frame_id.index() < self.capacity,
            "frame id {} out of range for replacer of capacity {}",
            frame_id.index(),
            self.capacity
        );

        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let ts = inner.current_timestamp;
        inner.current_timestamp += 1;

        if !inner.entries.contains_key(&frame_id) {
            if inner.evictable_count == self.capacity {
                inner.evict();
            }
            let mut history = VecDeque::with_capacity(self.k);
            history.push_back(ts);
            inner.entries.insert(
                frame_id,
                FrameEntry {
                    history,
                    accesses: 1,
                    evictable: true,
                },
            );
            inner.evictable_count += 1;
            if self.k == 1 {
                inner.mature.insert((ts, frame_id));
            } else {
                inner.probation.push_front(frame_id);
            }
            return;
        }

        let k = self.k as u64;
        let entry = inner.entries.get_mut(&frame_id).expect("entry present");
        entry.accesses += 1;
        let accesses = entry.accesses;

        if accesses < k {
            // Still +inf; position in probation is by arrival, unchanged.
            entry.history.push_back(ts);
        } else if accesses == k {
            // Graduates: k-th most recent is the oldest retained.
            entry.history.push_back(ts);
            let kth = *entry.history.front().expect("non-empty history");
            inner.probation.retain(|f| *f != frame_id);
            inner.mature.insert((kth, frame_id));
        } else {
            // Drop the oldest retained timestamp and re-key.
            let old_kth = entry.history.pop_front().expect("non-empty history");
            entry.history.push_back(ts);
            let new_kth = *entry.history.front().expect("non-empty history");
            inner.mature.remove(&(old_kth, frame_id));
            inner.mature.insert((new_kth, frame_id));
        }
    }

    /// Toggles whether `frame_id` may be evicted.
    ///
    /// No-op if the frame is untracked or already in the requested state.
    pub fn set_evictable(&self, frame_id: FrameId, evictable: bool) {
        let mut inner = self.inner.lock();
        let Some(entry) = inner.entries.get_mut(&frame_id) else {
            return;
        };
        if entry.evictable == evictable {
            return;
        }
        entry.evictable = evictable;
        if evictable {
            inner.evictable_count += 1;
        } else {
            inner.evictable_count -= 1;
        }
    }

    /// Chooses the evictable frame with maximum backward k-distance,
    /// untracks it, and returns its id. Returns `None` if no frame is
    /// evictable.
    pub fn evict(&self) -> Option<FrameId> {
        self.inner.lock().evict()
    }

    /// Untracks `frame_id`, dropping its access history.
    ///
    /// No-op if the frame is untracked or not evictable.
    pub fn remove(&self, frame_id: FrameId) {
        let mut inner = self.inner.lock();
        match inner.entries.get(&frame_id) {
            Some(entry) if entry.evictable => {}
            _ => return,
        }

        let entry = inner.entries.remove(&frame_id).expect("entry present");
        inner.evictable_count -= 1;
        if entry.accesses < self.k as u64 {
            inner.probation.retain(|f| *f != frame_id);
        } else {
            let kth = *entry.history.front().expect("non-empty history");
            inner.mature.remove(&(kth, frame_id));
        }
    }

    /// Returns the number of tracked frames currently evictable.
    pub fn len(&self) -> usize {
        self.inner.lock().evictable_count
    }

    /// Returns `true` if no tracked frame is evictable.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for LruKReplacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("LruKReplacer")
            .field("k", &self.k)
            .field("capacity", &self.capacity)
            .field("tracked", &inner.entries.len())
            .field("evictable", &inner.evictable_count)
            .finish()
    }
}
