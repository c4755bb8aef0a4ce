//! Buffer pool manager.
//!
//! Coordinates the frame array, the free list, the page directory, and
//! the LRU-K replacer, loading pages from disk on demand and writing
//! dirty victims back before their frames are reused.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use oxbow_common::types::PageId;
use parking_lot::Mutex;
use tracing::{debug, trace};

use super::config::BufferPoolConfig;
use super::error::{BufferError, BufferResult};
use super::frame::{BufferFrame, FrameId};
use super::replacer::LruKReplacer;
use super::BufferPoolStats;
use crate::disk::DiskManager;
use crate::hash::ExtendibleHashTable;

/// A non-owning handle to a resident, pinned frame.
///
/// The pool keeps the frame resident until every handle's pin is
/// released with [`BufferPoolManager::unpin_page`].
pub type FrameRef = Arc<BufferFrame>;

/// State guarded by the pool latch.
struct PoolInner {
    /// Frames known to hold no page.
    free_list: VecDeque<FrameId>,
    /// Monotonic page id allocator.
    next_page_id: u64,
}

/// The buffer pool manager.
///
/// A fixed array of frames caches disk pages. Callers fetch pages by id;
/// the pool pins them while in use and evicts cold pages through the
/// LRU-K replacer, writing dirty victims back first. A page's frame is
/// found through the extendible-hash page directory.
///
/// Every public operation takes the pool latch before touching shared
/// state, and disk I/O happens under it: operations are linearizable,
/// and a fetch observes all effects of earlier unpins of the same page.
/// The replacer and the directory have their own latches and never call
/// back into the pool, so lock order is strictly pool -> component.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use oxbow_storage::buffer::{BufferPoolConfig, BufferPoolManager};
/// use oxbow_storage::disk::MemDiskManager;
///
/// # fn main() -> oxbow_storage::buffer::BufferResult<()> {
/// let config = BufferPoolConfig::new(16);
/// let disk = Arc::new(MemDiskManager::new(config.page_size));
/// let pool = BufferPoolManager::new(config, disk)?;
///
/// let frame = pool.new_page()?;
/// let page_id = frame.page_id();
/// frame.write_data()[0] = 42;
/// pool.unpin_page(page_id, true);
///
/// let frame = pool.fetch_page(page_id)?;
/// assert_eq!(frame.read_data()[0], 42);
/// pool.unpin_page(page_id, false);
/// # Ok(())
/// # }
/// ```
pub struct BufferPoolManager {
    config: BufferPoolConfig,
    /// Array of buffer frames, fixed at construction.
    frames: Vec<Arc<BufferFrame>>,
    /// Free list and page id allocator, behind the pool latch.
    inner: Mutex<PoolInner>,
    /// Page directory: PageId -> FrameId.
    page_table: ExtendibleHashTable<PageId, FrameId>,
    /// LRU-K replacer for victim selection.
    replacer: LruKReplacer,
    /// Disk interface, injected at construction.
    disk: Arc<dyn DiskManager>,
    // Statistics counters.
    fetch_count: AtomicU64,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
    eviction_count: AtomicU64,
    flush_count: AtomicU64,
}

impl BufferPoolManager {
    /// Creates a buffer pool over the given disk manager.
    pub fn new(config: BufferPoolConfig, disk: Arc<dyn DiskManager>) -> BufferResult<Self> {
        config.validate().map_err(BufferError::config)?;
        if disk.page_size() != config.page_size {
            return Err(BufferError::config(format!(
                "disk page size {} does not match pool page size {}",
                disk.page_size(),
                config.page_size
            )));
        }

        let frames: Vec<Arc<BufferFrame>> = (0..config.pool_size)
            .map(|i| Arc::new(BufferFrame::new(FrameId::new(i), config.page_size)))
            .collect();

        let free_list: VecDeque<FrameId> = (0..config.pool_size).map(FrameId::new).collect();

        debug!(
            pool_size = config.pool_size,
            page_size = config.page_size,
            replacer_k = config.replacer_k,
            "buffer pool created"
        );

        Ok(Self {
            page_table: ExtendibleHashTable::new(config.bucket_size),
            replacer: LruKReplacer::new(config.pool_size, config.replacer_k),
            frames,
            inner: Mutex::new(PoolInner {
                free_list,
                next_page_id: 0,
            }),
            config,
            disk,
            fetch_count: AtomicU64::new(0),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
            eviction_count: AtomicU64::new(0),
            flush_count: AtomicU64::new(0),
        })
    }

    /// Allocates a new zeroed page and returns its pinned frame.
    ///
    /// The frame comes from the free list if one is available, otherwise
    /// from evicting a victim (writing it back first if dirty). Fails
    /// with [`BufferError::NoFreeFrames`] when every frame is pinned.
    pub fn new_page(&self) -> BufferResult<FrameRef> {
        let mut inner = self.inner.lock();

        let frame = self.acquire_frame(&mut inner)?;
        let page_id = PageId::new(inner.next_page_id);
        inner.next_page_id += 1;

        frame.set_page_id(page_id);
        frame.pin();
        self.page_table.insert(page_id, frame.frame_id());
        self.replacer.record_access(frame.frame_id());
        self.replacer.set_evictable(frame.frame_id(), false);

        trace!(%page_id, frame_id = frame.frame_id().index(), "new page");
        Ok(frame)
    }

    /// Fetches page `page_id`, reading it from disk if not resident.
    ///
    /// The returned frame is pinned; the caller must pair this with an
    /// [`unpin_page`]. Fails with [`BufferError::NoFreeFrames`] when the
    /// page is not resident and every frame is pinned.
    ///
    /// [`unpin_page`]: BufferPoolManager::unpin_page
    pub fn fetch_page(&self, page_id: PageId) -> BufferResult<FrameRef> {
        if !page_id.is_valid() {
            return Err(BufferError::InvalidPageId { page_id });
        }

        let mut inner = self.inner.lock();
        self.fetch_count.fetch_add(1, Ordering::Relaxed);

        if let Some(frame_id) = self.page_table.find(&page_id) {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
            let frame = Arc::clone(&self.frames[frame_id.index()]);
            frame.pin();
            self.replacer.record_access(frame_id);
            self.replacer.set_evictable(frame_id, false);
            return Ok(frame);
        }

        self.miss_count.fetch_add(1, Ordering::Relaxed);
        let frame = self.acquire_frame(&mut inner)?;

        if let Err(e) = self.disk.read_page(page_id, &mut frame.write_data()) {
            // A partial read may have landed; scrub the frame before it
            // goes back on the free list.
            frame.reset();
            inner.free_list.push_front(frame.frame_id());
            return Err(e.into());
        }

        frame.set_page_id(page_id);
        frame.pin();
        self.page_table.insert(page_id, frame.frame_id());
        self.replacer.record_access(frame.frame_id());
        self.replacer.set_evictable(frame.frame_id(), false);

        trace!(%page_id, frame_id = frame.frame_id().index(), "page read into pool");
        Ok(frame)
    }

    /// Releases one pin on page `page_id`.
    ///
    /// Returns `false` if the page is not resident or not pinned. When
    /// the pin count reaches zero the frame becomes evictable. Passing
    /// `is_dirty = true` marks the frame dirty; the flag is sticky and
    /// only cleared by a write-back.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let _inner = self.inner.lock();

        let Some(frame_id) = self.page_table.find(&page_id) else {
            return false;
        };
        let frame = &self.frames[frame_id.index()];
        if frame.pin_count() == 0 {
            return false;
        }

        if is_dirty {
            frame.set_dirty(true);
        }
        if frame.unpin() == 0 {
            self.replacer.set_evictable(frame_id, true);
        }
        true
    }

    /// Writes page `page_id` through to disk and clears its dirty flag.
    ///
    /// The write is unconditional, so a checkpoint can force a page out
    /// regardless of what the dirty flag claims. Fails with
    /// [`BufferError::PageNotFound`] if the page is not resident.
    pub fn flush_page(&self, page_id: PageId) -> BufferResult<()> {
        let _inner = self.inner.lock();

        let Some(frame_id) = self.page_table.find(&page_id) else {
            return Err(BufferError::page_not_found(page_id));
        };
        let frame = &self.frames[frame_id.index()];

        self.disk.write_page(page_id, &frame.read_data())?;
        frame.set_dirty(false);
        self.flush_count.fetch_add(1, Ordering::Relaxed);

        trace!(%page_id, "page flushed");
        Ok(())
    }

    /// Writes every dirty resident page to disk and clears its dirty
    /// flag. Returns the number of pages written.
    pub fn flush_all_pages(&self) -> BufferResult<usize> {
        let _inner = self.inner.lock();

        let mut flushed = 0;
        for frame in &self.frames {
            let page_id = frame.page_id();
            if page_id.is_valid() && frame.is_dirty() {
                self.disk.write_page(page_id, &frame.read_data())?;
                frame.set_dirty(false);
                flushed += 1;
            }
        }

        self.flush_count.fetch_add(flushed as u64, Ordering::Relaxed);
        debug!(flushed, "flushed all dirty pages");
        Ok(flushed)
    }

    /// Deletes page `page_id` from the pool.
    ///
    /// Returns `Ok(true)` if the page is gone afterwards - including
    /// when it was never resident - and `Ok(false)` if it is pinned and
    /// cannot be deleted. The disk layer is told the id is free.
    pub fn delete_page(&self, page_id: PageId) -> BufferResult<bool> {
        let mut inner = self.inner.lock();

        let Some(frame_id) = self.page_table.find(&page_id) else {
            return Ok(true);
        };
        let frame = &self.frames[frame_id.index()];
        if frame.pin_count() > 0 {
            return Ok(false);
        }

        self.page_table.remove(&page_id);
        self.replacer.remove(frame_id);
        frame.reset();
        inner.free_list.push_back(frame_id);
        self.disk.deallocate_page(page_id)?;

        trace!(%page_id, frame_id = frame_id.index(), "page deleted");
        Ok(true)
    }

    /// Returns true if `page_id` is resident in the pool.
    pub fn contains(&self, page_id: PageId) -> bool {
        let _inner = self.inner.lock();
        self.page_table.find(&page_id).is_some()
    }

    /// Returns the number of frames in the pool.
    pub fn pool_size(&self) -> usize {
        self.config.pool_size
    }

    /// Returns the page size in bytes.
    pub fn page_size(&self) -> usize {
        self.config.page_size
    }

    /// Returns a snapshot of the pool statistics.
    pub fn stats(&self) -> BufferPoolStats {
        let mut pinned = 0;
        let mut dirty = 0;
        for frame in &self.frames {
            if frame.is_pinned() {
                pinned += 1;
            }
            if frame.is_dirty() {
                dirty += 1;
            }
        }

        BufferPoolStats {
            fetches: self.fetch_count.load(Ordering::Relaxed),
            hits: self.hit_count.load(Ordering::Relaxed),
            misses: self.miss_count.load(Ordering::Relaxed),
            evictions: self.eviction_count.load(Ordering::Relaxed),
            flushes: self.flush_count.load(Ordering::Relaxed),
            pinned_frames: pinned,
            dirty_frames: dirty,
        }
    }

    // -------------------------------------------------------------------------
    // Private helpers
    // -------------------------------------------------------------------------

    /// Acquires an empty frame: from the free list if possible, else by
    /// evicting a victim. An evicted dirty page is written back and its
    /// directory mapping removed; the frame comes back reset and zeroed.
    ///
    /// Must be called with the pool latch held.
    fn acquire_frame(&self, inner: &mut PoolInner) -> BufferResult<FrameRef> {
        if let Some(frame_id) = inner.free_list.pop_front() {
            return Ok(Arc::clone(&self.frames[frame_id.index()]));
        }

        let Some(victim_id) = self.replacer.evict() else {
            return Err(BufferError::NoFreeFrames);
        };
        let frame = Arc::clone(&self.frames[victim_id.index()]);
        let old_page_id = frame.page_id();

        if frame.is_dirty() {
            trace!(page_id = %old_page_id, frame_id = victim_id.index(), "writing back dirty victim");
            if let Err(e) = self.disk.write_page(old_page_id, &frame.read_data()) {
                // Keep the victim resident and tracked so the pool stays
                // consistent; the caller sees the I/O failure.
                self.replacer.record_access(victim_id);
                self.replacer.set_evictable(victim_id, true);
                return Err(e.into());
            }
            frame.set_dirty(false);
            self.flush_count.fetch_add(1, Ordering::Relaxed);
        }

        self.page_table.remove(&old_page_id);
        frame.reset();
        self.eviction_count.fetch_add(1, Ordering::Relaxed);

        trace!(page_id = %old_page_id, frame_id = victim_id.index(), "frame evicted");
        Ok(frame)
    }
}

impl std::fmt::Debug for BufferPoolManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPoolManager")
            .field("pool_size", &self.config.pool_size)
            .field("page_size", &self.config.page_size)
            .field("pages_resident", &self.page_table.len())
            .field("stats", &self.stats())
            .finish()
    }
}
