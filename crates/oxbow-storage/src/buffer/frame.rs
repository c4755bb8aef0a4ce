//! Buffer frame - a slot in the buffer pool that holds a page.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use oxbow_common::types::{Lsn, PageId};
use parking_lot::RwLock;

/// Frame identifier - index into the buffer pool's frame array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub usize);

impl FrameId {
    /// Invalid frame ID.
    pub const INVALID: Self = Self(usize::MAX);

    /// Creates a new frame ID.
    #[inline]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    /// Returns the raw index.
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }

    /// Checks if this is a valid frame ID.
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != usize::MAX
    }
}

impl From<usize> for FrameId {
    fn from(id: usize) -> Self {
        Self::new(id)
    }
}

impl From<FrameId> for usize {
    fn from(id: FrameId) -> Self {
        id.0
    }
}

/// A buffer frame holds a single page in memory.
///
/// Each frame carries the page bytes behind a data latch plus metadata:
/// the resident page id, a pin count, the dirty flag, and the LSN of the
/// last modification. Metadata is atomic so frame handles held by callers
/// stay readable without the pool latch; all metadata *transitions* are
/// made by the pool while it holds its latch.
pub struct BufferFrame {
    /// Frame ID (index in the frame array).
    frame_id: FrameId,
    /// Page data buffer.
    data: RwLock<Vec<u8>>,
    /// Page ID stored in this frame (INVALID if empty).
    page_id: AtomicU64,
    /// Pin count (number of active references).
    pin_count: AtomicU32,
    /// Whether the page is dirty (modified since last write-back).
    dirty: AtomicBool,
    /// Last modified LSN.
    lsn: AtomicU64,
}

impl BufferFrame {
    /// Creates a new empty buffer frame.
    pub fn new(frame_id: FrameId, page_size: usize) -> Self {
        Self {
            frame_id,
            data: RwLock::new(vec![0u8; page_size]),
            page_id: AtomicU64::new(PageId::INVALID.as_u64()),
            pin_count: AtomicU32::new(0),
            dirty: AtomicBool::new(false),
            lsn: AtomicU64::new(Lsn::INVALID.as_u64()),
        }
    }

    /// Returns the frame ID.
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Returns the page ID stored in this frame.
    #[inline]
    pub fn page_id(&self) -> PageId {
        PageId::new(self.page_id.load(Ordering::Acquire))
    }

    /// Sets the page ID for this frame.
    #[inline]
    pub(crate) fn set_page_id(&self, page_id: PageId) {
        self.page_id.store(page_id.as_u64(), Ordering::Release);
    }

    /// Returns true if this frame is empty (no page assigned).
    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.page_id().is_valid()
    }

    /// Returns the current pin count.
    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Acquire)
    }

    /// Increments the pin count and returns the new value.
    #[inline]
    pub(crate) fn pin(&self) -> u32 {
        self.pin_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Decrements the pin count and returns the new value.
    #[inline]
    pub(crate) fn unpin(&self) -> u32 {
        let old = self.pin_count.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(old > 0, "unpinned frame with pin_count = 0");
        old - 1
    }

    /// Returns true if the frame is pinned.
    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    /// Returns true if the frame is dirty.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Sets or clears the dirty flag.
    #[inline]
    pub(crate) fn set_dirty(&self, dirty: bool) {
        self.dirty.store(dirty, Ordering::Release);
    }

    /// Returns the LSN of the last modification.
    #[inline]
    pub fn lsn(&self) -> Lsn {
        Lsn::new(self.lsn.load(Ordering::Acquire))
    }

    /// Sets the LSN.
    ///
    /// Callers that log their page edits record the edit's LSN here so a
    /// recovery layer can order log flushes before page write-back.
    #[inline]
    pub fn set_lsn(&self, lsn: Lsn) {
        self.lsn.store(lsn.as_u64(), Ordering::Release);
    }

    /// Returns a read lock on the page data.
    #[inline]
    pub fn read_data(&self) -> parking_lot::RwLockReadGuard<'_, Vec<u8>> {
        self.data.read()
    }

    /// Returns a write lock on the page data.
    #[inline]
    pub fn write_data(&self) -> parking_lot::RwLockWriteGuard<'_, Vec<u8>> {
        self.data.write()
    }

    /// Resets the frame to empty state, zeroing the page memory.
    pub(crate) fn reset(&self) {
        self.data.write().fill(0);
        self.page_id
            .store(PageId::INVALID.as_u64(), Ordering::Release);
        self.pin_count.store(0, Ordering::Release);
        self.dirty.store(false, Ordering::Release);
        self.lsn.store(Lsn::INVALID.as_u64(), Ordering::Release);
    }
}

impl std::fmt::Debug for BufferFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferFrame")
            .field("frame_id", &self.frame_id)
            .field("page_id", &self.page_id())
            .field("pin_count", &self.pin_count())
            .field("dirty", &self.is_dirty())
            .field("lsn", &self.lsn())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let frame = BufferFrame::new(FrameId::new(0), 4096);
        assert_eq!(frame.frame_id().index(), 0);
        assert!(!frame.page_id().is_valid());
        assert!(frame.is_empty());
        assert_eq!(frame.pin_count(), 0);
        assert!(!frame.is_dirty());
    }

    #[test]
    fn test_pin_unpin() {
        let frame = BufferFrame::new(FrameId::new(0), 4096);
        assert!(!frame.is_pinned());

        assert_eq!(frame.pin(), 1);
        assert!(frame.is_pinned());
        assert_eq!(frame.pin(), 2);

        assert_eq!(frame.unpin(), 1);
        assert!(frame.is_pinned());
        assert_eq!(frame.unpin(), 0);
        assert!(!frame.is_pinned());
    }

    #[test]
    fn test_dirty_flag() {
        let frame = BufferFrame::new(FrameId::new(0), 4096);
        assert!(!frame.is_dirty());

        frame.set_dirty(true);
        assert!(frame.is_dirty());

        frame.set_dirty(false);
        assert!(!frame.is_dirty());
    }

    #[test]
    fn test_data_access() {
        let frame = BufferFrame::new(FrameId::new(0), 4096);

        {
            let mut data = frame.write_data();
            data[0..4].copy_from_slice(&[1, 2, 3, 4]);
        }

        {
            let data = frame.read_data();
            assert_eq!(&data[0..4], &[1, 2, 3, 4]);
        }
    }

    #[test]
    fn test_reset_zeroes_memory() {
        let frame = BufferFrame::new(FrameId::new(0), 4096);
        frame.set_page_id(PageId::new(42));
        frame.pin();
        frame.set_dirty(true);
        frame.set_lsn(Lsn::new(1000));
        frame.write_data()[0..4].copy_from_slice(&[1, 2, 3, 4]);

        frame.reset();

        assert!(frame.is_empty());
        assert_eq!(frame.pin_count(), 0);
        assert!(!frame.is_dirty());
        assert_eq!(frame.lsn(), Lsn::INVALID);
        assert!(frame.read_data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_frame_id() {
        assert!(!FrameId::INVALID.is_valid());
        assert!(FrameId::new(0).is_valid());
        assert_eq!(FrameId::new(42).index(), 42);
    }
}
