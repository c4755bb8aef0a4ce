//! In-memory disk manager.
//!
//! Backs pages with a `HashMap` instead of a file. Used by tests, and
//! usable for ephemeral pools that never need to survive a restart. The
//! read/write/deallocate counters make I/O behavior observable to tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use oxbow_common::types::PageId;
use parking_lot::RwLock;

use super::error::{DiskError, DiskResult};
use super::DiskManager;

/// Disk manager backed by process memory.
pub struct MemDiskManager {
    page_size: usize,
    pages: RwLock<HashMap<PageId, Vec<u8>>>,
    reads: AtomicU64,
    writes: AtomicU64,
    deallocations: AtomicU64,
}

impl MemDiskManager {
    /// Creates an empty in-memory store.
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            pages: RwLock::new(HashMap::new()),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            deallocations: AtomicU64::new(0),
        }
    }

    /// Returns the number of pages ever read.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Returns the number of pages ever written.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Returns the number of deallocation hints received.
    pub fn deallocations(&self) -> u64 {
        self.deallocations.load(Ordering::Relaxed)
    }

    /// Returns `true` if `page_id` currently has stored contents.
    pub fn contains(&self, page_id: PageId) -> bool {
        self.pages.read().contains_key(&page_id)
    }

    fn check(&self, page_id: PageId, len: usize) -> DiskResult<()> {
        if !page_id.is_valid() {
            return Err(DiskError::invalid_page_id(page_id));
        }
        if len != self.page_size {
            return Err(DiskError::buffer_size(self.page_size, len));
        }
        Ok(())
    }
}

impl DiskManager for MemDiskManager {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> DiskResult<()> {
        self.check(page_id, buf.len())?;
        self.reads.fetch_add(1, Ordering::Relaxed);

        match self.pages.read().get(&page_id) {
            Some(data) => buf.copy_from_slice(data),
            None => buf.fill(0),
        }
        Ok(())
    }

    fn write_page(&self, page_id: PageId, data: &[u8]) -> DiskResult<()> {
        self.check(page_id, data.len())?;
        self.writes.fetch_add(1, Ordering::Relaxed);

        self.pages.write().insert(page_id, data.to_vec());
        Ok(())
    }

    fn deallocate_page(&self, page_id: PageId) -> DiskResult<()> {
        if !page_id.is_valid() {
            return Err(DiskError::invalid_page_id(page_id));
        }
        self.deallocations.fetch_add(1, Ordering::Relaxed);

        self.pages.write().remove(&page_id);
        Ok(())
    }
}

impl std::fmt::Debug for MemDiskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemDiskManager")
            .field("page_size", &self.page_size)
            .field("pages_stored", &self.pages.read().len())
            .field("reads", &self.reads())
            .field("writes", &self.writes())
            .finish()
    }
}
