//! Disk layer for OxbowDB.
//!
//! The buffer pool talks to durable storage through the [`DiskManager`]
//! trait: synchronous, page-granular reads and writes plus a deallocation
//! hint. Two backends are provided:
//!
//! - [`FileDiskManager`] - positional I/O on a single data file, pages
//!   stored at `page_id * page_size`
//! - [`MemDiskManager`] - an in-memory store with instrumented counters,
//!   for tests and ephemeral pools
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            DiskManager Trait            │
//! │  (read_page, write_page, deallocate)    │
//! └─────────────────────────────────────────┘
//!              │                   │
//!              ▼                   ▼
//! ┌─────────────────────┐  ┌─────────────────────┐
//! │   FileDiskManager   │  │   MemDiskManager    │
//! │   (data file)       │  │   (HashMap-backed)  │
//! └─────────────────────┘  └─────────────────────┘
//! ```

mod error;
mod file;
mod memory;

pub use error::{DiskError, DiskResult};
pub use file::FileDiskManager;
pub use memory::MemDiskManager;

use oxbow_common::types::PageId;

/// Synchronous page-granular storage interface.
///
/// The buffer pool is the only caller and invokes these while holding its
/// own latch, so implementations only need to be internally consistent;
/// they never call back into the pool.
pub trait DiskManager: Send + Sync {
    /// Returns the page size this store was configured with.
    fn page_size(&self) -> usize;

    /// Reads page `page_id` into `buf`.
    ///
    /// A page that was never written reads as zeros. `buf` must be
    /// exactly one page long.
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> DiskResult<()>;

    /// Writes one page of `data` as page `page_id`.
    ///
    /// Returns once the write has been handed to the OS; durability to
    /// the device requires an explicit sync by the caller.
    fn write_page(&self, page_id: PageId, data: &[u8]) -> DiskResult<()>;

    /// Hints that `page_id` is no longer in use and its storage may be
    /// reclaimed.
    fn deallocate_page(&self, page_id: PageId) -> DiskResult<()>;
}
