//! System-wide constants for OxbowDB.

// =============================================================================
// Page Constants
// =============================================================================

/// Default page size in bytes (4 KB).
///
/// Matches the common OS page and filesystem block size, so a page write
/// maps to a single block-level I/O on most setups.
pub const DEFAULT_PAGE_SIZE: usize = 4 * 1024;

/// Minimum supported page size in bytes.
pub const MIN_PAGE_SIZE: usize = 512;

/// Maximum supported page size in bytes (64 KB).
pub const MAX_PAGE_SIZE: usize = 64 * 1024;

// =============================================================================
// Buffer Pool Constants
// =============================================================================

/// Default number of frames in a buffer pool.
pub const DEFAULT_POOL_SIZE: usize = 64;

/// Default `k` for the LRU-K replacement policy.
pub const DEFAULT_REPLACER_K: usize = 2;

/// Default capacity of an extendible-hash bucket in the page directory.
pub const DEFAULT_BUCKET_SIZE: usize = 16;
