//! Buffer pool errors.

use oxbow_common::types::PageId;
use thiserror::Error;

use crate::disk::DiskError;

/// Result type for buffer pool operations.
pub type BufferResult<T> = Result<T, BufferError>;

/// Errors that can occur during buffer pool operations.
#[derive(Debug, Error)]
#[allow(missing_docs)] // Fields are documented by variant docs
pub enum BufferError {
    /// No frame available: the free list is empty and every resident
    /// page is pinned.
    #[error("no free frames available, all pages are pinned")]
    NoFreeFrames,

    /// Page not resident in the buffer pool.
    #[error("page {page_id} not found in buffer pool")]
    PageNotFound { page_id: PageId },

    /// Invalid page ID.
    #[error("invalid page ID: {page_id}")]
    InvalidPageId { page_id: PageId },

    /// Disk layer error during page read/write.
    #[error("disk error: {0}")]
    Disk(#[from] DiskError),

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl BufferError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a page-not-found error.
    pub fn page_not_found(page_id: PageId) -> Self {
        Self::PageNotFound { page_id }
    }

    /// Returns true if this is a transient error that can be retried
    /// once the caller unpins something.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NoFreeFrames)
    }
}
