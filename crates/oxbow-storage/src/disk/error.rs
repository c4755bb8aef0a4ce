//! Disk layer error types.

use std::io;
use std::path::PathBuf;

use oxbow_common::types::PageId;
use thiserror::Error;

/// Result type for disk operations.
pub type DiskResult<T> = Result<T, DiskError>;

/// Errors that can occur in the disk layer.
#[derive(Debug, Error)]
#[allow(missing_docs)] // Fields are documented by variant docs
pub enum DiskError {
    /// Standard I/O error.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// Failed to open the backing file.
    #[error("failed to open {path}: {source}")]
    Open { path: PathBuf, source: io::Error },

    /// Invalid page ID for this store.
    #[error("invalid page ID: {page_id}")]
    InvalidPageId { page_id: PageId },

    /// Caller buffer does not match the page size.
    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSize { expected: usize, actual: usize },

    /// Short write (fewer bytes written than expected).
    #[error("short write: expected {expected} bytes, wrote {actual}")]
    ShortWrite { expected: usize, actual: usize },
}

impl DiskError {
    /// Creates an invalid-page-id error.
    pub fn invalid_page_id(page_id: PageId) -> Self {
        Self::InvalidPageId { page_id }
    }

    /// Creates a buffer-size-mismatch error.
    pub fn buffer_size(expected: usize, actual: usize) -> Self {
        Self::BufferSize { expected, actual }
    }

    /// Converts from `std::io::Error` with the backing file path attached.
    pub fn from_open(err: io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Open {
            path: path.into(),
            source: err,
        }
    }
}
