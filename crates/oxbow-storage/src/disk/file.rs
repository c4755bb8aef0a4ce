//! File-backed disk manager.
//!
//! Pages live in a single data file at offset `page_id * page_size`.
//! All I/O is positional (pread/pwrite style), so concurrent readers
//! never race on a shared cursor.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use oxbow_common::types::PageId;
use tracing::{debug, trace};

use super::error::{DiskError, DiskResult};
use super::DiskManager;

/// Disk manager backed by a single data file.
pub struct FileDiskManager {
    file: File,
    path: PathBuf,
    page_size: usize,
}

impl FileDiskManager {
    /// Opens (creating if necessary) the data file at `path`.
    pub fn open(path: impl AsRef<Path>, page_size: usize) -> DiskResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .map_err(|e| DiskError::from_open(e, &path))?;

        debug!(path = %path.display(), page_size, "opened data file");

        Ok(Self {
            file,
            path,
            page_size,
        })
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Syncs file contents to the device.
    pub fn sync(&self) -> DiskResult<()> {
        self.file.sync_data()?;
        Ok(())
    }

    fn offset_of(&self, page_id: PageId) -> DiskResult<u64> {
        if !page_id.is_valid() {
            return Err(DiskError::invalid_page_id(page_id));
        }
        page_id
            .as_u64()
            .checked_mul(self.page_size as u64)
            .ok_or(DiskError::InvalidPageId { page_id })
    }

    fn check_buf(&self, len: usize) -> DiskResult<()> {
        if len != self.page_size {
            return Err(DiskError::buffer_size(self.page_size, len));
        }
        Ok(())
    }

    #[cfg(unix)]
    fn read_at(&self, buf: &mut [u8], offset: u64) -> std::io::Result<usize> {
        use std::os::unix::fs::FileExt;
        self.file.read_at(buf, offset)
    }

    #[cfg(windows)]
    fn read_at(&self, buf: &mut [u8], offset: u64) -> std::io::Result<usize> {
        use std::os::windows::fs::FileExt;
        self.file.seek_read(buf, offset)
    }

    #[cfg(unix)]
    fn write_at(&self, buf: &[u8], offset: u64) -> std::io::Result<usize> {
        use std::os::unix::fs::FileExt;
        self.file.write_at(buf, offset)
    }

    #[cfg(windows)]
    fn write_at(&self, buf: &[u8], offset: u64) -> std::io::Result<usize> {
        use std::os::windows::fs::FileExt;
        self.file.seek_write(buf, offset)
    }
}

impl DiskManager for FileDiskManager {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> DiskResult<()> {
        self.check_buf(buf.len())?;
        let offset = self.offset_of(page_id)?;

        let mut total = 0;
        while total < buf.len() {
            let n = self.read_at(&mut buf[total..], offset + total as u64)?;
            if n == 0 {
                // Allocated but never written: the tail reads as zeros.
                trace!(%page_id, read = total, "short read, zero-filling page tail");
                buf[total..].fill(0);
                break;
            }
            total += n;
        }
        Ok(())
    }

    fn write_page(&self, page_id: PageId, data: &[u8]) -> DiskResult<()> {
        self.check_buf(data.len())?;
        let offset = self.offset_of(page_id)?;

        let mut total = 0;
        while total < data.len() {
            let n = self.write_at(&data[total..], offset + total as u64)?;
            if n == 0 {
                return Err(DiskError::ShortWrite {
                    expected: data.len(),
                    actual: total,
                });
            }
            total += n;
        }
        Ok(())
    }

    fn deallocate_page(&self, page_id: PageId) -> DiskResult<()> {
        if !page_id.is_valid() {
            return Err(DiskError::invalid_page_id(page_id));
        }
        // A hint only: the file is not punched or shrunk. A free-space
        // map would record the id here for reuse.
        trace!(%page_id, "page deallocated");
        Ok(())
    }
}

impl std::fmt::Debug for FileDiskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileDiskManager")
            .field("path", &self.path)
            .field("page_size", &self.page_size)
            .finish()
    }
}
