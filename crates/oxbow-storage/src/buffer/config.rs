//! Buffer pool configuration.

use oxbow_common::constants::{
    DEFAULT_BUCKET_SIZE, DEFAULT_PAGE_SIZE, DEFAULT_POOL_SIZE, DEFAULT_REPLACER_K, MAX_PAGE_SIZE,
    MIN_PAGE_SIZE,
};

/// Configuration for the buffer pool.
///
/// All values are fixed at construction; the pool never resizes.
#[derive(Debug, Clone)]
pub struct BufferPoolConfig {
    /// Number of page frames in the buffer pool.
    pub pool_size: usize,
    /// Page size in bytes.
    pub page_size: usize,
    /// The `k` in LRU-K replacement.
    pub replacer_k: usize,
    /// Bucket capacity of the extendible-hash page directory.
    pub bucket_size: usize,
}

impl BufferPoolConfig {
    /// Creates a new configuration with the specified number of frames.
    pub fn new(pool_size: usize) -> Self {
        Self {
            pool_size,
            page_size: DEFAULT_PAGE_SIZE,
            replacer_k: DEFAULT_REPLACER_K,
            bucket_size: DEFAULT_BUCKET_SIZE,
        }
    }

    /// Sets the page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Sets the `k` for LRU-K replacement.
    pub fn with_replacer_k(mut self, replacer_k: usize) -> Self {
        self.replacer_k = replacer_k;
        self
    }

    /// Sets the directory bucket capacity.
    pub fn with_bucket_size(mut self, bucket_size: usize) -> Self {
        self.bucket_size = bucket_size;
        self
    }

    /// Returns the total memory used by the frame array.
    pub fn memory_usage(&self) -> usize {
        self.pool_size * self.page_size
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.pool_size == 0 {
            return Err("pool_size must be > 0");
        }
        if !self.page_size.is_power_of_two() {
            return Err("page_size must be a power of 2");
        }
        if self.page_size < MIN_PAGE_SIZE {
            return Err("page_size below minimum");
        }
        if self.page_size > MAX_PAGE_SIZE {
            return Err("page_size above maximum");
        }
        if self.replacer_k == 0 {
            return Err("replacer_k must be >= 1");
        }
        if self.bucket_size == 0 {
            return Err("bucket_size must be > 0");
        }
        Ok(())
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new() {
        let config = BufferPoolConfig::new(100);
        assert_eq!(config.pool_size, 100);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.replacer_k, DEFAULT_REPLACER_K);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = BufferPoolConfig::new(10)
            .with_page_size(16384)
            .with_replacer_k(3)
            .with_bucket_size(4);

        assert_eq!(config.page_size, 16384);
        assert_eq!(config.replacer_k, 3);
        assert_eq!(config.bucket_size, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_memory_usage() {
        let config = BufferPoolConfig::new(100);
        assert_eq!(config.memory_usage(), 100 * DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_validation() {
        assert!(BufferPoolConfig::new(0).validate().is_err());
        assert!(BufferPoolConfig::new(10)
            .with_page_size(1000)
            .validate()
            .is_err());
        assert!(BufferPoolConfig::new(10)
            .with_page_size(256)
            .validate()
            .is_err());
        assert!(BufferPoolConfig::new(10)
            .with_replacer_k(0)
            .validate()
            .is_err());
        assert!(BufferPoolConfig::new(10)
            .with_bucket_size(0)
            .validate()
            .is_err());
    }
}
