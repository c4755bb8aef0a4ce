//! # oxbow-storage
//!
//! Buffer pool and disk layer for OxbowDB.
//!
//! This crate implements the in-memory page cache that mediates between
//! page-oriented disk storage and the byte-addressable frames that access
//! methods operate on:
//!
//! - A fixed-capacity buffer pool with pinning, dirty-page write-back,
//!   and page allocation
//! - LRU-K page replacement
//! - An extendible hash directory mapping page ids to frame slots
//! - A pluggable synchronous disk layer

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Buffer pool manager, frames, and page replacement
pub mod buffer;

/// Disk manager trait and backends
pub mod disk;

/// Hash table containers
pub mod hash;
