//! # oxbow-common
//!
//! Common types and constants for OxbowDB.
//!
//! This crate provides the foundational types shared by all OxbowDB
//! components:
//!
//! - **Types**: core identifiers (`PageId`, `Lsn`)
//! - **Constants**: page-size and buffer-pool defaults and limits
//!
//! ## Example
//!
//! ```rust
//! use oxbow_common::types::PageId;
//!
//! let page_id = PageId::new(42);
//! assert!(page_id.is_valid());
//! assert_eq!(page_id.next(), PageId::new(43));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constants;
pub mod types;

// Re-export commonly used items at the crate root
pub use constants::*;
pub use types::{Lsn, PageId};
