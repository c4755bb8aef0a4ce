//! Core type definitions for OxbowDB.

mod ids;

pub use ids::{Lsn, PageId};
