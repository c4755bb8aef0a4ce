//! Hash table containers.
//!
//! The buffer pool's page directory is an extendible hash table: a
//! dynamically growing directory of bucket references where lookups
//! discriminate on the low bits of the key hash. Growth is online and
//! local - a full bucket splits in place, and the directory doubles only
//! when the splitting bucket already uses every directory bit.

mod extendible;

pub use extendible::ExtendibleHashTable;
