//! MemTable Module
//!
//! In-memory data structure for recent writes.
//!
//! ## Responsibilities
//! - Fast ordered inserts, lookups and deletes
//! - Track an estimated size for rotation triggers
//! - Ordered iteration for SSTable creation
//!
//! ## Data Structure Choice
//! `BTreeMap<Bytes, Bytes>`: keys order by unsigned byte comparison, which is
//! the order every on-disk structure uses too. The table carries no lock of
//! its own; [`crate::storage::MemoryStorage`] serializes access to it.

mod table;

pub use table::{MemTable, MemTableIterator};
