//! Storage provider abstraction
//!
//! The tree never touches the filesystem directly: it asks a provider for
//! fresh memtable/WAL pairs, SSTable writers, and the set of readable runs.

use std::sync::Arc;

use crate::error::Result;
use crate::sink::Sink;

use super::memory_storage::MemoryStorage;
use super::sstable::{SSTable, SSTableWriter};

/// An SSTable being written; invisible to readers until published
pub struct PendingTable {
    pub id: u64,
    pub writer: SSTableWriter<Box<dyn Sink>>,
}

/// Factory for the storage pieces a [`crate::Tree`] needs
pub trait StorageProvider: Send + Sync {
    /// A fresh memtable bound to a fresh WAL
    fn new_memory_storage(&self) -> Result<MemoryStorage>;

    /// A writer for a new, not yet visible run
    fn new_table_writer(&self) -> Result<PendingTable>;

    /// Make a fully written run visible to `files_storage`
    fn publish_table(&self, id: u64) -> Result<()>;

    /// Throw away a run whose write failed
    fn abandon_table(&self, id: u64) -> Result<()>;

    /// Published runs, oldest first
    fn files_storage(&self) -> Result<Vec<Arc<SSTable>>>;
}
