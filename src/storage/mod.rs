//! Storage Module
//!
//! Everything below the tree: memtable/WAL pairs, SSTable runs, and the
//! providers that create them.
//!
//! ## Responsibilities
//! - Pair each memtable with its own WAL
//! - Write drained memtables into immutable SSTable runs
//! - Track which runs are readable
//!
//! ## Providers
//! - [`FsStorageProvider`]: files under a base directory
//! - [`MemoryStorageProvider`]: in-memory buffers, for tests and benchmarks

mod fs;
mod memory;
mod memory_storage;
mod provider;
pub mod sstable;

pub use fs::FsStorageProvider;
pub use memory::MemoryStorageProvider;
pub use memory_storage::MemoryStorage;
pub use provider::{PendingTable, StorageProvider};
pub use sstable::{InMemoryRun, RunSource, SSTable, SSTableReader, SSTableWriter};
