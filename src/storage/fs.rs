//! Filesystem-backed storage provider
//!
//! ## Layout
//! ```text
//! {data_dir}/
//!   wal/<counter>-<unix>.wal
//!   tables/<counter>-<unix>/{data,index,sparse}.db
//! ```
//!
//! One counter numbers both WAL files and table directories, so names stay
//! unique even when rotations land in the same second. Runs are remembered
//! in memory only; nothing is re-scanned from disk on startup.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::{Mutex, RwLock};

use crate::config::{Config, WalSyncStrategy};
use crate::error::{Result, StoreError};
use crate::wal::{WalWriter, WAL_EXTENSION};

use super::memory_storage::MemoryStorage;
use super::provider::{PendingTable, StorageProvider};
use super::sstable::{SSTable, SSTableReader, SSTableWriter};

/// Provider that keeps WALs and runs under a base directory
///
/// ## Concurrency:
/// - `tables`: RwLock (many concurrent readers, exclusive publisher)
/// - `counter`: Atomic (lock-free)
/// - All methods use `&self`
pub struct FsStorageProvider {
    wal_dir: PathBuf,
    tables_dir: PathBuf,
    sparse_key_distance: usize,
    wal_sync_strategy: WalSyncStrategy,

    /// Next name counter for WAL files and table directories
    counter: AtomicU64,

    /// Tables being written, by id
    pending: Mutex<HashMap<u64, PathBuf>>,

    /// Published runs, oldest first
    tables: RwLock<Vec<Arc<SSTable>>>,
}

impl FsStorageProvider {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const WAL_DIR: &'static str = "wal";
    const TABLES_DIR: &'static str = "tables";

    /// Create the `wal/` and `tables/` directories under `config.data_dir`
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        let wal_dir = config.data_dir.join(Self::WAL_DIR);
        let tables_dir = config.data_dir.join(Self::TABLES_DIR);
        fs::create_dir_all(&wal_dir)?;
        fs::create_dir_all(&tables_dir)?;

        Ok(Self {
            wal_dir,
            tables_dir,
            sparse_key_distance: config.sparse_key_distance,
            wal_sync_strategy: config.wal_sync_strategy,
            counter: AtomicU64::new(0),
            pending: Mutex::new(HashMap::new()),
            tables: RwLock::new(Vec::new()),
        })
    }

    pub fn wal_dir(&self) -> &Path {
        &self.wal_dir
    }

    pub fn tables_dir(&self) -> &Path {
        &self.tables_dir
    }

    /// Get the number of published runs
    pub fn table_count(&self) -> usize {
        self.tables.read().len()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// "<counter>-<unix seconds>", e.g. "7-1700000000"
    fn next_name(&self) -> (u64, String) {
        let id = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        (id, format!("{}-{}", id, unix))
    }
}

impl StorageProvider for FsStorageProvider {
    fn new_memory_storage(&self) -> Result<MemoryStorage> {
        let (_, name) = self.next_name();
        let path = self.wal_dir.join(format!("{}.{}", name, WAL_EXTENSION));

        let wal = WalWriter::create(&path, self.wal_sync_strategy)?;
        tracing::debug!(path = %path.display(), "created WAL file");

        Ok(MemoryStorage::new(wal))
    }

    fn new_table_writer(&self) -> Result<PendingTable> {
        let (id, name) = self.next_name();
        let dir = self.tables_dir.join(name);
        fs::create_dir_all(&dir)?;

        let writer = SSTableWriter::create(&dir, self.sparse_key_distance)?.boxed();
        tracing::debug!(table = id, dir = %dir.display(), "created table directory");

        self.pending.lock().insert(id, dir);
        Ok(PendingTable { id, writer })
    }

    /// The run stays pending until its files open, so a failed publish can
    /// still be abandoned
    fn publish_table(&self, id: u64) -> Result<()> {
        let mut pending = self.pending.lock();
        let dir = pending.get(&id).ok_or(StoreError::UnknownTable(id))?;

        SSTableReader::open(dir)?;
        if let Some(dir) = pending.remove(&id) {
            self.tables.write().push(Arc::new(SSTable::new(id, dir)));
        }
        Ok(())
    }

    fn abandon_table(&self, id: u64) -> Result<()> {
        if let Some(dir) = self.pending.lock().remove(&id) {
            fs::remove_dir_all(&dir)?;
            tracing::debug!(table = id, dir = %dir.display(), "removed abandoned table");
        }
        Ok(())
    }

    fn files_storage(&self) -> Result<Vec<Arc<SSTable>>> {
        Ok(self.tables.read().clone())
    }
}
