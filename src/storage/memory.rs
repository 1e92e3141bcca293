//! In-memory storage provider
//!
//! Keeps every WAL and run in [`SharedBuffer`]s. Used by tests and
//! benchmarks; it can also be told to fail upcoming table writes.

use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::config::WalSyncStrategy;
use crate::error::{Result, StoreError};
use crate::sink::{SharedBuffer, Sink};
use crate::wal::WalWriter;

use super::memory_storage::MemoryStorage;
use super::provider::{PendingTable, StorageProvider};
use super::sstable::{InMemoryRun, SSTable, SSTableWriter};

/// Provider whose WALs and runs never leave memory
pub struct MemoryStorageProvider {
    sparse_key_distance: usize,
    counter: AtomicU64,
    wal_buffers: Mutex<Vec<SharedBuffer>>,
    pending: Mutex<HashMap<u64, TableBuffers>>,
    tables: RwLock<Vec<Arc<SSTable>>>,
    /// Number of upcoming table writers whose data sink rejects writes
    failing_tables: AtomicUsize,
}

#[derive(Clone, Default)]
struct TableBuffers {
    data: SharedBuffer,
    index: SharedBuffer,
    sparse: SharedBuffer,
}

impl MemoryStorageProvider {
    pub fn new(sparse_key_distance: usize) -> Self {
        Self {
            sparse_key_distance,
            counter: AtomicU64::new(0),
            wal_buffers: Mutex::new(Vec::new()),
            pending: Mutex::new(HashMap::new()),
            tables: RwLock::new(Vec::new()),
            failing_tables: AtomicUsize::new(0),
        }
    }

    /// Number of memtable/WAL pairs handed out
    pub fn wal_count(&self) -> usize {
        self.wal_buffers.lock().len()
    }

    /// The WAL buffer of the `n`th memtable handed out
    pub fn wal_buffer(&self, n: usize) -> Option<SharedBuffer> {
        self.wal_buffers.lock().get(n).cloned()
    }

    /// Get the number of published runs
    pub fn table_count(&self) -> usize {
        self.tables.read().len()
    }

    /// Tables created but neither published nor abandoned
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Make the next `n` table writers fail on their first data write
    pub fn fail_next_table_writes(&self, n: usize) {
        self.failing_tables.store(n, Ordering::SeqCst);
    }

    fn take_failure(&self) -> bool {
        self.failing_tables
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Default for MemoryStorageProvider {
    fn default() -> Self {
        Self::new(crate::Config::default().sparse_key_distance)
    }
}

impl StorageProvider for MemoryStorageProvider {
    fn new_memory_storage(&self) -> Result<MemoryStorage> {
        let buffer = SharedBuffer::new();
        self.wal_buffers.lock().push(buffer.clone());

        let wal = WalWriter::new(Box::new(buffer), WalSyncStrategy::EveryWrite);
        Ok(MemoryStorage::new(wal))
    }

    fn new_table_writer(&self) -> Result<PendingTable> {
        let id = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let buffers = TableBuffers::default();

        let data: Box<dyn Sink> = if self.take_failure() {
            Box::new(FailingSink)
        } else {
            Box::new(buffers.data.clone())
        };
        let writer = SSTableWriter::<Box<dyn Sink>>::new(
            data,
            Box::new(buffers.index.clone()),
            Box::new(buffers.sparse.clone()),
            self.sparse_key_distance,
        );

        self.pending.lock().insert(id, buffers);
        Ok(PendingTable { id, writer })
    }

    fn publish_table(&self, id: u64) -> Result<()> {
        let buffers = self
            .pending
            .lock()
            .remove(&id)
            .ok_or(StoreError::UnknownTable(id))?;

        let run = InMemoryRun {
            data: buffers.data.snapshot().into(),
            index: buffers.index.snapshot().into(),
            sparse: buffers.sparse.snapshot().into(),
        };
        self.tables.write().push(Arc::new(SSTable::new(id, run)));
        Ok(())
    }

    fn abandon_table(&self, id: u64) -> Result<()> {
        self.pending.lock().remove(&id);
        Ok(())
    }

    fn files_storage(&self) -> Result<Vec<Arc<SSTable>>> {
        Ok(self.tables.read().clone())
    }
}

/// Sink that rejects every write
struct FailingSink;

impl Write for FailingSink {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Other, "injected write failure"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Sink for FailingSink {
    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}
