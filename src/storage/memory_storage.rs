//! Memtable + WAL pair
//!
//! Every write lands in the WAL before the memtable; the pair is discarded
//! together once its contents live in an SSTable.

use std::path::PathBuf;

use bytes::{Bytes, BytesMut};
use parking_lot::{Mutex, RwLock};

use crate::error::{Result, Stage};
use crate::memtable::MemTable;
use crate::sink::Sink;
use crate::wal::{EntryV1, WalWriter};

use super::sstable::SSTableWriter;

/// A memtable backed by its own write-ahead log
pub struct MemoryStorage {
    /// Lock order: `wal` before `memtable`
    wal: Mutex<WalState>,
    memtable: RwLock<MemTable>,
}

struct WalState {
    writer: WalWriter,
    /// Reused entry encoding buffer
    buf: BytesMut,
}

impl MemoryStorage {
    pub fn new(wal: WalWriter) -> Self {
        Self {
            wal: Mutex::new(WalState {
                writer: wal,
                buf: BytesMut::new(),
            }),
            memtable: RwLock::new(MemTable::new()),
        }
    }

    /// Log the pair, then apply it to the memtable
    ///
    /// The memtable is untouched if encoding or the WAL write fails.
    pub fn put(&self, key: Bytes, value: Bytes) -> Result<()> {
        let entry = EntryV1 { key, value };

        let mut wal = self.wal.lock();
        let WalState { writer, buf } = &mut *wal;
        buf.clear();
        entry.encode(buf)?;
        writer.write(&buf[..]).map_err(|e| e.at(Stage::Wal))?;

        self.memtable.write().upsert(entry.key, entry.value);
        Ok(())
    }

    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.memtable.read().get(key)
    }

    /// Estimated memtable size in bytes
    pub fn size(&self) -> usize {
        self.memtable.read().size()
    }

    pub fn len(&self) -> usize {
        self.memtable.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.memtable.read().is_empty()
    }

    pub fn wal_path(&self) -> Option<PathBuf> {
        self.wal.lock().writer.path().map(|p| p.to_path_buf())
    }

    /// Drain every entry, in key order, into an SSTable writer
    ///
    /// Returns the number of entries written.
    pub fn write_to<W: Sink>(&self, writer: &mut SSTableWriter<W>) -> Result<usize> {
        let memtable = self.memtable.read();
        for (key, value) in memtable.iter() {
            writer.write(key, value)?;
        }
        Ok(memtable.len())
    }

    /// Delete the WAL and empty the memtable
    ///
    /// Only valid after `write_to` has persisted everything. The memtable is
    /// cleared even if removing the WAL fails.
    pub fn discard(&self) -> Result<()> {
        let mut wal = self.wal.lock();
        let deleted = wal.writer.delete().map_err(|e| e.at(Stage::Wal));
        self.memtable.write().clear();
        deleted
    }
}
