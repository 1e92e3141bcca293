//! WAL Writer
//!
//! Handles appending records to the WAL.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::checksum::ChecksumWriter;
use crate::config::WalSyncStrategy;
use crate::error::{Result, StoreError};
use crate::sink::Sink;

/// Appends checksummed records to a WAL sink
pub struct WalWriter {
    /// `None` once closed
    writer: Option<ChecksumWriter<Box<dyn Sink>>>,
    /// Backing file, if any; removed by `delete`
    path: Option<PathBuf>,
    sync_strategy: WalSyncStrategy,
    /// Records written since the last sync
    unsynced: usize,
}

impl WalWriter {
    /// Wrap an arbitrary sink
    pub fn new(sink: Box<dyn Sink>, sync_strategy: WalSyncStrategy) -> Self {
        Self {
            writer: Some(ChecksumWriter::new(sink)),
            path: None,
            sync_strategy,
            unsynced: 0,
        }
    }

    /// Create (or append to) a WAL file
    pub fn create(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        let mut writer = Self::new(Box::new(BufWriter::new(file)), sync_strategy);
        writer.path = Some(path.to_path_buf());
        Ok(writer)
    }

    /// Append one record and make it durable according to the sync strategy
    pub fn write(&mut self, payload: &[u8]) -> Result<()> {
        let len = u32::try_from(payload.len()).map_err(|_| {
            StoreError::Framing(format!("WAL payload of {} bytes is too large", payload.len()))
        })?;
        let writer = self.writer.as_mut().ok_or(StoreError::Closed("WAL writer"))?;

        writer.reset();
        writer.write_all(&len.to_le_bytes())?;
        writer.write_all(payload)?;
        let checksum = writer.checksum();
        writer.get_mut().write_all(&checksum)?;

        self.unsynced += 1;
        let due = match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => self.unsynced >= count,
        };
        if due {
            writer.get_mut().sync()?;
            self.unsynced = 0;
        }

        Ok(())
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        let writer = self.writer.as_mut().ok_or(StoreError::Closed("WAL writer"))?;
        writer.get_mut().sync()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Records written but not yet synced
    pub fn unsynced_count(&self) -> usize {
        self.unsynced
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_closed(&self) -> bool {
        self.writer.is_none()
    }

    /// Sync pending records and release the sink. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.get_mut().sync()?;
            self.unsynced = 0;
        }
        Ok(())
    }

    /// Close the writer and remove the backing file
    ///
    /// Only valid once every record has been persisted elsewhere.
    pub fn delete(&mut self) -> Result<()> {
        let closed = self.close();
        if let Some(path) = self.path.take() {
            fs::remove_file(&path)?;
            tracing::debug!(path = %path.display(), "deleted WAL file");
        }
        closed
    }
}
