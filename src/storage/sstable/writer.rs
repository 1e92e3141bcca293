//! SSTable Writer
//!
//! Writes one ascending pass of key/value pairs into the three files of a run.

use std::fs::{File, OpenOptions};
use std::io::BufWriter;
use std::path::Path;

use crate::error::{Result, Stage, StoreError};
use crate::sink::Sink;

use super::format::{encode, encode_key_offset};
use super::{ensure_dir, DATA_FILE, INDEX_FILE, SPARSE_INDEX_FILE};

/// Sequential writer for a data/index/sparse-index triple
///
/// Keys must be written in strictly ascending byte order; the reader's
/// narrowing search relies on it.
pub struct SSTableWriter<W> {
    data: W,
    index: W,
    sparse: W,
    sparse_key_distance: u64,
    /// Bytes written to the data file
    data_pos: u64,
    /// Bytes written to the index file
    index_pos: u64,
    /// Keys written so far
    keys: u64,
}

impl SSTableWriter<BufWriter<File>> {
    /// Create `data.db`, `index.db` and `sparse.db` inside an existing directory
    pub fn create(dir: &Path, sparse_key_distance: usize) -> Result<Self> {
        ensure_dir(dir)?;

        let open = |name: &str| -> Result<BufWriter<File>> {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(dir.join(name))?;
            Ok(BufWriter::new(file))
        };

        Ok(Self::new(
            open(DATA_FILE)?,
            open(INDEX_FILE)?,
            open(SPARSE_INDEX_FILE)?,
            sparse_key_distance,
        ))
    }
}

impl<W: Sink> SSTableWriter<W> {
    pub fn new(data: W, index: W, sparse: W, sparse_key_distance: usize) -> Self {
        Self {
            data,
            index,
            sparse,
            sparse_key_distance: sparse_key_distance.max(1) as u64,
            data_pos: 0,
            index_pos: 0,
            keys: 0,
        }
    }

    /// Append one pair to the run
    pub fn write(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let data_bytes = encode(&mut self.data, key, value).map_err(|e| e.at(Stage::Data))?;

        let index_bytes = encode_key_offset(&mut self.index, key, self.data_pos)
            .map_err(|e| e.at(Stage::Index))?;

        if self.keys % self.sparse_key_distance == 0 {
            encode_key_offset(&mut self.sparse, key, self.index_pos)
                .map_err(|e| e.at(Stage::SparseIndex))?;
        }

        self.data_pos += data_bytes;
        self.index_pos += index_bytes;
        self.keys += 1;

        Ok(())
    }

    pub fn keys(&self) -> u64 {
        self.keys
    }

    pub fn data_len(&self) -> u64 {
        self.data_pos
    }

    pub fn index_len(&self) -> u64 {
        self.index_pos
    }

    /// Flush and sync all three files
    ///
    /// Every file is attempted; the first error is returned.
    pub fn close(mut self) -> Result<()> {
        let results = [
            self.data.sync().map_err(|e| StoreError::from(e).at(Stage::Data)),
            self.index.sync().map_err(|e| StoreError::from(e).at(Stage::Index)),
            self.sparse
                .sync()
                .map_err(|e| StoreError::from(e).at(Stage::SparseIndex)),
        ];
        results.into_iter().collect()
    }
}

impl<W: Sink + 'static> SSTableWriter<W> {
    /// Erase the sink type
    pub fn boxed(self) -> SSTableWriter<Box<dyn Sink>> {
        SSTableWriter {
            data: Box::new(self.data),
            index: Box::new(self.index),
            sparse: Box::new(self.sparse),
            sparse_key_distance: self.sparse_key_distance,
            data_pos: self.data_pos,
            index_pos: self.index_pos,
            keys: self.keys,
        }
    }
}
