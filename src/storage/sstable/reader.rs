//! SSTable Reader
//!
//! Point lookups narrowed in three stages:
//!
//! 1. scan the sparse index for the `[from, to]` window of the index file
//! 2. scan that window of the index file for the key's data offset
//! 3. read the data file from that offset
//!
//! A key below the first sparse entry is rejected without touching the index
//! or data files.

use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::{Result, Stage};
use crate::sink::Source;

use super::format::{decode, decode_key_offset};
use super::{ensure_dir, DATA_FILE, INDEX_FILE, SPARSE_INDEX_FILE};

/// Index file window for one lookup. `to` is `None` past the last sample.
type Window = (u64, Option<u64>);

/// Reader for the data/index/sparse-index triple of a run
pub struct SSTableReader<R> {
    data: R,
    index: R,
    sparse: R,
}

impl SSTableReader<BufReader<File>> {
    /// Open the three files of a run directory
    pub fn open(dir: &Path) -> Result<Self> {
        ensure_dir(dir)?;

        let open = |name: &str| -> Result<BufReader<File>> {
            Ok(BufReader::new(File::open(dir.join(name))?))
        };

        Ok(Self::new(
            open(DATA_FILE)?,
            open(INDEX_FILE)?,
            open(SPARSE_INDEX_FILE)?,
        ))
    }
}

impl<R: Read + Seek> SSTableReader<R> {
    pub fn new(data: R, index: R, sparse: R) -> Self {
        Self {
            data,
            index,
            sparse,
        }
    }

    /// Look up a key
    ///
    /// Returns:
    /// - `Ok(Some(value))`: key found (an empty value reads back as empty)
    /// - `Ok(None)`: key not in this run
    /// - `Err(Stage { .. })`: I/O or decode failure, tagged with its stage
    pub fn find(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let window = self
            .search_sparse_index(key)
            .map_err(|e| e.at(Stage::SparseIndex))?;
        let Some((from, to)) = window else {
            return Ok(None);
        };

        let offset = self
            .search_index(key, from, to)
            .map_err(|e| e.at(Stage::Index))?;
        let Some(offset) = offset else {
            return Ok(None);
        };

        self.search_data(key, offset).map_err(|e| e.at(Stage::Data))
    }

    fn search_sparse_index(&mut self, key: &[u8]) -> Result<Option<Window>> {
        self.sparse.rewind()?;
        let window = scan_sparse_index(&mut self.sparse, key);
        // Leave the cursor at the start for the next lookup
        let rewound = self.sparse.rewind();
        let window = window?;
        rewound?;
        Ok(window)
    }

    fn search_index(&mut self, key: &[u8], from: u64, to: Option<u64>) -> Result<Option<u64>> {
        self.index.seek(SeekFrom::Start(from))?;

        let mut pos = from;
        while let Some(entry) = decode_key_offset(&mut self.index)? {
            if entry.key == key {
                return Ok(Some(entry.offset));
            }

            pos += entry.len;
            if let Some(to) = to {
                if to > from && pos > to {
                    return Ok(None);
                }
            }
        }

        Ok(None)
    }

    fn search_data(&mut self, key: &[u8], offset: u64) -> Result<Option<Vec<u8>>> {
        self.data.seek(SeekFrom::Start(offset))?;

        while let Some(record) = decode(&mut self.data)? {
            if record.key == key {
                return Ok(Some(record.value.unwrap_or_default()));
            }
        }

        Ok(None)
    }
}

impl<R: Source + 'static> SSTableReader<R> {
    /// Erase the source type
    pub fn boxed(self) -> SSTableReader<Box<dyn Source>> {
        SSTableReader {
            data: Box::new(self.data),
            index: Box::new(self.index),
            sparse: Box::new(self.sparse),
        }
    }
}

/// Find the index window that could hold `key`
///
/// `from` is the last sample `<= key`, `to` the first sample `> key`. An
/// exact sample hit pins both ends to the same offset.
fn scan_sparse_index<R: Read>(sparse: &mut R, key: &[u8]) -> Result<Option<Window>> {
    let mut from = None;

    while let Some(entry) = decode_key_offset(sparse)? {
        match entry.key.as_slice().cmp(key) {
            Ordering::Equal => return Ok(Some((entry.offset, Some(entry.offset)))),
            Ordering::Less => from = Some(entry.offset),
            // Keys are ascending: a first sample above the key rules it out
            Ordering::Greater => return Ok(from.map(|from| (from, Some(entry.offset)))),
        }
    }

    Ok(from.map(|from| (from, None)))
}
