//! SSTable Module
//!
//! Sorted String Table - an immutable on-disk sorted run, written once from a
//! drained memtable.
//!
//! ## Layout
//! ```text
//! tables/<counter>-<unix>/
//!   data.db     [BlockLen][KeyLen][Key][Value]          one per key
//!   index.db    [BlockLen][KeyLen][Key][DataOffset]     one per key
//!   sparse.db   [BlockLen][KeyLen][Key][IndexOffset]    every Nth key
//! ```
//!
//! All integers are 8-byte big-endian. See [`format`] for the record codec.

pub mod format;
mod reader;
mod writer;

use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::error::Result;
use crate::sink::Source;

pub use reader::SSTableReader;
pub use writer::SSTableWriter;

// =============================================================================
// Shared Constants (used by writer and reader)
// =============================================================================

pub const DATA_FILE: &str = "data.db";
pub const INDEX_FILE: &str = "index.db";
pub const SPARSE_INDEX_FILE: &str = "sparse.db";

fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.metadata()?.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not a directory", dir.display()),
        )
        .into());
    }
    Ok(())
}

// =============================================================================
// Run Sources
// =============================================================================

/// Where a published run's bytes live
///
/// Every lookup opens its own reader, so lookups on one run never share
/// seek positions.
pub trait RunSource: Send + Sync {
    fn open_reader(&self) -> Result<SSTableReader<Box<dyn Source>>>;
}

/// A run directory on disk
impl RunSource for PathBuf {
    fn open_reader(&self) -> Result<SSTableReader<Box<dyn Source>>> {
        Ok(SSTableReader::open(self)?.boxed())
    }
}

/// A run held entirely in memory
#[derive(Debug, Clone)]
pub struct InMemoryRun {
    pub data: Bytes,
    pub index: Bytes,
    pub sparse: Bytes,
}

impl RunSource for InMemoryRun {
    fn open_reader(&self) -> Result<SSTableReader<Box<dyn Source>>> {
        Ok(SSTableReader::new(
            Cursor::new(self.data.clone()),
            Cursor::new(self.index.clone()),
            Cursor::new(self.sparse.clone()),
        )
        .boxed())
    }
}

// =============================================================================
// SSTable Handle
// =============================================================================

/// A published, read-only run
///
/// Any number of threads may look up keys in one handle at once.
pub struct SSTable {
    id: u64,
    source: Box<dyn RunSource>,
}

impl SSTable {
    pub fn new(id: u64, source: impl RunSource + 'static) -> Self {
        Self {
            id,
            source: Box::new(source),
        }
    }

    /// Provider-assigned id; higher ids were created later
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn find(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.source.open_reader()?.find(key)
    }
}

impl std::fmt::Debug for SSTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SSTable").field("id", &self.id).finish()
    }
}
