//! WAL Reader
//!
//! Sequential reading of records from a WAL.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use crate::checksum::{ChecksumReader, CHECKSUM_LEN};
use crate::error::{Result, StoreError};
use crate::sink::read_exact_or_eof;

use super::EntryV1;

/// Reads records from a WAL, front to back
pub struct WalReader<R> {
    reader: ChecksumReader<R>,
}

impl WalReader<BufReader<File>> {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read> WalReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: ChecksumReader::new(reader),
        }
    }

    /// Read the next record's payload
    ///
    /// Returns `Ok(None)` at a clean end of stream. A record cut short is an
    /// I/O error; a checksum mismatch is an integrity error.
    pub fn read(&mut self) -> Result<Option<Vec<u8>>> {
        self.reader.reset();

        let mut len = [0u8; 4];
        if !read_exact_or_eof(&mut self.reader, &mut len)? {
            return Ok(None);
        }
        let len = u32::from_le_bytes(len) as u64;

        let mut payload = Vec::new();
        let read = (&mut self.reader).take(len).read_to_end(&mut payload)?;
        if read as u64 != len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("WAL record truncated: expected {} bytes, got {}", len, read),
            )
            .into());
        }
        let actual = self.reader.crc();

        let mut stored = [0u8; CHECKSUM_LEN];
        self.reader.get_mut().read_exact(&mut stored)?;
        let expected = u32::from_le_bytes(stored);
        if expected != actual {
            return Err(StoreError::Checksum { expected, actual });
        }

        Ok(Some(payload))
    }

    /// Iterate over all entries, decoding each payload
    pub fn entries(self) -> WalEntries<R> {
        WalEntries {
            reader: self,
            done: false,
        }
    }

    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }
}

/// Iterator over the decoded entries of a WAL; stops after the first error
pub struct WalEntries<R> {
    reader: WalReader<R>,
    done: bool,
}

impl<R: Read> Iterator for WalEntries<R> {
    type Item = Result<EntryV1>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = match self.reader.read() {
            Ok(Some(payload)) => EntryV1::decode(&mut payload.as_slice()),
            Ok(None) => {
                self.done = true;
                return None;
            }
            Err(e) => Err(e),
        };

        if result.is_err() {
            self.done = true;
        }
        Some(result)
    }
}
