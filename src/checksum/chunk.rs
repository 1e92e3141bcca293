//! Checksummed chunk codec
//!
//! Generic framing for ancillary records:
//!
//! ```text
//! ┌──────────────────┬───────────────────────┬──────────────┐
//! │ ChunkLen (8, LE) │ Values (ChunkLen - 4) │ CRC32 (4)    │
//! └──────────────────┴───────────────────────┴──────────────┘
//! ```
//!
//! `ChunkLen` counts the values plus the checksum. The checksum covers the
//! length prefix and the values.

use std::io::{self, Read, Write};

use crate::error::{Result, StoreError};

use super::{ChecksumReader, ChecksumWriter, CHECKSUM_LEN};

/// Write `values` back to back as one chunk
///
/// Returns the chunk length (values plus checksum, excluding the prefix).
pub fn write_chunk<W: Write>(w: &mut W, values: &[&[u8]]) -> Result<usize> {
    let chunk_len = values.iter().map(|v| v.len()).sum::<usize>() + CHECKSUM_LEN;

    let mut writer = ChecksumWriter::new(w);
    writer.write_all(&(chunk_len as u64).to_le_bytes())?;
    for value in values {
        writer.write_all(value)?;
    }

    let checksum = writer.checksum();
    writer.get_mut().write_all(&checksum)?;

    Ok(chunk_len)
}

/// Read one chunk and return its values as a single buffer
pub fn read_chunk<R: Read>(r: &mut R) -> Result<Vec<u8>> {
    let mut reader = ChecksumReader::new(r);
    let chunk_len = read_chunk_len(&mut reader)?;

    if chunk_len < CHECKSUM_LEN as u64 {
        return Err(StoreError::Framing(format!(
            "chunk length {} is shorter than its checksum",
            chunk_len
        )));
    }

    // `take` keeps a corrupted length from forcing a huge allocation
    let body_len = chunk_len - CHECKSUM_LEN as u64;
    let mut body = Vec::new();
    let read = (&mut reader).take(body_len).read_to_end(&mut body)?;
    if read as u64 != body_len {
        return Err(StoreError::Framing(format!(
            "expected to read {} bytes, got {}",
            body_len, read
        )));
    }

    verify_checksum(&mut reader)?;
    Ok(body)
}

/// Read one chunk into caller-sized buffers
///
/// Fails with a framing error when the buffers don't add up to the declared
/// chunk length. Returns the chunk length.
pub fn read_chunk_into<R: Read>(r: &mut R, values: &mut [&mut [u8]]) -> Result<usize> {
    let mut reader = ChecksumReader::new(r);
    let chunk_len = read_chunk_len(&mut reader)?;

    let mut consumed = 0usize;
    for value in values.iter_mut() {
        reader.read_exact(value).map_err(truncated)?;
        consumed += value.len();
    }

    verify_checksum(&mut reader)?;
    consumed += CHECKSUM_LEN;

    if consumed as u64 != chunk_len {
        return Err(StoreError::Framing(format!(
            "expected to read {} bytes, got {}",
            chunk_len, consumed
        )));
    }

    Ok(consumed)
}

// =============================================================================
// Private Helpers
// =============================================================================

fn read_chunk_len<R: Read>(reader: &mut ChecksumReader<R>) -> Result<u64> {
    let mut len = [0u8; 8];
    reader.read_exact(&mut len).map_err(truncated)?;
    Ok(u64::from_le_bytes(len))
}

fn verify_checksum<R: Read>(reader: &mut ChecksumReader<R>) -> Result<()> {
    let actual = reader.crc();
    let mut stored = [0u8; CHECKSUM_LEN];
    reader.get_mut().read_exact(&mut stored).map_err(truncated)?;

    let expected = u32::from_le_bytes(stored);
    if expected != actual {
        return Err(StoreError::Checksum { expected, actual });
    }
    Ok(())
}

fn truncated(e: io::Error) -> StoreError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        StoreError::Framing("chunk truncated".to_string())
    } else {
        StoreError::Io(e)
    }
}
