//! SSTable record encoding
//!
//! Every file of a run is a sequence of the same record:
//!
//! ```text
//! ┌────────────────┬───────────────┬─────┬───────┐
//! │ BlockLen (8)   │ KeyLen (8)    │ Key │ Value │
//! └────────────────┴───────────────┴─────┴───────┘
//!   BlockLen = 8 + KeyLen + len(Value), both big-endian
//! ```
//!
//! The index files store an 8-byte big-endian offset in the value slot.

use std::io::{Read, Write};

use crate::error::{Result, StoreError};
use crate::sink::read_exact_or_eof;

/// Width of every length and offset field
pub const LEN_WIDTH: u64 = 8;

/// A decoded data record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: Vec<u8>,
    /// `None` when the block holds only a key
    pub value: Option<Vec<u8>>,
    /// Bytes the record occupied on disk
    pub len: u64,
}

/// A decoded index record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyOffset {
    pub key: Vec<u8>,
    pub offset: u64,
    /// Bytes the record occupied on disk
    pub len: u64,
}

/// Write one record, returning the bytes written
pub fn encode<W: Write + ?Sized>(w: &mut W, key: &[u8], value: &[u8]) -> Result<u64> {
    let key_len = key.len() as u64;
    let block_len = LEN_WIDTH + key_len + value.len() as u64;

    w.write_all(&block_len.to_be_bytes())?;
    w.write_all(&key_len.to_be_bytes())?;
    w.write_all(key)?;
    w.write_all(value)?;

    Ok(LEN_WIDTH + block_len)
}

/// Read one record; `Ok(None)` at a clean end of stream
pub fn decode<R: Read + ?Sized>(r: &mut R) -> Result<Option<Record>> {
    let mut header = [0u8; LEN_WIDTH as usize];
    if !read_exact_or_eof(r, &mut header)? {
        return Ok(None);
    }

    let block_len = u64::from_be_bytes(header);
    if block_len < LEN_WIDTH {
        return Err(StoreError::Framing(format!(
            "block length {} cannot hold a key length",
            block_len
        )));
    }

    let mut block = Vec::new();
    let read = r.take(block_len).read_to_end(&mut block)?;
    if read as u64 != block_len {
        return Err(StoreError::Framing(format!(
            "block truncated: expected {} bytes, got {}",
            block_len, read
        )));
    }

    let mut key_len = [0u8; LEN_WIDTH as usize];
    key_len.copy_from_slice(&block[..LEN_WIDTH as usize]);
    let key_len = u64::from_be_bytes(key_len);
    if key_len > block_len - LEN_WIDTH {
        return Err(StoreError::Framing(format!(
            "key length {} overruns block of {} bytes",
            key_len, block_len
        )));
    }

    let key_end = (LEN_WIDTH + key_len) as usize;
    let value = if key_end == block.len() {
        None
    } else {
        Some(block[key_end..].to_vec())
    };
    block.truncate(key_end);
    block.drain(..LEN_WIDTH as usize);

    Ok(Some(Record {
        key: block,
        value,
        len: LEN_WIDTH + block_len,
    }))
}

/// Write a `(key, offset)` index record
pub fn encode_key_offset<W: Write + ?Sized>(w: &mut W, key: &[u8], offset: u64) -> Result<u64> {
    encode(w, key, &offset.to_be_bytes())
}

/// Read a `(key, offset)` index record; `Ok(None)` at a clean end of stream
pub fn decode_key_offset<R: Read + ?Sized>(r: &mut R) -> Result<Option<KeyOffset>> {
    let Some(record) = decode(r)? else {
        return Ok(None);
    };

    let value = record.value.unwrap_or_default();
    let offset: [u8; LEN_WIDTH as usize] = value.as_slice().try_into().map_err(|_| {
        StoreError::Framing(format!(
            "index offset must be {} bytes, got {}",
            LEN_WIDTH,
            value.len()
        ))
    })?;

    Ok(Some(KeyOffset {
        key: record.key,
        offset: u64::from_be_bytes(offset),
        len: record.len,
    }))
}
