//! WAL Entry definitions
//!
//! Defines the payload carried by a single WAL record.

use bytes::{Buf, BufMut, Bytes};

use crate::error::{Result, StoreError};

/// Version byte of [`EntryV1`]
pub const ENTRY_VERSION_V1: u8 = 1;

const LEN_PREFIX: usize = 2;

/// A put of `key` to `value`
///
/// The key must be non-empty; an empty value is legal. Both are capped at
/// `u16::MAX` bytes by the format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryV1 {
    pub key: Bytes,
    pub value: Bytes,
}

impl EntryV1 {
    pub fn new(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.key.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        check_len("key", self.key.len())?;
        check_len("value", self.value.len())
    }

    /// Size of the encoded payload
    pub fn encoded_len(&self) -> usize {
        1 + LEN_PREFIX + self.key.len() + LEN_PREFIX + self.value.len()
    }

    /// Append the encoded entry to `buf`; nothing is written if validation fails
    pub fn encode<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        self.validate()?;

        buf.put_u8(ENTRY_VERSION_V1);
        buf.put_u16_le(self.key.len() as u16);
        buf.put_slice(&self.key);
        buf.put_u16_le(self.value.len() as u16);
        buf.put_slice(&self.value);

        Ok(())
    }

    pub fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        ensure_remaining(buf, 1, "version")?;
        let version = buf.get_u8();
        if version != ENTRY_VERSION_V1 {
            return Err(StoreError::InvalidVersion(version));
        }

        let key = read_field(buf, "key")?;
        let value = read_field(buf, "value")?;

        Ok(Self { key, value })
    }
}

fn check_len(field: &'static str, len: usize) -> Result<()> {
    if len > u16::MAX as usize {
        return Err(StoreError::FieldTooLong { field, len });
    }
    Ok(())
}

fn read_field<B: Buf>(buf: &mut B, field: &'static str) -> Result<Bytes> {
    ensure_remaining(buf, LEN_PREFIX, field)?;
    let len = buf.get_u16_le() as usize;
    ensure_remaining(buf, len, field)?;
    Ok(buf.copy_to_bytes(len))
}

fn ensure_remaining<B: Buf>(buf: &B, needed: usize, field: &str) -> Result<()> {
    if buf.remaining() < needed {
        return Err(StoreError::Framing(format!(
            "entry truncated reading {}: need {} bytes, have {}",
            field,
            needed,
            buf.remaining()
        )));
    }
    Ok(())
}
