//! Checksum Framing
//!
//! A [`ChecksumWriter`] / [`ChecksumReader`] wraps a byte sink or source and
//! feeds every byte that passes through it into a CRC-32 (IEEE) accumulator.
//! The WAL drives the accumulator directly; [`chunk`] builds a generic
//! length-prefixed record format on top of it.
//!
//! Checksums are exposed as 4 little-endian bytes.

pub mod chunk;

use std::io::{self, Read, Write};

use crc32fast::Hasher;

/// Number of bytes a checksum occupies on disk
pub const CHECKSUM_LEN: usize = 4;

/// Writer that checksums everything written through it
pub struct ChecksumWriter<W> {
    inner: W,
    hasher: Hasher,
}

impl<W: Write> ChecksumWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Hasher::new(),
        }
    }

    /// CRC-32 of the bytes written since the last reset
    pub fn crc(&self) -> u32 {
        self.hasher.clone().finalize()
    }

    /// Encoded checksum of the bytes written since the last reset
    pub fn checksum(&self) -> [u8; CHECKSUM_LEN] {
        self.crc().to_le_bytes()
    }

    pub fn reset(&mut self) {
        self.hasher.reset();
    }

    /// Access the wrapped writer; bytes written here bypass the checksum
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for ChecksumWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Reader that checksums everything read through it
pub struct ChecksumReader<R> {
    inner: R,
    hasher: Hasher,
}

impl<R: Read> ChecksumReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: Hasher::new(),
        }
    }

    /// CRC-32 of the bytes read since the last reset
    pub fn crc(&self) -> u32 {
        self.hasher.clone().finalize()
    }

    /// Encoded checksum of the bytes read since the last reset
    pub fn checksum(&self) -> [u8; CHECKSUM_LEN] {
        self.crc().to_le_bytes()
    }

    pub fn reset(&mut self) {
        self.hasher.reset();
    }

    /// Access the wrapped reader; bytes read here bypass the checksum
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for ChecksumReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }
}
