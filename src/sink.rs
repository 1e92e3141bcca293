//! Byte sinks and sources
//!
//! The WAL and SSTable writers are agnostic to where their bytes land. A
//! [`Sink`] is a writer that can also be made durable; a [`Source`] is a
//! seekable reader.

use std::fs::File;
use std::io::{self, BufWriter, Read, Seek, Write};
use std::sync::Arc;

use parking_lot::Mutex;

/// A writer whose contents can be forced to stable storage
pub trait Sink: Write + Send {
    /// Flush buffered bytes and make them durable
    fn sync(&mut self) -> io::Result<()>;
}

impl Sink for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }
}

impl Sink for BufWriter<File> {
    fn sync(&mut self) -> io::Result<()> {
        self.flush()?;
        self.get_ref().sync_data()
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn sync(&mut self) -> io::Result<()> {
        (**self).sync()
    }
}

/// A seekable reader
pub trait Source: Read + Seek + Send {}

impl<T: Read + Seek + Send> Source for T {}

/// In-memory sink shared between a writer and whoever inspects it
///
/// Clones share the same underlying buffer.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the bytes written so far
    pub fn snapshot(&self) -> Vec<u8> {
        self.inner.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Sink for SharedBuffer {
    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Like `read_exact`, but a stream ending before the first byte is `Ok(false)`
///
/// A stream ending part way through `buf` is an `UnexpectedEof` error.
pub(crate) fn read_exact_or_eof<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("stream ended after {} of {} bytes", filled, buf.len()),
                ))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}
