//! Bridges from plain `std::io` readers and writers to channels.

use crate::buffer::ByteBuf;
use crate::traits::{Channel, ReadableChannel, WritableChannel};
use std::io::{self, Read, Write};

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "channel is closed")
}

/// Exposes any `Read` as a sequential (`Stream` kind) readable channel.
#[derive(Debug)]
pub struct ReaderChannel<R: Read> {
    inner: R,
    open: bool,
}

impl<R: Read> ReaderChannel<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, open: true }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Channel for ReaderChannel<R> {
    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) -> io::Result<()> {
        self.open = false;
        Ok(())
    }
}

impl<R: Read> ReadableChannel for ReaderChannel<R> {
    fn read(&mut self, dst: &mut ByteBuf<'_>) -> io::Result<Option<usize>> {
        if !self.open {
            return Err(closed());
        }
        if !dst.has_remaining() {
            return Ok(Some(0));
        }
        let n = self.inner.read(dst.remaining_mut())?;
        if n == 0 {
            return Ok(None);
        }
        dst.advance(n);
        Ok(Some(n))
    }
}

/// Exposes any `Write` as a sequential (`Stream` kind) writable channel.
///
/// Closing flushes the inner writer.
#[derive(Debug)]
pub struct WriterChannel<W: Write> {
    inner: W,
    open: bool,
}

impl<W: Write> WriterChannel<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, open: true }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Channel for WriterChannel<W> {
    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) -> io::Result<()> {
        if self.open {
            self.open = false;
            self.inner.flush()?;
        }
        Ok(())
    }
}

impl<W: Write> WritableChannel for WriterChannel<W> {
    fn write(&mut self, src: &[u8]) -> io::Result<usize> {
        if !self.open {
            return Err(closed());
        }
        self.inner.write(src)
    }
}
