//! A `std::io::Write` adapter over a writable channel.

use crate::error::{Error, Result};
use crate::traits::WritableChannel;
use std::io::{self, Write};
use std::sync::PoisonError;

/// Writes all of `src` to `channel`, looping over short writes.
///
/// Channels with mode control must be in blocking mode; the check and the writes happen
/// under the channel's blocking lock. A write that accepts zero bytes fails with
/// `io::ErrorKind::WriteZero` instead of spinning.
pub fn write_fully<C: WritableChannel + ?Sized>(channel: &mut C, mut src: &[u8]) -> Result<()> {
    let lock = channel.as_blocking().map(|mode| mode.blocking_lock());
    let _guard = lock
        .as_ref()
        .map(|l| l.lock().unwrap_or_else(PoisonError::into_inner));
    if let Some(mode) = channel.as_blocking() {
        if !mode.is_blocking() {
            return Err(Error::IllegalBlockingMode);
        }
    }

    while !src.is_empty() {
        let n = channel.write(src)?;
        if n == 0 {
            return Err(io::Error::from(io::ErrorKind::WriteZero).into());
        }
        src = &src[n.min(src.len())..];
    }
    Ok(())
}

/// A writer for pushing bytes into a channel through the `std::io::Write` interface.
///
/// Every `write` call drains its whole buffer into the channel before returning, so the
/// channel never sees a partially accepted slice.
pub struct ChannelWriter<W: WritableChannel> {
    channel: W,
}

impl<W: WritableChannel> ChannelWriter<W> {
    /// Creates a new `ChannelWriter`.
    pub fn new(channel: W) -> Self {
        Self { channel }
    }

    /// Closes the underlying channel.
    pub fn close(&mut self) -> Result<()> {
        self.channel.close()?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.channel
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.channel
    }

    /// Consumes the writer, returning the underlying channel.
    pub fn into_inner(self) -> W {
        self.channel
    }
}

impl<W: WritableChannel> Write for ChannelWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        write_fully(&mut self.channel, buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
