//! A sequential, blocking reader over a readable channel.

use crate::buffer::ByteBuf;
use crate::error::{Error, Result};
use crate::pool::{HeapPool, ScratchBuffer, ScratchPool};
use crate::traits::{Channel, ReadableChannel, WritableChannel};
use crate::transfer::Dispatcher;
use crate::writer::ChannelWriter;
use log::trace;
use std::io::{self, Read, Write};
use std::sync::PoisonError;

// Largest chunk discarded per read when skipping on a non-seekable channel.
const MAX_SKIP_BUFFER_SIZE: usize = 2048;

/// Reads from `channel` into `dst`, honoring the channel's blocking mode.
///
/// For channels without mode control this is a plain read. Otherwise the channel's
/// blocking lock is held for the whole call:
/// * a blocking read on a channel that is currently non-blocking fails with
///   `Error::IllegalBlockingMode` without reading;
/// * if `block` differs from the current mode, the mode is switched for the read and
///   switched back afterwards, also when the read fails.
pub fn read_channel<C: ReadableChannel + ?Sized>(
    channel: &mut C,
    dst: &mut ByteBuf<'_>,
    block: bool,
) -> Result<Option<usize>> {
    let lock = match channel.as_blocking() {
        Some(mode) => mode.blocking_lock(),
        None => return Ok(channel.read(dst)?),
    };
    let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

    let current = match channel.as_blocking() {
        Some(mode) => mode.is_blocking(),
        None => return Err(Error::missing("blocking mode")),
    };
    if block && !current {
        return Err(Error::IllegalBlockingMode);
    }
    if block == current {
        return Ok(channel.read(dst)?);
    }

    set_blocking(channel, block)?;
    let outcome = channel.read(dst);
    let restored = set_blocking(channel, current);
    let n = outcome?;
    restored?;
    Ok(n)
}

fn set_blocking<C: Channel + ?Sized>(channel: &mut C, blocking: bool) -> Result<()> {
    channel
        .as_blocking()
        .ok_or_else(|| Error::missing("blocking mode"))?
        .set_blocking(blocking)?;
    Ok(())
}

/// Address and length of the caller buffer the reader last read into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BufferId {
    addr: usize,
    len: usize,
}

impl BufferId {
    fn of(buf: &[u8]) -> Self {
        Self {
            addr: buf.as_ptr() as usize,
            len: buf.len(),
        }
    }
}

/// A blocking, sequential reader over a readable channel.
///
/// The reader borrows nothing from its caller between calls: it owns (or holds a
/// `&mut` to) the channel and a [`Dispatcher`] used for bulk transfers. All reading
/// methods take `&mut self`, so at most one read is ever in flight per reader.
///
/// ```rust
/// use chanstream::{ChannelReader, ReaderChannel};
/// use std::io::Cursor;
///
/// let mut reader = ChannelReader::new(ReaderChannel::new(Cursor::new(b"hi".to_vec())));
/// assert_eq!(reader.read_byte()?, Some(b'h'));
/// assert_eq!(reader.read_byte()?, Some(b'i'));
/// assert_eq!(reader.read_byte()?, None);
/// # Ok::<(), chanstream::Error>(())
/// ```
pub struct ChannelReader<C: ReadableChannel, P: ScratchPool = HeapPool> {
    channel: C,
    dispatcher: Dispatcher<P>,
    bound: Option<BufferId>,
    rebinds: u64,
    one: Option<Box<[u8; 1]>>,
}

impl<C: ReadableChannel> ChannelReader<C> {
    /// Creates a reader with the default dispatcher.
    pub fn new(channel: C) -> Self {
        Self::with_dispatcher(channel, Dispatcher::new())
    }
}

impl<C: ReadableChannel, P: ScratchPool> ChannelReader<C, P> {
    /// Creates a reader whose transfers and skips use the given dispatcher.
    pub fn with_dispatcher(channel: C, dispatcher: Dispatcher<P>) -> Self {
        Self {
            channel,
            dispatcher,
            bound: None,
            rebinds: 0,
            one: None,
        }
    }

    /// Reads a single byte. Returns `Ok(None)` at end of data.
    pub fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut one = self.one.take().unwrap_or_else(|| Box::new([0u8; 1]));
        let outcome = self.read_into(&mut one[..], 0, 1);
        let byte = one[0];
        self.one = Some(one);
        Ok(match outcome? {
            Some(1) => Some(byte),
            _ => None,
        })
    }

    /// Reads into `buf[offset..offset + len]`.
    ///
    /// Returns `Ok(Some(0))` for an empty window without touching the channel,
    /// `Ok(Some(n))` for `n` bytes read, and `Ok(None)` at end of data. Bytes outside
    /// the window are never touched. A window outside `buf` fails with
    /// `Error::OutOfBounds` before anything is read.
    pub fn read_into(
        &mut self,
        buf: &mut [u8],
        offset: usize,
        len: usize,
    ) -> Result<Option<usize>> {
        let end = offset
            .checked_add(len)
            .filter(|&end| end <= buf.len())
            .ok_or_else(|| Error::out_of_bounds(offset, len, buf.len()))?;
        if len == 0 {
            return Ok(Some(0));
        }

        let id = BufferId::of(buf);
        if self.bound != Some(id) {
            self.bound = Some(id);
            self.rebinds += 1;
        }
        let mut view = ByteBuf::wrap(buf);
        view.set_limit(end.min(view.capacity()));
        view.set_position(offset);
        read_channel(&mut self.channel, &mut view, true)
    }

    /// How many times `read_into` saw a different caller buffer than on the previous
    /// call. Views are rebuilt per call, so this only tracks buffer changes.
    #[doc(hidden)]
    pub fn rebinds(&self) -> u64 {
        self.rebinds
    }

    /// Bytes readable without blocking: the distance to the end for seekable channels,
    /// zero otherwise.
    pub fn available(&mut self) -> Result<usize> {
        match self.channel.as_seekable() {
            Some(s) => {
                let remaining = s.size()?.saturating_sub(s.position()?);
                Ok(usize::try_from(remaining).unwrap_or(usize::MAX))
            }
            None => Ok(0),
        }
    }

    /// Skips up to `n` bytes and returns the signed distance actually moved.
    ///
    /// Seekable channels are repositioned directly: forward skips stop at the end,
    /// backward skips stop at zero. Other channels only skip forward, by reading and
    /// discarding until `n` bytes are gone or the data ends.
    pub fn skip(&mut self, n: i64) -> Result<i64> {
        if let Some(s) = self.channel.as_seekable() {
            let pos = s.position()?;
            let new_pos = if n > 0 {
                let size = s.size()?;
                pos.checked_add(n as u64)
                    .filter(|&p| p <= size)
                    .unwrap_or(size)
            } else {
                pos.saturating_sub(n.unsigned_abs())
            };
            s.set_position(new_pos)?;
            return Ok(new_pos.wrapping_sub(pos) as i64);
        }

        if n <= 0 {
            return Ok(0);
        }
        let size = (n as u64).min(MAX_SKIP_BUFFER_SIZE as u64) as usize;
        let mut scratch = ScratchBuffer::acquire(self.dispatcher.pool(), size);
        let mut remaining = n as u64;
        while remaining > 0 {
            let want = remaining.min(size as u64) as usize;
            let mut view = ByteBuf::wrap(&mut scratch[..want]);
            match read_channel(&mut self.channel, &mut view, true)? {
                Some(k) if k > 0 => remaining -= k as u64,
                _ => break,
            }
        }
        trace!("skip: discarded {} of {} bytes", n as u64 - remaining, n);
        Ok(n - remaining as i64)
    }

    /// Closes the underlying channel.
    pub fn close(&mut self) -> Result<()> {
        self.channel.close()?;
        Ok(())
    }

    /// Moves every remaining byte into `dst` using the fastest strategy the two
    /// channels allow. Returns the number of bytes moved.
    pub fn transfer_to(&mut self, dst: &mut dyn WritableChannel) -> Result<u64> {
        self.dispatcher.transfer(&mut self.channel, dst)
    }

    /// Like [`transfer_to`](Self::transfer_to), targeting the channel behind a `ChannelWriter`.
    pub fn transfer_to_writer<W: WritableChannel>(
        &mut self,
        out: &mut ChannelWriter<W>,
    ) -> Result<u64> {
        self.transfer_to(out.get_mut())
    }

    /// Copies every remaining byte into a plain `Write`, through a pooled scratch buffer.
    pub fn copy_to<W: Write + ?Sized>(&mut self, out: &mut W) -> Result<u64> {
        let size = self.dispatcher.get_chunk_size();
        let mut scratch = ScratchBuffer::acquire(self.dispatcher.pool(), size);
        let mut total = 0u64;
        loop {
            let mut view = ByteBuf::wrap(&mut scratch);
            let n = match read_channel(&mut self.channel, &mut view, true)? {
                Some(n) => n,
                None => break,
            };
            out.write_all(&scratch[..n])?;
            total += n as u64;
        }
        Ok(total)
    }

    pub fn get_ref(&self) -> &C {
        &self.channel
    }

    pub fn get_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    pub fn dispatcher(&self) -> &Dispatcher<P> {
        &self.dispatcher
    }

    /// Consumes the reader, returning the underlying channel.
    pub fn into_inner(self) -> C {
        self.channel
    }
}

impl<C: ReadableChannel, P: ScratchPool> Read for ChannelReader<C, P> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len();
        Ok(self.read_into(buf, 0, len)?.unwrap_or(0))
    }
}
