//! Strategy selection and execution for bulk channel-to-channel transfers.
//!
//! A transfer moves every remaining byte of a source channel into a destination channel.
//! The dispatcher looks at the [`ChannelKind`] of both endpoints once, picks a
//! [`Strategy`], and runs it. Whatever happens inside the loop, the positions of the
//! endpoints are left at `start + bytes_moved` before any error is propagated.

use crate::buffer::ByteBuf;
use crate::error::{Error, Result};
use crate::pool::{HeapPool, ScratchBuffer, ScratchPool, TRANSFER_SIZE};
use crate::traits::{Channel, ChannelKind, ReadableChannel, Seekable, WritableChannel};
use log::{debug, trace, warn};
use std::io;
use std::sync::PoisonError;

/// How a transfer moves its bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// The source file pushes bytes straight into the destination.
    FileToChannel,
    /// The destination file pulls bytes straight out of a seekable source.
    SeekableToFile,
    /// A sequential source feeds a destination file through a scratch buffer,
    /// with a direct pull attempted before every staged chunk.
    StagedToFile,
    /// Read into a scratch buffer, drain it into the destination, repeat.
    Staged,
}

impl Strategy {
    /// Picks the cheapest legal strategy for a pair of endpoint kinds.
    pub fn select(source: ChannelKind, destination: ChannelKind) -> Self {
        match (source, destination) {
            (ChannelKind::File, _) => Strategy::FileToChannel,
            (ChannelKind::Seekable, ChannelKind::File) => Strategy::SeekableToFile,
            (ChannelKind::Stream, ChannelKind::File) => Strategy::StagedToFile,
            _ => Strategy::Staged,
        }
    }
}

/// Runs transfers between channels, drawing scratch buffers from a pool.
///
/// ```rust
/// use chanstream::{Dispatcher, ReaderChannel, WriterChannel};
/// use std::io::Cursor;
///
/// let mut src = ReaderChannel::new(Cursor::new(vec![7u8; 20_000]));
/// let mut dst = WriterChannel::new(Vec::new());
///
/// let moved = Dispatcher::new().transfer(&mut src, &mut dst)?;
/// assert_eq!(moved, 20_000);
/// assert_eq!(dst.get_ref().len(), 20_000);
/// # Ok::<(), chanstream::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Dispatcher<P: ScratchPool = HeapPool> {
    pool: P,
    chunk_size: usize,
}

impl Dispatcher<HeapPool> {
    pub fn new() -> Self {
        Self::with_pool(HeapPool)
    }
}

impl Default for Dispatcher<HeapPool> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: ScratchPool> Dispatcher<P> {
    pub fn with_pool(pool: P) -> Self {
        Self {
            pool,
            chunk_size: TRANSFER_SIZE,
        }
    }

    /// Sets the scratch buffer size used by the staged strategies. Zero is treated as one.
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn pool(&self) -> &P {
        &self.pool
    }

    pub fn get_chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Moves all remaining bytes from `src` to `dst` and returns how many were moved.
    pub fn transfer(
        &self,
        src: &mut dyn ReadableChannel,
        dst: &mut dyn WritableChannel,
    ) -> Result<u64> {
        let strategy = Strategy::select(src.kind(), dst.kind());
        self.transfer_with(strategy, src, dst)
    }

    /// Runs a specific strategy. The endpoints must offer what the strategy needs,
    /// otherwise `Error::MissingCapability` or an unsupported `Error::Io` is returned.
    /// A source that is currently non-blocking fails with `Error::IllegalBlockingMode`
    /// before anything moves.
    pub fn transfer_with(
        &self,
        strategy: Strategy,
        src: &mut dyn ReadableChannel,
        dst: &mut dyn WritableChannel,
    ) -> Result<u64> {
        debug!(
            "transfer: {:?} -> {:?} using {:?}",
            src.kind(),
            dst.kind(),
            strategy
        );
        ensure_blocking(src)?;
        let moved = match strategy {
            Strategy::FileToChannel => push_from_file(src, dst)?,
            Strategy::SeekableToFile => pull_into_file(src, dst)?,
            Strategy::StagedToFile => self.staged_into_file(src, dst)?,
            Strategy::Staged => self.staged_copy(src, dst)?,
        };
        debug!("transfer: {:?} moved {} bytes", strategy, moved);
        Ok(moved)
    }

    fn staged_into_file(
        &self,
        src: &mut dyn ReadableChannel,
        dst: &mut dyn WritableChannel,
    ) -> Result<u64> {
        let dst_start = seekable(dst)?.position()?;
        let mut scratch = ScratchBuffer::acquire(&self.pool, self.chunk_size);
        let mut written = 0u64;

        let outcome = staged_file_loop(src, dst, dst_start, &mut scratch, &mut written);
        let restored = restore(dst, dst_start, written);
        outcome.and(restored)?;
        Ok(written)
    }

    fn staged_copy(
        &self,
        src: &mut dyn ReadableChannel,
        dst: &mut dyn WritableChannel,
    ) -> Result<u64> {
        let mut scratch = ScratchBuffer::acquire(&self.pool, self.chunk_size);
        let mut view = ByteBuf::wrap(&mut scratch);
        let mut written = 0u64;

        while let Some(n) = src.read(&mut view)? {
            trace!("staged: read {} bytes", n);
            view.flip();
            while view.has_remaining() {
                let accepted = nonzero(dst.write(view.remaining_slice())?)?;
                view.advance(accepted);
                written += accepted as u64;
            }
            view.clear();
        }
        Ok(written)
    }
}

fn seekable<C: Channel + ?Sized>(channel: &mut C) -> Result<&mut dyn Seekable> {
    channel
        .as_seekable()
        .ok_or_else(|| Error::missing("seekable"))
}

fn ensure_blocking(src: &mut dyn ReadableChannel) -> Result<()> {
    if let Some(mode) = src.as_blocking() {
        let lock = mode.blocking_lock();
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        if !mode.is_blocking() {
            return Err(Error::IllegalBlockingMode);
        }
    }
    Ok(())
}

fn nonzero(accepted: usize) -> Result<usize> {
    if accepted == 0 {
        let err = io::Error::new(io::ErrorKind::WriteZero, "destination accepted no bytes");
        return Err(err.into());
    }
    Ok(accepted)
}

fn restore<C: Channel + ?Sized>(channel: &mut C, start: u64, moved: u64) -> Result<()> {
    seekable(channel)?.set_position(start.saturating_add(moved))?;
    Ok(())
}

fn push_from_file(src: &mut dyn ReadableChannel, dst: &mut dyn WritableChannel) -> Result<u64> {
    let (src_start, size) = {
        let s = seekable(src)?;
        (s.position()?, s.size()?)
    };
    let mut written = 0u64;

    let outcome = push_loop(src, dst, src_start, size, &mut written);
    let restored = restore(src, src_start, written);
    outcome.and(restored)?;
    Ok(written)
}

fn push_loop(
    src: &mut dyn ReadableChannel,
    dst: &mut dyn WritableChannel,
    src_start: u64,
    size: u64,
    written: &mut u64,
) -> Result<()> {
    while src_start.saturating_add(*written) < size {
        let n = src.transfer_to(src_start + *written, u64::MAX, dst)?;
        if n == 0 {
            warn!(
                "push stalled at offset {} of {}",
                src_start + *written,
                size
            );
            break;
        }
        trace!("push: {} bytes", n);
        *written += n;
    }
    Ok(())
}

fn pull_into_file(src: &mut dyn ReadableChannel, dst: &mut dyn WritableChannel) -> Result<u64> {
    let (src_start, size) = {
        let s = seekable(src)?;
        (s.position()?, s.size()?)
    };
    let dst_start = seekable(dst)?.position()?;
    let mut written = 0u64;

    let outcome = pull_loop(src, dst, src_start, size, dst_start, &mut written);
    let restored = restore(dst, dst_start, written).and(restore(src, src_start, written));
    outcome.and(restored)?;
    Ok(written)
}

fn pull_loop(
    src: &mut dyn ReadableChannel,
    dst: &mut dyn WritableChannel,
    src_start: u64,
    size: u64,
    dst_start: u64,
    written: &mut u64,
) -> Result<()> {
    while src_start.saturating_add(*written) < size {
        let n = dst.transfer_from(src, dst_start + *written, u64::MAX)?;
        if n == 0 {
            warn!(
                "pull stalled at offset {} of {}",
                src_start + *written,
                size
            );
            break;
        }
        trace!("pull: {} bytes", n);
        *written += n;
    }
    Ok(())
}

fn staged_file_loop(
    src: &mut dyn ReadableChannel,
    dst: &mut dyn WritableChannel,
    dst_start: u64,
    scratch: &mut [u8],
    written: &mut u64,
) -> Result<()> {
    let mut view = ByteBuf::wrap(scratch);
    loop {
        let pulled = dst.transfer_from(src, dst_start + *written, u64::MAX)?;
        *written += pulled;

        // A read also detects end of data, which the pull cannot report.
        match src.read(&mut view)? {
            None => return Ok(()),
            Some(n) => trace!("staged: pulled {} then read {} bytes", pulled, n),
        }
        view.flip();
        while view.has_remaining() {
            let accepted = nonzero(dst.write_at(view.remaining_slice(), dst_start + *written)?)?;
            view.advance(accepted);
            *written += accepted as u64;
        }
        view.clear();
    }
}
