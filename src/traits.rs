//! Core channel traits consumed by the chanstream library.
//!
//! Concrete channels (files, sockets, pipes) live outside this crate. They plug in by
//! implementing [`Channel`] plus [`ReadableChannel`] and/or [`WritableChannel`], and by
//! describing what they can do through [`ChannelKind`] and the capability accessors.

use crate::buffer::ByteBuf;
use std::io;
use std::sync::{Arc, Mutex};

/// Capability descriptor used to pick a transfer strategy.
///
/// The variants are ordered by what they promise:
/// * `Stream`: sequential reads/writes only.
/// * `Seekable`: position and size are available through [`Channel::as_seekable`].
/// * `File`: seekable, plus the descriptor-level operations
///   ([`ReadableChannel::transfer_to`], [`WritableChannel::write_at`],
///   [`WritableChannel::transfer_from`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Stream,
    Seekable,
    File,
}

impl ChannelKind {
    /// True for kinds that expose position and size.
    #[inline]
    pub fn is_seekable(self) -> bool {
        !matches!(self, ChannelKind::Stream)
    }
}

/// Lock token shared by every user of one underlying handle.
///
/// Holding the guard makes the "read mode, toggle, operate, restore" sequence atomic
/// with respect to other users of the same handle.
pub type BlockingLock = Arc<Mutex<()>>;

/// Position and size access for random-access channels.
pub trait Seekable {
    fn position(&mut self) -> io::Result<u64>;
    fn set_position(&mut self, position: u64) -> io::Result<()>;
    fn size(&mut self) -> io::Result<u64>;
}

/// Blocking-mode control for channels that can switch between blocking and non-blocking I/O.
pub trait BlockingMode {
    /// Returns the handle-scoped lock that guards mode changes.
    fn blocking_lock(&self) -> BlockingLock;
    fn is_blocking(&self) -> bool;
    fn set_blocking(&mut self, blocking: bool) -> io::Result<()>;
}

/// An open resource that can be closed and asked about its capabilities.
pub trait Channel {
    fn is_open(&self) -> bool;

    /// Closes the channel. Repeated closes and their errors are the implementation's concern.
    fn close(&mut self) -> io::Result<()>;

    fn kind(&self) -> ChannelKind {
        ChannelKind::Stream
    }

    /// Must return `Some` whenever `kind()` reports a seekable kind.
    fn as_seekable(&mut self) -> Option<&mut dyn Seekable> {
        None
    }

    fn as_blocking(&mut self) -> Option<&mut dyn BlockingMode> {
        None
    }
}

/// A channel that can be read from.
pub trait ReadableChannel: Channel {
    /// Reads into `dst[position..limit]` and advances its position.
    ///
    /// Returns `Ok(Some(n))` for `n` bytes read (possibly 0 in non-blocking mode) and
    /// `Ok(None)` once the channel has reached end of data.
    fn read(&mut self, dst: &mut ByteBuf<'_>) -> io::Result<Option<usize>>;

    /// Pushes up to `count` bytes starting at `position` directly into `target`.
    ///
    /// This channel's own position is not changed. Only `File` channels need to provide it.
    fn transfer_to(
        &mut self,
        position: u64,
        count: u64,
        target: &mut dyn WritableChannel,
    ) -> io::Result<u64> {
        let _ = (position, count, target);
        Err(unsupported("transfer_to"))
    }
}

/// A channel that can be written to.
pub trait WritableChannel: Channel {
    /// Writes some prefix of `src` and returns how many bytes were accepted.
    fn write(&mut self, src: &[u8]) -> io::Result<usize>;

    /// Writes some prefix of `src` at `position` without moving this channel's position.
    fn write_at(&mut self, src: &[u8], position: u64) -> io::Result<usize> {
        let _ = (src, position);
        Err(unsupported("write_at"))
    }

    /// Pulls up to `count` bytes from `src` and stores them starting at `position`.
    ///
    /// This channel's own position is not changed; `src` advances by what it yielded.
    fn transfer_from(
        &mut self,
        src: &mut dyn ReadableChannel,
        position: u64,
        count: u64,
    ) -> io::Result<u64> {
        let _ = (src, position, count);
        Err(unsupported("transfer_from"))
    }
}

fn unsupported(op: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        format!("{op} is not supported by this channel"),
    )
}

// Borrowed channels behave exactly like the channel they point to.

impl<T: Channel + ?Sized> Channel for &mut T {
    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }

    fn kind(&self) -> ChannelKind {
        (**self).kind()
    }

    fn as_seekable(&mut self) -> Option<&mut dyn Seekable> {
        (**self).as_seekable()
    }

    fn as_blocking(&mut self) -> Option<&mut dyn BlockingMode> {
        (**self).as_blocking()
    }
}

impl<T: ReadableChannel + ?Sized> ReadableChannel for &mut T {
    fn read(&mut self, dst: &mut ByteBuf<'_>) -> io::Result<Option<usize>> {
        (**self).read(dst)
    }

    fn transfer_to(
        &mut self,
        position: u64,
        count: u64,
        target: &mut dyn WritableChannel,
    ) -> io::Result<u64> {
        (**self).transfer_to(position, count, target)
    }
}

impl<T: WritableChannel + ?Sized> WritableChannel for &mut T {
    fn write(&mut self, src: &[u8]) -> io::Result<usize> {
        (**self).write(src)
    }

    fn write_at(&mut self, src: &[u8], position: u64) -> io::Result<usize> {
        (**self).write_at(src, position)
    }

    fn transfer_from(
        &mut self,
        src: &mut dyn ReadableChannel,
        position: u64,
        count: u64,
    ) -> io::Result<u64> {
        (**self).transfer_from(src, position, count)
    }
}
