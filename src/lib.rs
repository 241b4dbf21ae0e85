//! # chanstream (v0.1.0)
//!
//! Stream adapters and position-exact bulk transfers over channel handles.
//!
//! ## Overview
//!
//! `chanstream` sits between code that wants plain sequential streams and code that
//! hands out channel-like handles (files, sockets, pipes) with richer capabilities.
//! It does not open or implement channels itself; it orchestrates reads and transfers
//! over handles that implement the traits in [`traits`].
//!
//! ## Key Features
//!
//! * **Stream view**: [`ChannelReader`] offers single-byte reads, windowed reads,
//!   `skip`, `available`, and `std::io::Read` over any readable channel
//! * **Blocking-mode aware**: reads through mode-switchable channels hold the channel's
//!   own lock and leave its mode exactly as they found it
//! * **Strategy dispatch**: [`Dispatcher`] picks between direct descriptor push, direct
//!   pull, staged-into-file and plain staged copy based on both endpoints' [`ChannelKind`]
//! * **Exact bookkeeping**: after a transfer, success or failure, endpoint positions
//!   are advanced by exactly the bytes that moved
//! * **Pooled scratch buffers**: staging buffers come from a [`ScratchPool`] and are
//!   always handed back
//!
//! ## Quick Start
//!
//! ```rust
//! use chanstream::*;
//! use std::io::Cursor;
//!
//! fn main() -> Result<()> {
//!     let source = ReaderChannel::new(Cursor::new(b"header:payload".to_vec()));
//!     let mut reader = ChannelReader::new(source);
//!
//!     // Stream-style access
//!     let mut header = [0u8; 7];
//!     reader.read_into(&mut header, 0, 7)?;
//!     assert_eq!(&header, b"header:");
//!
//!     // Bulk transfer of whatever is left
//!     let mut sink = WriterChannel::new(Vec::new());
//!     let moved = reader.transfer_to(&mut sink)?;
//!     assert_eq!(moved, 7);
//!     assert_eq!(sink.into_inner(), b"payload");
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! * **`Channel` / `ReadableChannel` / `WritableChannel`**: what a handle can do
//! * **`ChannelReader` / `ChannelWriter`**: stream-facing adapters
//! * **`Dispatcher` / `Strategy`**: how bytes move between two handles
//! * **`ScratchPool`**: where staging buffers come from

pub mod bridge;
pub mod buffer;
pub mod error;
pub mod pool;
pub mod reader;
pub mod traits;
pub mod transfer;
pub mod writer;

// Re-export the main public API for user convenience.
pub use bridge::{ReaderChannel, WriterChannel};
pub use buffer::ByteBuf;
pub use error::{Error, Result};
pub use pool::{CachingPool, HeapPool, ScratchBuffer, ScratchPool, TRANSFER_SIZE};
pub use reader::{read_channel, ChannelReader};
pub use traits::{
    BlockingLock, BlockingMode, Channel, ChannelKind, ReadableChannel, Seekable,
    WritableChannel,
};
pub use transfer::{Dispatcher, Strategy};
pub use writer::{write_fully, ChannelWriter};
