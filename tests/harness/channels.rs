#![allow(dead_code)]

use chanstream::{
    BlockingLock, BlockingMode, ByteBuf, Channel, ChannelKind, ReadableChannel, Seekable,
    WritableChannel,
};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::{Arc, Mutex};

fn broken() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "injected write failure")
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "channel is closed")
}

/// Deterministic test data: byte `i` is `i mod 251`.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// In-memory random-access channel. Reports `File` kind by default, `Seekable` via
/// `MemoryFile::seekable`.
pub struct MemoryFile {
    pub data: Vec<u8>,
    pub position: u64,
    kind: ChannelKind,
    open: bool,
    /// Most bytes moved by one `transfer_to` call.
    pub max_push: usize,
    /// Most bytes moved by one `transfer_from` call.
    pub max_pull: u64,
    /// Total bytes this channel accepts before every write fails.
    pub fail_after_bytes: Option<u64>,
    pub bytes_written: u64,
    pub reads: usize,
    pub pushes: usize,
    pub pulls: usize,
    pub write_ats: usize,
}

impl MemoryFile {
    pub fn file(data: Vec<u8>) -> Self {
        Self {
            data,
            position: 0,
            kind: ChannelKind::File,
            open: true,
            max_push: usize::MAX,
            max_pull: u64::MAX,
            fail_after_bytes: None,
            bytes_written: 0,
            reads: 0,
            pushes: 0,
            pulls: 0,
            write_ats: 0,
        }
    }

    pub fn empty() -> Self {
        Self::file(Vec::new())
    }

    pub fn seekable(data: Vec<u8>) -> Self {
        Self {
            kind: ChannelKind::Seekable,
            ..Self::file(data)
        }
    }

    pub fn at(mut self, position: u64) -> Self {
        self.position = position;
        self
    }

    pub fn max_push(mut self, n: usize) -> Self {
        self.max_push = n;
        self
    }

    pub fn max_pull(mut self, n: u64) -> Self {
        self.max_pull = n;
        self
    }

    pub fn fail_after(mut self, bytes: u64) -> Self {
        self.fail_after_bytes = Some(bytes);
        self
    }

    /// Stores `src` at `position`, honoring the failure budget.
    fn store(&mut self, src: &[u8], position: u64) -> io::Result<usize> {
        if !self.open {
            return Err(closed());
        }
        let budget = match self.fail_after_bytes {
            Some(limit) if self.bytes_written >= limit => return Err(broken()),
            Some(limit) => (limit - self.bytes_written) as usize,
            None => usize::MAX,
        };
        let n = src.len().min(budget);
        let start = position as usize;
        let end = start + n;
        if self.data.len() < end {
            self.data.resize(end, 0);
        }
        self.data[start..end].copy_from_slice(&src[..n]);
        self.bytes_written += n as u64;
        Ok(n)
    }
}

impl Channel for MemoryFile {
    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) -> io::Result<()> {
        self.open = false;
        Ok(())
    }

    fn kind(&self) -> ChannelKind {
        self.kind
    }

    fn as_seekable(&mut self) -> Option<&mut dyn Seekable> {
        Some(self)
    }
}

impl Seekable for MemoryFile {
    fn position(&mut self) -> io::Result<u64> {
        Ok(self.position)
    }

    fn set_position(&mut self, position: u64) -> io::Result<()> {
        self.position = position;
        Ok(())
    }

    fn size(&mut self) -> io::Result<u64> {
        Ok(self.data.len() as u64)
    }
}

impl ReadableChannel for MemoryFile {
    fn read(&mut self, dst: &mut ByteBuf<'_>) -> io::Result<Option<usize>> {
        if !self.open {
            return Err(closed());
        }
        self.reads += 1;
        if !dst.has_remaining() {
            return Ok(Some(0));
        }
        let pos = self.position as usize;
        if pos >= self.data.len() {
            return Ok(None);
        }
        let n = dst.put(&self.data[pos..]);
        self.position += n as u64;
        Ok(Some(n))
    }

    fn transfer_to(
        &mut self,
        position: u64,
        count: u64,
        target: &mut dyn WritableChannel,
    ) -> io::Result<u64> {
        self.pushes += 1;
        let len = self.data.len() as u64;
        if position >= len {
            return Ok(0);
        }
        let end = len.min(position.saturating_add(count.min(self.max_push as u64)));
        let mut slice = &self.data[position as usize..end as usize];
        let mut total = 0u64;
        while !slice.is_empty() {
            match target.write(slice) {
                Ok(0) => break,
                Ok(n) => {
                    total += n as u64;
                    slice = &slice[n..];
                }
                // Report partial progress first; the next call surfaces the failure.
                Err(_) if total > 0 => break,
                Err(e) => return Err(e),
            }
        }
        Ok(total)
    }
}

impl WritableChannel for MemoryFile {
    fn write(&mut self, src: &[u8]) -> io::Result<usize> {
        let n = self.store(src, self.position)?;
        self.position += n as u64;
        Ok(n)
    }

    fn write_at(&mut self, src: &[u8], position: u64) -> io::Result<usize> {
        self.write_ats += 1;
        self.store(src, position)
    }

    fn transfer_from(
        &mut self,
        src: &mut dyn ReadableChannel,
        position: u64,
        count: u64,
    ) -> io::Result<u64> {
        self.pulls += 1;
        let limit = count.min(self.max_pull);
        let mut tmp = [0u8; 4096];
        let mut total = 0u64;
        while total < limit {
            let want = (limit - total).min(tmp.len() as u64) as usize;
            let mut view = ByteBuf::wrap(&mut tmp[..want]);
            let n = match src.read(&mut view)? {
                Some(n) if n > 0 => n,
                _ => break,
            };
            let mut chunk = &tmp[..n];
            while !chunk.is_empty() {
                let stored = match self.store(chunk, position + total) {
                    Ok(n) => n,
                    Err(_) if total > 0 => return Ok(total),
                    Err(e) => return Err(e),
                };
                total += stored as u64;
                chunk = &chunk[stored..];
            }
        }
        Ok(total)
    }
}

/// Sequential source that yields at most `max_chunk` bytes per read.
pub struct ChunkedSource {
    data: Vec<u8>,
    pos: usize,
    max_chunk: usize,
    /// Fails the read with this 1-based index.
    pub fail_on_read: Option<usize>,
    pub reads: usize,
    open: bool,
}

impl ChunkedSource {
    pub fn new(data: Vec<u8>, max_chunk: usize) -> Self {
        Self {
            data,
            pos: 0,
            max_chunk,
            fail_on_read: None,
            reads: 0,
            open: true,
        }
    }

    pub fn failing_on_read(mut self, n: usize) -> Self {
        self.fail_on_read = Some(n);
        self
    }

    pub fn consumed(&self) -> usize {
        self.pos
    }
}

impl Channel for ChunkedSource {
    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) -> io::Result<()> {
        self.open = false;
        Ok(())
    }
}

impl ReadableChannel for ChunkedSource {
    fn read(&mut self, dst: &mut ByteBuf<'_>) -> io::Result<Option<usize>> {
        if !self.open {
            return Err(closed());
        }
        self.reads += 1;
        if self.fail_on_read == Some(self.reads) {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "injected read failure"));
        }
        if self.pos >= self.data.len() {
            return Ok(None);
        }
        let end = self.data.len().min(self.pos.saturating_add(self.max_chunk));
        let n = dst.put(&self.data[self.pos..end]);
        self.pos += n;
        Ok(Some(n))
    }
}

/// Sequential sink accepting at most `max_write` bytes per call.
pub struct Sink {
    pub data: Vec<u8>,
    max_write: usize,
    pub fail_after_bytes: Option<u64>,
    pub writes: usize,
    open: bool,
}

impl Sink {
    pub fn new() -> Self {
        Self::with_max_write(usize::MAX)
    }

    pub fn with_max_write(max_write: usize) -> Self {
        Self {
            data: Vec::new(),
            max_write,
            fail_after_bytes: None,
            writes: 0,
            open: true,
        }
    }

    pub fn fail_after(mut self, bytes: u64) -> Self {
        self.fail_after_bytes = Some(bytes);
        self
    }
}

impl Channel for Sink {
    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) -> io::Result<()> {
        self.open = false;
        Ok(())
    }
}

impl WritableChannel for Sink {
    fn write(&mut self, src: &[u8]) -> io::Result<usize> {
        if !self.open {
            return Err(closed());
        }
        self.writes += 1;
        let budget = match self.fail_after_bytes {
            Some(limit) if self.data.len() as u64 >= limit => return Err(broken()),
            Some(limit) => (limit - self.data.len() as u64) as usize,
            None => usize::MAX,
        };
        let n = src.len().min(self.max_write).min(budget);
        self.data.extend_from_slice(&src[..n]);
        Ok(n)
    }
}

/// Sequential source with switchable blocking mode that records the mode of every read.
pub struct ModalSource {
    inner: ChunkedSource,
    lock: BlockingLock,
    blocking: bool,
    pub mode_changes: Vec<bool>,
    pub modes_seen: Vec<bool>,
    pub lock_held: Vec<bool>,
    pub fail_reads: bool,
}

impl ModalSource {
    pub fn new(data: Vec<u8>, blocking: bool) -> Self {
        Self {
            inner: ChunkedSource::new(data, usize::MAX),
            lock: Arc::new(Mutex::new(())),
            blocking,
            mode_changes: Vec::new(),
            modes_seen: Vec::new(),
            lock_held: Vec::new(),
            fail_reads: false,
        }
    }

    pub fn shared_lock(&self) -> BlockingLock {
        Arc::clone(&self.lock)
    }

    pub fn blocking(&self) -> bool {
        self.blocking
    }
}

impl Channel for ModalSource {
    fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    fn close(&mut self) -> io::Result<()> {
        self.inner.close()
    }

    fn as_blocking(&mut self) -> Option<&mut dyn BlockingMode> {
        Some(self)
    }
}

impl BlockingMode for ModalSource {
    fn blocking_lock(&self) -> BlockingLock {
        Arc::clone(&self.lock)
    }

    fn is_blocking(&self) -> bool {
        self.blocking
    }

    fn set_blocking(&mut self, blocking: bool) -> io::Result<()> {
        self.mode_changes.push(blocking);
        self.blocking = blocking;
        Ok(())
    }
}

impl ReadableChannel for ModalSource {
    fn read(&mut self, dst: &mut ByteBuf<'_>) -> io::Result<Option<usize>> {
        self.modes_seen.push(self.blocking);
        self.lock_held.push(self.lock.try_lock().is_err());
        if self.fail_reads {
            return Err(io::Error::new(io::ErrorKind::Other, "injected read failure"));
        }
        self.inner.read(dst)
    }
}

/// A real temporary file exposed as a `File` kind channel.
pub struct TempFileChannel {
    file: File,
    open: bool,
}

impl TempFileChannel {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            file: tempfile::tempfile()?,
            open: true,
        })
    }

    pub fn with_contents(data: &[u8]) -> io::Result<Self> {
        let mut ch = Self::new()?;
        ch.file.write_all(data)?;
        ch.file.seek(SeekFrom::Start(0))?;
        Ok(ch)
    }

    pub fn contents(&mut self) -> io::Result<Vec<u8>> {
        let pos = self.file.stream_position()?;
        self.file.seek(SeekFrom::Start(0))?;
        let mut out = Vec::new();
        self.file.read_to_end(&mut out)?;
        self.file.seek(SeekFrom::Start(pos))?;
        Ok(out)
    }

    fn read_at(&mut self, buf: &mut [u8], position: u64) -> io::Result<usize> {
        let saved = self.file.stream_position()?;
        self.file.seek(SeekFrom::Start(position))?;
        let outcome = self.file.read(buf);
        self.file.seek(SeekFrom::Start(saved))?;
        outcome
    }
}

impl Channel for TempFileChannel {
    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) -> io::Result<()> {
        self.open = false;
        Ok(())
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::File
    }

    fn as_seekable(&mut self) -> Option<&mut dyn Seekable> {
        Some(self)
    }
}

impl Seekable for TempFileChannel {
    fn position(&mut self) -> io::Result<u64> {
        self.file.stream_position()
    }

    fn set_position(&mut self, position: u64) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(position)).map(|_| ())
    }

    fn size(&mut self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }
}

impl ReadableChannel for TempFileChannel {
    fn read(&mut self, dst: &mut ByteBuf<'_>) -> io::Result<Option<usize>> {
        if !dst.has_remaining() {
            return Ok(Some(0));
        }
        let n = self.file.read(dst.remaining_mut())?;
        if n == 0 {
            return Ok(None);
        }
        dst.advance(n);
        Ok(Some(n))
    }

    fn transfer_to(
        &mut self,
        position: u64,
        count: u64,
        target: &mut dyn WritableChannel,
    ) -> io::Result<u64> {
        let mut buf = vec![0u8; 16 * 1024];
        let want = count.min(buf.len() as u64) as usize;
        let n = self.read_at(&mut buf[..want], position)?;
        let mut chunk = &buf[..n];
        let mut total = 0u64;
        while !chunk.is_empty() {
            let w = target.write(chunk)?;
            if w == 0 {
                break;
            }
            total += w as u64;
            chunk = &chunk[w..];
        }
        Ok(total)
    }
}

impl WritableChannel for TempFileChannel {
    fn write(&mut self, src: &[u8]) -> io::Result<usize> {
        self.file.write(src)
    }

    fn write_at(&mut self, src: &[u8], position: u64) -> io::Result<usize> {
        let saved = self.file.stream_position()?;
        self.file.seek(SeekFrom::Start(position))?;
        let outcome = self.file.write(src);
        self.file.seek(SeekFrom::Start(saved))?;
        outcome
    }

    fn transfer_from(
        &mut self,
        src: &mut dyn ReadableChannel,
        position: u64,
        count: u64,
    ) -> io::Result<u64> {
        let mut buf = vec![0u8; 16 * 1024];
        let want = count.min(buf.len() as u64) as usize;
        let mut view = ByteBuf::wrap(&mut buf[..want]);
        let n = match src.read(&mut view)? {
            Some(n) => n,
            None => return Ok(0),
        };
        let mut total = 0usize;
        while total < n {
            let w = self.write_at(&buf[total..n], position + total as u64)?;
            if w == 0 {
                break;
            }
            total += w;
        }
        Ok(total as u64)
    }
}

/// Routes `log` output through the test harness; safe to call from every test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
