//! Scratch-buffer pools used by the staged transfer strategies.
//!
//! This module defines a composable `ScratchPool` trait and two implementations that
//! control whether staging buffers are allocated per transfer or recycled between
//! transfers. Buffers are always borrowed through [`ScratchBuffer`], which hands the
//! buffer back to its pool when dropped, so every exit path releases it.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, PoisonError};

/// Default staging chunk size for buffered transfers.
pub const TRANSFER_SIZE: usize = 8192;

/// A source of temporary staging buffers.
pub trait ScratchPool {
    /// Returns a zero-initialized buffer whose length is exactly `size`.
    fn acquire(&self, size: usize) -> Vec<u8>;

    /// Gives a buffer back. Pools are free to drop it.
    fn release(&self, buf: Vec<u8>);
}

/// A zero-state pool that allocates on acquire and drops on release.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapPool;

impl ScratchPool for HeapPool {
    #[inline]
    fn acquire(&self, size: usize) -> Vec<u8> {
        vec![0; size]
    }

    #[inline]
    fn release(&self, _buf: Vec<u8>) {}
}

/// A bounded free list of staging buffers.
///
/// Released buffers are retained while fewer than `max_buffers` are cached and their
/// capacity does not exceed `max_buffer_size`. Requests larger than `max_buffer_size`
/// always get a fresh allocation.
#[derive(Debug)]
pub struct CachingPool {
    /// How many idle buffers to keep.
    pub max_buffers: usize,
    /// Largest buffer capacity worth caching.
    pub max_buffer_size: usize,
    free: Mutex<Vec<Vec<u8>>>,
}

impl Default for CachingPool {
    fn default() -> Self {
        Self::new(16)
    }
}

impl CachingPool {
    pub fn new(max_buffers: usize) -> Self {
        Self {
            max_buffers,
            max_buffer_size: usize::MAX,
            free: Mutex::new(Vec::new()),
        }
    }

    /// Caps the capacity of buffers the pool is willing to keep.
    pub fn with_max_buffer_size(mut self, max_buffer_size: usize) -> Self {
        self.max_buffer_size = max_buffer_size;
        self
    }

    /// Number of idle buffers currently held.
    pub fn cached(&self) -> usize {
        self.free.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl ScratchPool for CachingPool {
    fn acquire(&self, size: usize) -> Vec<u8> {
        if size > self.max_buffer_size {
            return vec![0; size];
        }
        let reused = {
            let mut free = self.free.lock().unwrap_or_else(PoisonError::into_inner);
            let fit = free.iter().position(|b| b.capacity() >= size);
            fit.map(|i| free.swap_remove(i))
        };
        match reused {
            Some(mut buf) => {
                buf.clear();
                buf.resize(size, 0);
                buf
            }
            None => vec![0; size],
        }
    }

    fn release(&self, buf: Vec<u8>) {
        if buf.capacity() > self.max_buffer_size {
            return;
        }
        let mut free = self.free.lock().unwrap_or_else(PoisonError::into_inner);
        if free.len() < self.max_buffers {
            free.push(buf);
        }
    }
}

impl<P: ScratchPool + ?Sized> ScratchPool for &P {
    fn acquire(&self, size: usize) -> Vec<u8> {
        (**self).acquire(size)
    }

    fn release(&self, buf: Vec<u8>) {
        (**self).release(buf)
    }
}

impl<P: ScratchPool + ?Sized> ScratchPool for Arc<P> {
    fn acquire(&self, size: usize) -> Vec<u8> {
        (**self).acquire(size)
    }

    fn release(&self, buf: Vec<u8>) {
        (**self).release(buf)
    }
}

/// A staging buffer on loan from a pool; returned to the pool on drop.
pub struct ScratchBuffer<'p, P: ScratchPool + ?Sized> {
    buf: Option<Vec<u8>>,
    pool: &'p P,
}

impl<'p, P: ScratchPool + ?Sized> ScratchBuffer<'p, P> {
    pub fn acquire(pool: &'p P, size: usize) -> Self {
        Self {
            buf: Some(pool.acquire(size)),
            pool,
        }
    }
}

impl<P: ScratchPool + ?Sized> Deref for ScratchBuffer<'_, P> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.buf.as_deref().unwrap_or(&[])
    }
}

impl<P: ScratchPool + ?Sized> DerefMut for ScratchBuffer<'_, P> {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.buf.as_deref_mut().unwrap_or(&mut [])
    }
}

impl<P: ScratchPool + ?Sized> Drop for ScratchBuffer<'_, P> {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.release(buf);
        }
    }
}
