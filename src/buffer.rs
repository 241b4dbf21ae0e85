//! A position/limit view over a borrowed byte slice.

/// A mutable window over a byte slice, exchanged with channel read and write primitives.
///
/// The view tracks `position <= limit <= capacity`. Reads fill `[position, limit)`
/// and advance the position; writes drain `[position, limit)` the same way. After a
/// read, `flip()` turns the filled prefix into the drainable window, and `clear()`
/// resets the view for the next fill.
#[derive(Debug)]
pub struct ByteBuf<'a> {
    bytes: &'a mut [u8],
    position: usize,
    limit: usize,
}

impl<'a> ByteBuf<'a> {
    /// Wraps a slice with position 0 and limit equal to its length.
    pub fn wrap(bytes: &'a mut [u8]) -> Self {
        let limit = bytes.len();
        Self {
            bytes,
            position: 0,
            limit,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    #[inline]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Sets the position, clamped to the current limit.
    pub fn set_position(&mut self, position: usize) {
        self.position = position.min(self.limit);
    }

    /// Sets the limit, clamped to capacity. A position beyond the new limit is pulled back.
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit.min(self.bytes.len());
        if self.position > self.limit {
            self.position = self.limit;
        }
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.limit - self.position
    }

    #[inline]
    pub fn has_remaining(&self) -> bool {
        self.position < self.limit
    }

    /// The bytes between position and limit.
    pub fn remaining_slice(&self) -> &[u8] {
        &self.bytes[self.position..self.limit]
    }

    /// The writable bytes between position and limit.
    pub fn remaining_mut(&mut self) -> &mut [u8] {
        &mut self.bytes[self.position..self.limit]
    }

    /// Moves the position forward by `n`, saturating at the limit.
    pub fn advance(&mut self, n: usize) {
        self.position = self.position.saturating_add(n).min(self.limit);
    }

    /// Copies as much of `src` as fits and advances. Returns the number of bytes copied.
    pub fn put(&mut self, src: &[u8]) -> usize {
        let n = src.len().min(self.remaining());
        self.bytes[self.position..self.position + n].copy_from_slice(&src[..n]);
        self.position += n;
        n
    }

    /// Makes the filled prefix `[0, position)` the drainable window.
    pub fn flip(&mut self) {
        self.limit = self.position;
        self.position = 0;
    }

    /// Resets position to 0 and limit to capacity. Contents are left untouched.
    pub fn clear(&mut self) {
        self.position = 0;
        self.limit = self.bytes.len();
    }
}
