use thiserror::Error;

/// Custom error types for the chanstream library.
#[derive(Error, Debug)]
pub enum Error {
    /// Underlying I/O errors reported by a channel, surfaced unchanged.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The requested `[offset, offset + len)` window does not fit the caller's buffer.
    #[error("Range out of bounds: offset {offset}, length {len}, buffer capacity {capacity}")]
    OutOfBounds {
        offset: usize,
        len: usize,
        capacity: usize,
    },

    /// A blocking operation was requested on a channel that is in non-blocking mode.
    #[error("Illegal blocking mode: channel is configured non-blocking")]
    IllegalBlockingMode,

    /// A channel advertised a capability through its kind but did not expose it.
    #[error("Channel reported {capability} capability but does not provide it")]
    MissingCapability { capability: &'static str },
}

impl Error {
    /// Create a new `OutOfBounds` error for the given window and buffer capacity.
    pub fn out_of_bounds(offset: usize, len: usize, capacity: usize) -> Self {
        Self::OutOfBounds {
            offset,
            len,
            capacity,
        }
    }

    /// Create a new `MissingCapability` error.
    pub fn missing(capability: &'static str) -> Self {
        Self::MissingCapability { capability }
    }
}

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(e) => e,
            Error::OutOfBounds { .. } => {
                std::io::Error::new(std::io::ErrorKind::InvalidInput, err)
            }
            Error::IllegalBlockingMode => {
                std::io::Error::new(std::io::ErrorKind::WouldBlock, err)
            }
            Error::MissingCapability { .. } => {
                std::io::Error::new(std::io::ErrorKind::Unsupported, err)
            }
        }
    }
}

/// Result type alias for the library operations.
pub type Result<T> = std::result::Result<T, Error>;
