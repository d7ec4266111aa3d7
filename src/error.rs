//! Error types for the compression core

use thiserror::Error;

/// Errors produced by the block and chunk codecs
///
/// Overflow is recoverable at the block boundary: the caller truncates the
/// buffer to the committed length and starts a new block. Decode errors are
/// terminal for the buffer being read; no partial result is surfaced.
#[derive(Error, Debug)]
pub enum CompressionError {
    /// A write could not be completed because the output buffer is exhausted
    #[error("output buffer overflow")]
    BufferOverflow,

    /// Compressed input does not decode cleanly (truncated stream, length
    /// prefix or count that does not match the bytes available)
    #[error("corrupted data: {0}")]
    CorruptedData(String),

    /// Block version tag is outside the supported range
    #[error("unsupported block version {found} (supported {min}..={max})")]
    UnsupportedVersion {
        /// Version read from the block header
        found: u16,
        /// Oldest version this build can decode
        min: u16,
        /// Newest version this build can decode
        max: u16,
    },

    /// A caller-supplied argument cannot be used (mismatched column lengths,
    /// undersized destination buffer)
    #[error("bad argument: {0}")]
    BadArgument(String),

    /// An internal sequencing invariant was violated
    #[error("internal error: {0}")]
    InternalError(String),
}

/// Result type alias for codec operations
pub type Result<T> = std::result::Result<T, CompressionError>;
