//! Byte-level I/O primitives over caller-supplied buffers
//!
//! This module provides the bounded cursors every codec in the crate writes
//! through. A `ByteStreamWriter` owns a position inside a borrowed output
//! buffer, never the bytes themselves; a `ByteStreamReader` is the matching
//! read cursor.
//!
//! # Overview
//!
//! All accesses are typed, fixed-width and in host byte order. Running out
//! of space is a recoverable condition reported through the return value,
//! not a panic: writers return `false`, readers return
//! [`CompressionError::CorruptedData`]. The cursor is never rewound after a
//! failed write, so callers must treat a failure as final for the session.
//!
//! Writers additionally support reservation: [`ByteStreamWriter::allocate`]
//! skips over a zero-filled field and hands back a [`WriteHandle`] that can
//! be patched in place later. The block encoder uses this for the element
//! counts it only knows at close time.
//!
//! # Example
//! ```
//! use skua_tsdb::compression::byte_stream::{ByteStreamReader, ByteStreamWriter};
//!
//! let mut buf = [0u8; 16];
//! let mut writer = ByteStreamWriter::new(&mut buf);
//! assert!(writer.put_raw(0xABCDu16));
//! assert!(writer.put_raw(42.5f64));
//! let written = writer.size();
//!
//! let mut reader = ByteStreamReader::new(&buf[..written]);
//! assert_eq!(reader.read_raw::<u16>().unwrap(), 0xABCD);
//! assert_eq!(reader.read_raw::<f64>().unwrap(), 42.5);
//! ```

use std::marker::PhantomData;

use crate::error::{CompressionError, Result};

/// Fixed-width value that can pass through a byte stream
///
/// Implemented for the unsigned integers and `f64` the block format is made
/// of. Encoding is host byte order throughout; the format makes no
/// cross-endian portability promise.
pub trait StreamValue: Copy {
    /// Encoded width in bytes
    const SIZE: usize;

    /// Write the value into `dst`, which is exactly `SIZE` bytes long
    fn write_to(self, dst: &mut [u8]);

    /// Read a value back from `src`, which is exactly `SIZE` bytes long
    fn read_from(src: &[u8]) -> Self;
}

macro_rules! impl_stream_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl StreamValue for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn write_to(self, dst: &mut [u8]) {
                    dst.copy_from_slice(&self.to_ne_bytes());
                }

                #[inline]
                fn read_from(src: &[u8]) -> Self {
                    <$ty>::from_ne_bytes(src.try_into().expect("slice length checked by the cursor"))
                }
            }
        )*
    };
}

impl_stream_value!(u8, u16, u32, u64, f64);

/// Handle to a reserved field inside a [`ByteStreamWriter`]
///
/// Returned by [`ByteStreamWriter::allocate`] and consumed by
/// [`ByteStreamWriter::patch`]. The handle is write-only; the reserved bytes
/// stay zero until patched.
#[derive(Debug, Clone, Copy)]
pub struct WriteHandle<T> {
    offset: usize,
    _marker: PhantomData<T>,
}

/// Bounded forward-only write cursor over a borrowed byte buffer
///
/// The writer performs no allocation and never reads previously written
/// bytes except through [`WriteHandle`] patches. After [`commit`] the
/// session is closed and every further `put_raw`/`allocate` fails.
///
/// [`commit`]: ByteStreamWriter::commit
pub struct ByteStreamWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
    committed: bool,
}

impl<'a> ByteStreamWriter<'a> {
    /// Create a writer positioned at the start of `buf`
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            committed: false,
        }
    }

    /// Write one fixed-width value at the cursor
    ///
    /// Returns `false` when the remaining space is smaller than the value or
    /// the session is already committed. The cursor is unchanged on failure,
    /// but callers must treat a failed write as final for the session.
    pub fn put_raw<T: StreamValue>(&mut self, value: T) -> bool {
        if self.committed || self.space_left() < T::SIZE {
            return false;
        }
        value.write_to(&mut self.buf[self.pos..self.pos + T::SIZE]);
        self.pos += T::SIZE;
        true
    }

    /// Reserve a zero-filled field at the cursor for later patching
    ///
    /// Returns `None` when there is no room. The reserved bytes count toward
    /// [`size`](ByteStreamWriter::size).
    pub fn allocate<T: StreamValue>(&mut self) -> Option<WriteHandle<T>> {
        if self.committed || self.space_left() < T::SIZE {
            return None;
        }
        let offset = self.pos;
        self.buf[offset..offset + T::SIZE].fill(0);
        self.pos += T::SIZE;
        Some(WriteHandle {
            offset,
            _marker: PhantomData,
        })
    }

    /// Fill a previously reserved field in place
    ///
    /// Patching does not move the cursor and stays valid through close-time
    /// bookkeeping, including after [`commit`](ByteStreamWriter::commit).
    pub fn patch<T: StreamValue>(&mut self, handle: WriteHandle<T>, value: T) {
        value.write_to(&mut self.buf[handle.offset..handle.offset + T::SIZE]);
    }

    /// Bytes written so far, reserved fields included
    pub fn size(&self) -> usize {
        self.pos
    }

    /// Bytes still available in the underlying buffer
    pub fn space_left(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Finalize the session
    ///
    /// After commit no further writes are accepted. Patches remain allowed:
    /// the patched regions were accounted for before the commit.
    pub fn commit(&mut self) -> bool {
        self.committed = true;
        true
    }
}

/// Bounded forward-only read cursor over a borrowed byte buffer
pub struct ByteStreamReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteStreamReader<'a> {
    /// Create a reader positioned at the start of `buf`
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Read one fixed-width value at the cursor
    ///
    /// # Errors
    ///
    /// Returns [`CompressionError::CorruptedData`] when fewer than `T::SIZE`
    /// bytes remain, which means the input is truncated or the framing
    /// counts are wrong.
    pub fn read_raw<T: StreamValue>(&mut self) -> Result<T> {
        if self.remaining() < T::SIZE {
            return Err(CompressionError::CorruptedData(
                "unexpected end of stream".to_string(),
            ));
        }
        let value = T::read_from(&self.buf[self.pos..self.pos + T::SIZE]);
        self.pos += T::SIZE;
        Ok(value)
    }

    /// Current cursor position in bytes
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Bytes left to read
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_typed_values() {
        let mut buf = [0u8; 32];
        let mut writer = ByteStreamWriter::new(&mut buf);
        assert!(writer.put_raw(0x12u8));
        assert!(writer.put_raw(0x3456u16));
        assert!(writer.put_raw(0x789A_BCDEu32));
        assert!(writer.put_raw(0x0123_4567_89AB_CDEFu64));
        assert!(writer.put_raw(-1234.5f64));
        let written = writer.size();
        assert_eq!(written, 1 + 2 + 4 + 8 + 8);

        let mut reader = ByteStreamReader::new(&buf[..written]);
        assert_eq!(reader.read_raw::<u8>().unwrap(), 0x12);
        assert_eq!(reader.read_raw::<u16>().unwrap(), 0x3456);
        assert_eq!(reader.read_raw::<u32>().unwrap(), 0x789A_BCDE);
        assert_eq!(reader.read_raw::<u64>().unwrap(), 0x0123_4567_89AB_CDEF);
        assert_eq!(reader.read_raw::<f64>().unwrap().to_bits(), (-1234.5f64).to_bits());
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_overflow_returns_false() {
        let mut buf = [0u8; 3];
        let mut writer = ByteStreamWriter::new(&mut buf);
        assert!(!writer.put_raw(0u32));
        assert_eq!(writer.size(), 0);
        assert!(writer.put_raw(0xFFu8));
        assert!(writer.put_raw(0xEEu8));
        assert!(writer.put_raw(0xDDu8));
        assert!(!writer.put_raw(0xCCu8));
        assert_eq!(writer.size(), 3);
        assert_eq!(writer.space_left(), 0);
    }

    #[test]
    fn test_allocate_and_patch() {
        let mut buf = [0xFFu8; 16];
        let mut writer = ByteStreamWriter::new(&mut buf);
        let count = writer.allocate::<u16>().unwrap();
        assert!(writer.put_raw(7u64));
        // reserved field is zeroed until patched
        assert_eq!(writer.size(), 10);

        writer.patch(count, 3u16);
        let written = writer.size();

        let mut reader = ByteStreamReader::new(&buf[..written]);
        assert_eq!(reader.read_raw::<u16>().unwrap(), 3);
        assert_eq!(reader.read_raw::<u64>().unwrap(), 7);
    }

    #[test]
    fn test_allocate_without_room() {
        let mut buf = [0u8; 1];
        let mut writer = ByteStreamWriter::new(&mut buf);
        assert!(writer.allocate::<u16>().is_none());
    }

    #[test]
    fn test_commit_blocks_writes_but_not_patches() {
        let mut buf = [0u8; 8];
        let mut writer = ByteStreamWriter::new(&mut buf);
        let field = writer.allocate::<u32>().unwrap();
        assert!(writer.commit());
        assert!(!writer.put_raw(1u8));
        assert!(writer.allocate::<u8>().is_none());
        writer.patch(field, 99u32);
        assert_eq!(writer.size(), 4);

        let mut reader = ByteStreamReader::new(&buf[..4]);
        assert_eq!(reader.read_raw::<u32>().unwrap(), 99);
    }

    #[test]
    fn test_read_past_end() {
        let buf = [1u8, 2];
        let mut reader = ByteStreamReader::new(&buf);
        assert_eq!(reader.read_raw::<u16>().unwrap(), u16::from_ne_bytes([1, 2]));
        assert!(reader.read_raw::<u8>().is_err());
    }

    #[test]
    fn test_failed_write_leaves_cursor() {
        let mut buf = [0u8; 10];
        let mut writer = ByteStreamWriter::new(&mut buf);
        assert!(writer.put_raw(1u64));
        assert!(!writer.put_raw(2u64));
        assert_eq!(writer.size(), 8);
        assert_eq!(writer.space_left(), 2);
    }
}
