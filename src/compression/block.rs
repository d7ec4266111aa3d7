//! Data block encoder and decoder
//!
//! A data block packs one series' samples into a caller-supplied buffer:
//!
//! ```text
//! | offset | size | field                                   |
//! |--------|------|-----------------------------------------|
//! |  0     |  2   | version (u16)                           |
//! |  2     |  2   | main_size: compressed sample count (u16)|
//! |  4     |  2   | tail_size: raw sample count (u16)       |
//! |  6     |  8   | series_id (u64)                         |
//! | 14     | var  | main section: (timestamp batch,         |
//! |        |      | value batch) pairs of 16 samples each   |
//! | ...    | var  | tail section: tail_size raw (u64, f64)  |
//! ```
//!
//! The encoder buffers sixteen samples at a time and flushes them as one
//! compressed timestamp batch followed by one compressed value batch. Once
//! the buffer cannot hold another worst-case batch, remaining samples are
//! appended raw to the tail section. Both counts live in reserved header
//! fields patched at close time.
//!
//! # Example
//! ```
//! use skua_tsdb::compression::block::{DataBlockReader, DataBlockWriter};
//!
//! let mut buf = vec![0u8; 4096];
//! let mut writer = DataBlockWriter::new(42, &mut buf);
//! for i in 0..20u64 {
//!     writer.put(1000 + i, 0.5 * i as f64).unwrap();
//! }
//! let committed = writer.close().unwrap();
//!
//! let reader = DataBlockReader::new(&buf[..committed]).unwrap();
//! assert_eq!(reader.header().series_id, 42);
//! let samples = reader.read_all().unwrap();
//! assert_eq!(samples.len(), 20);
//! ```

use tracing::{debug, trace};

use crate::compression::byte_stream::{ByteStreamReader, ByteStreamWriter, WriteHandle};
use crate::compression::delta_rle::{DeltaRleReader, DeltaRleWriter, MAX_VARINT_LEN};
use crate::compression::fcm::{FcmStreamReader, FcmStreamWriter};
use crate::compression::CHUNK_SIZE;
use crate::error::{CompressionError, Result};
use crate::types::{Sample, SeriesId, Timestamp};

/// Version tag written into every block header
pub const BLOCK_VERSION: u16 = 2;

/// Oldest version this build still decodes
const BLOCK_VERSION_MIN: u16 = 2;

/// Fixed header size in bytes
pub const HEADER_SIZE: usize = 2 + 2 + 2 + 8;

const CHUNK_MASK: usize = CHUNK_SIZE - 1;

/// Worst-case value batch: eight pairs of one control byte plus two
/// full-width residuals
const FCM_BATCH_WORST: usize = (CHUNK_SIZE / 2) * (1 + 8 + 8);

/// Worst-case timestamp batch: sixteen runs of length one with ten-byte
/// deltas
const DELTA_RLE_BATCH_WORST: usize = CHUNK_SIZE * (MAX_VARINT_LEN + 1);

/// Free space required before another compressed chunk is attempted
///
/// Also an upper bound for the close-time scratch flush (15 raw pairs, 240
/// bytes).
pub const CHUNK_MARGIN: usize = FCM_BATCH_WORST + DELTA_RLE_BATCH_WORST;

/// Decoded block header fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Format version tag
    pub version: u16,
    /// Number of samples in the compressed main section
    pub main_size: u16,
    /// Number of raw samples in the tail section
    pub tail_size: u16,
    /// Series the block belongs to
    pub series_id: SeriesId,
}

impl BlockHeader {
    /// Total number of samples stored in the block
    pub fn count(&self) -> usize {
        usize::from(self.main_size) + usize::from(self.tail_size)
    }
}

fn read_header(stream: &mut ByteStreamReader) -> Result<BlockHeader> {
    let version = stream.read_raw::<u16>()?;
    if !(BLOCK_VERSION_MIN..=BLOCK_VERSION).contains(&version) {
        return Err(CompressionError::UnsupportedVersion {
            found: version,
            min: BLOCK_VERSION_MIN,
            max: BLOCK_VERSION,
        });
    }
    let main_size = stream.read_raw::<u16>()?;
    let tail_size = stream.read_raw::<u16>()?;
    let series_id = stream.read_raw::<u64>()?;
    if usize::from(main_size) % CHUNK_SIZE != 0 {
        return Err(CompressionError::CorruptedData(format!(
            "main section count {} is not a multiple of {}",
            main_size, CHUNK_SIZE
        )));
    }
    if usize::from(tail_size) >= CHUNK_SIZE {
        return Err(CompressionError::CorruptedData(format!(
            "tail count {} exceeds the chunk size",
            tail_size
        )));
    }
    Ok(BlockHeader {
        version,
        main_size,
        tail_size,
        series_id,
    })
}

/// Inspect a block header without decoding the body
///
/// # Errors
///
/// Fails like [`DataBlockReader::new`]: truncated header, unsupported
/// version, or inconsistent counts.
pub fn peek_header(buffer: &[u8]) -> Result<BlockHeader> {
    let mut stream = ByteStreamReader::new(buffer);
    read_header(&mut stream)
}

/// Block encoder
///
/// Owns the write cursor over the caller's buffer for the duration of the
/// encode session. Samples go through [`put`](DataBlockWriter::put);
/// [`close`](DataBlockWriter::close) patches the header counts and returns
/// the committed length.
pub struct DataBlockWriter<'a> {
    stream: ByteStreamWriter<'a>,
    ts_stream: DeltaRleWriter,
    val_stream: FcmStreamWriter,
    ts_scratch: [Timestamp; CHUNK_SIZE],
    val_scratch: [f64; CHUNK_SIZE],
    write_index: usize,
    main_size: u16,
    tail_size: u16,
    main_handle: WriteHandle<u16>,
    tail_handle: WriteHandle<u16>,
}

impl<'a> DataBlockWriter<'a> {
    /// Start an encode session for `series_id` over `buffer`
    ///
    /// Writes the version and series id immediately and reserves the count
    /// fields.
    ///
    /// # Panics
    ///
    /// Panics when the buffer cannot hold the fixed header; a buffer that
    /// small is a caller bug, not a recoverable overflow.
    pub fn new(series_id: SeriesId, buffer: &'a mut [u8]) -> Self {
        let mut stream = ByteStreamWriter::new(buffer);
        let version_ok = stream.put_raw(BLOCK_VERSION);
        let main_handle = stream.allocate::<u16>();
        let tail_handle = stream.allocate::<u16>();
        let series_ok = stream.put_raw(series_id);
        let (main_handle, tail_handle) = match (main_handle, tail_handle) {
            (Some(main), Some(tail)) if version_ok && series_ok => (main, tail),
            _ => panic!("buffer is too small for the block header"),
        };
        Self {
            stream,
            ts_stream: DeltaRleWriter::new(),
            val_stream: FcmStreamWriter::new(),
            ts_scratch: [0; CHUNK_SIZE],
            val_scratch: [0.0; CHUNK_SIZE],
            write_index: 0,
            main_size: 0,
            tail_size: 0,
            main_handle,
            tail_handle,
        }
    }

    /// True while the buffer can absorb one more worst-case chunk
    fn room_for_chunk(&self) -> bool {
        // the u16 counter caps the compressed region at 65520 samples
        if usize::from(self.main_size) + CHUNK_SIZE > usize::from(u16::MAX) {
            return false;
        }
        self.stream.space_left() >= CHUNK_MARGIN
    }

    /// Append one sample
    ///
    /// Samples accumulate in a sixteen-entry scratch; a full scratch flushes
    /// as one compressed timestamp batch followed by one value batch. When
    /// the buffer cannot absorb another worst-case batch, samples are
    /// appended raw to the tail section instead.
    ///
    /// # Errors
    ///
    /// - [`CompressionError::BufferOverflow`] when the tail write does not
    ///   fit or the tail section reached its fifteen-entry cap; the block
    ///   should be closed and a new one started.
    /// - [`CompressionError::InternalError`] when the raw fallback is
    ///   reached off a chunk boundary, which cannot happen through this API.
    ///
    /// # Panics
    ///
    /// Panics when a batch flush fails even though the free-space margin was
    /// checked; that means the margin constant no longer bounds the codecs.
    pub fn put(&mut self, timestamp: Timestamp, value: f64) -> Result<()> {
        if self.room_for_chunk() {
            let slot = self.write_index & CHUNK_MASK;
            self.ts_scratch[slot] = timestamp;
            self.val_scratch[slot] = value;
            self.write_index += 1;
            if self.write_index & CHUNK_MASK == 0 {
                let flushed = self.ts_stream.tput(&mut self.stream, &self.ts_scratch)
                    && self.val_stream.tput(&mut self.stream, &self.val_scratch);
                assert!(flushed, "chunk flush failed despite the free-space margin");
                self.main_size += CHUNK_SIZE as u16;
            }
            Ok(())
        } else {
            if self.write_index & CHUNK_MASK != 0 {
                return Err(CompressionError::InternalError(
                    "raw fallback reached with samples still buffered".to_string(),
                ));
            }
            if usize::from(self.tail_size) + 1 >= CHUNK_SIZE {
                return Err(CompressionError::BufferOverflow);
            }
            if self.tail_size == 0 {
                debug!(
                    space_left = self.stream.space_left(),
                    "block nearly full, switching to raw tail appends"
                );
            }
            if self.stream.put_raw(timestamp) && self.stream.put_raw(value) {
                self.tail_size += 1;
                Ok(())
            } else {
                Err(CompressionError::BufferOverflow)
            }
        }
    }

    /// Bytes occupied so far, header included
    pub fn size(&self) -> usize {
        self.stream.size()
    }

    /// Finish the block and return the committed byte length
    ///
    /// Samples still sitting in the scratch are appended raw to the tail
    /// section (the chunk margin guarantees they fit), then the reserved
    /// count fields are patched and the stream is committed.
    ///
    /// # Errors
    ///
    /// Returns [`CompressionError::BufferOverflow`] when a scratch flush
    /// write fails; with an intact margin this is unreachable.
    pub fn close(mut self) -> Result<usize> {
        let pending = self.write_index & CHUNK_MASK;
        for slot in 0..pending {
            let (timestamp, value) = (self.ts_scratch[slot], self.val_scratch[slot]);
            if !(self.stream.put_raw(timestamp) && self.stream.put_raw(value)) {
                return Err(CompressionError::BufferOverflow);
            }
            self.tail_size += 1;
        }
        self.stream.patch(self.main_handle, self.main_size);
        self.stream.patch(self.tail_handle, self.tail_size);
        self.stream.commit();
        trace!(
            main = self.main_size,
            tail = self.tail_size,
            bytes = self.stream.size(),
            "closed data block"
        );
        Ok(self.stream.size())
    }
}

/// Block decoder
///
/// Validates the header on construction; the body is decoded by a single
/// [`read_into`](DataBlockReader::read_into) or
/// [`read_all`](DataBlockReader::read_all) call.
pub struct DataBlockReader<'a> {
    stream: ByteStreamReader<'a>,
    header: BlockHeader,
}

impl<'a> DataBlockReader<'a> {
    /// Open a block for decoding
    ///
    /// # Errors
    ///
    /// - [`CompressionError::UnsupportedVersion`] for a version outside the
    ///   supported range
    /// - [`CompressionError::CorruptedData`] for a truncated header or
    ///   inconsistent counts
    pub fn new(buffer: &'a [u8]) -> Result<Self> {
        let mut stream = ByteStreamReader::new(buffer);
        let header = read_header(&mut stream)?;
        Ok(Self { stream, header })
    }

    /// Header fields read at construction
    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    /// Decode the whole block into `dest`, returning the sample count
    ///
    /// The `i`-th decoded sample equals the `i`-th encoded sample exactly,
    /// timestamps and value bit patterns included.
    ///
    /// # Errors
    ///
    /// - [`CompressionError::BadArgument`] when `dest` is smaller than the
    ///   declared sample count
    /// - [`CompressionError::CorruptedData`] when the body is truncated or
    ///   malformed; no partial result is surfaced
    pub fn read_into(mut self, dest: &mut [Sample]) -> Result<usize> {
        let total = self.header.count();
        if dest.len() < total {
            return Err(CompressionError::BadArgument(format!(
                "destination holds {} samples, block declares {}",
                dest.len(),
                total
            )));
        }

        let mut ts_stream = DeltaRleReader::new();
        let mut val_stream = FcmStreamReader::new();
        let nbatches = usize::from(self.header.main_size) / CHUNK_SIZE;
        let mut ts_batch = [0u64; CHUNK_SIZE];
        let mut ix = 0;
        for _ in 0..nbatches {
            for slot in ts_batch.iter_mut() {
                *slot = ts_stream.next(&mut self.stream)?;
            }
            for &timestamp in &ts_batch {
                let value = val_stream.next(&mut self.stream)?;
                dest[ix] = Sample::new(timestamp, value);
                ix += 1;
            }
        }
        for _ in 0..self.header.tail_size {
            let timestamp = self.stream.read_raw::<u64>()?;
            let value = self.stream.read_raw::<f64>()?;
            dest[ix] = Sample::new(timestamp, value);
            ix += 1;
        }
        Ok(total)
    }

    /// Decode the whole block into a freshly allocated vector
    ///
    /// # Errors
    ///
    /// Same failure modes as [`read_into`](DataBlockReader::read_into).
    pub fn read_all(self) -> Result<Vec<Sample>> {
        let mut samples = vec![Sample::new(0, 0.0); self.header.count()];
        self.read_into(&mut samples)?;
        Ok(samples)
    }
}
