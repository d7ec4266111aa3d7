//! Legacy three-column chunk codec and reorder helpers
//!
//! The chunk format predates the interleaved block layout. It encodes three
//! parallel columns independently, each behind its own prefix:
//!
//! ```text
//! | size | field                                  |
//! |------|----------------------------------------|
//! |  4   | paramid stream byte length (u32)       |
//! | var  | paramid stream body (delta-RLE)        |
//! |  4   | timestamp stream byte length (u32)     |
//! | var  | timestamp stream body (delta-RLE)      |
//! |  4   | ncolumns (u32, currently 1)            |
//! |  4   | value stream element count (u32)       |
//! | var  | value stream body (predictive XOR)     |
//! ```
//!
//! The element count is framing the caller carries separately, so decoding
//! takes it as an argument and validates the byte-length prefixes against
//! the bytes actually consumed.

use crate::compression::byte_stream::{ByteStreamReader, ByteStreamWriter};
use crate::compression::delta_rle::{DeltaRleReader, DeltaRleWriter};
use crate::compression::fcm::{compress_doubles, decompress_doubles};
use crate::error::{CompressionError, Result};
use crate::types::{Timestamp, UncompressedChunk};

/// Summary returned by a successful chunk encode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSummary {
    /// Number of rows written
    pub n_elements: u32,
    /// Smallest timestamp in the chunk (`u64::MAX` when empty)
    pub ts_begin: Timestamp,
    /// Largest timestamp in the chunk (zero when empty)
    pub ts_end: Timestamp,
}

fn encode_delta_stream(stream: &mut ByteStreamWriter, column: &[u64]) -> Result<()> {
    let prefix = stream
        .allocate::<u32>()
        .ok_or(CompressionError::BufferOverflow)?;
    let body_start = stream.size();
    let mut writer = DeltaRleWriter::new();
    for &value in column {
        if !writer.put(stream, value) {
            return Err(CompressionError::BufferOverflow);
        }
    }
    if !writer.commit(stream) {
        return Err(CompressionError::BufferOverflow);
    }
    stream.patch(prefix, (stream.size() - body_start) as u32);
    Ok(())
}

fn decode_delta_stream(stream: &mut ByteStreamReader, count: usize) -> Result<Vec<u64>> {
    let declared = stream.read_raw::<u32>()? as usize;
    let body_start = stream.pos();
    let mut reader = DeltaRleReader::new();
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(reader.next(stream)?);
    }
    let consumed = stream.pos() - body_start;
    if consumed != declared {
        return Err(CompressionError::CorruptedData(format!(
            "sub-stream length prefix {} does not match {} bytes consumed",
            declared, consumed
        )));
    }
    Ok(out)
}

/// Encode a chunk into the stream and report its timestamp range
///
/// # Errors
///
/// - [`CompressionError::BadArgument`] when the columns differ in length
/// - [`CompressionError::BufferOverflow`] when the output buffer fills up;
///   the stream position is final and the caller discards the partial chunk
pub fn encode_chunk(
    data: &UncompressedChunk,
    stream: &mut ByteStreamWriter,
) -> Result<ChunkSummary> {
    if !data.columns_aligned() {
        return Err(CompressionError::BadArgument(
            "chunk columns differ in length".to_string(),
        ));
    }

    encode_delta_stream(stream, &data.paramids)?;

    let mut ts_begin = Timestamp::MAX;
    let mut ts_end = Timestamp::MIN;
    let prefix = stream
        .allocate::<u32>()
        .ok_or(CompressionError::BufferOverflow)?;
    let body_start = stream.size();
    let mut ts_writer = DeltaRleWriter::new();
    for &ts in &data.timestamps {
        ts_begin = ts_begin.min(ts);
        ts_end = ts_end.max(ts);
        if !ts_writer.put(stream, ts) {
            return Err(CompressionError::BufferOverflow);
        }
    }
    if !ts_writer.commit(stream) {
        return Err(CompressionError::BufferOverflow);
    }
    stream.patch(prefix, (stream.size() - body_start) as u32);

    // single value column for now; the field leaves room for more
    if !stream.put_raw(1u32) {
        return Err(CompressionError::BufferOverflow);
    }

    let count_field = stream
        .allocate::<u32>()
        .ok_or(CompressionError::BufferOverflow)?;
    let count = compress_doubles(&data.values, stream)?;
    stream.patch(count_field, count);

    Ok(ChunkSummary {
        n_elements: data.len() as u32,
        ts_begin,
        ts_end,
    })
}

/// Decode a chunk of `n_elements` rows from the stream
///
/// # Errors
///
/// Returns [`CompressionError::CorruptedData`] when a length prefix or
/// element count disagrees with the bytes available; no partial result is
/// surfaced.
pub fn decode_chunk(stream: &mut ByteStreamReader, n_elements: u32) -> Result<UncompressedChunk> {
    let count = n_elements as usize;
    let paramids = decode_delta_stream(stream, count)?;
    let timestamps = decode_delta_stream(stream, count)?;

    let _ncolumns = stream.read_raw::<u32>()?;

    let nvalues = stream.read_raw::<u32>()?;
    if nvalues != n_elements {
        return Err(CompressionError::CorruptedData(format!(
            "value stream holds {} elements, chunk declares {}",
            nvalues, n_elements
        )));
    }
    let mut values = Vec::new();
    decompress_doubles(stream, count, &mut values)?;

    Ok(UncompressedChunk {
        paramids,
        timestamps,
        values,
    })
}

fn reorder_chunk<K, F>(header: &UncompressedChunk, key: F) -> Result<UncompressedChunk>
where
    K: Ord,
    F: Fn(usize) -> K,
{
    if !header.columns_aligned() {
        return Err(CompressionError::BadArgument(
            "chunk columns differ in length".to_string(),
        ));
    }
    let mut index: Vec<usize> = (0..header.len()).collect();
    // stable: rows with equal keys keep their input order
    index.sort_by_key(|&ix| key(ix));

    let mut out = UncompressedChunk {
        paramids: Vec::with_capacity(index.len()),
        timestamps: Vec::with_capacity(index.len()),
        values: Vec::with_capacity(index.len()),
    };
    for ix in index {
        out.paramids.push(header.paramids[ix]);
        out.timestamps.push(header.timestamps[ix]);
        out.values.push(header.values[ix]);
    }
    Ok(out)
}

/// Reorder a chunk from series order into time order
///
/// Rows are stably sorted by timestamp, so rows with equal timestamps keep
/// the per-series append order.
///
/// # Errors
///
/// Returns [`CompressionError::BadArgument`] when the columns differ in
/// length.
pub fn convert_from_chunk_order(header: &UncompressedChunk) -> Result<UncompressedChunk> {
    reorder_chunk(header, |ix| header.timestamps[ix])
}

/// Reorder a chunk from time order into series order
///
/// Rows are stably sorted by parameter id, preserving time order within each
/// series.
///
/// # Errors
///
/// Returns [`CompressionError::BadArgument`] when the columns differ in
/// length.
pub fn convert_from_time_order(header: &UncompressedChunk) -> Result<UncompressedChunk> {
    reorder_chunk(header, |ix| header.paramids[ix])
}
