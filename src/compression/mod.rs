//! Compression core for data blocks and legacy chunks
//!
//! This module implements the dual-stream numeric codec the storage engine
//! stores its samples with:
//!
//! - **byte_stream**: bounded typed cursors over caller-supplied buffers
//! - **predictor**: FCM and DFCM next-value predictors
//! - **fcm**: predictive XOR codec for the double column
//! - **delta_rle**: delta plus run-length codec for the timestamp column
//! - **block**: the interleaved block format tying both codecs together
//! - **chunk**: the legacy three-column chunk format and reorder helpers

pub mod block;
pub mod byte_stream;
pub mod chunk;
pub mod delta_rle;
pub mod fcm;
pub mod predictor;

pub use block::{peek_header, BlockHeader, DataBlockReader, DataBlockWriter, BLOCK_VERSION};
pub use chunk::{
    convert_from_chunk_order, convert_from_time_order, decode_chunk, encode_chunk, ChunkSummary,
};

/// Number of samples flushed together through the compressed path
///
/// The main section of a block always holds a multiple of this many
/// samples; the raw tail holds fewer.
pub const CHUNK_SIZE: usize = 16;
