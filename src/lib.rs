//! Skua TSDB - block compression core for a time-series storage engine
//!
//! This crate encodes and decodes the fixed-layout data blocks the engine
//! stores on disk: a series identifier, a column of 64-bit timestamps and a
//! column of IEEE 754 doubles packed into one caller-supplied byte buffer.
//!
//! - Predictive XOR compression for doubles (FCM-family predictors, paired
//!   control nibbles, 1-8 payload bytes per sample)
//! - Delta plus run-length compression for timestamps
//! - Interleaved batches with a raw tail fallback when the buffer runs low
//! - Exact round trips: NaN payloads, signed zeros and denormals survive
//!   bit-for-bit
//!
//! # Example
//!
//! ```rust
//! use skua_tsdb::{DataBlockReader, DataBlockWriter};
//!
//! let mut buf = vec![0u8; 4096];
//! let mut writer = DataBlockWriter::new(1, &mut buf);
//! writer.put(1000, 45.2).unwrap();
//! writer.put(1010, 45.3).unwrap();
//! let committed = writer.close().unwrap();
//!
//! let samples = DataBlockReader::new(&buf[..committed])
//!     .unwrap()
//!     .read_all()
//!     .unwrap();
//! assert_eq!(samples.len(), 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compression;
pub mod error;
pub mod types;

// Re-export main types
pub use compression::{BlockHeader, DataBlockReader, DataBlockWriter, BLOCK_VERSION, CHUNK_SIZE};
pub use error::{CompressionError, Result};
pub use types::{Sample, SeriesId, Timestamp, UncompressedChunk};
