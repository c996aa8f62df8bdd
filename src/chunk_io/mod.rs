//! The RTMP chunk layer: header codecs, per-chunk-stream message assembly,
//! and the stateful reader/writer pair that move whole messages across a
//! byte stream.

mod assembler;
mod chunk_header;
mod errors;
mod reader;
mod writer;

pub use self::chunk_header::{
    ChunkHeaderFormat, DEFAULT_CHUNK_SIZE, EXTENDED_TIMESTAMP_THRESHOLD, MAX_CHUNK_SIZE,
    MAX_CHUNK_STREAM_ID,
};
pub use self::errors::{ChunkReadError, ChunkWriteError};
pub use self::reader::ChunkReader;
pub use self::writer::ChunkWriter;
