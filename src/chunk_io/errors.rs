use std::io;
use thiserror::Error;

/// An enumeration defining all the possible errors that could occur while
/// reading RTMP chunks off the wire. Every variant is fatal for the
/// connection; reconnecting is the caller's job.
#[derive(Debug, Error)]
pub enum ChunkReadError {
    /// The underlying stream failed while reading a chunk's basic header.
    #[error("failed to read chunk basic header: {source}")]
    BasicHeader { source: io::Error },

    /// The underlying stream failed while reading a chunk's message header
    /// (including its extended timestamp, when present).
    #[error("failed to read chunk message header: {source}")]
    MessageHeader { source: io::Error },

    /// The underlying stream failed while reading a chunk's payload bytes.
    #[error("failed to read chunk payload: {source}")]
    Payload { source: io::Error },

    /// Non-format-0 chunks reconstruct their header from the previous one
    /// on the same chunk stream. This error occurs when a format 1, 2 or 3
    /// chunk arrives on a stream that has never completed a full header.
    #[error(
        "received chunk with non-zero format on csid {csid} prior to receiving a format 0 chunk"
    )]
    NoPreviousChunkOnStream { csid: u32 },

    /// A chunk size outside 1..=16777215 was requested for the read side.
    #[error("chunk size {size} is outside the allowed range 1..=16777215")]
    InvalidChunkSize { size: u32 },
}

/// An enumeration defining all the possible errors that could occur while
/// serializing messages into RTMP chunks.
#[derive(Debug, Error)]
pub enum ChunkWriteError {
    /// A message payload cannot exceed 16,777,215 bytes no matter how many
    /// chunks it is split across, since the length field is 24 bits.
    #[error("message is {size} bytes, the maximum a chunked message can carry is 16777215")]
    MessageTooLong { size: usize },

    /// A chunk size outside 1..=16777215 was requested for the write side.
    #[error("chunk size {size} is outside the allowed range 1..=16777215")]
    InvalidChunkSize { size: u32 },

    /// The underlying stream failed while writing a chunk's basic header.
    #[error("failed to write chunk basic header: {source}")]
    BasicHeader { source: io::Error },

    /// The underlying stream failed while writing a chunk's message header.
    #[error("failed to write chunk message header: {source}")]
    MessageHeader { source: io::Error },

    /// The underlying stream failed while writing a chunk's payload bytes.
    #[error("failed to write chunk payload: {source}")]
    Payload { source: io::Error },

    /// The underlying stream failed while flushing buffered chunk output.
    #[error("failed to flush chunk output: {source}")]
    Flush { source: io::Error },
}
