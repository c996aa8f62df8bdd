use std::io;
use thiserror::Error;

use crate::chunk_io::{ChunkReadError, ChunkWriteError};
use crate::handshake::HandshakeError;
use crate::messages::ControlMessageError;

/// An enumeration defining all the possible errors that could occur on an
/// RTMP transport. Everything is fatal for the connection except the two
/// configuration variants, which are returned synchronously and leave the
/// connection usable.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The three-packet handshake failed or the peer spoke the wrong
    /// protocol version.
    #[error("{0}")]
    Handshake(#[from] HandshakeError),

    /// Reading chunks off the wire failed.
    #[error("{0}")]
    ChunkRead(#[from] ChunkReadError),

    /// Writing chunks to the wire failed.
    #[error("{0}")]
    ChunkWrite(#[from] ChunkWriteError),

    /// The peer sent a protocol control message with an invalid payload.
    #[error("malformed protocol control message: {0}")]
    MalformedControl(#[from] ControlMessageError),

    /// The caller asked for a chunk size outside 1..=16777215. The
    /// connection is untouched.
    #[error("chunk size {size} is outside the allowed range 1..=16777215")]
    ChunkSizeOutOfRange { size: u32 },

    /// The caller tried to send a state-coupled protocol control message
    /// through the generic write path. Use the dedicated setter instead;
    /// nothing was written and the connection is untouched.
    #[error(
        "message type {type_id} changes transport state and must be sent through its dedicated setter"
    )]
    ReservedControlMessage { type_id: u8 },

    /// The underlying stream failed outside the chunk codec, e.g. during
    /// the final flush on close.
    #[error("{0}")]
    Io(#[from] io::Error),
}
