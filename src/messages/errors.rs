use thiserror::Error;

/// An enumeration defining all the possible errors that could occur while
/// decoding a protocol control message payload. A peer that sends one of
/// these is violating the protocol, so every variant is fatal for the
/// connection.
#[derive(Debug, Error)]
pub enum ControlMessageError {
    /// The payload did not have the exact length the control message type
    /// requires.
    #[error("invalid {name} message length: expected {expected} bytes, got {actual}")]
    InvalidPayloadLength {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The payload was shorter than the minimum the control message type
    /// requires.
    #[error("invalid {name} message length: expected at least {minimum} bytes, got {actual}")]
    PayloadTooShort {
        name: &'static str,
        minimum: usize,
        actual: usize,
    },

    /// A SetChunkSize payload carried a size outside 1..=16777215 after the
    /// most significant bit was masked off.
    #[error("peer requested chunk size {size}, allowed range is 1..=16777215")]
    InvalidChunkSize { size: u32 },

    /// A SetPeerBandwidth payload carried an unknown limit type byte.
    #[error("unknown peer bandwidth limit type {value}")]
    UnknownBandwidthLimitType { value: u8 },
}
