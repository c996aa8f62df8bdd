//! Core RTMP transport engine.
//!
//! This crate implements the stateful framing layer of RTMP 1.0: the
//! version-3 handshake, the chunk protocol (basic headers, the four
//! message-header formats, extended timestamps), per-chunk-stream message
//! assembly, message fragmentation bounded by the negotiated chunk size,
//! transparent protocol-control handling, and window-acknowledgement flow
//! control. Payloads live in reference-counted pooled buffers so a received
//! message can be fanned out to many subscribers without copying.
//!
//! The command vocabulary (`connect`, `publish`, `play`, ...) and AMF
//! encoding sit above this crate; they exchange [`Message`] values through a
//! [`Transport`].

#[cfg(test)]
mod test_utils;

pub mod buffers;
pub mod chunk_io;
pub mod handshake;
pub mod messages;
pub mod metered;
pub mod time;
pub mod transport;

pub use self::buffers::{BufferPool, Payload, PooledBuffer};
pub use self::messages::{Message, MessageHeader, PeerBandwidthLimitType, UserControlEventType};
pub use self::transport::{Transport, TransportError};
