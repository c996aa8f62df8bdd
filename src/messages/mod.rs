//! Message-level types: the [`Message`] unit the transport exchanges, its
//! header, the message-type and chunk-stream-id vocabularies, and the codecs
//! for protocol control payloads.

mod errors;
pub mod types;

pub use self::errors::ControlMessageError;

use crate::buffers::Payload;
use crate::time::RtmpTimestamp;

/// RTMP message type ids.
pub mod message_type {
    pub const SET_CHUNK_SIZE: u8 = 1;
    pub const ABORT: u8 = 2;
    pub const ACKNOWLEDGEMENT: u8 = 3;
    pub const USER_CONTROL: u8 = 4;
    pub const WINDOW_ACK_SIZE: u8 = 5;
    pub const SET_PEER_BANDWIDTH: u8 = 6;
    pub const AUDIO: u8 = 8;
    pub const VIDEO: u8 = 9;
    pub const AMF3_DATA: u8 = 15;
    pub const AMF3_SHARED_OBJECT: u8 = 16;
    pub const AMF3_COMMAND: u8 = 17;
    pub const AMF0_DATA: u8 = 18;
    pub const AMF0_SHARED_OBJECT: u8 = 19;
    pub const AMF0_COMMAND: u8 = 20;
    pub const AGGREGATE: u8 = 22;
}

/// Conventional chunk stream ids. Any csid in 2..=65599 is legal on the
/// wire; these are the channels this implementation spreads messages across.
pub mod chunk_stream {
    pub const PROTOCOL_CONTROL: u32 = 2;
    pub const COMMAND: u32 = 3;
    pub const AUDIO: u32 = 4;
    pub const VIDEO: u32 = 5;
    pub const DATA: u32 = 6;
}

/// Advisory window acknowledgement size upper layers usually announce after
/// `connect`.
pub const DEFAULT_WINDOW_ACK_SIZE: u32 = 2_500_000;

/// Advisory peer bandwidth upper layers usually announce after `connect`.
pub const DEFAULT_PEER_BANDWIDTH: u32 = 2_500_000;

/// How strictly a SetPeerBandwidth message asks the peer to limit its output
/// bandwidth.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PeerBandwidthLimitType {
    Hard,
    Soft,
    Dynamic,
}

impl PeerBandwidthLimitType {
    pub fn from_raw(value: u8) -> Option<PeerBandwidthLimitType> {
        match value {
            0 => Some(PeerBandwidthLimitType::Hard),
            1 => Some(PeerBandwidthLimitType::Soft),
            2 => Some(PeerBandwidthLimitType::Dynamic),
            _ => None,
        }
    }

    pub fn raw(self) -> u8 {
        match self {
            PeerBandwidthLimitType::Hard => 0,
            PeerBandwidthLimitType::Soft => 1,
            PeerBandwidthLimitType::Dynamic => 2,
        }
    }
}

/// Events carried inside UserControl messages.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UserControlEventType {
    StreamBegin,
    StreamEof,
    StreamDry,
    SetBufferLength,
    StreamIsRecorded,
    PingRequest,
    PingResponse,
}

impl UserControlEventType {
    pub fn from_raw(value: u16) -> Option<UserControlEventType> {
        match value {
            0 => Some(UserControlEventType::StreamBegin),
            1 => Some(UserControlEventType::StreamEof),
            2 => Some(UserControlEventType::StreamDry),
            3 => Some(UserControlEventType::SetBufferLength),
            4 => Some(UserControlEventType::StreamIsRecorded),
            6 => Some(UserControlEventType::PingRequest),
            7 => Some(UserControlEventType::PingResponse),
            _ => None,
        }
    }

    pub fn raw(self) -> u16 {
        match self {
            UserControlEventType::StreamBegin => 0,
            UserControlEventType::StreamEof => 1,
            UserControlEventType::StreamDry => 2,
            UserControlEventType::SetBufferLength => 3,
            UserControlEventType::StreamIsRecorded => 4,
            UserControlEventType::PingRequest => 6,
            UserControlEventType::PingResponse => 7,
        }
    }
}

/// The header carried (in whole or elided form) by every chunk of a message.
///
/// `timestamp` is absolute and monotonic within a message stream.
/// `timestamp_delta` is what a format-3 chunk starting a new message would
/// reuse: a format-0 header seeds it with the absolute timestamp, formats 1
/// and 2 with their delta. `has_extended_timestamp` records whether the
/// header's 24-bit time field saturated, and propagates to format-3
/// continuation chunks of the same message.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MessageHeader {
    pub timestamp: RtmpTimestamp,
    pub timestamp_delta: u32,
    pub message_length: u32,
    pub message_type_id: u8,
    pub message_stream_id: u32,
    pub has_extended_timestamp: bool,
}

impl MessageHeader {
    /// A header for a fresh outbound message. Length is filled in when the
    /// header is paired with a payload.
    pub fn new(message_stream_id: u32, timestamp: RtmpTimestamp, message_type_id: u8) -> MessageHeader {
        MessageHeader {
            timestamp,
            timestamp_delta: 0,
            message_length: 0,
            message_type_id,
            message_stream_id,
            has_extended_timestamp: false,
        }
    }
}

/// A complete RTMP message: a header plus a reference-counted payload.
///
/// Cloning a message aliases the payload (a refcount bump, no copy); the
/// payload's storage returns to its pool when the last clone drops.
#[derive(Clone, Debug)]
pub struct Message {
    pub header: MessageHeader,
    payload: Payload,
}

impl Message {
    /// Pairs a header with a payload. The header's `message_length` is
    /// overwritten with the payload length so the two can never disagree.
    pub fn new(mut header: MessageHeader, payload: Payload) -> Message {
        header.message_length = payload.len() as u32;
        Message { header, payload }
    }

    /// The payload bytes.
    pub fn data(&self) -> &[u8] {
        &self.payload
    }

    /// The shared payload.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn type_id(&self) -> u8 {
        self.header.message_type_id
    }

    pub fn stream_id(&self) -> u32 {
        self.header.message_stream_id
    }

    pub fn timestamp(&self) -> RtmpTimestamp {
        self.header.timestamp
    }

    /// A copy of this message addressed to a different message stream,
    /// aliasing the same payload. This is the zero-copy fan-out primitive:
    /// one publisher's message is shared into each subscriber's stream id.
    pub fn share(&self, message_stream_id: u32) -> Message {
        let mut header = self.header;
        header.message_stream_id = message_stream_id;

        Message {
            header,
            payload: self.payload.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_length_always_matches_the_payload() {
        let mut header = MessageHeader::new(5, RtmpTimestamp::new(100), message_type::VIDEO);
        header.message_length = 9999;

        let message = Message::new(header, Payload::from_vec(vec![1, 2, 3]));

        assert_eq!(message.header.message_length, 3, "Incorrect message length");
        assert_eq!(message.data(), &[1, 2, 3], "Incorrect payload bytes");
    }

    #[test]
    fn share_changes_the_stream_id_and_aliases_the_payload() {
        let header = MessageHeader::new(1, RtmpTimestamp::new(500), message_type::AUDIO);
        let message = Message::new(header, Payload::from_vec(vec![10, 20, 30]));

        let shared = message.share(42);

        assert_eq!(shared.stream_id(), 42, "Incorrect shared stream id");
        assert_eq!(shared.timestamp(), RtmpTimestamp::new(500), "Timestamp changed");
        assert_eq!(shared.type_id(), message_type::AUDIO, "Type id changed");
        assert_eq!(shared.data(), message.data(), "Payloads differ");
        assert_eq!(
            shared.data().as_ptr(),
            message.data().as_ptr(),
            "Share copied the payload instead of aliasing it"
        );
    }

    #[test]
    fn limit_types_round_trip_through_their_wire_value() {
        for limit_type in [
            PeerBandwidthLimitType::Hard,
            PeerBandwidthLimitType::Soft,
            PeerBandwidthLimitType::Dynamic,
        ] {
            assert_eq!(
                PeerBandwidthLimitType::from_raw(limit_type.raw()),
                Some(limit_type),
                "Limit type did not round trip"
            );
        }

        assert_eq!(PeerBandwidthLimitType::from_raw(3), None);
    }

    #[test]
    fn user_control_events_round_trip_through_their_wire_value() {
        for event in [
            UserControlEventType::StreamBegin,
            UserControlEventType::StreamEof,
            UserControlEventType::StreamDry,
            UserControlEventType::SetBufferLength,
            UserControlEventType::StreamIsRecorded,
            UserControlEventType::PingRequest,
            UserControlEventType::PingResponse,
        ] {
            assert_eq!(
                UserControlEventType::from_raw(event.raw()),
                Some(event),
                "Event type did not round trip"
            );
        }

        assert_eq!(UserControlEventType::from_raw(5), None);
    }
}
