//! The transport orchestrator: glues the chunk reader and writer to one
//! stream, reacts to protocol control messages, answers pings, and emits
//! window acknowledgements.

mod errors;

pub use self::errors::TransportError;

use std::io::{Read, Write};

use log::{debug, trace, warn};

use crate::buffers::Payload;
use crate::chunk_io::{ChunkReader, ChunkWriter, ChunkWriteError, MAX_CHUNK_SIZE};
use crate::handshake;
use crate::messages::{
    message_type, types, ControlMessageError, Message, MessageHeader, PeerBandwidthLimitType,
    UserControlEventType,
};
use crate::metered::MeteredStream;
use crate::time::RtmpTimestamp;

/// A bidirectional RTMP connection after the handshake.
///
/// One `Transport` owns one connection's stream and all of its chunk state.
/// [`read_message`](Transport::read_message) transparently reacts to
/// protocol control traffic before yielding each message;
/// [`write_message`](Transport::write_message) fragments, writes and
/// flushes. The transport is a single-threaded actor: fan-out across
/// connections happens above it by [`Message::share`].
pub struct Transport<S>
where
    S: Read + Write,
{
    io: MeteredStream<S>,
    reader: ChunkReader,
    writer: ChunkWriter,
    window_ack_size: u32,
    last_ack_sent: u64,
    peer_bandwidth: Option<(u32, PeerBandwidthLimitType)>,
}

impl<S> Transport<S>
where
    S: Read + Write,
{
    /// Performs the server side of the handshake on the raw stream and
    /// wraps it in a transport.
    pub fn accept(mut stream: S) -> Result<Transport<S>, TransportError> {
        handshake::perform_server(&mut stream)?;
        Ok(Transport::new(stream))
    }

    /// Performs the client side of the handshake on the raw stream and
    /// wraps it in a transport.
    pub fn dial(mut stream: S) -> Result<Transport<S>, TransportError> {
        handshake::perform_client(&mut stream)?;
        Ok(Transport::new(stream))
    }

    /// Wraps a stream that has already completed its handshake.
    pub fn new(stream: S) -> Transport<S> {
        Transport {
            io: MeteredStream::new(stream),
            reader: ChunkReader::new(),
            writer: ChunkWriter::new(),
            window_ack_size: 0,
            last_ack_sent: 0,
            peer_bandwidth: None,
        }
    }

    /// Total bytes consumed from the peer so far.
    pub fn bytes_read(&self) -> u64 {
        self.io.bytes_read()
    }

    /// Total bytes queued for the peer so far.
    pub fn bytes_written(&self) -> u64 {
        self.io.bytes_written()
    }

    /// The acknowledgement window most recently announced by the peer.
    /// Zero means acknowledgements are disabled.
    pub fn window_ack_size(&self) -> u32 {
        self.window_ack_size
    }

    /// The bandwidth limit most recently announced by the peer, if any.
    pub fn peer_bandwidth(&self) -> Option<(u32, PeerBandwidthLimitType)> {
        self.peer_bandwidth
    }

    /// Blocks until the next complete message arrives and returns it.
    ///
    /// Protocol control messages are acted on first — chunk-size updates
    /// applied, aborts executed, pings answered, acknowledgement windows
    /// honored — and then still handed to the caller, in wire order.
    pub fn read_message(&mut self) -> Result<Message, TransportError> {
        let message = self.reader.read_message(&mut self.io)?;

        if let Err(error) = self.handle_protocol_control(&message) {
            warn!("protocol control handling failed: {error}");
            return Err(error);
        }

        self.handle_ack_window()?;

        Ok(message)
    }

    /// Fragments a message into chunks, writes them and flushes.
    ///
    /// The state-coupled control messages (SetChunkSize, Acknowledgement,
    /// WindowAckSize, SetPeerBandwidth) are rejected here: sending them
    /// without the matching local state change desyncs the connection, so
    /// they only travel through the dedicated setters.
    pub fn write_message(&mut self, message: &Message) -> Result<(), TransportError> {
        match message.type_id() {
            message_type::SET_CHUNK_SIZE
            | message_type::ACKNOWLEDGEMENT
            | message_type::WINDOW_ACK_SIZE
            | message_type::SET_PEER_BANDWIDTH => Err(TransportError::ReservedControlMessage {
                type_id: message.type_id(),
            }),

            _ => self.send(message),
        }
    }

    /// Announces a new outbound chunk size and applies it locally once the
    /// message is on the wire, so the peer sees the old size delimiting the
    /// SetChunkSize itself.
    pub fn set_out_chunk_size(&mut self, size: u32) -> Result<(), TransportError> {
        if size < 1 || size > MAX_CHUNK_SIZE {
            return Err(TransportError::ChunkSizeOutOfRange { size });
        }

        let message = control_message(
            message_type::SET_CHUNK_SIZE,
            types::set_chunk_size::serialize(size),
        );
        self.send(&message)?;

        self.writer.set_chunk_size(size)?;
        debug!("outgoing chunk size set to {size}");
        Ok(())
    }

    /// Announces the window size the peer should acknowledge against. Pure
    /// send; our own acknowledgement emission follows the peer's window.
    pub fn set_window_ack_size(&mut self, size: u32) -> Result<(), TransportError> {
        let message = control_message(
            message_type::WINDOW_ACK_SIZE,
            types::window_acknowledgement_size::serialize(size),
        );
        self.send(&message)
    }

    /// Announces a bandwidth limit to the peer. Pure send.
    pub fn set_peer_bandwidth(
        &mut self,
        size: u32,
        limit_type: PeerBandwidthLimitType,
    ) -> Result<(), TransportError> {
        let message = control_message(
            message_type::SET_PEER_BANDWIDTH,
            types::set_peer_bandwidth::serialize(size, limit_type),
        );
        self.send(&message)
    }

    /// Flushes buffered output and drops the stream, closing the
    /// connection. In-flight operations on the peer side fail with I/O
    /// errors once the stream is gone.
    pub fn close(mut self) -> Result<(), TransportError> {
        self.io.flush()?;
        Ok(())
    }

    fn send(&mut self, message: &Message) -> Result<(), TransportError> {
        self.writer.write_message(&mut self.io, message)?;
        self.io
            .flush()
            .map_err(|source| ChunkWriteError::Flush { source })?;
        Ok(())
    }

    fn handle_protocol_control(&mut self, message: &Message) -> Result<(), TransportError> {
        match message.type_id() {
            message_type::SET_CHUNK_SIZE => {
                let size = types::set_chunk_size::deserialize(message.data())?;
                self.reader.set_chunk_size(size)?;
                debug!("incoming chunk size set to {size}");
            }

            message_type::ABORT => {
                let csid = types::abort::deserialize(message.data())?;
                self.reader.abort_chunk_stream(csid);
                debug!("aborted partial message on csid {csid}");
            }

            message_type::ACKNOWLEDGEMENT => {
                // Accepted and ignored; reserved for send-side flow control.
                let _ = types::acknowledgement::deserialize(message.data())?;
            }

            message_type::USER_CONTROL => {
                let (event_type, event_data) = types::user_control::deserialize(message.data())?;
                if UserControlEventType::from_raw(event_type)
                    == Some(UserControlEventType::PingRequest)
                {
                    self.answer_ping(event_data)?;
                }
                // Every other event (StreamBegin, StreamEOF, ...) is the
                // upper layer's business; the message is yielded untouched.
            }

            message_type::WINDOW_ACK_SIZE => {
                let size = types::window_acknowledgement_size::deserialize(message.data())?;
                if self.window_ack_size != size {
                    // Re-baseline so prior reads do not retroactively emit
                    // acknowledgements against the new window.
                    self.last_ack_sent = self.io.bytes_read();
                }
                self.window_ack_size = size;
                debug!("peer window acknowledgement size set to {size}");
            }

            message_type::SET_PEER_BANDWIDTH => {
                let (size, limit_type) = types::set_peer_bandwidth::deserialize(message.data())?;
                self.peer_bandwidth = Some((size, limit_type));
            }

            _ => {}
        }

        Ok(())
    }

    fn answer_ping(&mut self, event_data: &[u8]) -> Result<(), TransportError> {
        if event_data.len() != 4 {
            return Err(ControlMessageError::InvalidPayloadLength {
                name: "PingRequest",
                expected: 4,
                actual: event_data.len(),
            }
            .into());
        }

        let pong = control_message(
            message_type::USER_CONTROL,
            types::user_control::serialize(UserControlEventType::PingResponse.raw(), event_data),
        );
        self.send(&pong)?;
        trace!("answered ping request");
        Ok(())
    }

    /// Emits one Acknowledgement per window boundary crossed since the last
    /// one. The loop form matters: a single giant payload can cross several
    /// windows in one read.
    fn handle_ack_window(&mut self) -> Result<(), TransportError> {
        if self.window_ack_size == 0 {
            return Ok(());
        }

        let bytes_read = self.io.bytes_read();
        while bytes_read - self.last_ack_sent >= u64::from(self.window_ack_size) {
            self.last_ack_sent += u64::from(self.window_ack_size);

            // The counter is truncated to 32 bits; long-lived connections
            // legitimately wrap.
            let ack = control_message(
                message_type::ACKNOWLEDGEMENT,
                types::acknowledgement::serialize(self.last_ack_sent as u32),
            );
            self.send(&ack)?;
            trace!("acknowledged {} bytes", self.last_ack_sent);
        }

        Ok(())
    }
}

fn control_message(type_id: u8, payload: Vec<u8>) -> Message {
    Message::new(
        MessageHeader::new(0, RtmpTimestamp::new(0), type_id),
        Payload::from_vec(payload),
    )
}
