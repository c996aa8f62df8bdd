//! Chunk-stream writer: fragments outgoing messages into chunks, choosing
//! the most compact legal header for each message.

use std::cmp::min;
use std::collections::HashMap;
use std::io::Write;

use super::chunk_header::{
    write_basic_header, write_message_header, ChunkHeaderFormat, DEFAULT_CHUNK_SIZE,
    EXTENDED_TIMESTAMP_THRESHOLD, MAX_CHUNK_SIZE,
};
use super::errors::ChunkWriteError;
use crate::messages::{chunk_stream, message_type, Message, MessageHeader};

/// Serializes RTMP messages into chunks.
///
/// Header compression relies on what was previously sent per chunk stream,
/// so all messages for one peer must flow through the same `ChunkWriter`.
pub struct ChunkWriter {
    chunk_size: u32,
    previous_headers: HashMap<u32, MessageHeader>,
}

impl ChunkWriter {
    /// Creates a writer with the protocol's initial 128-byte chunk size.
    pub fn new() -> ChunkWriter {
        ChunkWriter {
            chunk_size: DEFAULT_CHUNK_SIZE,
            previous_headers: HashMap::new(),
        }
    }

    /// The chunk size outbound payloads are currently delimited by.
    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    /// Applies a new outbound chunk size. The corresponding SetChunkSize
    /// message must already be on the wire, so the peer sees it delimited
    /// by the old size.
    pub fn set_chunk_size(&mut self, size: u32) -> Result<(), ChunkWriteError> {
        if size < 1 || size > MAX_CHUNK_SIZE {
            return Err(ChunkWriteError::InvalidChunkSize { size });
        }

        self.chunk_size = size;
        Ok(())
    }

    /// Writes one message as a sequence of chunks: the smallest legal header
    /// for the first chunk, then format 3 continuations every `chunk_size`
    /// payload bytes. Chunks of different messages are never interleaved.
    pub fn write_message<W>(&mut self, writer: &mut W, message: &Message) -> Result<(), ChunkWriteError>
    where
        W: Write,
    {
        let data = message.data();
        if data.len() > MAX_CHUNK_SIZE as usize {
            return Err(ChunkWriteError::MessageTooLong { size: data.len() });
        }

        let csid = chunk_stream_for_message_type(message.type_id());
        let mut header = message.header;
        header.message_length = data.len() as u32;

        let previous = self.previous_headers.get(&csid).copied();
        let format = match &previous {
            None => {
                // A full header's absolute timestamp doubles as the delta a
                // following format 3 message start would reuse.
                header.timestamp_delta = header.timestamp.value;
                ChunkHeaderFormat::Full
            }

            Some(previous) => {
                let format = pick_header_format(previous, &header);
                match format {
                    ChunkHeaderFormat::Full => {
                        header.timestamp_delta = header.timestamp.value;
                    }
                    ChunkHeaderFormat::TimeDeltaWithoutMessageStreamId
                    | ChunkHeaderFormat::TimeDeltaOnly => {
                        header.timestamp_delta = header.timestamp.delta_since(previous.timestamp);
                    }
                    ChunkHeaderFormat::Empty => {
                        header.timestamp_delta = previous.timestamp_delta;
                    }
                }
                format
            }
        };

        header.has_extended_timestamp = match format {
            ChunkHeaderFormat::Full => header.timestamp.value >= EXTENDED_TIMESTAMP_THRESHOLD,
            // A format 3 start reproduces the previous header, extended
            // field included; the inbound flag on an echoed message has no
            // say here.
            ChunkHeaderFormat::Empty => previous.map_or(false, |p| p.has_extended_timestamp),
            _ => header.timestamp_delta >= EXTENDED_TIMESTAMP_THRESHOLD,
        };

        write_basic_header(writer, format, csid)
            .map_err(|source| ChunkWriteError::BasicHeader { source })?;
        write_message_header(writer, format, &header)
            .map_err(|source| ChunkWriteError::MessageHeader { source })?;

        let mut offset = 0;
        loop {
            let end = min(offset + self.chunk_size as usize, data.len());
            writer
                .write_all(&data[offset..end])
                .map_err(|source| ChunkWriteError::Payload { source })?;
            offset = end;

            if offset >= data.len() {
                break;
            }

            // Every continuation repeats the 4-byte extended timestamp iff
            // the first chunk carried one.
            write_basic_header(writer, ChunkHeaderFormat::Empty, csid)
                .map_err(|source| ChunkWriteError::BasicHeader { source })?;
            write_message_header(writer, ChunkHeaderFormat::Empty, &header)
                .map_err(|source| ChunkWriteError::MessageHeader { source })?;
        }

        self.previous_headers.insert(csid, header);
        Ok(())
    }
}

impl Default for ChunkWriter {
    fn default() -> Self {
        ChunkWriter::new()
    }
}

/// Picks the most compact header the previous one allows, per the elision
/// rules: a changed message stream id forces a full header, a changed
/// length or type forces format 1, a changed timestamp format 2. Format 3
/// is only legal when it would reproduce the message exactly, which means
/// the previous delta must match the (zero) delta of an equal timestamp.
fn pick_header_format(previous: &MessageHeader, current: &MessageHeader) -> ChunkHeaderFormat {
    if current.message_stream_id != previous.message_stream_id {
        return ChunkHeaderFormat::Full;
    }

    if current.message_length != previous.message_length
        || current.message_type_id != previous.message_type_id
    {
        return ChunkHeaderFormat::TimeDeltaWithoutMessageStreamId;
    }

    if current.timestamp != previous.timestamp || previous.timestamp_delta != 0 {
        return ChunkHeaderFormat::TimeDeltaOnly;
    }

    ChunkHeaderFormat::Empty
}

/// The conventional chunk stream for each message type, spreading repeated
/// traffic across streams so header compression stays effective.
pub(crate) fn chunk_stream_for_message_type(type_id: u8) -> u32 {
    match type_id {
        message_type::SET_CHUNK_SIZE
        | message_type::ABORT
        | message_type::ACKNOWLEDGEMENT
        | message_type::USER_CONTROL
        | message_type::WINDOW_ACK_SIZE
        | message_type::SET_PEER_BANDWIDTH => chunk_stream::PROTOCOL_CONTROL,
        message_type::AMF0_COMMAND | message_type::AMF3_COMMAND => chunk_stream::COMMAND,
        message_type::AUDIO => chunk_stream::AUDIO,
        message_type::VIDEO => chunk_stream::VIDEO,
        message_type::AMF0_DATA | message_type::AMF3_DATA => chunk_stream::DATA,
        _ => chunk_stream::COMMAND,
    }
}
