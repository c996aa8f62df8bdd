//! Chunk-stream reader: pulls chunks off the wire and assembles them into
//! complete messages.

use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

use byteorder::{BigEndian, ReadBytesExt};

use super::assembler::ChunkStreamAssembler;
use super::chunk_header::{
    read_basic_header, read_delta_header, read_empty_header, read_full_header, ChunkHeaderFormat,
    DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE,
};
use super::errors::ChunkReadError;
use crate::buffers::BufferPool;
use crate::messages::{Message, MessageHeader};

/// Reads RTMP messages from interleaved chunks.
///
/// The chunk protocol is stateful: compressed headers and continuation
/// chunks rely on everything previously read from the same peer, so one
/// `ChunkReader` must see every byte of a connection's inbound side.
pub struct ChunkReader {
    chunk_size: u32,
    assemblers: HashMap<u32, ChunkStreamAssembler>,
    pool: Arc<BufferPool>,
}

impl ChunkReader {
    /// Creates a reader with the protocol's initial 128-byte chunk size,
    /// drawing payload buffers from the process-wide pool.
    pub fn new() -> ChunkReader {
        ChunkReader::with_pool(BufferPool::global())
    }

    /// Creates a reader that draws payload buffers from the given pool.
    pub fn with_pool(pool: Arc<BufferPool>) -> ChunkReader {
        ChunkReader {
            chunk_size: DEFAULT_CHUNK_SIZE,
            assemblers: HashMap::new(),
            pool,
        }
    }

    /// The chunk size inbound payloads are currently delimited by.
    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    /// Applies a chunk size announced by the peer's SetChunkSize message.
    /// Must happen before the next chunk is read or the stream desyncs.
    pub fn set_chunk_size(&mut self, size: u32) -> Result<(), ChunkReadError> {
        if size < 1 || size > MAX_CHUNK_SIZE {
            return Err(ChunkReadError::InvalidChunkSize { size });
        }

        self.chunk_size = size;
        Ok(())
    }

    /// Drops any partially-assembled message on the given chunk stream, as
    /// directed by an Abort message naming it.
    pub fn abort_chunk_stream(&mut self, csid: u32) {
        if let Some(assembler) = self.assemblers.get_mut(&csid) {
            assembler.abort();
        }
    }

    /// Blocks until a complete message has been assembled and returns it.
    /// Never returns a partial message.
    pub fn read_message<R>(&mut self, reader: &mut R) -> Result<Message, ChunkReadError>
    where
        R: Read,
    {
        loop {
            if let Some(message) = self.read_chunk(reader)? {
                return Ok(message);
            }
        }
    }

    fn read_chunk<R>(&mut self, reader: &mut R) -> Result<Option<Message>, ChunkReadError>
    where
        R: Read,
    {
        let chunk_size = self.chunk_size;
        let pool = Arc::clone(&self.pool);

        let (format, csid) =
            read_basic_header(reader).map_err(|source| ChunkReadError::BasicHeader { source })?;

        let assembler = self
            .assemblers
            .entry(csid)
            .or_insert_with(ChunkStreamAssembler::new);

        if let Some(current) = assembler.current_header().copied() {
            // Continuation of the current message: the header bytes are
            // consumed per the advertised format but their content is
            // ignored; only the first chunk's header describes the message.
            skip_continuation_header(reader, format, &current)
                .map_err(|source| ChunkReadError::MessageHeader { source })?;
        } else {
            let header = decode_message_start(reader, format, csid, assembler.prev_header())?;
            assembler.start_message(header, &pool);
        }

        let len = assembler.next_chunk_len(chunk_size);
        if len > 0 {
            reader
                .read_exact(assembler.chunk_slice(len))
                .map_err(|source| ChunkReadError::Payload { source })?;
            assembler.commit(len);
        }

        Ok(assembler.take_message())
    }
}

impl Default for ChunkReader {
    fn default() -> Self {
        ChunkReader::new()
    }
}

fn decode_message_start<R>(
    reader: &mut R,
    format: ChunkHeaderFormat,
    csid: u32,
    prev_header: Option<&MessageHeader>,
) -> Result<MessageHeader, ChunkReadError>
where
    R: Read,
{
    let header = match format {
        ChunkHeaderFormat::Full => read_full_header(reader),

        ChunkHeaderFormat::TimeDeltaWithoutMessageStreamId | ChunkHeaderFormat::TimeDeltaOnly => {
            let previous =
                prev_header.ok_or(ChunkReadError::NoPreviousChunkOnStream { csid })?;
            read_delta_header(reader, previous, format)
        }

        ChunkHeaderFormat::Empty => {
            let previous =
                prev_header.ok_or(ChunkReadError::NoPreviousChunkOnStream { csid })?;
            read_empty_header(reader, previous)
        }
    };

    header.map_err(|source| ChunkReadError::MessageHeader { source })
}

/// Consumes a continuation chunk's header bytes. Whether a format 3
/// continuation carries a 4-byte extended timestamp is a property of the
/// current message's first chunk, so the decision keys off the installed
/// header. Some encoders mislabel continuations as format 1 or 2; their
/// header bytes are consumed and discarded.
fn skip_continuation_header<R>(
    reader: &mut R,
    format: ChunkHeaderFormat,
    current: &MessageHeader,
) -> std::io::Result<()>
where
    R: Read,
{
    match format {
        ChunkHeaderFormat::Empty => {
            if current.has_extended_timestamp {
                reader.read_u32::<BigEndian>()?;
            }
            Ok(())
        }

        ChunkHeaderFormat::Full => read_full_header(reader).map(|_| ()),

        ChunkHeaderFormat::TimeDeltaWithoutMessageStreamId | ChunkHeaderFormat::TimeDeltaOnly => {
            read_delta_header(reader, current, format).map(|_| ())
        }
    }
}
