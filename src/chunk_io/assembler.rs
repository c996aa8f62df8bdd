//! Per-chunk-stream message assembly.
//!
//! Each inbound chunk stream owns one assembler. The first chunk of a
//! message installs the decoded header and acquires a pool buffer of exactly
//! `message_length` bytes; subsequent chunks land directly in that buffer
//! with no intermediate copy. The header of the last *completed* message is
//! kept so that format 1/2/3 chunks can reconstruct their elided fields.

use std::cmp::min;
use std::sync::Arc;

use crate::buffers::{BufferPool, PooledBuffer};
use crate::messages::{Message, MessageHeader};

pub(crate) struct ChunkStreamAssembler {
    message_header: Option<MessageHeader>,
    buffer: Option<PooledBuffer>,
    bytes_read: u32,
    prev_header: Option<MessageHeader>,
}

impl ChunkStreamAssembler {
    pub(crate) fn new() -> ChunkStreamAssembler {
        ChunkStreamAssembler {
            message_header: None,
            buffer: None,
            bytes_read: 0,
            prev_header: None,
        }
    }

    /// True while a message is partially assembled, meaning the next chunk
    /// on this stream is a continuation rather than a message start.
    pub(crate) fn is_mid_message(&self) -> bool {
        self.buffer.is_some()
    }

    /// The header installed by the current message's first chunk.
    pub(crate) fn current_header(&self) -> Option<&MessageHeader> {
        self.message_header.as_ref()
    }

    /// The header of the last completed message on this chunk stream.
    pub(crate) fn prev_header(&self) -> Option<&MessageHeader> {
        self.prev_header.as_ref()
    }

    /// Begins a new message: installs its header and acquires a destination
    /// buffer of exactly `message_length` bytes.
    pub(crate) fn start_message(&mut self, header: MessageHeader, pool: &Arc<BufferPool>) {
        self.buffer = Some(pool.acquire(header.message_length as usize));
        self.message_header = Some(header);
        self.bytes_read = 0;
    }

    /// How many payload bytes the next chunk carries: the negotiated chunk
    /// size, or whatever remains of the message if that is smaller.
    pub(crate) fn next_chunk_len(&self, chunk_size: u32) -> u32 {
        match &self.message_header {
            Some(header) => min(chunk_size, header.message_length - self.bytes_read),
            None => 0,
        }
    }

    /// The destination slice for the next `len` payload bytes.
    pub(crate) fn chunk_slice(&mut self, len: u32) -> &mut [u8] {
        let start = self.bytes_read as usize;
        match self.buffer.as_mut() {
            Some(buffer) => &mut buffer[start..start + len as usize],
            None => &mut [],
        }
    }

    /// Records that `len` payload bytes were read into the buffer.
    pub(crate) fn commit(&mut self, len: u32) {
        self.bytes_read += len;
    }

    /// Hands out the completed message, if the current one is finished.
    /// Completion freezes the buffer into a shared payload, clears the
    /// in-progress state and remembers the header for future format 1/2/3
    /// chunks.
    pub(crate) fn take_message(&mut self) -> Option<Message> {
        let header = *self.message_header.as_ref()?;
        if self.bytes_read < header.message_length {
            return None;
        }

        let buffer = self.buffer.take()?;
        self.message_header = None;
        self.bytes_read = 0;
        self.prev_header = Some(header);

        Some(Message::new(header, buffer.freeze()))
    }

    /// Drops a partially-assembled message, releasing its buffer back to
    /// the pool. `prev_header` is untouched: it only ever reflects
    /// completed messages.
    pub(crate) fn abort(&mut self) {
        self.buffer = None;
        self.message_header = None;
        self.bytes_read = 0;
    }
}
