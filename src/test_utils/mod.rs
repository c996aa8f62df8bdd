//! Shared test plumbing: an in-memory duplex pipe for two-sided handshake
//! and transport tests, a scripted stream that replays canned input while
//! capturing output, and helpers that hand-build chunks of each format.

use std::cmp::min;
use std::collections::VecDeque;
use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, Condvar, Mutex};

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};

/// One direction of a duplex pipe.
struct Half {
    state: Mutex<HalfState>,
    available: Condvar,
}

struct HalfState {
    buffer: VecDeque<u8>,
    closed: bool,
}

impl Half {
    fn new() -> Arc<Half> {
        Arc::new(Half {
            state: Mutex::new(HalfState {
                buffer: VecDeque::new(),
                closed: false,
            }),
            available: Condvar::new(),
        })
    }
}

/// One end of an in-memory duplex byte pipe. Reads block until the peer
/// writes or hangs up; dropping an end EOFs the peer's reads.
pub struct PipeEnd {
    incoming: Arc<Half>,
    outgoing: Arc<Half>,
}

/// Creates a connected pair of pipe ends.
pub fn pipe() -> (PipeEnd, PipeEnd) {
    let a_to_b = Half::new();
    let b_to_a = Half::new();

    let a = PipeEnd {
        incoming: Arc::clone(&b_to_a),
        outgoing: Arc::clone(&a_to_b),
    };
    let b = PipeEnd {
        incoming: a_to_b,
        outgoing: b_to_a,
    };

    (a, b)
}

impl Read for PipeEnd {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let mut state = self.incoming.state.lock().unwrap();
        while state.buffer.is_empty() && !state.closed {
            state = self.incoming.available.wait(state).unwrap();
        }

        if state.buffer.is_empty() {
            return Ok(0); // peer hung up
        }

        let count = min(buf.len(), state.buffer.len());
        for slot in buf.iter_mut().take(count) {
            *slot = state.buffer.pop_front().unwrap();
        }

        Ok(count)
    }
}

impl Write for PipeEnd {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.outgoing.state.lock().unwrap();
        if state.closed {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer hung up"));
        }

        state.buffer.extend(buf);
        self.outgoing.available.notify_all();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for PipeEnd {
    fn drop(&mut self) {
        let mut state = self.outgoing.state.lock().unwrap();
        state.closed = true;
        self.outgoing.available.notify_all();
    }
}

/// A stream that replays canned input and captures everything written to it
/// in a shared buffer the test keeps a handle to.
pub struct ScriptedStream {
    input: Cursor<Vec<u8>>,
    output: Arc<Mutex<Vec<u8>>>,
}

impl ScriptedStream {
    pub fn new(input: Vec<u8>) -> (ScriptedStream, Arc<Mutex<Vec<u8>>>) {
        let output = Arc::new(Mutex::new(Vec::new()));
        let stream = ScriptedStream {
            input: Cursor::new(input),
            output: Arc::clone(&output),
        };

        (stream, output)
    }

    /// How many input bytes have been consumed so far.
    pub fn bytes_consumed(&self) -> u64 {
        self.input.position()
    }
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn write_basic_header_bytes(cursor: &mut Cursor<Vec<u8>>, format_bits: u8, csid: u32) {
    if csid < 64 {
        cursor.write_u8(csid as u8 | format_bits).unwrap();
    } else if csid < 320 {
        cursor.write_u8(format_bits).unwrap();
        cursor.write_u8((csid - 64) as u8).unwrap();
    } else {
        cursor.write_u8(1 | format_bits).unwrap();
        cursor.write_u16::<LittleEndian>((csid - 64) as u16).unwrap();
    }
}

/// Builds a format 0 chunk. Payloads longer than `max_chunk_length` are
/// split, with format 3 continuation chunks appended (carrying the extended
/// timestamp when the first chunk used one).
pub fn form_type_0_chunk(
    csid: u32,
    timestamp: u32,
    message_stream_id: u32,
    type_id: u8,
    payload: &[u8],
    max_chunk_length: usize,
) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    write_basic_header_bytes(&mut cursor, 0b0000_0000, csid);

    let standard_timestamp = min(timestamp, 16_777_215);
    cursor.write_u24::<BigEndian>(standard_timestamp).unwrap();
    cursor.write_u24::<BigEndian>(payload.len() as u32).unwrap();
    cursor.write_u8(type_id).unwrap();
    cursor.write_u32::<LittleEndian>(message_stream_id).unwrap();

    let mut option_extended_timestamp = None;
    if timestamp >= 16_777_215 {
        cursor.write_u32::<BigEndian>(timestamp).unwrap();
        option_extended_timestamp = Some(timestamp);
    }

    if payload.len() > max_chunk_length {
        cursor.write_all(&payload[..max_chunk_length]).unwrap();

        let next_chunk = form_type_3_chunk(
            csid,
            &payload[max_chunk_length..],
            max_chunk_length,
            option_extended_timestamp,
        );
        cursor.write_all(&next_chunk).unwrap();
    } else {
        cursor.write_all(payload).unwrap();
    }

    cursor.into_inner()
}

/// Builds a format 1 chunk (delta, length and type; stream id elided).
pub fn form_type_1_chunk(csid: u32, delta: u32, type_id: u8, payload: &[u8]) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    write_basic_header_bytes(&mut cursor, 0b0100_0000, csid);

    let standard_timestamp = min(delta, 16_777_215);
    cursor.write_u24::<BigEndian>(standard_timestamp).unwrap();
    cursor.write_u24::<BigEndian>(payload.len() as u32).unwrap();
    cursor.write_u8(type_id).unwrap();

    if delta >= 16_777_215 {
        cursor.write_u32::<BigEndian>(delta).unwrap();
    }

    cursor.write_all(payload).unwrap();
    cursor.into_inner()
}

/// Builds a format 2 chunk (delta only).
pub fn form_type_2_chunk(csid: u32, delta: u32, payload: &[u8]) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    write_basic_header_bytes(&mut cursor, 0b1000_0000, csid);

    let standard_timestamp = min(delta, 16_777_215);
    cursor.write_u24::<BigEndian>(standard_timestamp).unwrap();

    if delta >= 16_777_215 {
        cursor.write_u32::<BigEndian>(delta).unwrap();
    }

    cursor.write_all(payload).unwrap();
    cursor.into_inner()
}

/// Builds a format 3 chunk, splitting oversized payloads into further
/// format 3 chunks. `extended_timestamp` repeats the 4-byte field the way
/// continuations of an extended-timestamp message must.
pub fn form_type_3_chunk(
    csid: u32,
    payload: &[u8],
    max_chunk_length: usize,
    extended_timestamp: Option<u32>,
) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    write_basic_header_bytes(&mut cursor, 0b1100_0000, csid);

    if let Some(value) = extended_timestamp {
        assert!(
            value >= 16_777_215,
            "extended timestamp {} is below the threshold",
            value
        );
        cursor.write_u32::<BigEndian>(value).unwrap();
    }

    if payload.len() > max_chunk_length {
        cursor.write_all(&payload[..max_chunk_length]).unwrap();

        let next_chunk = form_type_3_chunk(
            csid,
            &payload[max_chunk_length..],
            max_chunk_length,
            extended_timestamp,
        );
        cursor.write_all(&next_chunk).unwrap();
    } else {
        cursor.write_all(payload).unwrap();
    }

    cursor.into_inner()
}
