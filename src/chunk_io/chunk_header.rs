//! Wire codec for chunk basic headers and the four message-header formats.

use std::cmp::min;
use std::io::{self, Read, Write};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::messages::MessageHeader;
use crate::time::RtmpTimestamp;

/// Chunk size both sides use until a SetChunkSize negotiates otherwise.
pub const DEFAULT_CHUNK_SIZE: u32 = 128;

/// Largest negotiable chunk size; also the largest message length, since
/// both travel in 24-bit fields.
pub const MAX_CHUNK_SIZE: u32 = 0xFF_FFFF;

/// A 24-bit timestamp or delta field equal to this value means the real
/// value follows in 4 extra big-endian bytes after the fixed header fields.
pub const EXTENDED_TIMESTAMP_THRESHOLD: u32 = 0xFF_FFFF;

/// Largest chunk stream id the 3-byte basic header can express.
pub const MAX_CHUNK_STREAM_ID: u32 = 65_599;

/// The four chunk message-header formats, from the full 11-byte header down
/// to no header at all.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChunkHeaderFormat {
    /// Format 0: absolute timestamp, length, type and message stream id.
    Full,
    /// Format 1: timestamp delta, length and type; stream id from the
    /// previous header.
    TimeDeltaWithoutMessageStreamId,
    /// Format 2: timestamp delta only.
    TimeDeltaOnly,
    /// Format 3: everything from the previous header.
    Empty,
}

impl ChunkHeaderFormat {
    pub(crate) fn from_first_byte(byte: u8) -> ChunkHeaderFormat {
        match byte >> 6 {
            0 => ChunkHeaderFormat::Full,
            1 => ChunkHeaderFormat::TimeDeltaWithoutMessageStreamId,
            2 => ChunkHeaderFormat::TimeDeltaOnly,
            _ => ChunkHeaderFormat::Empty,
        }
    }

    pub(crate) fn format_bits(self) -> u8 {
        match self {
            ChunkHeaderFormat::Full => 0b0000_0000,
            ChunkHeaderFormat::TimeDeltaWithoutMessageStreamId => 0b0100_0000,
            ChunkHeaderFormat::TimeDeltaOnly => 0b1000_0000,
            ChunkHeaderFormat::Empty => 0b1100_0000,
        }
    }
}

/// Reads a basic header: format bits plus a 1, 2 or 3 byte chunk stream id.
///
/// A csid field of 0 signals the 2-byte form (csid 64..=319), a field of 1
/// the 3-byte little-endian form (csid 64..=65599).
pub(crate) fn read_basic_header<R>(reader: &mut R) -> io::Result<(ChunkHeaderFormat, u32)>
where
    R: Read,
{
    let first_byte = reader.read_u8()?;
    let format = ChunkHeaderFormat::from_first_byte(first_byte);

    let csid = match first_byte & 0b0011_1111 {
        0 => u32::from(reader.read_u8()?) + 64,
        1 => u32::from(reader.read_u16::<LittleEndian>()?) + 64,
        value => u32::from(value),
    };

    Ok((format, csid))
}

/// Writes a basic header, choosing the shortest form that fits the csid.
pub(crate) fn write_basic_header<W>(
    writer: &mut W,
    format: ChunkHeaderFormat,
    csid: u32,
) -> io::Result<()>
where
    W: Write,
{
    debug_assert!(
        (2..=MAX_CHUNK_STREAM_ID).contains(&csid),
        "chunk stream id {} is outside 2..=65599",
        csid
    );

    let format_bits = format.format_bits();
    if csid < 64 {
        writer.write_u8(format_bits | csid as u8)?;
    } else if csid < 320 {
        writer.write_u8(format_bits)?;
        writer.write_u8((csid - 64) as u8)?;
    } else {
        writer.write_u8(format_bits | 1)?;
        writer.write_u16::<LittleEndian>((csid - 64) as u16)?;
    }

    Ok(())
}

/// Reads a format 0 message header: absolute timestamp, length, type id and
/// little-endian message stream id, plus the extended timestamp when the
/// 24-bit field saturates.
///
/// The absolute timestamp also seeds `timestamp_delta`, because a format 3
/// chunk that starts the next message reuses it verbatim.
pub(crate) fn read_full_header<R>(reader: &mut R) -> io::Result<MessageHeader>
where
    R: Read,
{
    let timestamp_field = reader.read_u24::<BigEndian>()?;
    let message_length = reader.read_u24::<BigEndian>()?;
    let message_type_id = reader.read_u8()?;
    let message_stream_id = reader.read_u32::<LittleEndian>()?;

    let (timestamp, has_extended_timestamp) = if timestamp_field == EXTENDED_TIMESTAMP_THRESHOLD {
        (reader.read_u32::<BigEndian>()?, true)
    } else {
        (timestamp_field, false)
    };

    Ok(MessageHeader {
        timestamp: RtmpTimestamp::new(timestamp),
        timestamp_delta: timestamp,
        message_length,
        message_type_id,
        message_stream_id,
        has_extended_timestamp,
    })
}

/// Reads a format 1 or 2 message header, reconstructing the elided fields
/// from the previous header on the same chunk stream.
pub(crate) fn read_delta_header<R>(
    reader: &mut R,
    previous: &MessageHeader,
    format: ChunkHeaderFormat,
) -> io::Result<MessageHeader>
where
    R: Read,
{
    let delta_field = reader.read_u24::<BigEndian>()?;

    let (message_length, message_type_id) =
        if format == ChunkHeaderFormat::TimeDeltaWithoutMessageStreamId {
            (reader.read_u24::<BigEndian>()?, reader.read_u8()?)
        } else {
            (previous.message_length, previous.message_type_id)
        };

    // The extended field comes after the fixed header fields, not directly
    // after the 24-bit field it replaces.
    let (timestamp_delta, has_extended_timestamp) = if delta_field == EXTENDED_TIMESTAMP_THRESHOLD {
        (reader.read_u32::<BigEndian>()?, true)
    } else {
        (delta_field, false)
    };

    Ok(MessageHeader {
        timestamp: previous.timestamp + timestamp_delta,
        timestamp_delta,
        message_length,
        message_type_id,
        message_stream_id: previous.message_stream_id,
        has_extended_timestamp,
    })
}

/// Reads a format 3 header that *starts* a new message: every field comes
/// from the previous header, except that a previous header with an extended
/// timestamp re-sends the 4-byte delta here.
pub(crate) fn read_empty_header<R>(
    reader: &mut R,
    previous: &MessageHeader,
) -> io::Result<MessageHeader>
where
    R: Read,
{
    let timestamp_delta = if previous.has_extended_timestamp {
        reader.read_u32::<BigEndian>()?
    } else {
        previous.timestamp_delta
    };

    Ok(MessageHeader {
        timestamp: previous.timestamp + timestamp_delta,
        timestamp_delta,
        message_length: previous.message_length,
        message_type_id: previous.message_type_id,
        message_stream_id: previous.message_stream_id,
        has_extended_timestamp: previous.has_extended_timestamp,
    })
}

/// Writes a message header in the given format.
///
/// 24-bit time fields are capped at the extended-timestamp threshold, with
/// the real value appended after the fixed fields. An `Empty` header writes
/// nothing unless the message carries an extended timestamp, in which case
/// the 4-byte delta is repeated; this is what format 3 continuation chunks
/// (and format 3 message starts after an extended header) put on the wire.
pub(crate) fn write_message_header<W>(
    writer: &mut W,
    format: ChunkHeaderFormat,
    header: &MessageHeader,
) -> io::Result<()>
where
    W: Write,
{
    match format {
        ChunkHeaderFormat::Full => {
            let timestamp = header.timestamp.value;
            writer.write_u24::<BigEndian>(min(timestamp, EXTENDED_TIMESTAMP_THRESHOLD))?;
            writer.write_u24::<BigEndian>(header.message_length)?;
            writer.write_u8(header.message_type_id)?;
            writer.write_u32::<LittleEndian>(header.message_stream_id)?;
            if timestamp >= EXTENDED_TIMESTAMP_THRESHOLD {
                writer.write_u32::<BigEndian>(timestamp)?;
            }
        }

        ChunkHeaderFormat::TimeDeltaWithoutMessageStreamId => {
            let delta = header.timestamp_delta;
            writer.write_u24::<BigEndian>(min(delta, EXTENDED_TIMESTAMP_THRESHOLD))?;
            writer.write_u24::<BigEndian>(header.message_length)?;
            writer.write_u8(header.message_type_id)?;
            if delta >= EXTENDED_TIMESTAMP_THRESHOLD {
                writer.write_u32::<BigEndian>(delta)?;
            }
        }

        ChunkHeaderFormat::TimeDeltaOnly => {
            let delta = header.timestamp_delta;
            writer.write_u24::<BigEndian>(min(delta, EXTENDED_TIMESTAMP_THRESHOLD))?;
            if delta >= EXTENDED_TIMESTAMP_THRESHOLD {
                writer.write_u32::<BigEndian>(delta)?;
            }
        }

        ChunkHeaderFormat::Empty => {
            if header.has_extended_timestamp {
                writer.write_u32::<BigEndian>(header.timestamp_delta)?;
            }
        }
    }

    Ok(())
}
