//! SetChunkSize (type 1): the peer announces the chunk size it will use
//! from now on.

use super::{exact_payload, read_u32_be};
use crate::chunk_io::MAX_CHUNK_SIZE;
use crate::messages::ControlMessageError;

/// The size field is a 31-bit value; the most significant bit must be zero
/// on the wire and is masked off on receive.
pub const CHUNK_SIZE_MESSAGE_MASK: u32 = 0x7FFF_FFFF;

pub fn serialize(size: u32) -> Vec<u8> {
    (size & CHUNK_SIZE_MESSAGE_MASK).to_be_bytes().to_vec()
}

pub fn deserialize(data: &[u8]) -> Result<u32, ControlMessageError> {
    let data = exact_payload("SetChunkSize", 4, data)?;
    let size = read_u32_be(data) & CHUNK_SIZE_MESSAGE_MASK;

    if size < 1 || size > MAX_CHUNK_SIZE {
        return Err(ControlMessageError::InvalidChunkSize { size });
    }

    Ok(size)
}
