//! Abort (type 2): the peer discards a partially-sent message on the named
//! chunk stream.

use super::{exact_payload, read_u32_be};
use crate::messages::ControlMessageError;

pub fn serialize(chunk_stream_id: u32) -> Vec<u8> {
    chunk_stream_id.to_be_bytes().to_vec()
}

pub fn deserialize(data: &[u8]) -> Result<u32, ControlMessageError> {
    let data = exact_payload("Abort", 4, data)?;
    Ok(read_u32_be(data))
}
