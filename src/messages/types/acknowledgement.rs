//! Acknowledgement (type 3): the cumulative number of bytes received so
//! far, truncated to 32 bits (long-lived connections legitimately wrap).

use super::{exact_payload, read_u32_be};
use crate::messages::ControlMessageError;

pub fn serialize(sequence_number: u32) -> Vec<u8> {
    sequence_number.to_be_bytes().to_vec()
}

pub fn deserialize(data: &[u8]) -> Result<u32, ControlMessageError> {
    let data = exact_payload("Acknowledgement", 4, data)?;
    Ok(read_u32_be(data))
}
