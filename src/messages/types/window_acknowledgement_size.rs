//! WindowAckSize (type 5): how many bytes the sender wants to receive
//! between Acknowledgement messages. Zero disables acknowledgements.

use super::{exact_payload, read_u32_be};
use crate::messages::ControlMessageError;

pub fn serialize(size: u32) -> Vec<u8> {
    size.to_be_bytes().to_vec()
}

pub fn deserialize(data: &[u8]) -> Result<u32, ControlMessageError> {
    let data = exact_payload("WindowAckSize", 4, data)?;
    Ok(read_u32_be(data))
}
