//! UserControl (type 4): a 16-bit event type followed by event data. Only
//! ping requests get a reaction from the transport; everything else is
//! passed through to the layer above.

use crate::messages::ControlMessageError;

pub fn serialize(event_type: u16, event_data: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(2 + event_data.len());
    bytes.extend_from_slice(&event_type.to_be_bytes());
    bytes.extend_from_slice(event_data);
    bytes
}

pub fn deserialize(data: &[u8]) -> Result<(u16, &[u8]), ControlMessageError> {
    if data.len() < 2 {
        return Err(ControlMessageError::PayloadTooShort {
            name: "UserControl",
            minimum: 2,
            actual: data.len(),
        });
    }

    let event_type = u16::from_be_bytes([data[0], data[1]]);
    Ok((event_type, &data[2..]))
}
