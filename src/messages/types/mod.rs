//! Payload codecs for the protocol control message types, one module per
//! type. Each `deserialize` enforces the exact payload length the protocol
//! requires; a mismatch means the peer is misbehaving and the connection
//! must be dropped.

pub mod abort;
pub mod acknowledgement;
pub mod set_chunk_size;
pub mod set_peer_bandwidth;
pub mod user_control;
pub mod window_acknowledgement_size;

use super::ControlMessageError;

fn exact_payload<'a>(
    name: &'static str,
    expected: usize,
    data: &'a [u8],
) -> Result<&'a [u8], ControlMessageError> {
    if data.len() != expected {
        return Err(ControlMessageError::InvalidPayloadLength {
            name,
            expected,
            actual: data.len(),
        });
    }

    Ok(data)
}

fn read_u32_be(data: &[u8]) -> u32 {
    u32::from_be_bytes([data[0], data[1], data[2], data[3]])
}
