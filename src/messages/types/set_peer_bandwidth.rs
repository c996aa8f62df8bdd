//! SetPeerBandwidth (type 6): an output bandwidth limit plus how strictly
//! the peer should apply it.

use super::{exact_payload, read_u32_be};
use crate::messages::{ControlMessageError, PeerBandwidthLimitType};

pub fn serialize(size: u32, limit_type: PeerBandwidthLimitType) -> Vec<u8> {
    let mut bytes = size.to_be_bytes().to_vec();
    bytes.push(limit_type.raw());
    bytes
}

pub fn deserialize(data: &[u8]) -> Result<(u32, PeerBandwidthLimitType), ControlMessageError> {
    let data = exact_payload("SetPeerBandwidth", 5, data)?;
    let size = read_u32_be(data);
    let limit_type = PeerBandwidthLimitType::from_raw(data[4])
        .ok_or(ControlMessageError::UnknownBandwidthLimitType { value: data[4] })?;

    Ok((size, limit_type))
}
