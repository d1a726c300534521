use crate::{Descriptor, StoreError};

/// Decode a stored descriptor. JSON is tried first, then MessagePack.
pub fn decode_descriptor(bytes: &[u8]) -> Result<Descriptor, StoreError> {
    serde_json::from_slice(bytes)
        .or_else(|_| rmp_serde::decode::from_slice(bytes).map_err(StoreError::from))
}
