use crate::{Descriptor, DescriptorFormat, StoreError};

pub fn encode_descriptor(
    descriptor: &Descriptor,
    format: DescriptorFormat,
) -> Result<Vec<u8>, StoreError> {
    let bytes = match format {
        DescriptorFormat::Json => serde_json::to_vec_pretty(descriptor)?,
        // Named fields keep the MessagePack form readable by the same schema.
        DescriptorFormat::Msgpack => rmp_serde::encode::to_vec_named(descriptor)?,
    };
    Ok(bytes)
}
