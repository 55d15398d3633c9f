use std::{any::type_name, fmt::Debug};

use serde::{de::DeserializeOwned, Serialize};

use crate::StateStoreError;

/// Records in the metadata column family are stored as JSON.
pub struct JsonEncoder;

impl JsonEncoder {
    pub fn encode<T: Serialize + Debug>(value: &T) -> Result<Vec<u8>, StateStoreError> {
        serde_json::to_vec(value).map_err(|e| StateStoreError::JsonEncoderFailed {
            source: anyhow::anyhow!(
                "error serializing into json: {}, type: {}, value: {:?}",
                e,
                type_name::<T>(),
                value
            ),
        })
    }

    pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StateStoreError> {
        serde_json::from_slice(bytes).map_err(|e| StateStoreError::JsonDecoderFailed {
            source: anyhow::anyhow!(
                "error deserializing from json bytes, {}, type: {}",
                e,
                type_name::<T>()
            ),
        })
    }
}
