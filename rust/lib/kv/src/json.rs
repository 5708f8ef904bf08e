//! JSON helpers on top of the raw byte interface.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::KVError;
use crate::traits::KVStore;

/// Read and decode a JSON value. Missing keys yield `None`.
pub fn get_json<T: DeserializeOwned>(kv: &dyn KVStore, key: &str) -> Result<Option<T>, KVError> {
    match kv.get(key)? {
        Some(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| KVError::Serialization(format!("{}: {}", key, e))),
        None => Ok(None),
    }
}

/// Encode a value as JSON and store it.
pub fn set_json<T: Serialize>(kv: &dyn KVStore, key: &str, value: &T) -> Result<(), KVError> {
    let bytes = serde_json::to_vec(value).map_err(|e| KVError::Serialization(e.to_string()))?;
    kv.set(key, &bytes)
}
