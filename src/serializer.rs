//! Pluggable value serialization
//!
//! The cache treats encoded values as opaque bytes; the host picks the
//! encoding by supplying a [`Serializer`]. The default encodes through
//! serde_json.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Converts host values to and from the byte payloads the stores persist.
pub trait Serializer {
    /// Serialize a value to bytes.
    fn to_bytes<V: Serialize>(&self, value: &V) -> Result<Vec<u8>>;

    /// Deserialize a value from bytes.
    fn from_bytes<V: DeserializeOwned>(&self, bytes: &[u8]) -> Result<V>;
}

/// JSON serializer, the default encoding.
///
/// JSON payloads never end in a space byte, so they survive the slot
/// store's trailing-pad strip unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn to_bytes<V: Serialize>(&self, value: &V) -> Result<Vec<u8>> {
        serde_json::to_vec(value)
            .map_err(|e| Error::Serialization(format!("Failed to serialize value: {}", e)))
    }

    fn from_bytes<V: DeserializeOwned>(&self, bytes: &[u8]) -> Result<V> {
        serde_json::from_slice(bytes)
            .map_err(|e| Error::Serialization(format!("Failed to deserialize value: {}", e)))
    }
}
