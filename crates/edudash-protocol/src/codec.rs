//! Codec trait and implementations for serializing frames and rows.
//!
//! The realtime socket and the REST reads both move JSON, but the layers
//! above only need "something that implements [`Codec`]". Tests can swap
//! in a codec that fails on purpose without touching the socket code.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because a codec is stored inside long-lived
/// socket tasks that Tokio may move between threads.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or
    /// don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;

    /// Decodes a batch of JSON rows, as returned by a snapshot fetch.
    ///
    /// Stops at the first row that doesn't fit `T`.
    fn decode_rows<T: DeserializeOwned>(
        &self,
        rows: Vec<serde_json::Value>,
    ) -> Result<Vec<T>, ProtocolError> {
        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(ProtocolError::Decode))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON via `serde_json`.
///
/// ## Example
///
/// ```rust
/// use edudash_protocol::{ChangeEvent, Codec, JsonCodec};
///
/// let codec = JsonCodec;
/// let event = ChangeEvent::insert("messages", serde_json::json!({ "id": "m-1" }));
///
/// let bytes = codec.encode(&event).unwrap();
/// let decoded: ChangeEvent = codec.decode(&bytes).unwrap();
/// assert_eq!(event, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
