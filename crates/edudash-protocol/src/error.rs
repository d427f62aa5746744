//! Error types for the protocol layer.
//!
//! Each edudash crate defines its own error enum. A `ProtocolError` always
//! means a record or frame could not be turned into (or out of) bytes; it
//! never means the network or the backend misbehaved.

/// Errors that can occur while encoding or decoding records and frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust value into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes or a JSON row into a Rust
    /// value). Common causes: missing columns, renamed columns, or a
    /// column of the wrong type.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The payload decoded fine but is not usable, e.g. a change event
    /// with no row attached.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
