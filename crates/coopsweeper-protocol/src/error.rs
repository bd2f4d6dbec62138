//! Error types for the protocol layer.

/// Errors that can occur while encoding, decoding, or validating messages.
///
/// When you see a `ProtocolError`, the problem is in the bytes or in the
/// shape of a message, not in networking or room management.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, a missing field, or an
    /// unknown message `type`.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message decoded fine but breaks a protocol rule, e.g. the first
    /// message was not a handshake.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
