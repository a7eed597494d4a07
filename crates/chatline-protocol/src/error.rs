//! Protocol error types.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while encoding or decoding records.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Record exceeds the maximum allowed size.
    #[error("record too large: {size} bytes (max: {max})")]
    RecordTooLarge { size: usize, max: usize },

    /// JSON (de)serialization failed.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Record parsed as JSON but is not an object.
    #[error("malformed record: {reason}")]
    Malformed { reason: String },

    /// Record has no string `type` field.
    #[error("record has no type")]
    MissingType,

    /// Record names a type this client does not know.
    #[error("unknown record type: {0}")]
    UnknownType(String),
}

impl ProtocolError {
    /// Creates a malformed record error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }

    /// Returns true for errors that concern a single record's payload.
    ///
    /// These are dropped by readers; the stream itself is still usable.
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            Self::Serialization(_) | Self::Malformed { .. } | Self::MissingType | Self::UnknownType(_)
        )
    }
}
