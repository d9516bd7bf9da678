//! Record Error Types

use thiserror::Error;

/// Errors while decoding, encoding or hashing weather records
#[derive(Debug, Clone, Error)]
pub enum RecordError {
    /// Line is not a JSON object
    #[error("Malformed wire record: {0}")]
    Malformed(String),

    /// Required key absent from the wire object
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Key outside the record schema
    #[error("Unexpected field: {0}")]
    UnexpectedField(String),

    /// Key present but holding the wrong kind of value
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: &'static str,
    },

    /// Serialization failure
    #[error("Encoding failed: {0}")]
    Encode(String),
}
