//! Error types for Veil Core.

use thiserror::Error;

/// Core errors that can occur while constructing or encoding values.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown FHE utype code: {0}")]
    UnknownUType(u8),

    #[error("utype {utype} is not valid here: {reason}")]
    InvalidUType { utype: u8, reason: &'static str },

    #[error("value {value} does not fit into {utype}")]
    ValueOutOfRange { utype: &'static str, value: String },

    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("encoding error: {0}")]
    EncodingError(String),
}

impl From<hex::FromHexError> for CoreError {
    fn from(e: hex::FromHexError) -> Self {
        CoreError::InvalidHex(e.to_string())
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
