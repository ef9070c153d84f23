//! Error types for the permissions module.

use thiserror::Error;

/// Errors that can occur during permit operations.
#[derive(Debug, Error)]
pub enum PermsError {
    /// The external signer refused (user cancelled, wallet locked).
    #[error("signing rejected: {0}")]
    SigningRejected(String),

    /// The external signer failed for any other reason.
    #[error("signing failed: {0}")]
    SigningFailed(String),

    /// The signer's address is not the one the permit names.
    #[error("signer {actual} cannot sign for {expected}")]
    SignerMismatch { expected: String, actual: String },

    /// Imported permit JSON failed validation.
    #[error("invalid import: {0}")]
    InvalidImport(String),

    /// Permit fields are inconsistent with its kind.
    #[error("invalid permit: {0}")]
    InvalidPermit(String),

    /// Message does not match its typed-data type map.
    #[error("typed data error: {0}")]
    TypedData(String),

    /// A signature did not verify.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// Operation requires the private half of the sealing key pair.
    #[error("sealing key pair has no private key")]
    MissingPrivateKey,

    /// Encryption error.
    #[error("encryption error: {0}")]
    EncryptionError(String),

    /// Decryption error.
    #[error("decryption error: {0}")]
    DecryptionError(String),

    /// Invalid key material.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Core error.
    #[error("core error: {0}")]
    Core(#[from] veil_core::CoreError),
}

impl From<serde_json::Error> for PermsError {
    fn from(e: serde_json::Error) -> Self {
        PermsError::SerializationError(e.to_string())
    }
}

/// Result type for permit operations.
pub type Result<T> = std::result::Result<T, PermsError>;
