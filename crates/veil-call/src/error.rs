//! Error types for the call pipeline.

use thiserror::Error;

/// Errors that can occur while transforming or sending a call.
#[derive(Debug, Error)]
pub enum CallError {
    /// A tagged leaf with a discriminant outside the closed set, rejected
    /// under [`LeafPolicy::Reject`](crate::json::LeafPolicy::Reject).
    #[error("unrecognized leaf at {path}: utype {utype}")]
    UnrecognizedLeaf { path: String, utype: u64 },

    /// JSON that cannot be represented as a call value.
    #[error("invalid call json at {path}: {reason}")]
    InvalidJson { path: String, reason: String },

    /// The encryption primitive failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(String),

    /// Sealing or permit error.
    #[error("permit error: {0}")]
    Perms(#[from] veil_perms::PermsError),

    /// Core error.
    #[error("core error: {0}")]
    Core(#[from] veil_core::CoreError),
}

/// Result type for call operations.
pub type Result<T> = std::result::Result<T, CallError>;
