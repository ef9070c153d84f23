//! Error types for a Veil session.

use thiserror::Error;

use veil_core::{CoreError, PermitHash};
use veil_call::CallError;
use veil_perms::PermsError;
use veil_store::StoreError;

/// Errors that can occur during session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Permit error (signing, import, sealing).
    #[error("permit error: {0}")]
    Perms(#[from] PermsError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Call pipeline error.
    #[error("call error: {0}")]
    Call(#[from] CallError),

    /// Core error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// No permit with this hash for the connected account.
    #[error("permit not found: {0}")]
    PermitNotFound(PermitHash),

    /// Configuration could not be loaded.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
