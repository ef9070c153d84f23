//! # Veil Store
//!
//! Permit state: per-account permit sets and the active-permit selection.
//!
//! ## Key Types
//!
//! - [`PermitStore`] - The async trait for permit state
//! - [`MemoryPermitStore`] - Lock-guarded in-memory implementation
//! - [`PermitStoreSnapshot`] - Serializable shape for external persistence
//!
//! ## Invariants
//!
//! - Permits are keyed by their hash; storing the same permit twice replaces it.
//! - The active pointer of an account names a stored permit or is absent.
//! - Removing the active permit clears the pointer.
//! - Renaming never changes a permit's hash.

pub mod error;
pub mod memory;
pub mod snapshot;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryPermitStore;
pub use snapshot::PermitStoreSnapshot;
pub use traits::{PermitStore, SetResult};
