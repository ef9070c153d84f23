//! # Veil
//!
//! Confidential access permits and encrypted contract calls for an FHE
//! smart-contract platform.
//!
//! ## Overview
//!
//! - **Permits**: signed capabilities that let the holder of a sealing key
//!   unseal an account's confidential values for a set of contracts or
//!   projects, until they expire. Permits can be shared with a recipient who
//!   co-signs with their own sealing key.
//! - **Calls**: arguments are encrypted before they are sent, results are
//!   unsealed after they arrive, and the shape of both is preserved exactly.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use veil::{Session, SessionConfig};
//! use veil::call::transport::memory::MemoryTransport;
//! use veil::perms::LocalSigner;
//! use veil::store::MemoryPermitStore;
//!
//! # async fn example() -> veil::Result<()> {
//! let session = Session::connect(
//!     LocalSigner::generate(),
//!     Arc::new(MemoryPermitStore::new()),
//!     MemoryTransport::new(),
//!     SessionConfig::default(),
//! )
//! .await?;
//!
//! let (hash, permit) = session
//!     .create_self(session.permit_builder().project("veil-demo"))
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Re-exports
//!
//! - `veil::core` - Value trees, FHE types, Unsealable
//! - `veil::perms` - Permits, sealing keys, signers
//! - `veil::store` - Permit storage
//! - `veil::call` - Transform engine and call pipeline

pub mod config;
pub mod error;
pub mod session;

pub use veil_call as call;
pub use veil_core as core;
pub use veil_perms as perms;
pub use veil_store as store;

pub use config::SessionConfig;
pub use error::{Result, SessionError};
pub use session::Session;

pub use veil_call::{CallOutcome, LeafPolicy};
pub use veil_core::{
    process_unsealable_list, process_unsealables, unsealable_or, Address, CallValue,
    EncryptableValue, PermitHash, SealedValue, Unsealable, Unsealed, U256,
};
pub use veil_perms::{AccessRequirements, Permit, PermitKind};
