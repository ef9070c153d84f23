//! # Veil Call
//!
//! The structural transform engine and the confidential call pipeline.
//!
//! ## Overview
//!
//! Outbound arguments may contain plaintexts to encrypt and a placeholder
//! for the caller's permission; inbound results may contain outputs sealed
//! for the caller's sealing key. Both are rewritten by one shape-preserving
//! walk over [`CallValue`](veil_core::CallValue):
//!
//! - [`encrypt_tree`] - all-or-nothing encryption and permission population
//! - [`unseal_tree`] - unsealing into an [`Unsealable`](veil_core::Unsealable)
//! - [`from_json`] / [`to_json`] - host JSON adapters, read per [`JsonDirection`] with a [`LeafPolicy`]
//! - [`CallPipeline`] - encrypt → [`CallTransport`] → unseal
//!
//! ## Usage
//!
//! ```no_run
//! use veil_call::{transport::memory::MemoryTransport, CallPipeline, Caller};
//! use veil_core::{Address, CallValue};
//!
//! # async fn example() -> veil_call::Result<()> {
//! let pipeline = CallPipeline::new(MemoryTransport::new());
//! let outcome = pipeline
//!     .call(Caller::anonymous(Address::ZERO), Address::ZERO, "name", &CallValue::Null)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod decrypt;
pub mod encrypt;
pub mod error;
pub mod json;
pub mod pipeline;
pub mod transform;
pub mod transport;

pub use decrypt::{sealed_leaf_count, unseal_tree, unseal_value};
pub use encrypt::{encrypt_tree, EncryptNeeds, EncryptionTarget, Encryptor};
pub use error::{CallError, Result};
pub use json::{from_json, to_json, JsonDirection, LeafPolicy};
pub use pipeline::{CallOutcome, CallPipeline, Caller, PipelineConfig};
pub use transform::{map_leaves, visit_leaves, LeafPath, PathSegment};
pub use transport::{CallRequest, CallTransport};
