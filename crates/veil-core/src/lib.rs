//! # Veil Core
//!
//! Pure data model for confidential contract calls on an FHE chain.
//!
//! This crate contains no I/O, no key material, no networking. It defines the
//! values that flow through an encrypt → call → unseal round trip.
//!
//! ## Key Types
//!
//! - [`FheUType`] - Closed set of ciphertext discriminants
//! - [`EncryptableValue`] - Plaintext awaiting encryption
//! - [`SealedValue`] - Ciphertext sealed for one sealing key
//! - [`Unsealable`] - "Decrypted" or "not decryptable yet"
//! - [`CallValue`] - Argument/result tree walked by the transform engine
//! - [`Permission`] - Public permit descriptor passed to contracts
//! - [`PermitHash`] - Content-addressed permit identifier
//!
//! ## Canonicalization
//!
//! Permit identity is computed over deterministic CBOR. See [`canonical`].

pub mod canonical;
pub mod crypto;
pub mod encryptable;
pub mod error;
pub mod permission;
pub mod sealed;
pub mod types;
pub mod unsealable;
pub mod utype;
pub mod value;

pub use canonical::{canonical_hash, encode_canonical};
pub use crypto::{keccak256, Blake3Hash};
pub use encryptable::{Encryptable, EncryptableValue, EncryptedValue};
pub use error::{CoreError, Result};
pub use permission::Permission;
pub use sealed::{SealedKind, SealedValue, Unsealed};
pub use types::{now_secs, Address, PermitHash, Signature, B256, U256};
pub use unsealable::{
    process_unsealable_list, process_unsealables, unsealable_or, Plain, UnsealInput,
    UnsealInputs, Unsealable,
};
pub use utype::FheUType;
pub use value::{CallValue, PERMISSION_PLACEHOLDER};
