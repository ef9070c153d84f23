//! # Veil Permits
//!
//! Permits, sealing keys, and the typed-data signing protocol.
//!
//! ## Overview
//!
//! A [`Permit`] grants the holder of a sealing key the right to have an
//! issuer's confidential values re-encrypted ("sealed") for them. Contracts
//! seal outputs for the permit's public key; [`SealingKeyPair::unseal`] opens
//! them locally.
//!
//! ## Signing Protocol
//!
//! 1. **Self**: issuer signs `{..., sealingKey}` with their own key pair.
//! 2. **Sharing**: issuer signs `{..., recipient}` without a sealing key.
//! 3. **Recipient**: recipient generates a key pair and co-signs
//!    `{sealingKey, issuerSignature}`.
//!
//! Signing goes through the async [`Signer`] capability; it is the only
//! suspension point in permit construction.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use veil_perms::{LocalSigner, PermitBuilder, TypedDataDomain};
//! # async fn demo() -> veil_perms::Result<()> {
//! let wallet = LocalSigner::generate();
//! let permit = PermitBuilder::new(wallet.local_address())
//!     .project("FHERC20")
//!     .sign_self(&wallet, &TypedDataDomain::default())
//!     .await?;
//! let hash = permit.hash()?;
//! # Ok(())
//! # }
//! ```

pub mod crypto;
pub mod envelope;
pub mod error;
pub mod export;
pub mod import;
pub mod permit;
pub mod sealing;
pub mod signer;
pub mod typed_data;

pub use crypto::{X25519PublicKey, X25519StaticSecret};
pub use envelope::SealedEnvelope;
pub use error::{PermsError, Result};
pub use export::{OwnPermitExport, SerializedPermit, SharingPermitExport};
pub use import::{classify_import, PermitImport};
pub use permit::{
    time_until, AccessRequirements, Permit, PermitBuilder, PermitInvalid, PermitKind,
    DEFAULT_EXPIRATION_SECS,
};
pub use sealing::{seal_output, SealingKeyPair, SerializedSealingPair};
pub use signer::{LocalSigner, LocalVerifier, SignatureVerifier, Signer};
pub use typed_data::{TypedDataDomain, TypedDataTypes, TypedField, TypedMessage, TypedValue};
