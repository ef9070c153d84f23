//! Signer capability.
//!
//! Permits are signed by an external wallet. The core only needs the wallet's
//! address and a typed-data signing call; both may suspend for as long as the
//! wallet takes. A rejected request surfaces as
//! [`PermsError::SigningRejected`] and never yields a signature.
//!
//! [`LocalSigner`] is an in-process signer for development and tests. It signs
//! the typed-data digest with an Ed25519 key and derives its address from the
//! Keccak-256 of the public key.

use async_trait::async_trait;
use ed25519_dalek::{Signer as _, SigningKey, Verifier as _, VerifyingKey};
use rand::rngs::OsRng;
use std::sync::Arc;

use veil_core::{keccak256, Address, Signature};

use crate::error::{PermsError, Result};
use crate::typed_data::{signing_digest, TypedDataDomain, TypedDataTypes, TypedMessage};

/// An external wallet able to sign typed data.
#[async_trait]
pub trait Signer: Send + Sync {
    /// The connected account.
    async fn address(&self) -> Result<Address>;

    /// Sign `message` of the primary type (first key of `types`).
    async fn sign_typed_data(
        &self,
        domain: &TypedDataDomain,
        types: &TypedDataTypes,
        message: &TypedMessage,
    ) -> Result<Signature>;
}

#[async_trait]
impl<S: Signer + ?Sized> Signer for Arc<S> {
    async fn address(&self) -> Result<Address> {
        (**self).address().await
    }

    async fn sign_typed_data(
        &self,
        domain: &TypedDataDomain,
        types: &TypedDataTypes,
        message: &TypedMessage,
    ) -> Result<Signature> {
        (**self).sign_typed_data(domain, types, message).await
    }
}

/// Checks that a signature over typed data was produced by an address.
pub trait SignatureVerifier: Send + Sync {
    fn verify(
        &self,
        signer: Address,
        domain: &TypedDataDomain,
        types: &TypedDataTypes,
        message: &TypedMessage,
        signature: &Signature,
    ) -> Result<()>;
}

/// Address of an Ed25519 verifying key: last 20 bytes of its Keccak-256.
pub fn local_address(key: &VerifyingKey) -> Address {
    let hash = keccak256(key.as_bytes());
    Address::from_slice(&hash[12..])
}

/// In-process Ed25519 signer.
#[derive(Clone)]
pub struct LocalSigner {
    key: SigningKey,
}

impl LocalSigner {
    pub fn generate() -> Self {
        Self {
            key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Deterministic signer from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            key: SigningKey::from_bytes(seed),
        }
    }

    pub fn local_address(&self) -> Address {
        local_address(&self.key.verifying_key())
    }

    /// Sign synchronously. Signature bytes are `public key ‖ ed25519 signature`.
    pub fn sign_digest(
        &self,
        domain: &TypedDataDomain,
        types: &TypedDataTypes,
        message: &TypedMessage,
    ) -> Result<Signature> {
        let digest = signing_digest(domain, types, message)?;
        let sig = self.key.sign(digest.as_slice());

        let mut bytes = Vec::with_capacity(96);
        bytes.extend_from_slice(self.key.verifying_key().as_bytes());
        bytes.extend_from_slice(&sig.to_bytes());
        Ok(Signature::from_bytes(bytes))
    }
}

impl std::fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LocalSigner({})", self.local_address())
    }
}

#[async_trait]
impl Signer for LocalSigner {
    async fn address(&self) -> Result<Address> {
        Ok(self.local_address())
    }

    async fn sign_typed_data(
        &self,
        domain: &TypedDataDomain,
        types: &TypedDataTypes,
        message: &TypedMessage,
    ) -> Result<Signature> {
        self.sign_digest(domain, types, message)
    }
}

/// Verifier for signatures produced by [`LocalSigner`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalVerifier;

impl SignatureVerifier for LocalVerifier {
    fn verify(
        &self,
        signer: Address,
        domain: &TypedDataDomain,
        types: &TypedDataTypes,
        message: &TypedMessage,
        signature: &Signature,
    ) -> Result<()> {
        let bytes = signature.as_bytes();
        if bytes.len() != 96 {
            return Err(PermsError::InvalidSignature(format!(
                "expected 96 bytes, got {}",
                bytes.len()
            )));
        }

        let mut pk = [0u8; 32];
        pk.copy_from_slice(&bytes[..32]);
        let key = VerifyingKey::from_bytes(&pk)
            .map_err(|e| PermsError::InvalidSignature(e.to_string()))?;
        if local_address(&key) != signer {
            return Err(PermsError::InvalidSignature(format!(
                "signed by {}, expected {}",
                local_address(&key),
                signer
            )));
        }

        let mut sig = [0u8; 64];
        sig.copy_from_slice(&bytes[32..]);
        let sig = ed25519_dalek::Signature::from_bytes(&sig);

        let digest = signing_digest(domain, types, message)?;
        key.verify(digest.as_slice(), &sig)
            .map_err(|e| PermsError::InvalidSignature(e.to_string()))
    }
}
