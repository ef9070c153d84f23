//! Sealed-box envelope.
//!
//! A value sealed for a sealing public key travels as `0x`-prefixed hex of a
//! CBOR map holding the sender's ephemeral key, the nonce and the ciphertext.
//! Only the holder of the matching secret can open it.

use serde::{Deserialize, Serialize};

use veil_core::types::strip_0x;

use crate::crypto::{EncryptionNonce, EphemeralKeyPair, X25519PublicKey, X25519StaticSecret};
use crate::error::{PermsError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedEnvelope {
    /// Ephemeral X25519 public key (sender's side of ECDH).
    pub ephemeral_public: X25519PublicKey,

    pub nonce: EncryptionNonce,

    /// Encrypted data (includes authentication tag).
    pub ciphertext: Vec<u8>,
}

impl SealedEnvelope {
    /// Seal `plaintext` so only the holder of `recipient`'s secret can open it.
    pub fn seal(plaintext: &[u8], recipient: &X25519PublicKey) -> Result<Self> {
        let ephemeral = EphemeralKeyPair::generate();
        let ephemeral_public = ephemeral.public_key();

        let shared = ephemeral.diffie_hellman(recipient);
        let key = shared.derive_encryption_key(ephemeral_public.as_bytes());

        let nonce = EncryptionNonce::generate();
        let ciphertext = key.encrypt(plaintext, &nonce)?;

        Ok(Self {
            ephemeral_public,
            nonce,
            ciphertext,
        })
    }

    pub fn open(&self, secret: &X25519StaticSecret) -> Result<Vec<u8>> {
        let shared = secret.diffie_hellman(&self.ephemeral_public);
        let key = shared.derive_encryption_key(self.ephemeral_public.as_bytes());
        key.decrypt(&self.ciphertext, &self.nonce)
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| PermsError::SerializationError(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| PermsError::SerializationError(e.to_string()))
    }

    /// The ciphertext string carried in a `SealedValue`.
    pub fn to_hex(&self) -> Result<String> {
        Ok(format!("0x{}", hex::encode(self.to_bytes()?)))
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(strip_0x(s))
            .map_err(|e| PermsError::DecryptionError(format!("malformed sealed data: {e}")))?;
        Self::from_bytes(&bytes)
    }
}
