//! Sealing key pairs.
//!
//! Confidential outputs are re-encrypted on-chain for a permit's sealing
//! public key. The permit holder's private half opens them again. Plaintexts
//! are 32-byte big-endian words.

use serde::{Deserialize, Serialize};
use std::fmt;

use veil_core::encryptable::address_from_u256;
use veil_core::{SealedKind, SealedValue, Unsealed, U256};

use crate::crypto::{X25519PublicKey, X25519StaticSecret};
use crate::envelope::SealedEnvelope;
use crate::error::{PermsError, Result};

/// A sealing key pair. The private half is only present for its local holder.
#[derive(Clone)]
pub struct SealingKeyPair {
    public: X25519PublicKey,
    secret: Option<X25519StaticSecret>,
}

impl SealingKeyPair {
    /// Generate a fresh key pair.
    pub fn generate() -> Self {
        Self::from_secret(X25519StaticSecret::generate())
    }

    pub fn from_secret(secret: X25519StaticSecret) -> Self {
        Self {
            public: secret.public_key(),
            secret: Some(secret),
        }
    }

    /// A pair that can only be sealed for, never unsealed with.
    pub fn public_only(public: X25519PublicKey) -> Self {
        Self {
            public,
            secret: None,
        }
    }

    pub fn public_key(&self) -> X25519PublicKey {
        self.public
    }

    pub fn has_secret(&self) -> bool {
        self.secret.is_some()
    }

    /// Drop the private half.
    pub fn without_secret(&self) -> Self {
        Self::public_only(self.public)
    }

    /// Open a sealed ciphertext into its plaintext word.
    pub fn unseal(&self, data: &str) -> Result<U256> {
        let secret = self.secret.as_ref().ok_or(PermsError::MissingPrivateKey)?;
        let plaintext = SealedEnvelope::from_hex(data)?.open(secret)?;
        if plaintext.len() != 32 {
            return Err(PermsError::DecryptionError(format!(
                "sealed plaintext must be 32 bytes, got {}",
                plaintext.len()
            )));
        }
        Ok(U256::from_be_slice(&plaintext))
    }

    /// Unseal a typed output.
    ///
    /// Bools compare the word to 1; addresses take its low 20 bytes.
    pub fn unseal_value(&self, sealed: &SealedValue) -> Result<Unsealed> {
        let word = self.unseal(&sealed.data)?;
        Ok(match sealed.kind() {
            SealedKind::Bool => Unsealed::Bool(word == U256::from(1u8)),
            SealedKind::Uint => Unsealed::Uint(word),
            SealedKind::Address => Unsealed::Address(address_from_u256(word)),
        })
    }

    /// Serializable form; includes the private key when present.
    pub fn to_serialized(&self) -> SerializedSealingPair {
        SerializedSealingPair {
            public_key: self.public.to_hex(),
            private_key: self.secret.as_ref().map(|s| hex::encode(s.to_bytes())),
        }
    }

    /// Rebuild from the serializable form.
    ///
    /// When a private key is present, the public key must match it.
    pub fn from_serialized(serialized: &SerializedSealingPair) -> Result<Self> {
        let public = X25519PublicKey::from_hex(&serialized.public_key)?;
        match &serialized.private_key {
            None => Ok(Self::public_only(public)),
            Some(private) => {
                let pair = Self::from_secret(X25519StaticSecret::from_hex(private)?);
                if pair.public != public {
                    return Err(PermsError::InvalidKey(
                        "public key does not match private key".into(),
                    ));
                }
                Ok(pair)
            }
        }
    }
}

impl fmt::Debug for SealingKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SealingKeyPair")
            .field("public", &self.public)
            .field("has_secret", &self.has_secret())
            .finish()
    }
}

impl PartialEq for SealingKeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.public == other.public
            && self.secret.as_ref().map(|s| s.to_bytes())
                == other.secret.as_ref().map(|s| s.to_bytes())
    }
}

impl Eq for SealingKeyPair {}

/// `{publicKey, privateKey?}` as hex strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedSealingPair {
    pub public_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
}

/// Seal a plaintext word for `recipient`, as a contract would for an output.
pub fn seal_output(value: U256, recipient: &X25519PublicKey) -> Result<String> {
    SealedEnvelope::seal(&value.to_be_bytes::<32>(), recipient)?.to_hex()
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_core::{Address, FheUType};

    #[test]
    fn test_seal_unseal_uint() {
        let pair = SealingKeyPair::generate();
        let data = seal_output(U256::from(42u64), &pair.public_key()).unwrap();
        assert_eq!(pair.unseal(&data).unwrap(), U256::from(42u64));
    }

    #[test]
    fn test_unseal_value_coercions() {
        let pair = SealingKeyPair::generate();
        let pk = pair.public_key();

        let one = SealedValue::with_utype(seal_output(U256::from(1u8), &pk).unwrap(), FheUType::Bool);
        assert_eq!(pair.unseal_value(&one).unwrap(), Unsealed::Bool(true));

        let zero =
            SealedValue::with_utype(seal_output(U256::ZERO, &pk).unwrap(), FheUType::Bool);
        assert_eq!(pair.unseal_value(&zero).unwrap(), Unsealed::Bool(false));

        let addr = Address::repeat_byte(0x22);
        let word = U256::from_be_slice(addr.as_slice());
        let sealed =
            SealedValue::with_utype(seal_output(word, &pk).unwrap(), FheUType::Address);
        assert_eq!(pair.unseal_value(&sealed).unwrap(), Unsealed::Address(addr));
    }

    #[test]
    fn test_public_only_cannot_unseal() {
        let pair = SealingKeyPair::generate();
        let data = seal_output(U256::from(1u8), &pair.public_key()).unwrap();
        assert!(matches!(
            pair.without_secret().unseal(&data),
            Err(PermsError::MissingPrivateKey)
        ));
    }

    #[test]
    fn test_serialized_form() {
        let pair = SealingKeyPair::generate();
        let serialized = pair.to_serialized();
        assert!(serialized.private_key.is_some());
        assert_eq!(SealingKeyPair::from_serialized(&serialized).unwrap(), pair);

        let public = pair.without_secret().to_serialized();
        let json = serde_json::to_string(&public).unwrap();
        assert!(!json.contains("privateKey"));
    }

    #[test]
    fn test_mismatched_serialized_pair_rejected() {
        let a = SealingKeyPair::generate().to_serialized();
        let b = SealingKeyPair::generate().to_serialized();
        let mixed = SerializedSealingPair {
            public_key: a.public_key,
            private_key: b.private_key,
        };
        assert!(SealingKeyPair::from_serialized(&mixed).is_err());
    }
}
