//! Encrypt direction.
//!
//! Replaces every [`CallValue::Encryptable`] leaf with the output of an
//! [`Encryptor`] and every [`CallValue::PermissionPlaceholder`] with the
//! caller's [`Permission`]. The pass is all-or-nothing: when any replacement
//! is impossible the result is `None`, never a partially encrypted tree.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use veil_core::{CallValue, EncryptableValue, EncryptedValue, Permission};
use veil_perms::X25519PublicKey;

use crate::error::{CallError, Result};
use crate::transform::{map_leaves, visit_leaves, LeafPath};

/// The opaque encryption primitive.
#[async_trait]
pub trait Encryptor: Send + Sync {
    /// Encrypt one plaintext for `target`.
    async fn encrypt(
        &self,
        value: &EncryptableValue,
        target: &X25519PublicKey,
    ) -> Result<EncryptedValue>;
}

#[async_trait]
impl<E: Encryptor + ?Sized> Encryptor for Arc<E> {
    async fn encrypt(
        &self,
        value: &EncryptableValue,
        target: &X25519PublicKey,
    ) -> Result<EncryptedValue> {
        (**self).encrypt(value, target).await
    }
}

/// An encryptor together with the key it encrypts for.
#[derive(Clone, Copy)]
pub struct EncryptionTarget<'a> {
    pub encryptor: &'a dyn Encryptor,
    pub public_key: X25519PublicKey,
}

impl<'a> EncryptionTarget<'a> {
    pub fn new(encryptor: &'a dyn Encryptor, public_key: X25519PublicKey) -> Self {
        Self {
            encryptor,
            public_key,
        }
    }
}

/// What an encrypt pass over a tree would need.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncryptNeeds {
    pub encryptables: usize,
    pub placeholders: usize,
}

impl EncryptNeeds {
    pub fn of(tree: &CallValue) -> Self {
        let mut needs = Self::default();
        visit_leaves(tree, &mut |_, leaf| match leaf {
            CallValue::Encryptable(_) => needs.encryptables += 1,
            CallValue::PermissionPlaceholder => needs.placeholders += 1,
            _ => {}
        });
        needs
    }

    pub fn is_empty(&self) -> bool {
        self.encryptables == 0 && self.placeholders == 0
    }
}

/// Encrypt every encryptable leaf of `tree` and fill in permission
/// placeholders.
///
/// Returns `Ok(None)` when the tree has encryptable leaves but no target, or
/// placeholders but no permission. Failures of the primitive itself are
/// errors.
pub async fn encrypt_tree(
    tree: &CallValue,
    target: Option<EncryptionTarget<'_>>,
    permission: Option<&Permission>,
) -> Result<Option<CallValue>> {
    let needs = EncryptNeeds::of(tree);
    if needs.is_empty() {
        return Ok(Some(tree.clone()));
    }
    if needs.placeholders > 0 && permission.is_none() {
        debug!(placeholders = needs.placeholders, "no permission to populate");
        return Ok(None);
    }

    let mut ciphertexts = Vec::with_capacity(needs.encryptables);
    if needs.encryptables > 0 {
        let Some(target) = target else {
            debug!(encryptables = needs.encryptables, "no encryption target");
            return Ok(None);
        };

        let mut plaintexts = Vec::with_capacity(needs.encryptables);
        visit_leaves(tree, &mut |_, leaf| {
            if let CallValue::Encryptable(value) = leaf {
                plaintexts.push(*value);
            }
        });
        for value in &plaintexts {
            let encrypted = target.encryptor.encrypt(value, &target.public_key).await?;
            if encrypted.utype != value.utype() {
                return Err(CallError::Encryption(format!(
                    "encryptor returned {} for a {} input",
                    encrypted.utype,
                    value.utype()
                )));
            }
            ciphertexts.push(encrypted);
        }
    }

    let mut ciphertexts = ciphertexts.into_iter();
    let out = map_leaves(
        tree,
        &mut |path: &LeafPath, leaf: &CallValue| -> Result<Option<CallValue>> {
            match leaf {
                CallValue::Encryptable(_) => ciphertexts
                    .next()
                    .map(|c| Some(CallValue::Encrypted(c)))
                    .ok_or_else(|| CallError::Encryption(format!("no ciphertext for {path}"))),
                CallValue::PermissionPlaceholder => Ok(permission.cloned().map(CallValue::from)),
                _ => Ok(None),
            }
        },
    )?;

    debug!(
        encryptables = needs.encryptables,
        placeholders = needs.placeholders,
        "encrypted call arguments"
    );
    Ok(Some(out))
}
