//! Call argument and result trees.
//!
//! `CallValue` is the closed value type the transform engine walks. Containers
//! are lists (variable length), tuples (fixed length, indexed positionally by
//! callers) and records. Everything else is a leaf; only the FHE leaves are
//! ever replaced.

use bytes::Bytes;
use std::collections::BTreeMap;

use crate::encryptable::{EncryptableValue, EncryptedValue};
use crate::permission::Permission;
use crate::sealed::{SealedValue, Unsealed};
use crate::types::{Address, U256};

/// Sentinel string that stands for "the caller's current permission".
pub const PERMISSION_PLACEHOLDER: &str = "populate-fhenix-permission";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallValue {
    Null,
    Bool(bool),
    Uint(U256),
    Int(i128),
    Address(Address),
    Bytes(Bytes),
    Text(String),
    List(Vec<CallValue>),
    Tuple(Vec<CallValue>),
    Record(BTreeMap<String, CallValue>),
    /// Plaintext to be encrypted before the call is sent.
    Encryptable(EncryptableValue),
    /// Output of the encryption primitive.
    Encrypted(EncryptedValue),
    /// Ciphertext sealed for the caller, as returned by a contract.
    Sealed(SealedValue),
    Unsealed(Unsealed),
    /// Replaced by the active permit's [`Permission`] on encrypt.
    PermissionPlaceholder,
    Permission(Box<Permission>),
}

impl CallValue {
    pub fn record<K: Into<String>>(fields: impl IntoIterator<Item = (K, CallValue)>) -> Self {
        Self::Record(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn list(items: impl IntoIterator<Item = CallValue>) -> Self {
        Self::List(items.into_iter().collect())
    }

    pub fn tuple(items: impl IntoIterator<Item = CallValue>) -> Self {
        Self::Tuple(items.into_iter().collect())
    }

    pub fn uint(value: impl Into<U256>) -> Self {
        Self::Uint(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Self::List(_) | Self::Tuple(_) | Self::Record(_))
    }

    /// Field of a record.
    pub fn get(&self, key: &str) -> Option<&CallValue> {
        match self {
            Self::Record(fields) => fields.get(key),
            _ => None,
        }
    }

    /// Element of a list or tuple.
    pub fn at(&self, index: usize) -> Option<&CallValue> {
        match self {
            Self::List(items) | Self::Tuple(items) => items.get(index),
            _ => None,
        }
    }

    /// Count leaves (non-container nodes) matching `pred`.
    pub fn count_leaves(&self, pred: &impl Fn(&CallValue) -> bool) -> usize {
        match self {
            Self::List(items) | Self::Tuple(items) => {
                items.iter().map(|v| v.count_leaves(pred)).sum()
            }
            Self::Record(fields) => fields.values().map(|v| v.count_leaves(pred)).sum(),
            leaf => usize::from(pred(leaf)),
        }
    }

    /// Whether any FHE leaf (encryptable, placeholder or sealed) is present.
    pub fn has_fhe_leaves(&self) -> bool {
        self.count_leaves(&|v| {
            matches!(
                v,
                Self::Encryptable(_) | Self::PermissionPlaceholder | Self::Sealed(_)
            )
        }) > 0
    }
}

impl From<bool> for CallValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<U256> for CallValue {
    fn from(v: U256) -> Self {
        Self::Uint(v)
    }
}

impl From<u64> for CallValue {
    fn from(v: u64) -> Self {
        Self::Uint(U256::from(v))
    }
}

impl From<Address> for CallValue {
    fn from(v: Address) -> Self {
        Self::Address(v)
    }
}

impl From<&str> for CallValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for CallValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<EncryptableValue> for CallValue {
    fn from(v: EncryptableValue) -> Self {
        Self::Encryptable(v)
    }
}

impl From<SealedValue> for CallValue {
    fn from(v: SealedValue) -> Self {
        Self::Sealed(v)
    }
}

impl From<Unsealed> for CallValue {
    fn from(v: Unsealed) -> Self {
        Self::Unsealed(v)
    }
}

impl From<Permission> for CallValue {
    fn from(v: Permission) -> Self {
        Self::Permission(Box::new(v))
    }
}

impl<T: Into<CallValue>> From<Option<T>> for CallValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}
