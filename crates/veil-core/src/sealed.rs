//! Sealed outputs and their plaintext counterparts.
//!
//! A contract re-encrypts a confidential result for the caller's sealing
//! public key and returns it as a [`SealedValue`]. On the output side the
//! protocol does not distinguish integer widths.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;
use crate::types::{Address, U256};
use crate::utype::FheUType;

/// Coarse class of a sealed output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SealedKind {
    Bool,
    Uint,
    Address,
}

impl From<FheUType> for SealedKind {
    fn from(utype: FheUType) -> Self {
        match utype {
            FheUType::Bool => Self::Bool,
            FheUType::Address => Self::Address,
            _ => Self::Uint,
        }
    }
}

/// A ciphertext sealed for one sealing public key.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SealedValue {
    /// Opaque ciphertext, as produced by the sealing primitive.
    pub data: String,
    pub utype: FheUType,
}

impl SealedValue {
    /// Build from a raw discriminant code; unknown codes are rejected.
    pub fn new(data: impl Into<String>, code: u8) -> Result<Self> {
        Ok(Self {
            data: data.into(),
            utype: FheUType::try_from(code)?,
        })
    }

    pub fn with_utype(data: impl Into<String>, utype: FheUType) -> Self {
        Self {
            data: data.into(),
            utype,
        }
    }

    pub fn kind(&self) -> SealedKind {
        self.utype.into()
    }
}

impl fmt::Debug for SealedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown: String = self.data.chars().take(18).collect();
        write!(f, "SealedValue({}, {}..)", self.utype, shown)
    }
}

/// A decrypted output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Unsealed {
    Bool(bool),
    Address(Address),
    Uint(U256),
}

impl Unsealed {
    pub fn kind(&self) -> SealedKind {
        match self {
            Self::Bool(_) => SealedKind::Bool,
            Self::Uint(_) => SealedKind::Uint,
            Self::Address(_) => SealedKind::Address,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<U256> {
        match self {
            Self::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<Address> {
        match self {
            Self::Address(a) => Some(*a),
            _ => None,
        }
    }
}
