//! Plaintexts awaiting encryption, and the opaque wire form they become.
//!
//! An [`EncryptableValue`] is built by the caller right before an encrypt pass
//! and never persisted. Each variant holds a value of exactly its width, so an
//! out-of-range plaintext cannot be represented.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::types::{Address, U256};
use crate::utype::FheUType;

/// A plaintext of one of the encryptable FHE types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encryptable {
    Bool(bool),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Uint128(u128),
    Uint256(U256),
    Address(Address),
}

impl Encryptable {
    /// The FHE discriminant of this plaintext.
    pub fn utype(&self) -> FheUType {
        match self {
            Self::Bool(_) => FheUType::Bool,
            Self::Uint8(_) => FheUType::Uint8,
            Self::Uint16(_) => FheUType::Uint16,
            Self::Uint32(_) => FheUType::Uint32,
            Self::Uint64(_) => FheUType::Uint64,
            Self::Uint128(_) => FheUType::Uint128,
            Self::Uint256(_) => FheUType::Uint256,
            Self::Address(_) => FheUType::Address,
        }
    }

    /// Widen the plaintext to a 256-bit integer.
    ///
    /// Bools map to 0/1 and addresses to their big-endian integer value.
    pub fn to_u256(&self) -> U256 {
        match *self {
            Self::Bool(b) => U256::from(b as u8),
            Self::Uint8(v) => U256::from(v),
            Self::Uint16(v) => U256::from(v),
            Self::Uint32(v) => U256::from(v),
            Self::Uint64(v) => U256::from(v),
            Self::Uint128(v) => U256::from(v),
            Self::Uint256(v) => v,
            Self::Address(a) => U256::from_be_slice(a.as_slice()),
        }
    }

    /// Narrow a 256-bit integer into the variant named by `utype`.
    ///
    /// Fails when the value does not fit the width, so a `Uint8` can never
    /// hold 256 and a `Bool` can only hold 0 or 1.
    pub fn from_u256(utype: FheUType, value: U256) -> Result<Self> {
        if value.bit_len() > utype.bits() {
            return Err(CoreError::ValueOutOfRange {
                utype: utype.name(),
                value: value.to_string(),
            });
        }
        let limbs = value.as_limbs();
        let low = limbs[0];
        Ok(match utype {
            FheUType::Bool => Self::Bool(low == 1),
            FheUType::Uint8 => Self::Uint8(low as u8),
            FheUType::Uint16 => Self::Uint16(low as u16),
            FheUType::Uint32 => Self::Uint32(low as u32),
            FheUType::Uint64 => Self::Uint64(low),
            FheUType::Uint128 => Self::Uint128(((limbs[1] as u128) << 64) | low as u128),
            FheUType::Uint256 => Self::Uint256(value),
            FheUType::Address => Self::Address(address_from_u256(value)),
        })
    }
}

/// A plaintext plus the security zone it is to be encrypted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncryptableValue {
    pub item: Encryptable,
    pub security_zone: i32,
}

impl EncryptableValue {
    /// Wrap a plaintext in the default security zone (0).
    pub fn new(item: Encryptable) -> Self {
        Self {
            item,
            security_zone: 0,
        }
    }

    pub fn bool(value: bool) -> Self {
        Self::new(Encryptable::Bool(value))
    }

    pub fn uint8(value: u8) -> Self {
        Self::new(Encryptable::Uint8(value))
    }

    pub fn uint16(value: u16) -> Self {
        Self::new(Encryptable::Uint16(value))
    }

    pub fn uint32(value: u32) -> Self {
        Self::new(Encryptable::Uint32(value))
    }

    pub fn uint64(value: u64) -> Self {
        Self::new(Encryptable::Uint64(value))
    }

    pub fn uint128(value: u128) -> Self {
        Self::new(Encryptable::Uint128(value))
    }

    pub fn uint256(value: U256) -> Self {
        Self::new(Encryptable::Uint256(value))
    }

    pub fn address(value: Address) -> Self {
        Self::new(Encryptable::Address(value))
    }

    /// Set the security zone.
    pub fn with_security_zone(mut self, zone: i32) -> Self {
        self.security_zone = zone;
        self
    }

    /// The FHE discriminant of the wrapped plaintext.
    pub fn utype(&self) -> FheUType {
        self.item.utype()
    }

    /// Build from a raw discriminant code and a widened value.
    ///
    /// Used where plaintexts arrive untyped; unknown codes are rejected.
    pub fn from_parts(code: u8, value: U256, security_zone: i32) -> Result<Self> {
        let utype = FheUType::try_from(code)?;
        Ok(Self {
            item: Encryptable::from_u256(utype, value)?,
            security_zone,
        })
    }
}

/// An encrypted input, as returned by the encryption primitive.
///
/// The ciphertext is opaque to Veil; only the tag travels alongside it so the
/// receiving contract can validate type and zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedValue {
    pub data: Bytes,
    pub utype: FheUType,
    pub security_zone: i32,
}

impl EncryptedValue {
    pub fn new(data: impl Into<Bytes>, utype: FheUType, security_zone: i32) -> Self {
        Self {
            data: data.into(),
            utype,
            security_zone,
        }
    }
}

/// Interpret the low 160 bits of a word as an address.
pub fn address_from_u256(value: U256) -> Address {
    let bytes = value.to_be_bytes::<32>();
    Address::from_slice(&bytes[12..])
}
