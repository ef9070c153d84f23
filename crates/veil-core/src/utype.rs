//! FHE type discriminants.
//!
//! The on-chain runtime tags every ciphertext with a small integer code. The
//! set is closed: anything outside it is rejected when values are built
//! internally.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};

/// Discriminant of an encrypted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum FheUType {
    Uint8 = 0,
    Uint16 = 1,
    Uint32 = 2,
    Uint64 = 3,
    Uint128 = 4,
    Uint256 = 5,
    Address = 12,
    Bool = 13,
}

impl FheUType {
    /// Every recognised discriminant.
    pub const ALL: [FheUType; 8] = [
        FheUType::Bool,
        FheUType::Uint8,
        FheUType::Uint16,
        FheUType::Uint32,
        FheUType::Uint64,
        FheUType::Uint128,
        FheUType::Uint256,
        FheUType::Address,
    ];

    /// The integer discriminants, narrowest first.
    pub const UINT: [FheUType; 6] = [
        FheUType::Uint8,
        FheUType::Uint16,
        FheUType::Uint32,
        FheUType::Uint64,
        FheUType::Uint128,
        FheUType::Uint256,
    ];

    /// Convert to the wire code.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Look up a wire code. Returns `None` for codes outside the closed set.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Uint8),
            1 => Some(Self::Uint16),
            2 => Some(Self::Uint32),
            3 => Some(Self::Uint64),
            4 => Some(Self::Uint128),
            5 => Some(Self::Uint256),
            12 => Some(Self::Address),
            13 => Some(Self::Bool),
            _ => None,
        }
    }

    /// Check if this is one of the unsigned integer discriminants.
    pub fn is_uint(self) -> bool {
        self.code() <= 5
    }

    /// Bit width of the plaintext.
    pub fn bits(self) -> usize {
        match self {
            Self::Bool => 1,
            Self::Uint8 => 8,
            Self::Uint16 => 16,
            Self::Uint32 => 32,
            Self::Uint64 => 64,
            Self::Uint128 => 128,
            Self::Uint256 => 256,
            Self::Address => 160,
        }
    }

    /// Human-readable name, as used in contract ABIs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Uint128 => "uint128",
            Self::Uint256 => "uint256",
            Self::Address => "address",
        }
    }
}

impl fmt::Display for FheUType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for FheUType {
    type Error = CoreError;

    fn try_from(code: u8) -> Result<Self> {
        Self::from_code(code).ok_or(CoreError::UnknownUType(code))
    }
}

impl From<FheUType> for u8 {
    fn from(utype: FheUType) -> Self {
        utype.code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_roundtrip() {
        for utype in FheUType::ALL {
            assert_eq!(FheUType::from_code(utype.code()), Some(utype));
        }
    }

    #[test]
    fn test_unknown_codes() {
        for code in [6u8, 7, 11, 14, 255] {
            assert!(FheUType::from_code(code).is_none());
            assert!(matches!(
                FheUType::try_from(code),
                Err(CoreError::UnknownUType(c)) if c == code
            ));
        }
    }

    #[test]
    fn test_uint_classification() {
        assert!(FheUType::UINT.iter().all(|u| u.is_uint()));
        assert!(!FheUType::Bool.is_uint());
        assert!(!FheUType::Address.is_uint());
    }

    #[test]
    fn test_serde_as_code() {
        let json = serde_json::to_string(&FheUType::Bool).unwrap();
        assert_eq!(json, "13");
        let parsed: FheUType = serde_json::from_str("2").unwrap();
        assert_eq!(parsed, FheUType::Uint32);
        assert!(serde_json::from_str::<FheUType>("9").is_err());
    }
}
