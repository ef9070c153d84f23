//! Typed structured-data hashing (EIP-712 style).
//!
//! Permits are signed as typed data: a domain, an ordered type map whose first
//! entry is the primary type, and a message. Only flat structs are needed, so
//! field types are limited to `address`, `uintN`, `bytes32`, `bytes`, `string`
//! and one-dimensional arrays of those.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use veil_core::{keccak256, Address, B256, U256};

use crate::error::{PermsError, Result};

/// Signing domain shared by every permit signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedDataDomain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl Default for TypedDataDomain {
    fn default() -> Self {
        Self {
            name: "Veil Permission".to_string(),
            version: "v2.0.0".to_string(),
            chain_id: 0,
            verifying_contract: Address::ZERO,
        }
    }
}

impl TypedDataDomain {
    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    pub fn with_verifying_contract(mut self, contract: Address) -> Self {
        self.verifying_contract = contract;
        self
    }

    /// `hashStruct(EIP712Domain)`.
    pub fn separator(&self) -> B256 {
        let type_hash = keccak256(
            "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)",
        );
        let mut buf = Vec::with_capacity(5 * 32);
        buf.extend_from_slice(type_hash.as_slice());
        buf.extend_from_slice(keccak256(self.name.as_bytes()).as_slice());
        buf.extend_from_slice(keccak256(self.version.as_bytes()).as_slice());
        buf.extend_from_slice(&U256::from(self.chain_id).to_be_bytes::<32>());
        buf.extend_from_slice(self.verifying_contract.into_word().as_slice());
        keccak256(&buf)
    }
}

/// One `type name` member of a struct type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

impl TypedField {
    pub fn new(name: &str, ty: &str) -> Self {
        Self {
            name: name.to_string(),
            ty: ty.to_string(),
        }
    }
}

/// Ordered type map; the first entry is the primary type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TypedDataTypes(Vec<(String, Vec<TypedField>)>);

impl TypedDataTypes {
    /// A map holding only `primary`.
    pub fn single(primary: &str, fields: Vec<TypedField>) -> Self {
        Self(vec![(primary.to_string(), fields)])
    }

    pub fn primary_type(&self) -> Option<&str> {
        self.0.first().map(|(name, _)| name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&[TypedField]> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, fields)| fields.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[TypedField])> {
        self.0.iter().map(|(n, f)| (n.as_str(), f.as_slice()))
    }

    /// `encodeType` of the primary type, e.g. `Mail(address to,string body)`.
    pub fn encode_type(&self) -> Result<String> {
        let (name, fields) = self
            .0
            .first()
            .ok_or_else(|| PermsError::TypedData("empty type map".into()))?;
        let members: Vec<String> = fields.iter().map(|f| format!("{} {}", f.ty, f.name)).collect();
        Ok(format!("{}({})", name, members.join(",")))
    }
}

/// A typed-data field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypedValue {
    Address(Address),
    Bytes32(B256),
    Uint(U256),
    Bytes(Vec<u8>),
    String(String),
    Array(Vec<TypedValue>),
}

/// Message fields keyed by name.
pub type TypedMessage = BTreeMap<String, TypedValue>;

/// `hashStruct(message)` for the primary type.
pub fn hash_struct(types: &TypedDataTypes, message: &TypedMessage) -> Result<B256> {
    let primary = types
        .primary_type()
        .ok_or_else(|| PermsError::TypedData("empty type map".into()))?;
    let fields = types.get(primary).unwrap_or_default();

    let mut buf = Vec::with_capacity((fields.len() + 1) * 32);
    buf.extend_from_slice(keccak256(types.encode_type()?.as_bytes()).as_slice());
    for field in fields {
        let value = message
            .get(&field.name)
            .ok_or_else(|| PermsError::TypedData(format!("missing field `{}`", field.name)))?;
        buf.extend_from_slice(&encode_field(&field.ty, value)?);
    }
    Ok(keccak256(&buf))
}

/// The digest a signer signs: `keccak256(0x1901 ‖ domainSeparator ‖ hashStruct)`.
pub fn signing_digest(
    domain: &TypedDataDomain,
    types: &TypedDataTypes,
    message: &TypedMessage,
) -> Result<B256> {
    let mut buf = Vec::with_capacity(66);
    buf.extend_from_slice(&[0x19, 0x01]);
    buf.extend_from_slice(domain.separator().as_slice());
    buf.extend_from_slice(hash_struct(types, message)?.as_slice());
    Ok(keccak256(&buf))
}

fn encode_field(ty: &str, value: &TypedValue) -> Result<[u8; 32]> {
    if let Some(elem_ty) = ty.strip_suffix("[]") {
        let TypedValue::Array(items) = value else {
            return Err(mismatch(ty, value));
        };
        let mut buf = Vec::with_capacity(items.len() * 32);
        for item in items {
            buf.extend_from_slice(&encode_field(elem_ty, item)?);
        }
        return Ok(keccak256(&buf).0);
    }

    match (ty, value) {
        ("address", TypedValue::Address(a)) => Ok(a.into_word().0),
        ("bytes32", TypedValue::Bytes32(b)) => Ok(b.0),
        ("bytes", TypedValue::Bytes(b)) => Ok(keccak256(b).0),
        ("string", TypedValue::String(s)) => Ok(keccak256(s.as_bytes()).0),
        (t, TypedValue::Uint(v)) if t.starts_with("uint") => Ok(v.to_be_bytes::<32>()),
        _ => Err(mismatch(ty, value)),
    }
}

fn mismatch(ty: &str, value: &TypedValue) -> PermsError {
    PermsError::TypedData(format!("value {value:?} does not match type `{ty}`"))
}
