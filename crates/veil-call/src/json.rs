//! JSON boundary adapters.
//!
//! Call arguments and results arrive from hosts as JSON. Tagged leaves are
//! recognised by shape, and which shapes count depends on the direction:
//!
//! - Arguments: `"populate-fhenix-permission"` is the permission placeholder,
//!   and `{ "data": <plaintext>, "utype": n }` with an optional
//!   `"securityZone"` is an encryptable input. String data is a plaintext
//!   too (addresses, big integers), never a ciphertext.
//! - Results: `{ "data": "<ciphertext>", "utype": n }` is a sealed output.
//!
//! An object of a recognised shape whose `utype` is outside the closed code
//! set is handled according to [`LeafPolicy`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use veil_core::{
    Address, CallValue, Encryptable, EncryptableValue, FheUType, SealedValue, Unsealed, U256,
    PERMISSION_PLACEHOLDER,
};

use crate::error::{CallError, Result};
use crate::transform::{LeafPath, PathSegment};

/// What to do with a tagged object carrying an unknown `utype`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeafPolicy {
    /// Keep it as an ordinary record.
    #[default]
    PassThrough,
    /// Fail with [`CallError::UnrecognizedLeaf`].
    Reject,
}

/// Which side of a call a JSON tree belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonDirection {
    /// Call arguments, before encryption.
    Arguments,
    /// Call results, before unsealing.
    Results,
}

/// Convert host JSON into a call tree.
pub fn from_json(
    value: &Value,
    direction: JsonDirection,
    policy: LeafPolicy,
) -> Result<CallValue> {
    let mut path = LeafPath::root();
    Reader { direction, policy }.read(value, &mut path)
}

#[derive(Clone, Copy)]
struct Reader {
    direction: JsonDirection,
    policy: LeafPolicy,
}

impl Reader {
    fn read(self, value: &Value, path: &mut LeafPath) -> Result<CallValue> {
        Ok(match value {
            Value::Null => CallValue::Null,
            Value::Bool(b) => CallValue::Bool(*b),
            Value::Number(n) => number_value(n, path)?,
            Value::String(s)
                if self.direction == JsonDirection::Arguments && s == PERMISSION_PLACEHOLDER =>
            {
                CallValue::PermissionPlaceholder
            }
            Value::String(s) => CallValue::Text(s.clone()),
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    path.push(PathSegment::Index(i));
                    let converted = self.read(item, path);
                    path.pop();
                    out.push(converted?);
                }
                CallValue::List(out)
            }
            Value::Object(map) => {
                if let Some(leaf) = self.tagged_leaf(map, path)? {
                    return Ok(leaf);
                }
                let mut fields = std::collections::BTreeMap::new();
                for (name, child) in map {
                    path.push(PathSegment::Field(name.clone()));
                    let converted = self.read(child, path);
                    path.pop();
                    fields.insert(name.clone(), converted?);
                }
                CallValue::Record(fields)
            }
        })
    }

    fn tagged_leaf(self, map: &Map<String, Value>, path: &LeafPath) -> Result<Option<CallValue>> {
        let (Some(data), Some(code)) = (map.get("data"), map.get("utype").and_then(Value::as_u64))
        else {
            return Ok(None);
        };
        let shape_matches = match self.direction {
            JsonDirection::Arguments => map
                .keys()
                .all(|k| matches!(k.as_str(), "data" | "utype" | "securityZone")),
            JsonDirection::Results => map.len() == 2 && data.is_string(),
        };
        if !shape_matches {
            return Ok(None);
        }

        let Some(utype) = u8::try_from(code).ok().and_then(FheUType::from_code) else {
            return match self.policy {
                LeafPolicy::PassThrough => {
                    warn!(%path, utype = code, "passing through leaf with unrecognized utype");
                    Ok(None)
                }
                LeafPolicy::Reject => Err(CallError::UnrecognizedLeaf {
                    path: path.to_string(),
                    utype: code,
                }),
            };
        };

        match (self.direction, data) {
            (JsonDirection::Results, Value::String(ciphertext)) => Ok(Some(CallValue::Sealed(
                SealedValue::with_utype(ciphertext.clone(), utype),
            ))),
            (JsonDirection::Results, _) => Ok(None),
            (JsonDirection::Arguments, data) => {
                let security_zone = match map.get("securityZone") {
                    None => 0,
                    Some(z) => z
                        .as_i64()
                        .and_then(|z| i32::try_from(z).ok())
                        .ok_or_else(|| invalid(path, format!("bad securityZone {z}")))?,
                };
                let word = plaintext_word(data, utype, path)?;
                Ok(Some(CallValue::Encryptable(EncryptableValue {
                    item: Encryptable::from_u256(utype, word)?,
                    security_zone,
                })))
            }
        }
    }
}

fn number_value(n: &serde_json::Number, path: &LeafPath) -> Result<CallValue> {
    if let Some(u) = n.as_u64() {
        Ok(CallValue::Uint(U256::from(u)))
    } else if let Some(i) = n.as_i64() {
        Ok(CallValue::Int(i128::from(i)))
    } else {
        Err(invalid(path, format!("non-integer number {n}")))
    }
}

fn plaintext_word(data: &Value, utype: FheUType, path: &LeafPath) -> Result<U256> {
    match data {
        Value::Bool(b) => Ok(U256::from(u8::from(*b))),
        Value::Number(n) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| invalid(path, format!("plaintext {n} is not an unsigned integer"))),
        Value::String(s) if utype == FheUType::Address => s
            .parse::<Address>()
            .map(|a| U256::from_be_slice(a.as_slice()))
            .map_err(|e| invalid(path, format!("bad address {s}: {e}"))),
        Value::String(s) => s
            .parse::<U256>()
            .map_err(|e| invalid(path, format!("bad integer {s}: {e}"))),
        other => Err(invalid(path, format!("unsupported plaintext {other}"))),
    }
}

fn invalid(path: &LeafPath, reason: String) -> CallError {
    CallError::InvalidJson {
        path: path.to_string(),
        reason,
    }
}

/// Convert a call tree into host JSON.
///
/// Tuples become arrays; integers beyond `u64`/`i64` become decimal strings.
pub fn to_json(value: &CallValue) -> Result<Value> {
    Ok(match value {
        CallValue::Null => Value::Null,
        CallValue::Bool(b) => Value::Bool(*b),
        CallValue::Uint(v) => uint_json(*v),
        CallValue::Int(i) => i64::try_from(*i)
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(i.to_string())),
        CallValue::Address(a) => Value::String(a.to_string()),
        CallValue::Bytes(b) => Value::String(format!("0x{}", hex::encode(b))),
        CallValue::Text(s) => Value::String(s.clone()),
        CallValue::List(items) | CallValue::Tuple(items) => {
            Value::Array(items.iter().map(to_json).collect::<Result<_>>()?)
        }
        CallValue::Record(fields) => Value::Object(
            fields
                .iter()
                .map(|(k, v)| Ok((k.clone(), to_json(v)?)))
                .collect::<Result<_>>()?,
        ),
        CallValue::Encryptable(v) => {
            let data = match v.item {
                Encryptable::Bool(b) => Value::Bool(b),
                Encryptable::Address(a) => Value::String(a.to_string()),
                other => uint_json(other.to_u256()),
            };
            serde_json::json!({
                "data": data,
                "securityZone": v.security_zone,
                "utype": v.utype().code(),
            })
        }
        CallValue::Encrypted(v) => serde_json::json!({
            "data": format!("0x{}", hex::encode(&v.data)),
            "securityZone": v.security_zone,
            "utype": v.utype.code(),
        }),
        CallValue::Sealed(v) => serde_json::json!({
            "data": v.data,
            "utype": v.utype.code(),
        }),
        CallValue::Unsealed(Unsealed::Bool(b)) => Value::Bool(*b),
        CallValue::Unsealed(Unsealed::Uint(v)) => uint_json(*v),
        CallValue::Unsealed(Unsealed::Address(a)) => Value::String(a.to_string()),
        CallValue::PermissionPlaceholder => Value::String(PERMISSION_PLACEHOLDER.to_string()),
        CallValue::Permission(p) => serde_json::to_value(p).map_err(|e| CallError::InvalidJson {
            path: "permission".into(),
            reason: e.to_string(),
        })?,
    })
}

fn uint_json(v: U256) -> Value {
    u64::try_from(v)
        .map(Value::from)
        .unwrap_or_else(|_| Value::String(v.to_string()))
}
