//! Persisted store shape.
//!
//! ```json
//! {
//!   "permits": { "<account>": { "<hash>": { ...SerializedPermit } } },
//!   "activePermitHash": { "<account>": "<hash>" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use veil_core::{Address, PermitHash};
use veil_perms::SerializedPermit;

use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermitStoreSnapshot {
    #[serde(default)]
    pub permits: BTreeMap<Address, BTreeMap<PermitHash, SerializedPermit>>,
    #[serde(default)]
    pub active_permit_hash: BTreeMap<Address, PermitHash>,
}

impl PermitStoreSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
