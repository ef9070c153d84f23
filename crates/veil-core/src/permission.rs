//! The permission descriptor passed to contracts.
//!
//! A contract call that reads confidential state takes a `Permission`
//! argument: the public subset of a permit, enough for the contract to
//! recheck the signatures and to know which sealing key to seal results for.

use serde::{Deserialize, Serialize};

use crate::types::{Address, Signature, B256};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub issuer: Address,
    pub expiration: u64,
    pub contracts: Vec<Address>,
    pub projects: Vec<String>,
    pub recipient: Address,
    pub validator_id: u32,
    pub validator_contract: Address,
    /// Sealing public key of the permit holder.
    pub sealing_key: B256,
    pub issuer_signature: Signature,
    pub recipient_signature: Signature,
}

impl Permission {
    /// Whether this permission was delegated to a recipient.
    pub fn is_shared(&self) -> bool {
        self.recipient != Address::ZERO
    }
}
