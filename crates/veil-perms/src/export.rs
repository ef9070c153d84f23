//! Serialized permit forms.
//!
//! - [`SerializedPermit`] is the full persisted record, private key included
//!   when the local holder has one. It never leaves the local store.
//! - [`OwnPermitExport`] is the export of one's own Self/Recipient permit and
//!   carries the private sealing key.
//! - [`SharingPermitExport`] is what an issuer hands to a recipient. The type
//!   has no key fields at all, so private material cannot end up in it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use veil_core::{Address, Signature};

use crate::error::{PermsError, Result};
use crate::permit::{Permit, PermitKind};
use crate::sealing::{SealingKeyPair, SerializedSealingPair};

/// Persisted permit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedPermit {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PermitKind,
    pub issuer: Address,
    pub expiration: u64,
    #[serde(default)]
    pub contracts: Vec<Address>,
    #[serde(default)]
    pub projects: Vec<String>,
    #[serde(default)]
    pub recipient: Address,
    #[serde(default)]
    pub validator_id: u32,
    #[serde(default)]
    pub validator_contract: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sealing_pair: Option<SerializedSealingPair>,
    #[serde(default)]
    pub issuer_signature: Signature,
    #[serde(default)]
    pub recipient_signature: Signature,
}

impl Permit {
    pub fn to_serialized(&self) -> SerializedPermit {
        SerializedPermit {
            name: self.name.clone(),
            kind: self.kind,
            issuer: self.issuer,
            expiration: self.expiration,
            contracts: self.contracts.iter().copied().collect(),
            projects: self.projects.iter().cloned().collect(),
            recipient: self.recipient,
            validator_id: self.validator_id,
            validator_contract: self.validator_contract,
            sealing_pair: self.sealing_pair.as_ref().map(SealingKeyPair::to_serialized),
            issuer_signature: self.issuer_signature.clone(),
            recipient_signature: self.recipient_signature.clone(),
        }
    }

    /// Rebuild a permit, checking its fields are consistent with its kind.
    pub fn from_serialized(s: &SerializedPermit) -> Result<Permit> {
        let sealing_pair = s
            .sealing_pair
            .as_ref()
            .map(SealingKeyPair::from_serialized)
            .transpose()?;

        match s.kind {
            PermitKind::Own => {
                if sealing_pair.is_none() {
                    return Err(invalid("self permit without sealing key"));
                }
                if s.recipient != Address::ZERO || !s.recipient_signature.is_empty() {
                    return Err(invalid("self permit cannot name a recipient"));
                }
            }
            PermitKind::Sharing => {
                if s.recipient == Address::ZERO {
                    return Err(invalid("sharing permit without recipient"));
                }
                if sealing_pair.is_some() || !s.recipient_signature.is_empty() {
                    return Err(invalid("sharing permit cannot carry recipient material"));
                }
            }
            PermitKind::Recipient => {
                if s.recipient == Address::ZERO {
                    return Err(invalid("recipient permit without recipient"));
                }
                if sealing_pair.is_none() {
                    return Err(invalid("recipient permit without sealing key"));
                }
            }
        }

        Ok(Permit {
            name: s.name.clone(),
            kind: s.kind,
            issuer: s.issuer,
            expiration: s.expiration,
            contracts: s.contracts.iter().copied().collect::<BTreeSet<_>>(),
            projects: s.projects.iter().cloned().collect::<BTreeSet<_>>(),
            recipient: s.recipient,
            validator_id: s.validator_id,
            validator_contract: s.validator_contract,
            sealing_pair,
            issuer_signature: s.issuer_signature.clone(),
            recipient_signature: s.recipient_signature.clone(),
        })
    }

    /// Export one's own Self or Recipient permit, private key included.
    pub fn export_own(&self) -> Result<OwnPermitExport> {
        if self.kind == PermitKind::Sharing {
            return Err(PermsError::InvalidPermit(
                "sharing permits are exported with export_sharing".into(),
            ));
        }
        Ok(OwnPermitExport(self.to_serialized()))
    }

    /// Export the issuer-signed sharing statement for its recipient.
    pub fn export_sharing(&self) -> Result<SharingPermitExport> {
        if self.kind != PermitKind::Sharing {
            return Err(PermsError::InvalidPermit(
                "only sharing permits can be shared".into(),
            ));
        }
        Ok(SharingPermitExport {
            name: self.name.clone(),
            kind: SharingTag::Sharing,
            issuer: self.issuer,
            expiration: self.expiration,
            contracts: self.contracts.iter().copied().collect(),
            projects: self.projects.iter().cloned().collect(),
            recipient: self.recipient,
            validator_id: self.validator_id,
            validator_contract: self.validator_contract,
            issuer_signature: self.issuer_signature.clone(),
        })
    }
}

fn invalid(msg: &str) -> PermsError {
    PermsError::InvalidPermit(msg.to_string())
}

/// Export of a Self or Recipient permit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnPermitExport(pub SerializedPermit);

impl OwnPermitExport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.0)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SharingTag {
    Sharing,
}

/// Export of a Sharing permit; holds no key material by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SharingPermitExport {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SharingTag,
    pub issuer: Address,
    pub expiration: u64,
    pub contracts: Vec<Address>,
    pub projects: Vec<String>,
    pub recipient: Address,
    pub validator_id: u32,
    pub validator_contract: Address,
    pub issuer_signature: Signature,
}

impl SharingPermitExport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The record in storage form.
    pub fn to_serialized(&self) -> SerializedPermit {
        SerializedPermit {
            name: self.name.clone(),
            kind: PermitKind::Sharing,
            issuer: self.issuer,
            expiration: self.expiration,
            contracts: self.contracts.clone(),
            projects: self.projects.clone(),
            recipient: self.recipient,
            validator_id: self.validator_id,
            validator_contract: self.validator_contract,
            sealing_pair: None,
            issuer_signature: self.issuer_signature.clone(),
            recipient_signature: Signature::EMPTY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permit::PermitBuilder;
    use crate::signer::LocalSigner;
    use crate::typed_data::TypedDataDomain;

    #[tokio::test]
    async fn test_serialized_roundtrip_keeps_hash() {
        let alice = LocalSigner::from_seed(&[1; 32]);
        let permit = PermitBuilder::new(alice.local_address())
            .name("mine")
            .expiration(2_000_000_000)
            .contract(Address::repeat_byte(0xaa))
            .project("FHERC20")
            .sign_self(&alice, &TypedDataDomain::default())
            .await
            .unwrap();

        let json = serde_json::to_string(&permit.to_serialized()).unwrap();
        let parsed: SerializedPermit = serde_json::from_str(&json).unwrap();
        let restored = Permit::from_serialized(&parsed).unwrap();

        assert_eq!(restored, permit);
        assert_eq!(restored.hash().unwrap(), permit.hash().unwrap());
        assert!(restored.can_unseal());
    }

    #[tokio::test]
    async fn test_sharing_export_has_no_key_material() {
        let alice = LocalSigner::from_seed(&[1; 32]);
        let bob = LocalSigner::from_seed(&[2; 32]);
        let sharing = PermitBuilder::new(alice.local_address())
            .contract(Address::repeat_byte(0xaa))
            .sign_sharing(bob.local_address(), &alice, &TypedDataDomain::default())
            .await
            .unwrap();

        let json = sharing.export_sharing().unwrap().to_json().unwrap();
        assert!(!json.contains("sealingPair"));
        assert!(!json.contains("privateKey"));
        assert!(json.contains("\"type\": \"sharing\""));
        assert!(sharing.export_own().is_err());
    }

    #[tokio::test]
    async fn test_own_export_includes_private_key() {
        let alice = LocalSigner::from_seed(&[1; 32]);
        let permit = PermitBuilder::new(alice.local_address())
            .contract(Address::repeat_byte(0xaa))
            .sign_self(&alice, &TypedDataDomain::default())
            .await
            .unwrap();

        let json = permit.export_own().unwrap().to_json().unwrap();
        assert!(json.contains("privateKey"));
        assert!(json.contains("\"type\": \"self\""));
        assert!(permit.export_sharing().is_err());
    }

    #[test]
    fn test_sharing_export_rejects_extra_fields() {
        let json = r#"{
            "name": "x", "type": "sharing",
            "issuer": "0x1111111111111111111111111111111111111111",
            "expiration": 1, "contracts": [], "projects": [],
            "recipient": "0x2222222222222222222222222222222222222222",
            "validatorId": 0,
            "validatorContract": "0x0000000000000000000000000000000000000000",
            "issuerSignature": "0x01",
            "sealingPair": {"publicKey": "00", "privateKey": "00"}
        }"#;
        assert!(serde_json::from_str::<SharingPermitExport>(json).is_err());
    }

    #[test]
    fn test_inconsistent_kind_rejected() {
        let record = SerializedPermit {
            name: "bad".into(),
            kind: PermitKind::Own,
            issuer: Address::repeat_byte(1),
            expiration: 1,
            contracts: vec![],
            projects: vec![],
            recipient: Address::ZERO,
            validator_id: 0,
            validator_contract: Address::ZERO,
            sealing_pair: None,
            issuer_signature: Signature::EMPTY,
            recipient_signature: Signature::EMPTY,
        };
        assert!(matches!(
            Permit::from_serialized(&record),
            Err(PermsError::InvalidPermit(_))
        ));
    }
}
