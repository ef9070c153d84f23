//! Permits.
//!
//! A permit is a signed statement by an issuer that the holder of a sealing
//! key may read the issuer's confidential values in a set of contracts or
//! projects until an expiration. There are three kinds:
//!
//! - **Self**: the issuer holds the sealing key and signs over it.
//! - **Sharing**: the issuer signs a statement naming a recipient, without any
//!   sealing key. It is handed to the recipient and cannot unseal anything.
//! - **Recipient**: the recipient's copy of a sharing permit, with the
//!   recipient's own sealing key and a co-signature over
//!   `{sealingKey, issuerSignature}`.
//!
//! Every cryptographic field is fixed once signed; only the local `name`
//! label may change afterwards.

use ciborium::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use veil_core::canonical::{canonical_hash, int_map};
use veil_core::{now_secs, Address, Permission, PermitHash, Signature, U256};

use crate::error::{PermsError, Result};
use crate::sealing::SealingKeyPair;
use crate::signer::{SignatureVerifier, Signer};
use crate::typed_data::{TypedDataDomain, TypedDataTypes, TypedField, TypedMessage, TypedValue};

/// Key-derivation context for permit hashes.
const PERMIT_HASH_CONTEXT: &str = "veil-permit-v0-hash";

/// Expiration offset used when none is given: 24 hours.
pub const DEFAULT_EXPIRATION_SECS: u64 = 24 * 60 * 60;

pub const DEFAULT_PERMIT_NAME: &str = "Unnamed Permit";

/// Which signing scheme a permit follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermitKind {
    /// Issued by and for the same account.
    #[serde(rename = "self")]
    Own,
    Sharing,
    Recipient,
}

impl PermitKind {
    fn code(self) -> u8 {
        match self {
            Self::Own => 0,
            Self::Sharing => 1,
            Self::Recipient => 2,
        }
    }
}

/// Field keys in the canonical hash encoding.
mod keys {
    pub const KIND: u64 = 0;
    pub const ISSUER: u64 = 1;
    pub const EXPIRATION: u64 = 2;
    pub const CONTRACTS: u64 = 3;
    pub const PROJECTS: u64 = 4;
    pub const RECIPIENT: u64 = 5;
    pub const VALIDATOR_ID: u64 = 6;
    pub const VALIDATOR_CONTRACT: u64 = 7;
    pub const SEALING_KEY: u64 = 8;
}

/// Typed-data formats of the three signing payloads.
pub mod formats {
    use super::*;

    pub const SELF_TYPE: &str = "PermissionedV2IssuerSelf";
    pub const SHARING_TYPE: &str = "PermissionedV2IssuerShared";
    pub const RECIPIENT_TYPE: &str = "PermissionedV2Recipient";

    fn issuer_fields() -> Vec<TypedField> {
        vec![
            TypedField::new("issuer", "address"),
            TypedField::new("expiration", "uint64"),
            TypedField::new("contracts", "address[]"),
            TypedField::new("projects", "string[]"),
            TypedField::new("recipient", "address"),
            TypedField::new("validatorId", "uint256"),
            TypedField::new("validatorContract", "address"),
        ]
    }

    pub fn self_types() -> TypedDataTypes {
        let mut fields = issuer_fields();
        fields.push(TypedField::new("sealingKey", "bytes32"));
        TypedDataTypes::single(SELF_TYPE, fields)
    }

    pub fn sharing_types() -> TypedDataTypes {
        TypedDataTypes::single(SHARING_TYPE, issuer_fields())
    }

    pub fn recipient_types() -> TypedDataTypes {
        TypedDataTypes::single(
            RECIPIENT_TYPE,
            vec![
                TypedField::new("sealingKey", "bytes32"),
                TypedField::new("issuerSignature", "bytes"),
            ],
        )
    }
}

/// What a caller needs the permit to cover.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequirements {
    #[serde(default)]
    pub contracts: Vec<Address>,
    #[serde(default)]
    pub projects: Vec<String>,
}

impl AccessRequirements {
    pub fn contracts(contracts: impl IntoIterator<Item = Address>) -> Self {
        Self {
            contracts: contracts.into_iter().collect(),
            projects: Vec::new(),
        }
    }

    pub fn projects<S: Into<String>>(projects: impl IntoIterator<Item = S>) -> Self {
        Self {
            contracts: Vec::new(),
            projects: projects.into_iter().map(Into::into).collect(),
        }
    }
}

/// Why a permit is not currently usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PermitInvalid {
    #[error("permit expired")]
    Expired,
    #[error("permit is missing the issuer signature")]
    MissingIssuerSignature,
    #[error("permit is missing the recipient signature")]
    MissingRecipientSignature,
}

/// A signed access permit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permit {
    pub(crate) name: String,
    pub(crate) kind: PermitKind,
    pub(crate) issuer: Address,
    pub(crate) expiration: u64,
    pub(crate) contracts: BTreeSet<Address>,
    pub(crate) projects: BTreeSet<String>,
    pub(crate) recipient: Address,
    pub(crate) validator_id: u32,
    pub(crate) validator_contract: Address,
    pub(crate) sealing_pair: Option<SealingKeyPair>,
    pub(crate) issuer_signature: Signature,
    pub(crate) recipient_signature: Signature,
}

impl Permit {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Change the local label. Does not affect [`Permit::hash`].
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn kind(&self) -> PermitKind {
        self.kind
    }

    pub fn issuer(&self) -> Address {
        self.issuer
    }

    pub fn expiration(&self) -> u64 {
        self.expiration
    }

    pub fn contracts(&self) -> &BTreeSet<Address> {
        &self.contracts
    }

    pub fn projects(&self) -> &BTreeSet<String> {
        &self.projects
    }

    /// Zero for Self permits.
    pub fn recipient(&self) -> Address {
        self.recipient
    }

    pub fn validator_id(&self) -> u32 {
        self.validator_id
    }

    pub fn validator_contract(&self) -> Address {
        self.validator_contract
    }

    /// `None` for Sharing permits, which carry no sealing key.
    pub fn sealing_pair(&self) -> Option<&SealingKeyPair> {
        self.sealing_pair.as_ref()
    }

    pub fn issuer_signature(&self) -> &Signature {
        &self.issuer_signature
    }

    pub fn recipient_signature(&self) -> &Signature {
        &self.recipient_signature
    }

    pub fn has_issuer_signature(&self) -> bool {
        !self.issuer_signature.is_empty()
    }

    pub fn has_recipient_signature(&self) -> bool {
        !self.recipient_signature.is_empty()
    }

    /// Whether the holder can unseal with this permit.
    pub fn can_unseal(&self) -> bool {
        self.sealing_pair.as_ref().is_some_and(SealingKeyPair::has_secret)
    }

    pub fn is_expired_at(&self, now: u64) -> bool {
        now >= self.expiration
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_secs())
    }

    /// Check expiration and the signatures the kind requires.
    pub fn validate(&self, now: u64) -> std::result::Result<(), PermitInvalid> {
        if self.is_expired_at(now) {
            return Err(PermitInvalid::Expired);
        }
        if !self.has_issuer_signature() {
            return Err(PermitInvalid::MissingIssuerSignature);
        }
        if self.kind == PermitKind::Recipient && !self.has_recipient_signature() {
            return Err(PermitInvalid::MissingRecipientSignature);
        }
        Ok(())
    }

    /// Whether this permit fully covers one requirement dimension.
    ///
    /// Partial coverage of contracts never falls back to projects, or the
    /// reverse.
    pub fn satisfies(&self, req: &AccessRequirements) -> bool {
        let contracts_ok =
            !req.contracts.is_empty() && req.contracts.iter().all(|c| self.contracts.contains(c));
        let projects_ok =
            !req.projects.is_empty() && req.projects.iter().all(|p| self.projects.contains(p));
        contracts_ok || projects_ok
    }

    /// Identity: Blake3 over the canonical encoding of the signed fields.
    ///
    /// Excludes `name` and the signatures.
    pub fn hash(&self) -> Result<PermitHash> {
        let sealing_key = match &self.sealing_pair {
            Some(pair) => Value::Bytes(pair.public_key().as_bytes().to_vec()),
            None => Value::Null,
        };
        let value = int_map([
            (keys::KIND, Value::Integer(self.kind.code().into())),
            (keys::ISSUER, Value::Bytes(self.issuer.to_vec())),
            (keys::EXPIRATION, Value::Integer(self.expiration.into())),
            (
                keys::CONTRACTS,
                Value::Array(self.contracts.iter().map(|c| Value::Bytes(c.to_vec())).collect()),
            ),
            (
                keys::PROJECTS,
                Value::Array(self.projects.iter().map(|p| Value::Text(p.clone())).collect()),
            ),
            (keys::RECIPIENT, Value::Bytes(self.recipient.to_vec())),
            (keys::VALIDATOR_ID, Value::Integer(self.validator_id.into())),
            (
                keys::VALIDATOR_CONTRACT,
                Value::Bytes(self.validator_contract.to_vec()),
            ),
            (keys::SEALING_KEY, sealing_key),
        ]);
        let hash = canonical_hash(PERMIT_HASH_CONTEXT, &value)?;
        Ok(PermitHash::from_bytes(hash.0))
    }

    /// The descriptor passed to contracts. `None` without a sealing key.
    pub fn permission(&self) -> Option<Permission> {
        let pair = self.sealing_pair.as_ref()?;
        Some(Permission {
            issuer: self.issuer,
            expiration: self.expiration,
            contracts: self.contracts.iter().copied().collect(),
            projects: self.projects.iter().cloned().collect(),
            recipient: self.recipient,
            validator_id: self.validator_id,
            validator_contract: self.validator_contract,
            sealing_key: pair.public_key().to_b256(),
            issuer_signature: self.issuer_signature.clone(),
            recipient_signature: self.recipient_signature.clone(),
        })
    }

    /// Verify the signatures this permit's kind requires.
    pub fn verify(&self, verifier: &dyn SignatureVerifier, domain: &TypedDataDomain) -> Result<()> {
        self.verify_issuer(verifier, domain)?;
        if self.kind != PermitKind::Recipient {
            return Ok(());
        }
        let message = self.recipient_message()?;
        verifier.verify(
            self.recipient,
            domain,
            &formats::recipient_types(),
            &message,
            &self.recipient_signature,
        )
    }

    /// Verify only the issuer signature, over the Self payload for own
    /// permits and the Sharing payload otherwise.
    pub fn verify_issuer(
        &self,
        verifier: &dyn SignatureVerifier,
        domain: &TypedDataDomain,
    ) -> Result<()> {
        match self.kind {
            PermitKind::Own => {
                let message = self.self_message()?;
                verifier.verify(
                    self.issuer,
                    domain,
                    &formats::self_types(),
                    &message,
                    &self.issuer_signature,
                )
            }
            PermitKind::Sharing | PermitKind::Recipient => verifier.verify(
                self.issuer,
                domain,
                &formats::sharing_types(),
                &self.sharing_message(),
                &self.issuer_signature,
            ),
        }
    }

    /// Turn a Sharing permit into the recipient's copy.
    ///
    /// Generates a fresh sealing key pair and asks `signer` (the recipient)
    /// to co-sign it together with the issuer signature. The issuer signature
    /// is verified first; the signer is never asked to co-sign a statement
    /// that does not verify.
    pub async fn accept<S: Signer + ?Sized>(
        &self,
        signer: &S,
        verifier: &dyn SignatureVerifier,
        domain: &TypedDataDomain,
    ) -> Result<Permit> {
        self.accept_with_pair(SealingKeyPair::generate(), signer, verifier, domain)
            .await
    }

    /// As [`Permit::accept`], with a caller-supplied sealing key pair.
    pub async fn accept_with_pair<S: Signer + ?Sized>(
        &self,
        sealing_pair: SealingKeyPair,
        signer: &S,
        verifier: &dyn SignatureVerifier,
        domain: &TypedDataDomain,
    ) -> Result<Permit> {
        if !matches!(self.kind, PermitKind::Sharing | PermitKind::Recipient) {
            return Err(PermsError::InvalidPermit(
                "only sharing permits can be accepted".into(),
            ));
        }
        if !self.has_issuer_signature() {
            return Err(PermsError::InvalidPermit(
                "sharing permit is not signed by its issuer".into(),
            ));
        }
        self.verify_issuer(verifier, domain)?;
        ensure_signer(signer, self.recipient).await?;

        let mut permit = Permit {
            kind: PermitKind::Recipient,
            sealing_pair: Some(sealing_pair),
            recipient_signature: Signature::EMPTY,
            ..self.clone()
        };
        let message = permit.recipient_message()?;
        permit.recipient_signature = signer
            .sign_typed_data(domain, &formats::recipient_types(), &message)
            .await?;
        Ok(permit)
    }

    /// The Sharing statement this permit carries, without any key material.
    pub fn to_sharing(&self) -> Permit {
        Permit {
            kind: PermitKind::Sharing,
            sealing_pair: None,
            recipient_signature: Signature::EMPTY,
            ..self.clone()
        }
    }

    fn issuer_message(&self) -> TypedMessage {
        let mut m = TypedMessage::new();
        m.insert("issuer".into(), TypedValue::Address(self.issuer));
        m.insert("expiration".into(), TypedValue::Uint(U256::from(self.expiration)));
        m.insert(
            "contracts".into(),
            TypedValue::Array(self.contracts.iter().map(|c| TypedValue::Address(*c)).collect()),
        );
        m.insert(
            "projects".into(),
            TypedValue::Array(
                self.projects
                    .iter()
                    .map(|p| TypedValue::String(p.clone()))
                    .collect(),
            ),
        );
        m.insert("recipient".into(), TypedValue::Address(self.recipient));
        m.insert("validatorId".into(), TypedValue::Uint(U256::from(self.validator_id)));
        m.insert(
            "validatorContract".into(),
            TypedValue::Address(self.validator_contract),
        );
        m
    }

    fn sharing_message(&self) -> TypedMessage {
        self.issuer_message()
    }

    fn self_message(&self) -> Result<TypedMessage> {
        let mut m = self.issuer_message();
        m.insert("sealingKey".into(), TypedValue::Bytes32(self.sealing_key()?));
        Ok(m)
    }

    fn recipient_message(&self) -> Result<TypedMessage> {
        let mut m = TypedMessage::new();
        m.insert("sealingKey".into(), TypedValue::Bytes32(self.sealing_key()?));
        m.insert(
            "issuerSignature".into(),
            TypedValue::Bytes(self.issuer_signature.as_bytes().to_vec()),
        );
        Ok(m)
    }

    fn sealing_key(&self) -> Result<veil_core::B256> {
        self.sealing_pair
            .as_ref()
            .map(|p| p.public_key().to_b256())
            .ok_or_else(|| PermsError::InvalidPermit("permit has no sealing key".into()))
    }
}

async fn ensure_signer<S: Signer + ?Sized>(signer: &S, expected: Address) -> Result<()> {
    let actual = signer.address().await?;
    if actual != expected {
        return Err(PermsError::SignerMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

/// Builder for Self and Sharing permits.
#[derive(Debug, Clone)]
pub struct PermitBuilder {
    issuer: Address,
    name: String,
    expiration: Option<u64>,
    contracts: BTreeSet<Address>,
    projects: BTreeSet<String>,
    validator_id: u32,
    validator_contract: Address,
}

impl PermitBuilder {
    pub fn new(issuer: Address) -> Self {
        Self {
            issuer,
            name: DEFAULT_PERMIT_NAME.to_string(),
            expiration: None,
            contracts: BTreeSet::new(),
            projects: BTreeSet::new(),
            validator_id: 0,
            validator_contract: Address::ZERO,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Absolute expiration (unix seconds). Defaults to 24 hours from signing.
    pub fn expiration(mut self, expiration: u64) -> Self {
        self.expiration = Some(expiration);
        self
    }

    pub fn contract(mut self, contract: Address) -> Self {
        self.contracts.insert(contract);
        self
    }

    pub fn contracts(mut self, contracts: impl IntoIterator<Item = Address>) -> Self {
        self.contracts.extend(contracts);
        self
    }

    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.projects.insert(project.into());
        self
    }

    pub fn projects<S: Into<String>>(mut self, projects: impl IntoIterator<Item = S>) -> Self {
        self.projects.extend(projects.into_iter().map(Into::into));
        self
    }

    /// On-chain revalidation hook. Zero disables.
    pub fn validator(mut self, id: u32, contract: Address) -> Self {
        self.validator_id = id;
        self.validator_contract = contract;
        self
    }

    fn build(self, kind: PermitKind, recipient: Address, pair: Option<SealingKeyPair>) -> Permit {
        Permit {
            name: self.name,
            kind,
            issuer: self.issuer,
            expiration: self
                .expiration
                .unwrap_or_else(|| now_secs() + DEFAULT_EXPIRATION_SECS),
            contracts: self.contracts,
            projects: self.projects,
            recipient,
            validator_id: self.validator_id,
            validator_contract: self.validator_contract,
            sealing_pair: pair,
            issuer_signature: Signature::EMPTY,
            recipient_signature: Signature::EMPTY,
        }
    }

    /// Create and sign a Self permit with a fresh sealing key pair.
    pub async fn sign_self<S: Signer + ?Sized>(
        self,
        signer: &S,
        domain: &TypedDataDomain,
    ) -> Result<Permit> {
        self.sign_self_with_pair(SealingKeyPair::generate(), signer, domain)
            .await
    }

    /// As [`PermitBuilder::sign_self`], with a caller-supplied key pair.
    pub async fn sign_self_with_pair<S: Signer + ?Sized>(
        self,
        sealing_pair: SealingKeyPair,
        signer: &S,
        domain: &TypedDataDomain,
    ) -> Result<Permit> {
        ensure_signer(signer, self.issuer).await?;

        let mut permit = self.build(PermitKind::Own, Address::ZERO, Some(sealing_pair));
        let message = permit.self_message()?;
        permit.issuer_signature = signer
            .sign_typed_data(domain, &formats::self_types(), &message)
            .await?;
        Ok(permit)
    }

    /// Create and sign a Sharing permit for `recipient`.
    pub async fn sign_sharing<S: Signer + ?Sized>(
        self,
        recipient: Address,
        signer: &S,
        domain: &TypedDataDomain,
    ) -> Result<Permit> {
        if recipient == Address::ZERO {
            return Err(PermsError::InvalidPermit(
                "sharing permit needs a recipient".into(),
            ));
        }
        ensure_signer(signer, self.issuer).await?;

        let mut permit = self.build(PermitKind::Sharing, recipient, None);
        permit.issuer_signature = signer
            .sign_typed_data(domain, &formats::sharing_types(), &permit.sharing_message())
            .await?;
        Ok(permit)
    }
}

/// Coarse time-to-expiry label: `>1y`, `3m`, `2w`, `5d`, `4h`, `12m`, `0m`.
///
/// The first `m` is months (30 days), the second minutes.
pub fn time_until(expiration: u64, now: u64) -> String {
    const UNITS: [(&str, u64); 6] = [
        ("y", 365 * 24 * 60 * 60),
        ("m", 30 * 24 * 60 * 60),
        ("w", 7 * 24 * 60 * 60),
        ("d", 24 * 60 * 60),
        ("h", 60 * 60),
        ("m", 60),
    ];

    let diff = expiration.saturating_sub(now);
    if diff > UNITS[0].1 {
        return ">1y".to_string();
    }
    UNITS
        .iter()
        .find(|(_, secs)| diff / secs > 0)
        .map(|(label, secs)| format!("{}{}", diff / secs, label))
        .unwrap_or_else(|| "0m".to_string())
}
