//! Permit import.
//!
//! A permit JSON is parsed and then classified against the connected account:
//!
//! - `self` permits must be issued by the account and carry the private key.
//! - Anything else becomes a Sharing permit when the account is the issuer,
//!   or a Recipient permit when the account is the recipient. A Recipient
//!   import needs the account's co-signature before it is usable.
//! - Otherwise the import is rejected.
//!
//! Every classified permit must verify against its signatures before it is
//! returned, and a sharing statement is verified again before the account is
//! asked to co-sign it. Nothing is stored until classification and signing
//! have both succeeded.

use tracing::debug;
use veil_core::Address;

use crate::error::{PermsError, Result};
use crate::export::SerializedPermit;
use crate::permit::{Permit, PermitKind};
use crate::signer::{SignatureVerifier, Signer};
use crate::typed_data::TypedDataDomain;

/// A classified import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermitImport {
    /// Usable as is.
    Ready(Permit),
    /// A sharing statement addressed to the account; needs co-signing.
    NeedsRecipientSignature(Permit),
}

impl PermitImport {
    pub fn permit(&self) -> &Permit {
        match self {
            Self::Ready(p) | Self::NeedsRecipientSignature(p) => p,
        }
    }

    /// Obtain the recipient co-signature if one is needed.
    pub async fn finalize<S: Signer + ?Sized>(
        self,
        signer: &S,
        verifier: &dyn SignatureVerifier,
        domain: &TypedDataDomain,
    ) -> Result<Permit> {
        match self {
            Self::Ready(permit) => Ok(permit),
            Self::NeedsRecipientSignature(sharing) => {
                sharing
                    .verify_issuer(verifier, domain)
                    .map_err(into_import_error)?;
                sharing.accept(signer, verifier, domain).await
            }
        }
    }
}

/// Parse and classify a permit JSON for `account`.
///
/// The classified permit's signatures are checked with `verifier` under
/// `domain`; a permit that does not verify is an invalid import.
pub fn classify_import(
    json: &str,
    account: Address,
    verifier: &dyn SignatureVerifier,
    domain: &TypedDataDomain,
) -> Result<PermitImport> {
    let import = classify(json, account)?;
    import
        .permit()
        .verify(verifier, domain)
        .map_err(into_import_error)?;
    Ok(import)
}

fn classify(json: &str, account: Address) -> Result<PermitImport> {
    let record: SerializedPermit = serde_json::from_str(json)
        .map_err(|e| PermsError::InvalidImport(format!("malformed permit: {e}")))?;

    debug!(
        kind = ?record.kind,
        issuer = %record.issuer,
        recipient = %record.recipient,
        "classifying permit import"
    );

    if record.issuer_signature.is_empty() {
        return Err(PermsError::InvalidImport(
            "permit is not signed by its issuer".into(),
        ));
    }

    if record.kind == PermitKind::Own {
        if record.issuer != account {
            return Err(PermsError::InvalidImport(format!(
                "self permit issued by {}, connected account is {}",
                record.issuer, account
            )));
        }
        let permit = Permit::from_serialized(&record).map_err(into_import_error)?;
        if !permit.can_unseal() {
            return Err(PermsError::InvalidImport(
                "self permit is missing its private sealing key".into(),
            ));
        }
        return Ok(PermitImport::Ready(permit));
    }

    if record.issuer == account {
        let sharing = SerializedPermit {
            kind: PermitKind::Sharing,
            sealing_pair: None,
            recipient_signature: Default::default(),
            ..record
        };
        let permit = Permit::from_serialized(&sharing).map_err(into_import_error)?;
        return Ok(PermitImport::Ready(permit));
    }

    if record.recipient == account {
        // an already co-signed copy exported by its own holder
        if record.kind == PermitKind::Recipient && !record.recipient_signature.is_empty() {
            let permit = Permit::from_serialized(&record).map_err(into_import_error)?;
            if permit.can_unseal() {
                return Ok(PermitImport::Ready(permit));
            }
        }
        let sharing = SerializedPermit {
            kind: PermitKind::Sharing,
            sealing_pair: None,
            recipient_signature: Default::default(),
            ..record
        };
        let permit = Permit::from_serialized(&sharing).map_err(into_import_error)?;
        return Ok(PermitImport::NeedsRecipientSignature(permit));
    }

    Err(PermsError::InvalidImport(format!(
        "connected account {account} is neither issuer nor recipient"
    )))
}

fn into_import_error(e: PermsError) -> PermsError {
    match e {
        PermsError::InvalidImport(_) => e,
        other => PermsError::InvalidImport(other.to_string()),
    }
}
