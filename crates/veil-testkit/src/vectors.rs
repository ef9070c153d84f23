//! Permit hash vectors.
//!
//! Every input that feeds a permit's hash is fixed here, sealing keys
//! included, so the hashes are reproducible across runs and platforms.

use veil_core::{Address, PermitHash};
use veil_perms::{
    LocalSigner, LocalVerifier, Permit, PermitBuilder, SealingKeyPair, TypedDataDomain,
    X25519StaticSecret,
};

/// A permit hash vector.
#[derive(Debug, Clone)]
pub struct PermitVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Seed of the issuing wallet.
    pub issuer_seed: [u8; 32],
    /// Seed of the recipient wallet; `None` for a Self permit.
    pub recipient_seed: Option<[u8; 32]>,
    /// Secret of the holder's sealing key.
    pub sealing_secret: [u8; 32],
    /// Each byte `b` names the contract `0xbbbb…bb`.
    pub contracts: &'static [u8],
    pub projects: &'static [&'static str],
    pub expiration: u64,
    /// Expected permit hash (hex).
    pub expected_hash: &'static str,
}

/// Get all permit vectors.
pub fn all_vectors() -> Vec<PermitVector> {
    vec![
        PermitVector {
            name: "Self permit for one contract",
            issuer_seed: [0x42; 32],
            recipient_seed: None,
            sealing_secret: [0x11; 32],
            contracts: &[0x7e],
            projects: &[],
            expiration: 1_736_956_800, // 2025-01-15T16:00:00Z
            expected_hash: "b91b273fb3212b0cf4b269944c0425da16ac2260f8c540cedd784a12f46de6a8",
        },
        PermitVector {
            name: "Self permit for projects",
            issuer_seed: [0x42; 32],
            recipient_seed: None,
            sealing_secret: [0x11; 32],
            contracts: &[],
            projects: &["veil-demo", "amm"],
            expiration: 1_736_956_800,
            expected_hash: "a9a8e7cd59167ed862d05bf4f55adc3b123d04c2d5e5adb6b3770f2f132cb414",
        },
        PermitVector {
            name: "Recipient permit",
            issuer_seed: [0x42; 32],
            recipient_seed: Some([0x43; 32]),
            sealing_secret: [0x22; 32],
            contracts: &[0x7e, 0x7f],
            projects: &[],
            expiration: 1_736_956_800,
            expected_hash: "d88c4430de6b3632956b583509222c2b7174cc449c13f077ec131732ba064ecf",
        },
    ]
}

/// Build the permit a vector describes.
pub async fn permit_from_vector(vector: &PermitVector) -> veil_perms::Result<Permit> {
    let domain = TypedDataDomain::default();
    let issuer = LocalSigner::from_seed(&vector.issuer_seed);
    let sealing_pair =
        SealingKeyPair::from_secret(X25519StaticSecret::from_bytes(vector.sealing_secret));

    let builder = PermitBuilder::new(issuer.local_address())
        .contracts(vector.contracts.iter().map(|b| Address::repeat_byte(*b)))
        .projects(vector.projects.iter().copied())
        .expiration(vector.expiration);

    match vector.recipient_seed {
        None => {
            builder
                .sign_self_with_pair(sealing_pair, &issuer, &domain)
                .await
        }
        Some(seed) => {
            let recipient = LocalSigner::from_seed(&seed);
            let sharing = builder
                .sign_sharing(recipient.local_address(), &issuer, &domain)
                .await?;
            sharing
                .accept_with_pair(sealing_pair, &recipient, &LocalVerifier, &domain)
                .await
        }
    }
}

/// Compute every vector's hash and compare it with the expected one.
///
/// Returns `(name, matches, hash_hex)`.
pub async fn verify_all_vectors() -> veil_perms::Result<Vec<(String, bool, String)>> {
    let mut results = Vec::new();
    for vector in all_vectors() {
        let hash: PermitHash = permit_from_vector(&vector).await?.hash()?;
        let hex = hash.to_hex();
        let matches = hex == vector.expected_hash;
        results.push((vector.name.to_string(), matches, hex));
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_perms::PermitKind;

    #[tokio::test]
    async fn test_vectors_are_deterministic() {
        for vector in all_vectors() {
            let p1 = permit_from_vector(&vector).await.unwrap();
            let p2 = permit_from_vector(&vector).await.unwrap();

            assert_eq!(
                p1.hash().unwrap(),
                p2.hash().unwrap(),
                "Vector '{}' produced different hashes on regeneration",
                vector.name
            );
            assert_eq!(p1.issuer_signature(), p2.issuer_signature());
        }
    }

    #[tokio::test]
    async fn test_vectors_verify() {
        let domain = TypedDataDomain::default();
        for vector in all_vectors() {
            let permit = permit_from_vector(&vector).await.unwrap();
            permit.verify(&LocalVerifier, &domain).unwrap();

            let expected_kind = match vector.recipient_seed {
                Some(_) => PermitKind::Recipient,
                None => PermitKind::Own,
            };
            assert_eq!(permit.kind(), expected_kind, "{}", vector.name);
        }
    }

    #[tokio::test]
    async fn test_all_vectors_match() {
        let results = verify_all_vectors().await.unwrap();
        assert_eq!(results.len(), all_vectors().len());
        for (name, matches, hex) in results {
            assert!(matches, "Vector '{name}' hashed to {hex}");
        }
    }

    #[tokio::test]
    async fn test_different_sealing_keys_different_hashes() {
        let mut v1 = all_vectors().remove(0);
        let p1 = permit_from_vector(&v1).await.unwrap();
        v1.sealing_secret = [0x12; 32];
        let p2 = permit_from_vector(&v1).await.unwrap();

        assert_ne!(p1.hash().unwrap(), p2.hash().unwrap());
    }
}
