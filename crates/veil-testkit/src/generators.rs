//! Proptest generators for property-based testing.

use proptest::prelude::*;
use std::collections::BTreeMap;

use veil_core::{Address, CallValue, EncryptableValue, U256};
use veil_perms::{LocalSigner, Permit, PermitBuilder, TypedDataDomain};

/// Generate a random address.
pub fn address() -> impl Strategy<Value = Address> {
    any::<[u8; 20]>().prop_map(Address::from)
}

/// Generate a random 256-bit integer.
pub fn u256() -> impl Strategy<Value = U256> {
    prop_oneof![
        any::<u64>().prop_map(U256::from),
        any::<[u8; 32]>().prop_map(|b| U256::from_be_bytes::<32>(b)),
    ]
}

/// Generate a field name.
pub fn field_name() -> impl Strategy<Value = String> {
    "[a-z][a-zA-Z0-9]{0,11}".prop_map(String::from)
}

/// Generate a project name.
pub fn project() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,15}".prop_map(String::from)
}

/// A leaf the transform engine never rewrites.
pub fn plain_leaf() -> impl Strategy<Value = CallValue> {
    prop_oneof![
        Just(CallValue::Null),
        any::<bool>().prop_map(CallValue::Bool),
        u256().prop_map(CallValue::Uint),
        any::<i64>().prop_map(|i| CallValue::Int(i128::from(i))),
        address().prop_map(CallValue::Address),
        ".{0,16}".prop_map(CallValue::Text),
        prop::collection::vec(any::<u8>(), 0..32).prop_map(|b| CallValue::Bytes(b.into())),
    ]
}

/// Arbitrarily nested lists, tuples and records of plain leaves.
pub fn plain_tree() -> impl Strategy<Value = CallValue> {
    plain_leaf().prop_recursive(4, 64, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(CallValue::List),
            prop::collection::vec(inner.clone(), 0..6).prop_map(CallValue::Tuple),
            prop::collection::btree_map(field_name(), inner, 0..6)
                .prop_map(|fields: BTreeMap<String, CallValue>| CallValue::Record(fields)),
        ]
    })
}

/// Generate an encryptable plaintext of any type.
pub fn encryptable_value() -> impl Strategy<Value = EncryptableValue> {
    let item = prop_oneof![
        any::<bool>().prop_map(EncryptableValue::bool),
        any::<u8>().prop_map(EncryptableValue::uint8),
        any::<u16>().prop_map(EncryptableValue::uint16),
        any::<u32>().prop_map(EncryptableValue::uint32),
        any::<u64>().prop_map(EncryptableValue::uint64),
        any::<u128>().prop_map(EncryptableValue::uint128),
        u256().prop_map(EncryptableValue::uint256),
        address().prop_map(EncryptableValue::address),
    ];
    (item, -2i32..=2).prop_map(|(v, zone)| v.with_security_zone(zone))
}

/// A plain tree with encryptable leaves mixed in.
pub fn tree_with_encryptables() -> impl Strategy<Value = CallValue> {
    let leaf = prop_oneof![
        3 => plain_leaf(),
        1 => encryptable_value().prop_map(CallValue::Encryptable),
    ];
    let tree = leaf.prop_recursive(3, 32, 5, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..5).prop_map(CallValue::List),
            prop::collection::vec(inner.clone(), 0..5).prop_map(CallValue::Tuple),
            prop::collection::btree_map(field_name(), inner, 0..5).prop_map(CallValue::Record),
        ]
    });
    (tree, encryptable_value())
        .prop_map(|(tree, extra)| CallValue::list([tree, CallValue::Encryptable(extra)]))
}

/// Parameters for generating a Self permit.
#[derive(Debug, Clone)]
pub struct PermitParams {
    pub seed: [u8; 32],
    pub name: String,
    pub contracts: Vec<Address>,
    pub projects: Vec<String>,
    pub expiration: u64,
    pub validator_id: u32,
    pub validator_contract: Address,
}

impl Arbitrary for PermitParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            any::<[u8; 32]>(), // seed
            "[A-Za-z ]{0,16}",
            prop::collection::vec(address(), 0..4),
            prop::collection::vec(project(), 0..4),
            1u64..=4_000_000_000u64, // expiration
            any::<u32>(),
            address(),
        )
            .prop_map(
                |(seed, name, contracts, projects, expiration, validator_id, validator_contract)| {
                    PermitParams {
                        seed,
                        name,
                        contracts,
                        projects,
                        expiration,
                        validator_id,
                        validator_contract,
                    }
                },
            )
            .boxed()
    }
}

impl PermitParams {
    pub fn signer(&self) -> LocalSigner {
        LocalSigner::from_seed(&self.seed)
    }

    pub fn builder(&self) -> PermitBuilder {
        PermitBuilder::new(self.signer().local_address())
            .name(self.name.clone())
            .contracts(self.contracts.iter().copied())
            .projects(self.projects.iter().cloned())
            .expiration(self.expiration)
            .validator(self.validator_id, self.validator_contract)
    }
}

/// Sign a Self permit from parameters.
pub async fn permit_from_params(params: &PermitParams) -> veil_perms::Result<Permit> {
    params
        .builder()
        .sign_self(&params.signer(), &TypedDataDomain::default())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_perms::PermitKind;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
    }

    proptest! {
        #[test]
        fn test_plain_tree_has_no_fhe_leaves(tree in plain_tree()) {
            prop_assert!(!tree.has_fhe_leaves());
        }

        #[test]
        fn test_tree_with_encryptables_has_some(tree in tree_with_encryptables()) {
            prop_assert!(tree.has_fhe_leaves());
        }

        #[test]
        fn test_permit_hash_ignores_name(params: PermitParams, other_name in "[a-z]{1,8}") {
            let mut permit = runtime().block_on(permit_from_params(&params)).unwrap();
            let before = permit.hash().unwrap();
            permit.set_name(other_name);
            prop_assert_eq!(permit.hash().unwrap(), before);
            prop_assert_eq!(permit.kind(), PermitKind::Own);
        }

        #[test]
        fn test_permit_hash_survives_serialization(params: PermitParams) {
            let permit = runtime().block_on(permit_from_params(&params)).unwrap();
            let restored = Permit::from_serialized(&permit.to_serialized()).unwrap();
            prop_assert_eq!(restored.hash().unwrap(), permit.hash().unwrap());
            prop_assert!(restored.recipient_signature().is_empty());
        }
    }
}
