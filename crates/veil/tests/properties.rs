//! Property tests for the encrypt and unseal passes.

use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

use veil::call::{encrypt_tree, unseal_tree, visit_leaves, EncryptionTarget};
use veil::core::{EncryptableValue, EncryptedValue};
use veil::{process_unsealables, CallValue, Unsealable, U256};
use veil_testkit::generators::{plain_tree, tree_with_encryptables};
use veil_testkit::SimulatedNetwork;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

fn encryptables(tree: &CallValue) -> Vec<(String, EncryptableValue)> {
    let mut found = Vec::new();
    visit_leaves(tree, &mut |path, leaf| {
        if let CallValue::Encryptable(v) = leaf {
            found.push((path.to_string(), *v));
        }
    });
    found
}

fn encrypted(tree: &CallValue) -> Vec<(String, EncryptedValue)> {
    let mut found = Vec::new();
    visit_leaves(tree, &mut |path, leaf| {
        if let CallValue::Encrypted(v) = leaf {
            found.push((path.to_string(), v.clone()));
        }
    });
    found
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn plain_trees_pass_through_both_passes(tree in plain_tree()) {
        let encrypted = runtime().block_on(encrypt_tree(&tree, None, None)).unwrap();
        prop_assert_eq!(encrypted, Some(tree.clone()));

        let unsealed = unseal_tree(&tree, None).unwrap();
        prop_assert_eq!(unsealed, Unsealable::unsealed(tree));
    }

    #[test]
    fn encryption_without_a_target_is_all_or_nothing(tree in tree_with_encryptables()) {
        let result = runtime().block_on(encrypt_tree(&tree, None, None)).unwrap();
        prop_assert!(result.is_none());
    }

    #[test]
    fn encryption_replaces_every_leaf_in_place(tree in tree_with_encryptables()) {
        let network = SimulatedNetwork::new();
        let target = EncryptionTarget::new(&network, network.public_key());
        let out = runtime()
            .block_on(encrypt_tree(&tree, Some(target), None))
            .unwrap()
            .unwrap();

        let before = encryptables(&tree);
        let after = encrypted(&out);
        prop_assert!(encryptables(&out).is_empty());
        prop_assert_eq!(before.len(), after.len());

        for ((path_in, plain), (path_out, cipher)) in before.iter().zip(after.iter()) {
            prop_assert_eq!(path_in, path_out);
            prop_assert_eq!(cipher.utype, plain.utype());
            prop_assert_eq!(cipher.security_zone, plain.security_zone);
            prop_assert_eq!(network.decrypt_input(cipher).unwrap(), plain.item.to_u256());
        }
    }

    #[test]
    fn sealed_inputs_short_circuit_combination(
        values in prop::collection::vec(any::<u64>(), 1..6),
        sealed_at in any::<prop::sample::Index>(),
    ) {
        let sealed = sealed_at.index(values.len());
        let calls = AtomicUsize::new(0);
        let inputs: Vec<Unsealable<U256>> = values
            .iter()
            .enumerate()
            .map(|(i, v)| if i == sealed { Unsealable::Sealed } else { Unsealable::unsealed(U256::from(*v)) })
            .collect();

        let result = veil::process_unsealable_list(inputs, |_: Vec<U256>| {
            calls.fetch_add(1, Ordering::SeqCst);
        });
        prop_assert_eq!(result, Unsealable::Sealed);
        prop_assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unsealed_inputs_combine(a in any::<u64>(), b in any::<bool>()) {
        let result = process_unsealables(
            (Unsealable::unsealed(U256::from(a)), Unsealable::unsealed(b)),
            |(a, b)| if b { a } else { U256::ZERO },
        );
        prop_assert_eq!(
            result,
            Unsealable::unsealed(if b { U256::from(a) } else { U256::ZERO })
        );
    }
}
