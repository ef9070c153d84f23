//! Decrypt direction.
//!
//! Replaces every [`CallValue::Sealed`] leaf with its [`Unsealed`] plaintext.
//! Without a private sealing key the result is [`Unsealable::Sealed`]; that
//! is the "not ready yet" state, not an error.

use tracing::debug;

use veil_core::{CallValue, SealedValue, Unsealable, Unsealed};
use veil_perms::SealingKeyPair;

use crate::error::Result;
use crate::transform::{map_leaves, LeafPath};

/// Number of sealed leaves in `tree`.
pub fn sealed_leaf_count(tree: &CallValue) -> usize {
    tree.count_leaves(&|v| matches!(v, CallValue::Sealed(_)))
}

/// Unseal every sealed leaf of `tree`.
///
/// `Null` leaves pass through without touching the key. A tree with no
/// sealed leaves is returned as is, key or not.
pub fn unseal_tree(
    tree: &CallValue,
    key: Option<&SealingKeyPair>,
) -> Result<Unsealable<CallValue>> {
    let sealed = sealed_leaf_count(tree);
    if sealed == 0 {
        return Ok(Unsealable::unsealed(tree.clone()));
    }

    let Some(key) = key.filter(|k| k.has_secret()) else {
        debug!(sealed, "no sealing key, results stay sealed");
        return Ok(Unsealable::Sealed);
    };

    let out = map_leaves(
        tree,
        &mut |_: &LeafPath, leaf: &CallValue| -> Result<Option<CallValue>> {
            match leaf {
                CallValue::Sealed(value) => Ok(Some(CallValue::Unsealed(key.unseal_value(value)?))),
                _ => Ok(None),
            }
        },
    )?;

    debug!(sealed, "unsealed call results");
    Ok(Unsealable::unsealed(out))
}

/// Unseal a single output.
pub fn unseal_value(
    sealed: &SealedValue,
    key: Option<&SealingKeyPair>,
) -> Result<Unsealable<Unsealed>> {
    match key.filter(|k| k.has_secret()) {
        Some(key) => Ok(Unsealable::unsealed(key.unseal_value(sealed)?)),
        None => Ok(Unsealable::Sealed),
    }
}
