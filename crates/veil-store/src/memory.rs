//! In-memory implementation of the PermitStore trait.
//!
//! State lives behind a single `RwLock`, so multi-field updates (remove plus
//! clearing the active pointer) are never observed half-done. Initial state
//! can be injected from a [`PermitStoreSnapshot`] and exported again for an
//! external persistence layer.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tracing::{debug, warn};

use veil_core::{Address, PermitHash};
use veil_perms::Permit;

use crate::error::{Result, StoreError};
use crate::snapshot::PermitStoreSnapshot;
use crate::traits::{PermitStore, SetResult};

/// In-memory permit store. Thread-safe via RwLock.
pub struct MemoryPermitStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Permits per account, keyed by hash.
    permits: HashMap<Address, BTreeMap<PermitHash, Permit>>,

    /// Active permit per account.
    active: HashMap<Address, PermitHash>,
}

impl MemoryPermitStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    /// Create a store from persisted state.
    ///
    /// Permits are re-keyed by their recomputed hash; a stored key that
    /// disagrees is rejected. Active pointers to missing permits are dropped.
    pub fn with_snapshot(snapshot: PermitStoreSnapshot) -> Result<Self> {
        let mut inner = MemoryStoreInner::default();

        for (account, records) in snapshot.permits {
            let entry = inner.permits.entry(account).or_default();
            for (key, record) in records {
                let permit = Permit::from_serialized(&record)?;
                let hash = permit.hash()?;
                if hash != key {
                    return Err(StoreError::InvalidData(format!(
                        "permit stored under {key} hashes to {hash}"
                    )));
                }
                entry.insert(hash, permit);
            }
        }

        for (account, hash) in snapshot.active_permit_hash {
            let exists = inner
                .permits
                .get(&account)
                .is_some_and(|p| p.contains_key(&hash));
            if exists {
                inner.active.insert(account, hash);
            } else {
                warn!(%account, %hash, "dropping active pointer to missing permit");
            }
        }

        Ok(Self {
            inner: RwLock::new(inner),
        })
    }

    /// Export the current state in its persisted shape.
    pub fn snapshot(&self) -> Result<PermitStoreSnapshot> {
        let inner = self.read()?;
        Ok(PermitStoreSnapshot {
            permits: inner
                .permits
                .iter()
                .map(|(account, permits)| {
                    let records = permits
                        .iter()
                        .map(|(hash, permit)| (*hash, permit.to_serialized()))
                        .collect();
                    (*account, records)
                })
                .collect(),
            active_permit_hash: inner.active.iter().map(|(a, h)| (*a, *h)).collect(),
        })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner.write().map_err(|_| StoreError::Poisoned)
    }
}

impl Default for MemoryPermitStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PermitStore for MemoryPermitStore {
    async fn set_permit(&self, account: Address, permit: Permit) -> Result<SetResult> {
        let hash = permit.hash()?;
        let mut inner = self.write()?;

        let previous = inner.permits.entry(account).or_default().insert(hash, permit);
        debug!(%account, %hash, replaced = previous.is_some(), "stored permit");

        Ok(match previous {
            Some(_) => SetResult::Replaced(hash),
            None => SetResult::Inserted(hash),
        })
    }

    async fn get_permit(&self, account: Address, hash: &PermitHash) -> Result<Option<Permit>> {
        let inner = self.read()?;
        Ok(inner
            .permits
            .get(&account)
            .and_then(|p| p.get(hash))
            .cloned())
    }

    async fn permits(&self, account: Address) -> Result<Vec<(PermitHash, Permit)>> {
        let inner = self.read()?;
        Ok(inner
            .permits
            .get(&account)
            .map(|p| p.iter().map(|(h, p)| (*h, p.clone())).collect())
            .unwrap_or_default())
    }

    async fn set_active(&self, account: Address, hash: &PermitHash) -> Result<bool> {
        let mut inner = self.write()?;

        let exists = inner
            .permits
            .get(&account)
            .is_some_and(|p| p.contains_key(hash));
        if !exists {
            debug!(%account, %hash, "ignoring activation of unknown permit");
            return Ok(false);
        }

        inner.active.insert(account, *hash);
        debug!(%account, %hash, "activated permit");
        Ok(true)
    }

    async fn active_hash(&self, account: Address) -> Result<Option<PermitHash>> {
        let inner = self.read()?;
        Ok(inner.active.get(&account).copied())
    }

    async fn get_active(&self, account: Address) -> Result<Option<Permit>> {
        let inner = self.read()?;
        Ok(inner.active.get(&account).and_then(|hash| {
            inner
                .permits
                .get(&account)
                .and_then(|p| p.get(hash))
                .cloned()
        }))
    }

    async fn remove(&self, account: Address, hash: &PermitHash) -> Result<Option<Permit>> {
        let mut inner = self.write()?;

        let removed = inner.permits.get_mut(&account).and_then(|p| p.remove(hash));
        if removed.is_some() && inner.active.get(&account) == Some(hash) {
            inner.active.remove(&account);
            debug!(%account, %hash, "cleared active permit");
        }
        debug!(%account, %hash, removed = removed.is_some(), "removed permit");

        Ok(removed)
    }

    async fn rename(&self, account: Address, hash: &PermitHash, name: &str) -> Result<bool> {
        let mut inner = self.write()?;

        match inner.permits.get_mut(&account).and_then(|p| p.get_mut(hash)) {
            Some(permit) => {
                permit.set_name(name);
                debug!(%account, %hash, "renamed permit");
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_perms::{LocalSigner, PermitBuilder, TypedDataDomain};

    async fn make_permit(signer: &LocalSigner, project: &str) -> Permit {
        PermitBuilder::new(signer.local_address())
            .project(project)
            .expiration(2_000_000_000)
            .sign_self(signer, &TypedDataDomain::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let store = MemoryPermitStore::new();
        let alice = LocalSigner::from_seed(&[1; 32]);
        let account = alice.local_address();
        let permit = make_permit(&alice, "A").await;

        let result = store.set_permit(account, permit.clone()).await.unwrap();
        assert!(matches!(result, SetResult::Inserted(_)));
        assert_eq!(
            store.get_permit(account, &result.hash()).await.unwrap(),
            Some(permit.clone())
        );

        let again = store.set_permit(account, permit).await.unwrap();
        assert_eq!(again, SetResult::Replaced(result.hash()));
        assert_eq!(store.permits(account).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_set_active_unknown_is_noop() {
        let store = MemoryPermitStore::new();
        let alice = LocalSigner::from_seed(&[1; 32]);
        let account = alice.local_address();
        let hash = store
            .set_permit(account, make_permit(&alice, "A").await)
            .await
            .unwrap()
            .hash();

        assert!(store.set_active(account, &hash).await.unwrap());
        assert!(!store
            .set_active(account, &PermitHash::from_bytes([9; 32]))
            .await
            .unwrap());
        assert_eq!(store.active_hash(account).await.unwrap(), Some(hash));
    }

    #[tokio::test]
    async fn test_remove_active_clears_pointer() {
        let store = MemoryPermitStore::new();
        let alice = LocalSigner::from_seed(&[1; 32]);
        let account = alice.local_address();
        let hash = store
            .set_permit(account, make_permit(&alice, "A").await)
            .await
            .unwrap()
            .hash();
        store.set_active(account, &hash).await.unwrap();

        assert!(store.remove(account, &hash).await.unwrap().is_some());
        assert!(store.get_active(account).await.unwrap().is_none());
        assert!(store.active_hash(account).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove_inactive_keeps_pointer() {
        let store = MemoryPermitStore::new();
        let alice = LocalSigner::from_seed(&[1; 32]);
        let account = alice.local_address();
        let a = store
            .set_permit(account, make_permit(&alice, "A").await)
            .await
            .unwrap()
            .hash();
        let b = store
            .set_permit(account, make_permit(&alice, "B").await)
            .await
            .unwrap()
            .hash();
        store.set_active(account, &a).await.unwrap();

        store.remove(account, &b).await.unwrap();
        assert_eq!(store.active_hash(account).await.unwrap(), Some(a));
    }

    #[tokio::test]
    async fn test_rename_keeps_identity() {
        let store = MemoryPermitStore::new();
        let alice = LocalSigner::from_seed(&[1; 32]);
        let account = alice.local_address();
        let hash = store
            .set_permit(account, make_permit(&alice, "A").await)
            .await
            .unwrap()
            .hash();

        assert!(store.rename(account, &hash, "Trading").await.unwrap());
        let permit = store.get_permit(account, &hash).await.unwrap().unwrap();
        assert_eq!(permit.name(), "Trading");
        assert_eq!(permit.hash().unwrap(), hash);
        assert!(!store
            .rename(account, &PermitHash::from_bytes([0; 32]), "x")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_accounts_are_isolated() {
        let store = MemoryPermitStore::new();
        let alice = LocalSigner::from_seed(&[1; 32]);
        let bob = LocalSigner::from_seed(&[2; 32]);
        let hash = store
            .set_permit(alice.local_address(), make_permit(&alice, "A").await)
            .await
            .unwrap()
            .hash();

        assert!(!store.set_active(bob.local_address(), &hash).await.unwrap());
        assert!(store.permits(bob.local_address()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_roundtrip() {
        let store = MemoryPermitStore::new();
        let alice = LocalSigner::from_seed(&[1; 32]);
        let account = alice.local_address();
        let hash = store
            .set_permit(account, make_permit(&alice, "A").await)
            .await
            .unwrap()
            .hash();
        store.set_active(account, &hash).await.unwrap();

        let json = store.snapshot().unwrap().to_json().unwrap();
        let restored =
            MemoryPermitStore::with_snapshot(PermitStoreSnapshot::from_json(&json).unwrap())
                .unwrap();

        assert_eq!(restored.active_hash(account).await.unwrap(), Some(hash));
        let permit = restored.get_active(account).await.unwrap().unwrap();
        assert!(permit.can_unseal());
    }

    #[tokio::test]
    async fn test_snapshot_drops_dangling_active() {
        let alice = LocalSigner::from_seed(&[1; 32]);
        let mut snapshot = PermitStoreSnapshot::default();
        snapshot
            .active_permit_hash
            .insert(alice.local_address(), PermitHash::from_bytes([3; 32]));

        let store = MemoryPermitStore::with_snapshot(snapshot).unwrap();
        assert!(store.active_hash(alice.local_address()).await.unwrap().is_none());
    }
}
