//! PermitStore trait: the abstract interface for permit state.
//!
//! Per account, a store holds a set of permits keyed by [`PermitHash`] and at
//! most one active permit. The active pointer always names a stored permit or
//! is absent.

use async_trait::async_trait;
use veil_core::{Address, PermitHash};
use veil_perms::Permit;

use crate::error::Result;

/// Result of storing a permit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetResult {
    /// A new permit was added.
    Inserted(PermitHash),
    /// A permit with the same hash was replaced (last write wins).
    Replaced(PermitHash),
}

impl SetResult {
    pub fn hash(&self) -> PermitHash {
        match *self {
            Self::Inserted(h) | Self::Replaced(h) => h,
        }
    }
}

/// Keyed permit state with per-account active selection.
///
/// Every method is a single atomic step; callers on the same account that
/// need read-modify-write must serialize externally.
#[async_trait]
pub trait PermitStore: Send + Sync {
    /// Upsert `permit` under its hash.
    async fn set_permit(&self, account: Address, permit: Permit) -> Result<SetResult>;

    async fn get_permit(&self, account: Address, hash: &PermitHash) -> Result<Option<Permit>>;

    /// All permits of an account, ordered by hash.
    async fn permits(&self, account: Address) -> Result<Vec<(PermitHash, Permit)>>;

    /// Select the active permit. A hash not stored for the account is a
    /// no-op that leaves the previous selection unchanged; returns whether
    /// the selection was applied.
    async fn set_active(&self, account: Address, hash: &PermitHash) -> Result<bool>;

    async fn active_hash(&self, account: Address) -> Result<Option<PermitHash>>;

    async fn get_active(&self, account: Address) -> Result<Option<Permit>>;

    /// Delete a permit, clearing the active pointer if it named it.
    async fn remove(&self, account: Address, hash: &PermitHash) -> Result<Option<Permit>>;

    /// Change only the `name` label; returns whether the permit existed.
    async fn rename(&self, account: Address, hash: &PermitHash, name: &str) -> Result<bool>;
}
