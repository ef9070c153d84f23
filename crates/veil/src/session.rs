//! The Session: the connected account's view of Veil.
//!
//! A session binds a signer (the connected wallet), a permit store, a call
//! pipeline and a configuration. It drives the permit lifecycle (create,
//! import, activate, rename, remove) and runs confidential calls with the
//! active permit.
//!
//! Nothing is written to the store until signing has completed, so a
//! rejected or failed signature leaves no trace. Imported permits are checked
//! with the session's [`SignatureVerifier`] before they are co-signed or
//! stored.

use std::sync::Arc;

use tracing::{info, warn};

use veil_call::{
    unseal_tree, CallOutcome, CallPipeline, CallTransport, Caller, Encryptor, JsonDirection,
};
use veil_core::{now_secs, Address, CallValue, Permission, PermitHash, Unsealable};
use veil_perms::{
    classify_import, AccessRequirements, LocalVerifier, Permit, PermitBuilder, PermitKind,
    SignatureVerifier, Signer, X25519PublicKey,
};
use veil_store::PermitStore;

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};

/// A connected account's session.
pub struct Session<S: PermitStore, G: Signer, T: CallTransport> {
    account: Address,
    signer: G,
    verifier: Arc<dyn SignatureVerifier>,
    store: Arc<S>,
    pipeline: CallPipeline<T>,
    config: SessionConfig,
}

impl<S: PermitStore, G: Signer, T: CallTransport> Session<S, G, T> {
    /// Connect: resolve the signer's account once and bind it.
    ///
    /// Imports are verified with [`LocalVerifier`] until
    /// [`with_verifier`](Self::with_verifier) installs the wallet's scheme.
    pub async fn connect(signer: G, store: Arc<S>, transport: T, config: SessionConfig) -> Result<Self> {
        let account = signer.address().await?;
        let pipeline = CallPipeline::new(transport).with_config(config.pipeline());
        info!(%account, "session connected");
        Ok(Self {
            account,
            signer,
            verifier: Arc::new(LocalVerifier),
            store,
            pipeline,
            config,
        })
    }

    /// Encrypt call inputs with `encryptor` for the network key `target`.
    pub fn with_encryptor(mut self, encryptor: Arc<dyn Encryptor>, target: X25519PublicKey) -> Self {
        self.pipeline = self.pipeline.with_encryptor(encryptor, target);
        self
    }

    /// Verify imported permits with `verifier`.
    pub fn with_verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn account(&self) -> Address {
        self.account
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn pipeline(&self) -> &CallPipeline<T> {
        &self.pipeline
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Permit Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// A builder for a permit issued by this account, expiring after the
    /// configured default.
    pub fn permit_builder(&self) -> PermitBuilder {
        PermitBuilder::new(self.account)
            .expiration(now_secs().saturating_add(self.config.default_expiration_secs))
    }

    /// Sign and store a Self permit.
    pub async fn create_self(&self, builder: PermitBuilder) -> Result<(PermitHash, Permit)> {
        let permit = builder.sign_self(&self.signer, &self.config.domain).await?;
        let hash = self.store_permit(permit.clone(), self.config.activate_on_create).await?;
        info!(account = %self.account, %hash, "created self permit");
        Ok((hash, permit))
    }

    /// Sign and store a Sharing permit for `recipient`.
    ///
    /// Sharing permits cannot unseal, so they are never made active.
    pub async fn create_sharing(
        &self,
        builder: PermitBuilder,
        recipient: Address,
    ) -> Result<(PermitHash, Permit)> {
        let permit = builder
            .sign_sharing(recipient, &self.signer, &self.config.domain)
            .await?;
        let hash = self.store_permit(permit.clone(), false).await?;
        info!(account = %self.account, %hash, %recipient, "created sharing permit");
        Ok((hash, permit))
    }

    /// Import a permit JSON, co-signing it first when it is addressed to
    /// this account.
    pub async fn import(&self, json: &str) -> Result<(PermitHash, Permit)> {
        let domain = &self.config.domain;
        let import = classify_import(json, self.account, &*self.verifier, domain).map_err(|e| {
            warn!(account = %self.account, error = %e, "rejected permit import");
            e
        })?;
        let permit = import.finalize(&self.signer, &*self.verifier, domain).await?;

        let activate = self.config.activate_on_create && permit.can_unseal();
        let hash = self.store_permit(permit.clone(), activate).await?;
        info!(account = %self.account, %hash, kind = ?permit.kind(), "imported permit");
        Ok((hash, permit))
    }

    /// Export a stored permit as JSON.
    ///
    /// Sharing permits use the key-free sharing form; everything else the
    /// full form including the private sealing key.
    pub async fn export(&self, hash: &PermitHash) -> Result<String> {
        let permit = self.permit(hash).await?;
        Ok(match permit.kind() {
            PermitKind::Sharing => permit.export_sharing()?.to_json()?,
            PermitKind::Own | PermitKind::Recipient => permit.export_own()?.to_json()?,
        })
    }

    /// Select the active permit; returns false when the hash is unknown.
    pub async fn activate(&self, hash: &PermitHash) -> Result<bool> {
        let applied = self.store.set_active(self.account, hash).await?;
        if applied {
            info!(account = %self.account, %hash, "activated permit");
        }
        Ok(applied)
    }

    pub async fn rename(&self, hash: &PermitHash, name: &str) -> Result<bool> {
        Ok(self.store.rename(self.account, hash, name).await?)
    }

    pub async fn remove(&self, hash: &PermitHash) -> Result<Option<Permit>> {
        let removed = self.store.remove(self.account, hash).await?;
        if removed.is_some() {
            info!(account = %self.account, %hash, "removed permit");
        }
        Ok(removed)
    }

    pub async fn permit(&self, hash: &PermitHash) -> Result<Permit> {
        self.store
            .get_permit(self.account, hash)
            .await?
            .ok_or(SessionError::PermitNotFound(*hash))
    }

    pub async fn permits(&self) -> Result<Vec<(PermitHash, Permit)>> {
        Ok(self.store.permits(self.account).await?)
    }

    pub async fn active_permit(&self) -> Result<Option<Permit>> {
        Ok(self.store.get_active(self.account).await?)
    }

    /// The active permit's permission descriptor.
    pub async fn active_permission(&self) -> Result<Option<Permission>> {
        Ok(self.active_permit().await?.and_then(|p| p.permission()))
    }

    /// Whether the active permit fully covers `requirements`.
    pub async fn active_satisfies(&self, requirements: &AccessRequirements) -> Result<bool> {
        Ok(self
            .active_permit()
            .await?
            .is_some_and(|p| p.satisfies(requirements)))
    }

    async fn store_permit(&self, permit: Permit, activate: bool) -> Result<PermitHash> {
        let hash = self.store.set_permit(self.account, permit).await?.hash();
        if activate {
            self.store.set_active(self.account, &hash).await?;
        }
        Ok(hash)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Confidential Calls
    // ─────────────────────────────────────────────────────────────────────────

    /// Encrypt call arguments with the active permission. `None` means not
    /// ready.
    pub async fn encrypt(&self, args: &CallValue) -> Result<Option<CallValue>> {
        let permission = self.active_permission().await?;
        Ok(self.pipeline.prepare(args, permission.as_ref()).await?)
    }

    /// Unseal call results with the active permit's sealing key.
    pub async fn unseal(&self, results: &CallValue) -> Result<Unsealable<CallValue>> {
        let active = self.active_permit().await?;
        Ok(unseal_tree(
            results,
            active.as_ref().and_then(Permit::sealing_pair),
        )?)
    }

    /// Encrypt, call and unseal with the active permit.
    pub async fn call(
        &self,
        contract: Address,
        function: &str,
        args: &CallValue,
    ) -> Result<CallOutcome> {
        let active = self.active_permit().await?;
        if let Some(permit) = &active {
            if permit.is_expired() {
                warn!(account = %self.account, %contract, "calling with an expired permit");
            }
        }
        let permission = active.as_ref().and_then(Permit::permission);
        let caller = Caller {
            account: self.account,
            permission: permission.as_ref(),
            sealing_pair: active.as_ref().and_then(Permit::sealing_pair),
        };
        Ok(self.pipeline.call(caller, contract, function, args).await?)
    }

    /// As [`call`](Self::call), with arguments given as host JSON.
    pub async fn call_json(
        &self,
        contract: Address,
        function: &str,
        args: &serde_json::Value,
    ) -> Result<CallOutcome> {
        let args = veil_call::from_json(args, JsonDirection::Arguments, self.config.leaf_policy)?;
        self.call(contract, function, &args).await
    }
}
