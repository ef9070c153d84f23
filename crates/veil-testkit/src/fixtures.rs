//! Test fixtures and helpers.
//!
//! Deterministic wallets, and a simulated FHE network that plays both the
//! encryption primitive and a confidential token contract.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use veil_call::{CallError, CallRequest, CallTransport, Encryptor};
use veil_core::{
    now_secs, Address, CallValue, EncryptableValue, EncryptedValue, FheUType, Permission,
    SealedValue, U256,
};
use veil_perms::{
    seal_output, LocalSigner, Permit, PermitBuilder, SealedEnvelope, TypedDataDomain,
    X25519PublicKey, X25519StaticSecret,
};
use veil_store::MemoryPermitStore;

/// A wallet with its own permit store.
pub struct TestFixture {
    pub signer: LocalSigner,
    pub store: Arc<MemoryPermitStore>,
}

impl TestFixture {
    /// Create a new test fixture with a random wallet.
    pub fn new() -> Self {
        Self {
            signer: LocalSigner::generate(),
            store: Arc::new(MemoryPermitStore::new()),
        }
    }

    /// Create with a deterministic wallet from seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self {
            signer: LocalSigner::from_seed(&seed),
            store: Arc::new(MemoryPermitStore::new()),
        }
    }

    pub fn address(&self) -> Address {
        self.signer.local_address()
    }

    pub fn builder(&self) -> PermitBuilder {
        PermitBuilder::new(self.address())
    }

    /// Sign a Self permit for `contracts`, valid for a day.
    pub async fn make_self_permit(&self, contracts: &[Address]) -> veil_perms::Result<Permit> {
        self.builder()
            .contracts(contracts.iter().copied())
            .expiration(now_secs() + 86_400)
            .sign_self(&self.signer, &TypedDataDomain::default())
            .await
    }

    /// Sign a Sharing permit for `recipient` over `contracts`.
    pub async fn make_sharing_permit(
        &self,
        recipient: Address,
        contracts: &[Address],
    ) -> veil_perms::Result<Permit> {
        self.builder()
            .contracts(contracts.iter().copied())
            .expiration(now_secs() + 86_400)
            .sign_sharing(recipient, &self.signer, &TypedDataDomain::default())
            .await
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Create multiple test fixtures for multi-party tests.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            seed[31] = 0x5e;
            TestFixture::with_seed(seed)
        })
        .collect()
}

/// A simulated FHE network.
///
/// Encrypts inputs for its own network key and hosts one confidential token
/// contract at [`SimulatedNetwork::token`]:
///
/// - `deposit({amount})` credits the caller with an encrypted amount
/// - `transfer({to, amount})` moves an encrypted amount
/// - `sealedBalance({permission})` returns the permission issuer's balance
///   sealed for the permission's sealing key
pub struct SimulatedNetwork {
    network_key: X25519StaticSecret,
    token: Address,
    balances: RwLock<HashMap<Address, U256>>,
}

impl SimulatedNetwork {
    pub fn new() -> Self {
        Self::with_seed([0x4e; 32])
    }

    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self {
            network_key: X25519StaticSecret::from_bytes(seed),
            token: Address::repeat_byte(0x7e),
            balances: RwLock::new(HashMap::new()),
        }
    }

    /// The key inputs must be encrypted for.
    pub fn public_key(&self) -> X25519PublicKey {
        self.network_key.public_key()
    }

    /// Address of the confidential token contract.
    pub fn token(&self) -> Address {
        self.token
    }

    pub async fn balance_of(&self, account: Address) -> U256 {
        self.balances
            .read()
            .await
            .get(&account)
            .copied()
            .unwrap_or_default()
    }

    /// Decrypt an input encrypted for the network key.
    pub fn decrypt_input(&self, value: &EncryptedValue) -> veil_call::Result<U256> {
        let plaintext = SealedEnvelope::from_bytes(&value.data)?.open(&self.network_key)?;
        if plaintext.len() != 32 {
            return Err(CallError::Encryption(format!(
                "input plaintext must be 32 bytes, got {}",
                plaintext.len()
            )));
        }
        Ok(U256::from_be_slice(&plaintext))
    }

    /// Seal `value` for `sealing_key`, as the contract does for outputs.
    pub fn seal_for(
        &self,
        value: U256,
        utype: FheUType,
        sealing_key: &X25519PublicKey,
    ) -> veil_call::Result<SealedValue> {
        Ok(SealedValue::with_utype(seal_output(value, sealing_key)?, utype))
    }

    fn encrypted_arg(&self, args: &CallValue, field: &str) -> veil_call::Result<U256> {
        match args.get(field) {
            Some(CallValue::Encrypted(value)) => self.decrypt_input(value),
            other => Err(CallError::Transport(format!(
                "{field} must be an encrypted input, got {other:?}"
            ))),
        }
    }

    fn permission_arg<'a>(&self, args: &'a CallValue) -> veil_call::Result<&'a Permission> {
        match args.get("permission") {
            Some(CallValue::Permission(p)) => Ok(p),
            other => Err(CallError::Transport(format!(
                "permission must be populated, got {other:?}"
            ))),
        }
    }
}

impl Default for SimulatedNetwork {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Encryptor for SimulatedNetwork {
    async fn encrypt(
        &self,
        value: &EncryptableValue,
        target: &X25519PublicKey,
    ) -> veil_call::Result<EncryptedValue> {
        let word = value.item.to_u256().to_be_bytes::<32>();
        let envelope = SealedEnvelope::seal(&word, target)?;
        Ok(EncryptedValue::new(
            envelope.to_bytes()?,
            value.utype(),
            value.security_zone,
        ))
    }
}

#[async_trait]
impl CallTransport for SimulatedNetwork {
    async fn call(&self, request: CallRequest) -> veil_call::Result<CallValue> {
        if request.contract != self.token {
            return Err(CallError::Transport(format!(
                "no contract at {}",
                request.contract
            )));
        }
        debug!(from = %request.from, function = %request.function, "simulated call");

        match request.function.as_str() {
            "deposit" => {
                let amount = self.encrypted_arg(&request.args, "amount")?;
                let mut balances = self.balances.write().await;
                let balance = balances.entry(request.from).or_default();
                *balance = balance.saturating_add(amount);
                Ok(CallValue::Bool(true))
            }
            "transfer" => {
                let amount = self.encrypted_arg(&request.args, "amount")?;
                let to = match request.args.get("to") {
                    Some(CallValue::Address(a)) => *a,
                    other => {
                        return Err(CallError::Transport(format!(
                            "to must be an address, got {other:?}"
                        )))
                    }
                };
                let mut balances = self.balances.write().await;
                let from_balance = balances.get(&request.from).copied().unwrap_or_default();
                // insufficient funds transfer nothing, as confidential tokens do
                let moved = if from_balance >= amount { amount } else { U256::ZERO };
                balances.insert(request.from, from_balance - moved);
                let to_balance = balances.entry(to).or_default();
                *to_balance = to_balance.saturating_add(moved);
                Ok(CallValue::Bool(true))
            }
            "sealedBalance" => {
                let permission = self.permission_arg(&request.args)?;
                if permission.expiration <= now_secs() {
                    return Err(CallError::Transport("permission expired".into()));
                }
                if !permission.contracts.contains(&self.token) {
                    return Err(CallError::Transport(
                        "permission does not cover this contract".into(),
                    ));
                }
                let balance = self.balance_of(permission.issuer).await;
                let sealed = self.seal_for(
                    balance,
                    FheUType::Uint64,
                    &X25519PublicKey::from(permission.sealing_key),
                )?;
                Ok(CallValue::record([("balance", CallValue::Sealed(sealed))]))
            }
            other => Err(CallError::Transport(format!("unknown function {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multi_party() {
        let parties = multi_party_fixtures(3);

        let addrs: Vec<_> = parties.iter().map(|p| p.address()).collect();
        assert_ne!(addrs[0], addrs[1]);
        assert_ne!(addrs[1], addrs[2]);
        assert_ne!(addrs[0], addrs[2]);
    }

    #[tokio::test]
    async fn test_network_reads_its_inputs() {
        let network = SimulatedNetwork::new();
        let encrypted = network
            .encrypt(&EncryptableValue::uint32(42), &network.public_key())
            .await
            .unwrap();

        assert_eq!(encrypted.utype, FheUType::Uint32);
        assert_eq!(network.decrypt_input(&encrypted).unwrap(), U256::from(42u64));
    }

    #[tokio::test]
    async fn test_fixture_permits() {
        let alice = TestFixture::with_seed([1; 32]);
        let bob = TestFixture::with_seed([2; 32]);

        let own = alice.make_self_permit(&[Address::repeat_byte(7)]).await.unwrap();
        assert!(own.can_unseal());

        let sharing = alice
            .make_sharing_permit(bob.address(), &[Address::repeat_byte(7)])
            .await
            .unwrap();
        assert_eq!(sharing.recipient(), bob.address());
        assert!(!sharing.can_unseal());
    }
}
