//! End-to-end scenarios against the simulated network.

use std::sync::Arc;

use async_trait::async_trait;
use veil::call::{CallOutcome, Encryptor};
use veil::core::{Address, CallValue, EncryptableValue, Signature, Unsealable, Unsealed, U256};
use veil::perms::{
    LocalSigner, LocalVerifier, PermsError, Signer, TypedDataDomain, TypedDataTypes, TypedMessage,
};
use veil::store::{MemoryPermitStore, PermitStore};
use veil::{AccessRequirements, PermitKind, Session, SessionConfig, SessionError};
use veil_testkit::SimulatedNetwork;

type TestSession = Session<MemoryPermitStore, LocalSigner, Arc<SimulatedNetwork>>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

async fn session(seed: u8, network: &Arc<SimulatedNetwork>) -> anyhow::Result<TestSession> {
    let encryptor: Arc<dyn Encryptor> = network.clone();
    let session = Session::connect(
        LocalSigner::from_seed(&[seed; 32]),
        Arc::new(MemoryPermitStore::new()),
        Arc::clone(network),
        SessionConfig::default(),
    )
    .await?
    .with_encryptor(encryptor, network.public_key());
    Ok(session)
}

fn deposit_args(amount: u32) -> CallValue {
    CallValue::record([("amount", EncryptableValue::uint32(amount).into())])
}

fn balance_args() -> CallValue {
    CallValue::record([("permission", CallValue::PermissionPlaceholder)])
}

fn unsealed_balance(outcome: CallOutcome) -> Option<U256> {
    match outcome.into_value()?.get("balance")? {
        CallValue::Unsealed(Unsealed::Uint(v)) => Some(*v),
        _ => None,
    }
}

#[tokio::test]
async fn alice_encrypts_calls_and_unseals() -> anyhow::Result<()> {
    init_tracing();
    let network = Arc::new(SimulatedNetwork::new());
    let alice = session(1, &network).await?;
    let token = network.token();

    let (hash, permit) = alice
        .create_self(alice.permit_builder().contract(token))
        .await?;
    assert_eq!(alice.store().active_hash(alice.account()).await?, Some(hash));
    assert!(alice
        .active_satisfies(&AccessRequirements::contracts([token]))
        .await?);
    assert!(permit.recipient_signature().is_empty());

    let encrypted = alice
        .encrypt(&deposit_args(42))
        .await?
        .expect("encryptor is configured");
    let Some(CallValue::Encrypted(amount)) = encrypted.get("amount") else {
        panic!("amount was not encrypted");
    };
    assert_eq!(network.decrypt_input(amount)?, U256::from(42u64));

    let deposit = alice.call(token, "deposit", &deposit_args(42)).await?;
    assert_eq!(deposit.into_value(), Some(CallValue::Bool(true)));
    assert_eq!(network.balance_of(alice.account()).await, U256::from(42u64));

    let balance = alice.call(token, "sealedBalance", &balance_args()).await?;
    assert_eq!(unsealed_balance(balance), Some(U256::from(42u64)));
    Ok(())
}

#[tokio::test]
async fn sharing_and_recipient_round_trip() -> anyhow::Result<()> {
    init_tracing();
    let network = Arc::new(SimulatedNetwork::new());
    let alice = session(1, &network).await?;
    let bob = session(2, &network).await?;
    let token = network.token();

    alice
        .create_self(alice.permit_builder().contract(token))
        .await?;
    alice.call(token, "deposit", &deposit_args(100)).await?;

    let (sharing_hash, sharing) = alice
        .create_sharing(alice.permit_builder().contract(token), bob.account())
        .await?;
    assert!(sharing.sealing_pair().is_none());
    // the issuer's active permit stays the self permit
    assert_ne!(
        alice.store().active_hash(alice.account()).await?,
        Some(sharing_hash)
    );

    let exported = alice.export(&sharing_hash).await?;
    assert!(!exported.contains("privateKey"));
    assert!(!exported.contains("sealingPair"));

    let (recipient_hash, recipient) = bob.import(&exported).await?;
    assert_eq!(recipient.kind(), PermitKind::Recipient);
    assert_eq!(recipient.issuer_signature(), sharing.issuer_signature());
    assert!(recipient.has_recipient_signature());
    assert_ne!(recipient_hash, sharing_hash);
    recipient.verify(&LocalVerifier, &SessionConfig::default().domain)?;

    let balance = bob.call(token, "sealedBalance", &balance_args()).await?;
    assert_eq!(unsealed_balance(balance), Some(U256::from(100u64)));
    Ok(())
}

#[tokio::test]
async fn own_permit_moves_between_devices() -> anyhow::Result<()> {
    let network = Arc::new(SimulatedNetwork::new());
    let laptop = session(1, &network).await?;
    let phone = session(1, &network).await?;
    let token = network.token();

    let (hash, _) = laptop
        .create_self(laptop.permit_builder().contract(token).name("Laptop"))
        .await?;
    let exported = laptop.export(&hash).await?;
    assert!(exported.contains("privateKey"));

    let (imported_hash, imported) = phone.import(&exported).await?;
    assert_eq!(imported_hash, hash);
    assert!(imported.can_unseal());
    assert_eq!(phone.active_permit().await?.map(|p| p.name().to_string()), Some("Laptop".into()));
    Ok(())
}

#[tokio::test]
async fn stranger_cannot_import() -> anyhow::Result<()> {
    let network = Arc::new(SimulatedNetwork::new());
    let alice = session(1, &network).await?;
    let bob = session(2, &network).await?;
    let carol = session(3, &network).await?;

    let (hash, _) = alice
        .create_sharing(alice.permit_builder().contract(network.token()), bob.account())
        .await?;
    let exported = alice.export(&hash).await?;

    let result = carol.import(&exported).await;
    assert!(matches!(
        result,
        Err(SessionError::Perms(PermsError::InvalidImport(_)))
    ));
    assert!(carol.permits().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn altered_device_export_is_refused() -> anyhow::Result<()> {
    let network = Arc::new(SimulatedNetwork::new());
    let laptop = session(1, &network).await?;
    let phone = session(1, &network).await?;

    let (hash, _) = laptop
        .create_self(laptop.permit_builder().contract(network.token()))
        .await?;
    let mut record: serde_json::Value = serde_json::from_str(&laptop.export(&hash).await?)?;
    record["contracts"]
        .as_array_mut()
        .expect("contracts is a list")
        .push(serde_json::json!(Address::repeat_byte(0xcc)));

    let result = phone.import(&record.to_string()).await;
    assert!(matches!(
        result,
        Err(SessionError::Perms(PermsError::InvalidImport(_)))
    ));
    assert!(phone.permits().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn nothing_is_sent_without_a_permit() -> anyhow::Result<()> {
    let network = Arc::new(SimulatedNetwork::new());
    let alice = session(1, &network).await?;

    let outcome = alice
        .call(network.token(), "sealedBalance", &balance_args())
        .await?;
    assert_eq!(outcome, CallOutcome::NotSent);
    assert!(alice.encrypt(&balance_args()).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn results_stay_sealed_without_a_key() -> anyhow::Result<()> {
    let network = Arc::new(SimulatedNetwork::new());
    let alice = session(1, &network).await?;
    let (_, permit) = alice.create_self(alice.permit_builder()).await?;
    let pair = permit.sealing_pair().expect("self permit has a key");

    let sealed = CallValue::tuple([
        CallValue::Sealed(network.seal_for(
            U256::from(1u8),
            veil::core::FheUType::Bool,
            &pair.public_key(),
        )?),
        CallValue::Null,
    ]);

    let unsealed = alice.unseal(&sealed).await?;
    assert_eq!(
        unsealed.into_option().and_then(|t| t.at(0).cloned()),
        Some(CallValue::Unsealed(Unsealed::Bool(true)))
    );

    let hash = permit.hash()?;
    alice.remove(&hash).await?;
    assert_eq!(alice.unseal(&sealed).await?, Unsealable::Sealed);
    Ok(())
}

#[tokio::test]
async fn store_invariants_through_the_session() -> anyhow::Result<()> {
    let network = Arc::new(SimulatedNetwork::new());
    let alice = session(1, &network).await?;

    let (first, _) = alice.create_self(alice.permit_builder().project("a")).await?;
    let (second, _) = alice.create_self(alice.permit_builder().project("b")).await?;
    assert_eq!(alice.active_permit().await?.map(|p| p.hash().ok()), Some(Some(second)));

    let unknown = veil::PermitHash::from_bytes([0xee; 32]);
    assert!(!alice.activate(&unknown).await?);
    assert_eq!(alice.store().active_hash(alice.account()).await?, Some(second));

    assert!(alice.rename(&first, "Renamed").await?);
    assert_eq!(alice.permit(&first).await?.name(), "Renamed");
    assert_eq!(alice.permit(&first).await?.hash()?, first);

    alice.remove(&second).await?;
    assert!(alice.active_permit().await?.is_none());
    assert_eq!(alice.permits().await?.len(), 1);
    assert!(matches!(
        alice.permit(&second).await,
        Err(SessionError::PermitNotFound(_))
    ));
    Ok(())
}

/// A wallet whose user declines every request.
struct RejectingSigner(Address);

#[async_trait]
impl Signer for RejectingSigner {
    async fn address(&self) -> veil::perms::Result<Address> {
        Ok(self.0)
    }

    async fn sign_typed_data(
        &self,
        _domain: &TypedDataDomain,
        _types: &TypedDataTypes,
        _message: &TypedMessage,
    ) -> veil::perms::Result<Signature> {
        Err(PermsError::SigningRejected("user rejected the request".into()))
    }
}

#[tokio::test]
async fn rejected_signing_stores_nothing() -> anyhow::Result<()> {
    let network = Arc::new(SimulatedNetwork::new());
    let store = Arc::new(MemoryPermitStore::new());
    let session = Session::connect(
        RejectingSigner(Address::repeat_byte(0x99)),
        Arc::clone(&store),
        Arc::clone(&network),
        SessionConfig::default(),
    )
    .await?;

    let result = session.create_self(session.permit_builder()).await;
    assert!(matches!(
        result,
        Err(SessionError::Perms(PermsError::SigningRejected(_)))
    ));
    assert!(store.permits(session.account()).await?.is_empty());
    assert!(store.active_hash(session.account()).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn reject_policy_applies_to_json_calls() -> anyhow::Result<()> {
    let network = Arc::new(SimulatedNetwork::new());
    let config = SessionConfig::from_json_str(r#"{ "leafPolicy": "reject" }"#)?;
    let alice = Session::connect(
        LocalSigner::from_seed(&[1; 32]),
        Arc::new(MemoryPermitStore::new()),
        Arc::clone(&network),
        config,
    )
    .await?;

    let result = alice
        .call_json(
            network.token(),
            "deposit",
            &serde_json::json!({ "amount": { "data": "0x01", "utype": 42 } }),
        )
        .await;
    assert!(matches!(
        result,
        Err(SessionError::Call(veil::call::CallError::UnrecognizedLeaf { .. }))
    ));
    Ok(())
}

#[tokio::test]
async fn json_string_plaintexts_are_encrypted() -> anyhow::Result<()> {
    let network = Arc::new(SimulatedNetwork::new());
    let alice = session(1, &network).await?;
    let token = network.token();
    alice
        .create_self(alice.permit_builder().contract(token))
        .await?;

    let deposit = alice
        .call_json(
            token,
            "deposit",
            &serde_json::json!({ "amount": { "data": "1000000000000", "utype": 5 } }),
        )
        .await?;
    assert_eq!(deposit.into_value(), Some(CallValue::Bool(true)));
    assert_eq!(
        network.balance_of(alice.account()).await,
        U256::from(1_000_000_000_000u64)
    );

    let balance = alice.call(token, "sealedBalance", &balance_args()).await?;
    assert_eq!(unsealed_balance(balance), Some(U256::from(1_000_000_000_000u64)));
    Ok(())
}
