//! Encrypt, call, unseal.
//!
//! [`CallPipeline`] ties the two transform directions to a transport. A call
//! whose arguments cannot be prepared is never sent; results that cannot be
//! unsealed come back as [`Unsealable::Sealed`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use veil_core::{Address, CallValue, Permission, Unsealable};
use veil_perms::{SealingKeyPair, X25519PublicKey};

use crate::decrypt::unseal_tree;
use crate::encrypt::{encrypt_tree, EncryptionTarget, Encryptor};
use crate::error::Result;
use crate::json::{from_json, JsonDirection, LeafPolicy};
use crate::transport::{CallRequest, CallTransport};

/// Pipeline configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Policy for unknown `utype` codes in JSON arguments.
    pub leaf_policy: LeafPolicy,
}

/// Who is calling, and with which permit material.
#[derive(Debug, Clone, Copy)]
pub struct Caller<'a> {
    pub account: Address,
    /// Substituted for permission placeholders.
    pub permission: Option<&'a Permission>,
    /// Used to unseal results.
    pub sealing_pair: Option<&'a SealingKeyPair>,
}

impl<'a> Caller<'a> {
    /// A caller with no active permit.
    pub fn anonymous(account: Address) -> Self {
        Self {
            account,
            permission: None,
            sealing_pair: None,
        }
    }
}

/// Result of a pipeline call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    /// Arguments could not be prepared; nothing was sent.
    NotSent,
    /// The call completed.
    Returned(Unsealable<CallValue>),
}

impl CallOutcome {
    pub fn was_sent(&self) -> bool {
        matches!(self, Self::Returned(_))
    }

    /// The unsealed result, if the call was sent and could be unsealed.
    pub fn into_value(self) -> Option<CallValue> {
        match self {
            Self::Returned(result) => result.into_option(),
            Self::NotSent => None,
        }
    }
}

/// Encrypt → call → unseal.
pub struct CallPipeline<T> {
    transport: T,
    encryptor: Option<Arc<dyn Encryptor>>,
    network_key: Option<X25519PublicKey>,
    config: PipelineConfig,
}

impl<T: CallTransport> CallPipeline<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            encryptor: None,
            network_key: None,
            config: PipelineConfig::default(),
        }
    }

    /// Encrypt inputs with `encryptor` for the network key `target`.
    pub fn with_encryptor(mut self, encryptor: Arc<dyn Encryptor>, target: X25519PublicKey) -> Self {
        self.encryptor = Some(encryptor);
        self.network_key = Some(target);
        self
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Encrypt `args` for sending. `None` means the call is not ready.
    pub async fn prepare(
        &self,
        args: &CallValue,
        permission: Option<&Permission>,
    ) -> Result<Option<CallValue>> {
        let target = match (&self.encryptor, self.network_key) {
            (Some(encryptor), Some(key)) => Some(EncryptionTarget::new(&**encryptor, key)),
            _ => None,
        };
        encrypt_tree(args, target, permission).await
    }

    /// Run a call end to end.
    pub async fn call(
        &self,
        caller: Caller<'_>,
        contract: Address,
        function: &str,
        args: &CallValue,
    ) -> Result<CallOutcome> {
        let Some(args) = self.prepare(args, caller.permission).await? else {
            debug!(%contract, function, "call not ready, arguments not prepared");
            return Ok(CallOutcome::NotSent);
        };

        let raw = self
            .transport
            .call(CallRequest {
                from: caller.account,
                contract,
                function: function.to_string(),
                args,
            })
            .await?;

        let result = unseal_tree(&raw, caller.sealing_pair)?;
        debug!(%contract, function, unsealed = result.is_unsealed(), "call returned");
        Ok(CallOutcome::Returned(result))
    }

    /// Like [`call`](Self::call), with arguments given as host JSON.
    pub async fn call_json(
        &self,
        caller: Caller<'_>,
        contract: Address,
        function: &str,
        args: &serde_json::Value,
    ) -> Result<CallOutcome> {
        let args = from_json(args, JsonDirection::Arguments, self.config.leaf_policy)?;
        self.call(caller, contract, function, &args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CallError;
    use crate::transport::memory::MemoryTransport;
    use async_trait::async_trait;
    use veil_core::{EncryptableValue, EncryptedValue, FheUType, SealedValue, Unsealed, U256};
    use veil_perms::seal_output;

    struct PlainEncryptor;

    #[async_trait]
    impl Encryptor for PlainEncryptor {
        async fn encrypt(
            &self,
            value: &EncryptableValue,
            _target: &X25519PublicKey,
        ) -> Result<EncryptedValue> {
            Ok(EncryptedValue::new(
                value.item.to_u256().to_be_bytes::<32>().to_vec(),
                value.utype(),
                value.security_zone,
            ))
        }
    }

    fn token() -> Address {
        Address::repeat_byte(0x70)
    }

    async fn token_transport(sealing_key: X25519PublicKey) -> MemoryTransport {
        let transport = MemoryTransport::new();
        transport
            .register(token(), "balanceOf", move |_| {
                let data = seal_output(U256::from(250u64), &sealing_key)?;
                Ok(CallValue::record([(
                    "balance",
                    CallValue::Sealed(SealedValue::with_utype(data, FheUType::Uint32)),
                )]))
            })
            .await;
        transport
            .register(token(), "transfer", |req| match req.args.get("amount") {
                Some(CallValue::Encrypted(_)) => Ok(CallValue::Bool(true)),
                _ => Err(CallError::Transport("amount must be encrypted".into())),
            })
            .await;
        transport
    }

    #[tokio::test]
    async fn test_call_unseals_results() {
        let pair = SealingKeyPair::generate();
        let pipeline = CallPipeline::new(token_transport(pair.public_key()).await);
        let caller = Caller {
            account: Address::repeat_byte(1),
            permission: None,
            sealing_pair: Some(&pair),
        };

        let out = pipeline
            .call(caller, token(), "balanceOf", &CallValue::Null)
            .await
            .unwrap()
            .into_value()
            .unwrap();
        assert_eq!(
            out.get("balance"),
            Some(&CallValue::Unsealed(Unsealed::Uint(U256::from(250u64))))
        );
    }

    #[tokio::test]
    async fn test_call_without_encryptor_is_not_sent() {
        let pair = SealingKeyPair::generate();
        let pipeline = CallPipeline::new(token_transport(pair.public_key()).await);
        let args = CallValue::record([("amount", EncryptableValue::uint32(5).into())]);

        let outcome = pipeline
            .call(Caller::anonymous(Address::ZERO), token(), "transfer", &args)
            .await
            .unwrap();
        assert_eq!(outcome, CallOutcome::NotSent);
        assert!(pipeline.transport().sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_call_json_encrypts_arguments() {
        let pair = SealingKeyPair::generate();
        let pipeline = CallPipeline::new(token_transport(pair.public_key()).await)
            .with_encryptor(Arc::new(PlainEncryptor), pair.public_key());

        let outcome = pipeline
            .call_json(
                Caller::anonymous(Address::ZERO),
                token(),
                "transfer",
                &serde_json::json!({ "amount": { "data": 5, "securityZone": 0, "utype": 2 } }),
            )
            .await
            .unwrap();
        assert_eq!(outcome.into_value(), Some(CallValue::Bool(true)));
    }

    #[tokio::test]
    async fn test_call_json_encrypts_string_plaintexts() {
        let pair = SealingKeyPair::generate();
        let pipeline = CallPipeline::new(token_transport(pair.public_key()).await)
            .with_encryptor(Arc::new(PlainEncryptor), pair.public_key());
        let to = Address::repeat_byte(0x11);

        pipeline
            .call_json(
                Caller::anonymous(Address::ZERO),
                token(),
                "transfer",
                &serde_json::json!({
                    "to": { "data": to.to_string(), "utype": 12 },
                    "amount": { "data": "1000000000000000000000", "utype": 5 },
                }),
            )
            .await
            .unwrap();

        let sent = pipeline.transport().sent().await;
        let args = &sent[0].args;
        match (args.get("to"), args.get("amount")) {
            (Some(CallValue::Encrypted(to_ct)), Some(CallValue::Encrypted(amount_ct))) => {
                assert_eq!(to_ct.utype, FheUType::Address);
                assert_eq!(&to_ct.data[12..], to.as_slice());
                assert_eq!(amount_ct.utype, FheUType::Uint256);
            }
            other => panic!("expected ciphertexts, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_results_stay_sealed_without_key() {
        let pair = SealingKeyPair::generate();
        let pipeline = CallPipeline::new(token_transport(pair.public_key()).await);

        let outcome = pipeline
            .call(Caller::anonymous(Address::ZERO), token(), "balanceOf", &CallValue::Null)
            .await
            .unwrap();
        assert_eq!(outcome, CallOutcome::Returned(Unsealable::Sealed));
        assert!(outcome.was_sent());
    }
}
