//! Transport abstraction for contract calls.
//!
//! The transport receives already encrypted argument trees and returns raw
//! result trees. Implementations may wrap JSON-RPC, a multicall batcher, or
//! anything else; the pipeline only needs [`CallTransport::call`].

use std::sync::Arc;

use async_trait::async_trait;

use veil_core::{Address, CallValue};

use crate::error::Result;

/// A single contract call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    /// Account the call is made on behalf of.
    pub from: Address,
    pub contract: Address,
    pub function: String,
    pub args: CallValue,
}

/// Sends calls and returns their raw results.
#[async_trait]
pub trait CallTransport: Send + Sync {
    async fn call(&self, request: CallRequest) -> Result<CallValue>;
}

#[async_trait]
impl<T: CallTransport + ?Sized> CallTransport for Arc<T> {
    async fn call(&self, request: CallRequest) -> Result<CallValue> {
        (**self).call(request).await
    }
}

/// A simple in-memory transport for testing.
///
/// Contract functions are registered as closures; every request is recorded
/// so tests can inspect what actually went over the wire.
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::RwLock;

    use crate::error::CallError;

    type Handler = Box<dyn Fn(&CallRequest) -> Result<CallValue> + Send + Sync>;

    /// In-memory transport implementation.
    #[derive(Default)]
    pub struct MemoryTransport {
        handlers: RwLock<HashMap<(Address, String), Handler>>,
        sent: RwLock<Vec<CallRequest>>,
    }

    impl MemoryTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Register the handler for `contract.function`, replacing any previous one.
        pub async fn register<F>(&self, contract: Address, function: &str, handler: F)
        where
            F: Fn(&CallRequest) -> Result<CallValue> + Send + Sync + 'static,
        {
            self.handlers
                .write()
                .await
                .insert((contract, function.to_string()), Box::new(handler));
        }

        /// Requests received so far, oldest first.
        pub async fn sent(&self) -> Vec<CallRequest> {
            self.sent.read().await.clone()
        }
    }

    #[async_trait]
    impl CallTransport for MemoryTransport {
        async fn call(&self, request: CallRequest) -> Result<CallValue> {
            self.sent.write().await.push(request.clone());

            let handlers = self.handlers.read().await;
            let handler = handlers
                .get(&(request.contract, request.function.clone()))
                .ok_or_else(|| {
                    CallError::Transport(format!(
                        "no handler for {}.{}",
                        request.contract, request.function
                    ))
                })?;
            handler(&request)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryTransport;
    use super::*;
    use crate::error::CallError;

    fn request(function: &str, args: CallValue) -> CallRequest {
        CallRequest {
            from: Address::repeat_byte(1),
            contract: Address::repeat_byte(2),
            function: function.into(),
            args,
        }
    }

    #[tokio::test]
    async fn test_memory_transport_dispatch() {
        let transport = MemoryTransport::new();
        transport
            .register(Address::repeat_byte(2), "echo", |req| Ok(req.args.clone()))
            .await;

        let out = transport
            .call(request("echo", CallValue::from(5u64)))
            .await
            .unwrap();
        assert_eq!(out, CallValue::from(5u64));
        assert_eq!(transport.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn test_memory_transport_unknown_function() {
        let transport = MemoryTransport::new();
        let result = transport.call(request("missing", CallValue::Null)).await;
        assert!(matches!(result, Err(CallError::Transport(_))));
    }
}
