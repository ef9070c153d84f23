//! # Veil Testkit
//!
//! Testing utilities for Veil.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: deterministic wallets with their own permit stores, and a
//!   [`SimulatedNetwork`] that encrypts inputs and hosts a confidential token
//! - **Generators**: Proptest strategies for call trees and permit parameters
//! - **Vectors**: Permits built from fixed inputs, for hash stability checks
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use veil_testkit::generators::plain_tree;
//!
//! proptest! {
//!     #[test]
//!     fn plain_trees_pass_through(tree in plain_tree()) {
//!         let out = veil_call::unseal_tree(&tree, None).unwrap();
//!         prop_assert_eq!(out.into_option(), Some(tree));
//!     }
//! }
//! ```
//!
//! ## Simulated Network
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use veil_call::CallPipeline;
//! use veil_testkit::SimulatedNetwork;
//!
//! let network = Arc::new(SimulatedNetwork::new());
//! let pipeline = CallPipeline::new(Arc::clone(&network))
//!     .with_encryptor(network.clone(), network.public_key());
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_party_fixtures, SimulatedNetwork, TestFixture};
pub use generators::{permit_from_params, PermitParams};
pub use vectors::{all_vectors, permit_from_vector, verify_all_vectors, PermitVector};
