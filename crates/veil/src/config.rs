//! Session configuration.

use serde::{Deserialize, Serialize};

use veil_call::{LeafPolicy, PipelineConfig};
use veil_perms::{TypedDataDomain, DEFAULT_EXPIRATION_SECS};

use crate::error::{Result, SessionError};

/// Configuration for a [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfig {
    /// Domain every permit signature is made under.
    pub domain: TypedDataDomain,
    /// Expiration offset for permits created without one.
    pub default_expiration_secs: u64,
    /// Policy for unknown `utype` codes in JSON call arguments.
    pub leaf_policy: LeafPolicy,
    /// Make newly created or imported usable permits active.
    pub activate_on_create: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            domain: TypedDataDomain::default(),
            default_expiration_secs: DEFAULT_EXPIRATION_SECS,
            leaf_policy: LeafPolicy::default(),
            activate_on_create: true,
        }
    }
}

impl SessionConfig {
    /// Load from JSON; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| SessionError::Config(e.to_string()))
    }

    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            leaf_policy: self.leaf_policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.domain.name, "Veil Permission");
        assert_eq!(config.domain.version, "v2.0.0");
        assert_eq!(config.default_expiration_secs, 86_400);
        assert_eq!(config.leaf_policy, LeafPolicy::PassThrough);
        assert!(config.activate_on_create);
    }

    #[test]
    fn test_partial_json() {
        let config =
            SessionConfig::from_json_str(r#"{ "leafPolicy": "reject", "defaultExpirationSecs": 60 }"#)
                .unwrap();
        assert_eq!(config.leaf_policy, LeafPolicy::Reject);
        assert_eq!(config.default_expiration_secs, 60);
        assert_eq!(config.domain, TypedDataDomain::default());
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(
            SessionConfig::from_json_str("{ \"leafPolicy\": 3 }"),
            Err(SessionError::Config(_))
        ));
    }
}
