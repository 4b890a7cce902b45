//! Service configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use secretd_common::{Error, Result};
use secretd_crypto::Algorithm;

/// Whether plain sessions may retrieve secrets from private collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlainPrivatePolicy {
    /// Reject with `InsufficientSessionSecurity`.
    #[default]
    Deny,
    /// Allow; the caller accepts plaintext transport.
    Allow,
}

/// Configuration of a [`SecretService`](crate::SecretService).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Retrieval policy for plain sessions against private collections.
    pub plain_private_policy: PlainPrivatePolicy,
    /// Algorithms clients may negotiate.
    pub algorithms: Vec<Algorithm>,
    /// Cap on concurrently open sessions; `None` means unlimited.
    pub max_sessions: Option<usize>,
    /// Label of a collection created when the service starts.
    pub default_collection: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            plain_private_policy: PlainPrivatePolicy::Deny,
            algorithms: Algorithm::ALL.to_vec(),
            max_sessions: None,
            default_collection: None,
        }
    }
}

impl ServiceConfig {
    /// Check the configuration for values the service cannot run with.
    ///
    /// # Errors
    /// - `InvalidInput` if no algorithm is enabled
    /// - `InvalidInput` if the session cap is zero
    pub fn validate(&self) -> Result<()> {
        if self.algorithms.is_empty() {
            return Err(Error::InvalidInput(
                "At least one algorithm must be enabled".to_string(),
            ));
        }
        if self.max_sessions == Some(0) {
            return Err(Error::InvalidInput(
                "max_sessions must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Load and validate configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))
    }
}
