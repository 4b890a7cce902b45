//! Secret payloads exchanged over a session.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A secret value as it crosses the service boundary.
///
/// `value` is ciphertext for encrypted sessions and plaintext only when
/// `algorithm` is `"plain"`. Constructed fresh per response and zeroized on
/// drop.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Secret {
    /// Wire tag of the session algorithm that produced this secret.
    pub algorithm: String,
    /// Algorithm-specific parameters (the nonce for AEAD sessions).
    pub parameters: Vec<u8>,
    /// Ciphertext || tag, or plaintext on plain sessions.
    pub value: Vec<u8>,
}

impl Secret {
    /// Build a secret from its parts.
    pub fn new(algorithm: impl Into<String>, parameters: Vec<u8>, value: Vec<u8>) -> Self {
        Self {
            algorithm: algorithm.into(),
            parameters,
            value,
        }
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("algorithm", &self.algorithm)
            .field("parameters", &format_args!("[{} bytes]", self.parameters.len()))
            .field("value", &format_args!("[REDACTED; {} bytes]", self.value.len()))
            .finish()
    }
}
