//! Session algorithm tags.

use serde::{Deserialize, Serialize};
use std::fmt;

use secretd_common::{Error, Result};

/// Transport-encryption scheme negotiated for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Algorithm {
    /// No encryption. Secret values travel as plaintext.
    Plain,
    /// X25519 key agreement, HKDF-SHA256 key derivation,
    /// XChaCha20-Poly1305 secret sealing.
    DhX25519,
}

impl Algorithm {
    /// Every algorithm this crate implements, in preference order.
    pub const ALL: [Algorithm; 2] = [Algorithm::DhX25519, Algorithm::Plain];

    /// Wire tag of the algorithm.
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Plain => "plain",
            Algorithm::DhX25519 => "dh-x25519-hkdf-sha256-xchacha20poly1305",
        }
    }

    /// Parse a wire tag.
    ///
    /// # Errors
    /// - `UnsupportedAlgorithm` if the tag is not recognised
    pub fn parse(tag: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.as_str() == tag)
            .ok_or_else(|| Error::UnsupportedAlgorithm(tag.to_string()))
    }

    /// Whether secrets on this algorithm are encrypted in transit.
    pub fn is_encrypted(&self) -> bool {
        !matches!(self, Algorithm::Plain)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Algorithm {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Algorithm> for String {
    fn from(alg: Algorithm) -> Self {
        alg.as_str().to_string()
    }
}
