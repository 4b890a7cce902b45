//! X25519 key agreement.
//!
//! Both ends generate an ephemeral keypair, exchange public keys, and
//! expand the shared secret with HKDF-SHA256 into a session key.

use hkdf::Hkdf;
use sha2::Sha256;
use std::fmt;
use x25519_dalek::{EphemeralSecret, PublicKey};
use zeroize::Zeroize;

use chacha20poly1305::aead::OsRng;

use crate::keys::{SessionKey, KEY_LENGTH};
use secretd_common::{Error, Result};

/// Length of an X25519 public key in bytes.
pub const PUBLIC_KEY_LENGTH: usize = 32;

const SESSION_SALT: &[u8] = b"secretd-session-v1";
const SESSION_INFO: &[u8] = b"session-key";

/// One side of an X25519 exchange.
///
/// The secret half is consumed by [`DhExchange::complete`], so each
/// exchange yields exactly one session key.
pub struct DhExchange {
    secret: EphemeralSecret,
    public: PublicKey,
}

impl DhExchange {
    /// Generate a fresh ephemeral keypair.
    pub fn new() -> Self {
        let secret = EphemeralSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Public key to send to the peer.
    pub fn public_bytes(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        self.public.to_bytes()
    }

    /// Combine with the peer's public key and derive the session key.
    ///
    /// # Errors
    /// - `InvalidInput` if the peer key is not 32 bytes
    /// - `InvalidInput` if the peer key is a low-order point
    pub fn complete(self, peer_public: &[u8]) -> Result<SessionKey> {
        let peer: [u8; PUBLIC_KEY_LENGTH] = peer_public.try_into().map_err(|_| {
            Error::InvalidInput(format!(
                "Public key must be {} bytes, got {}",
                PUBLIC_KEY_LENGTH,
                peer_public.len()
            ))
        })?;

        let shared = self.secret.diffie_hellman(&PublicKey::from(peer));
        if !shared.was_contributory() {
            return Err(Error::InvalidInput(
                "Public key is a low-order point".to_string(),
            ));
        }

        derive_session_key(shared.as_bytes())
    }
}

impl Default for DhExchange {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DhExchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DhExchange")
            .field("public", &self.public.as_bytes())
            .finish_non_exhaustive()
    }
}

fn derive_session_key(shared: &[u8]) -> Result<SessionKey> {
    let hk = Hkdf::<Sha256>::new(Some(SESSION_SALT), shared);
    let mut okm = [0u8; KEY_LENGTH];
    hk.expand(SESSION_INFO, &mut okm)
        .map_err(|e| Error::Crypto(format!("Key derivation failed: {}", e)))?;

    let key = SessionKey::from_bytes(okm);
    okm.zeroize();
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_sides_derive_same_key() {
        let client = DhExchange::new();
        let server = DhExchange::new();
        let client_pub = client.public_bytes();
        let server_pub = server.public_bytes();

        let server_key = server.complete(&client_pub).unwrap();
        let client_key = client.complete(&server_pub).unwrap();

        assert_eq!(server_key.as_bytes(), client_key.as_bytes());
    }

    #[test]
    fn test_distinct_exchanges_distinct_keys() {
        let peer = DhExchange::new().public_bytes();
        let a = DhExchange::new().complete(&peer).unwrap();
        let b = DhExchange::new().complete(&peer).unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_wrong_length_rejected() {
        let err = DhExchange::new().complete(&[9u8; 16]).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_low_order_point_rejected() {
        let err = DhExchange::new().complete(&[0u8; 32]).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
