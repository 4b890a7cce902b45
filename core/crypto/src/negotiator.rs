//! Session algorithm negotiation.
//!
//! A negotiator turns a client's proposed algorithm tag and public input into
//! a [`SessionCipher`] plus the server's public output, and seals/opens
//! [`Secret`] payloads for an established cipher.

use tracing::debug;

use crate::aead::{self, NONCE_SIZE};
use crate::algorithm::Algorithm;
use crate::dh::DhExchange;
use crate::keys::SessionKey;
use crate::secret::Secret;
use secretd_common::{Error, Result, SensitiveBytes};

/// Transport mode bound to a session.
#[derive(Debug)]
pub enum SessionCipher {
    /// Secrets travel unencrypted.
    Plain,
    /// Secrets are sealed with the derived session key.
    Aead(SessionKey),
}

impl SessionCipher {
    /// Algorithm this cipher implements.
    pub fn algorithm(&self) -> Algorithm {
        match self {
            SessionCipher::Plain => Algorithm::Plain,
            SessionCipher::Aead(_) => Algorithm::DhX25519,
        }
    }

    /// Whether secrets are encrypted in transit.
    pub fn is_encrypted(&self) -> bool {
        self.algorithm().is_encrypted()
    }

    /// Seal plaintext into a secret for this cipher.
    ///
    /// # Errors
    /// - `Crypto` if encryption fails
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Secret> {
        match self {
            SessionCipher::Plain => Ok(Secret::new(
                Algorithm::Plain.as_str(),
                Vec::new(),
                plaintext.to_vec(),
            )),
            SessionCipher::Aead(key) => {
                let nonce = aead::generate_nonce();
                let value = aead::encrypt_with_nonce(key.as_bytes(), &nonce, plaintext)?;
                Ok(Secret::new(
                    Algorithm::DhX25519.as_str(),
                    nonce.to_vec(),
                    value,
                ))
            }
        }
    }

    /// Open a secret produced for this cipher.
    ///
    /// # Errors
    /// - `DecryptionFailed` on tag mismatch, malformed parameters, wrong key
    ///   or tampered ciphertext, without saying which
    pub fn decrypt(&self, secret: &Secret) -> Result<SensitiveBytes> {
        if secret.algorithm != self.algorithm().as_str() {
            return Err(Error::DecryptionFailed);
        }

        match self {
            SessionCipher::Plain => {
                if !secret.parameters.is_empty() {
                    return Err(Error::DecryptionFailed);
                }
                Ok(SensitiveBytes::from(secret.value.as_slice()))
            }
            SessionCipher::Aead(key) => {
                let nonce: [u8; NONCE_SIZE] = secret
                    .parameters
                    .as_slice()
                    .try_into()
                    .map_err(|_| Error::DecryptionFailed)?;
                aead::decrypt_with_nonce(key.as_bytes(), &nonce, &secret.value)
                    .map(SensitiveBytes::new)
            }
        }
    }
}

/// Outcome of a successful negotiation.
#[derive(Debug)]
pub struct Negotiated {
    /// Cipher to bind to the new session.
    pub cipher: SessionCipher,
    /// Bytes to return to the client (the server public key, or empty).
    pub server_public: Vec<u8>,
}

impl Negotiated {
    /// The negotiated algorithm.
    pub fn algorithm(&self) -> Algorithm {
        self.cipher.algorithm()
    }
}

/// Crypto backend used by the session layer.
pub trait KeyNegotiator: Send + Sync {
    /// Algorithms this negotiator will accept.
    fn algorithms(&self) -> Vec<Algorithm>;

    /// Negotiate a session cipher.
    ///
    /// # Errors
    /// - `UnsupportedAlgorithm` if the tag is unknown or disabled
    /// - `InvalidInput` if the client input is malformed for the algorithm
    fn negotiate(&self, proposed: &str, client_public: &[u8]) -> Result<Negotiated>;

    /// Seal plaintext for a session.
    fn encrypt(&self, cipher: &SessionCipher, plaintext: &[u8]) -> Result<Secret> {
        cipher.encrypt(plaintext)
    }

    /// Open a secret received on a session.
    fn decrypt(&self, cipher: &SessionCipher, secret: &Secret) -> Result<SensitiveBytes> {
        cipher.decrypt(secret)
    }
}

/// Negotiator backed by this crate's primitives.
#[derive(Debug, Clone)]
pub struct StandardNegotiator {
    enabled: Vec<Algorithm>,
}

impl StandardNegotiator {
    /// Create a negotiator accepting every implemented algorithm.
    pub fn new() -> Self {
        Self {
            enabled: Algorithm::ALL.to_vec(),
        }
    }

    /// Create a negotiator restricted to the given algorithms.
    pub fn with_algorithms(enabled: Vec<Algorithm>) -> Self {
        Self { enabled }
    }
}

impl Default for StandardNegotiator {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyNegotiator for StandardNegotiator {
    fn algorithms(&self) -> Vec<Algorithm> {
        self.enabled.clone()
    }

    fn negotiate(&self, proposed: &str, client_public: &[u8]) -> Result<Negotiated> {
        let algorithm = Algorithm::parse(proposed)?;
        if !self.enabled.contains(&algorithm) {
            return Err(Error::UnsupportedAlgorithm(proposed.to_string()));
        }

        let negotiated = match algorithm {
            Algorithm::Plain => {
                if !client_public.is_empty() {
                    return Err(Error::InvalidInput(
                        "Plain sessions take no client input".to_string(),
                    ));
                }
                Negotiated {
                    cipher: SessionCipher::Plain,
                    server_public: Vec::new(),
                }
            }
            Algorithm::DhX25519 => {
                let exchange = DhExchange::new();
                let server_public = exchange.public_bytes().to_vec();
                let key = exchange.complete(client_public)?;
                Negotiated {
                    cipher: SessionCipher::Aead(key),
                    server_public,
                }
            }
        };

        debug!(algorithm = %algorithm, "Negotiated session algorithm");
        Ok(negotiated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn negotiate_dh() -> (SessionCipher, SessionCipher) {
        let client = DhExchange::new();
        let negotiated = StandardNegotiator::new()
            .negotiate(Algorithm::DhX25519.as_str(), &client.public_bytes())
            .unwrap();
        let client_key = client.complete(&negotiated.server_public).unwrap();
        (negotiated.cipher, SessionCipher::Aead(client_key))
    }

    #[test]
    fn test_negotiate_plain() {
        let negotiated = StandardNegotiator::new().negotiate("plain", &[]).unwrap();
        assert_eq!(negotiated.algorithm(), Algorithm::Plain);
        assert!(negotiated.server_public.is_empty());
    }

    #[test]
    fn test_plain_rejects_client_input() {
        let err = StandardNegotiator::new()
            .negotiate("plain", &[1, 2, 3])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_unknown_algorithm() {
        let err = StandardNegotiator::new()
            .negotiate("dh-ietf1024-sha256-aes128-cbc-pkcs7", &[])
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedAlgorithm(_)));
    }

    #[test]
    fn test_disabled_algorithm() {
        let negotiator = StandardNegotiator::with_algorithms(vec![Algorithm::DhX25519]);
        let err = negotiator.negotiate("plain", &[]).unwrap_err();
        assert!(matches!(err, Error::UnsupportedAlgorithm(_)));
    }

    #[test]
    fn test_dh_client_reads_server_secret() {
        let (server, client) = negotiate_dh();
        assert!(server.is_encrypted());

        let secret = server.encrypt(b"correct horse").unwrap();
        assert_eq!(secret.algorithm, Algorithm::DhX25519.as_str());
        assert_eq!(secret.parameters.len(), NONCE_SIZE);
        assert_ne!(secret.value, b"correct horse");

        let opened = client.decrypt(&secret).unwrap();
        assert_eq!(opened.as_bytes(), b"correct horse");
    }

    #[test]
    fn test_decrypt_with_other_session_fails() {
        let (server, _) = negotiate_dh();
        let (_, stranger) = negotiate_dh();

        let secret = server.encrypt(b"payload").unwrap();
        assert!(matches!(
            stranger.decrypt(&secret),
            Err(Error::DecryptionFailed)
        ));
    }

    #[test]
    fn test_decrypt_rejects_tampering() {
        let (server, client) = negotiate_dh();

        let mut secret = server.encrypt(b"payload").unwrap();
        secret.value[0] ^= 0x01;
        assert!(matches!(client.decrypt(&secret), Err(Error::DecryptionFailed)));

        let mut secret = server.encrypt(b"payload").unwrap();
        secret.parameters.truncate(12);
        assert!(matches!(client.decrypt(&secret), Err(Error::DecryptionFailed)));

        let mut secret = server.encrypt(b"payload").unwrap();
        secret.algorithm = "plain".to_string();
        assert!(matches!(client.decrypt(&secret), Err(Error::DecryptionFailed)));
    }

    #[test]
    fn test_plain_cipher_passes_value_through() {
        let secret = SessionCipher::Plain.encrypt(b"visible").unwrap();
        assert_eq!(secret.algorithm, "plain");
        assert!(secret.parameters.is_empty());
        assert_eq!(secret.value, b"visible");
        assert_eq!(
            SessionCipher::Plain.decrypt(&secret).unwrap().as_bytes(),
            b"visible"
        );
    }

    proptest! {
        #[test]
        fn prop_dh_roundtrip(plaintext in proptest::collection::vec(any::<u8>(), 0..512)) {
            let (server, client) = negotiate_dh();
            let secret = server.encrypt(&plaintext).unwrap();
            let opened_by_client = client.decrypt(&secret).unwrap();
            let opened_by_server = server.decrypt(&secret).unwrap();
            prop_assert_eq!(opened_by_client.as_bytes(), plaintext.as_slice());
            prop_assert_eq!(opened_by_server.as_bytes(), plaintext.as_slice());
        }
    }
}
