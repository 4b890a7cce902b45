//! Cryptographic primitives for secretd.
//!
//! This module provides:
//! - Session algorithm negotiation (`plain` and an X25519 key exchange)
//! - Authenticated encryption using XChaCha20-Poly1305
//! - Secret payload construction and validation for a negotiated session
//! - Key types with automatic zeroization
//!
//! # Security Guarantees
//! - All key material is automatically zeroized on drop
//! - No plaintext or key material is ever logged
//! - Decryption failures are reported without distinguishing their cause

pub mod aead;
pub mod algorithm;
pub mod dh;
pub mod keys;
pub mod negotiator;
pub mod secret;

pub use aead::{decrypt, encrypt};
pub use algorithm::Algorithm;
pub use dh::DhExchange;
pub use keys::{ItemKey, SessionKey, StoreKey, KEY_LENGTH};
pub use negotiator::{KeyNegotiator, Negotiated, SessionCipher, StandardNegotiator};
pub use secret::Secret;
