//! Common utilities and types shared across the secretd crates.
//!
//! This module provides the error taxonomy, the object-path identifiers used
//! for collections and items, and the zeroizing byte wrapper that carries
//! plaintext secret material between components.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{CollectionId, ItemId, SensitiveBytes, COLLECTION_PREFIX, SERVICE_PATH};
