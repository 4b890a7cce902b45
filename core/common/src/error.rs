//! Common error types for secretd.

use thiserror::Error;

/// Top-level error type for secretd operations.
///
/// Every variant is recoverable at the caller; none of them should bring the
/// service process down.
#[derive(Debug, Error)]
pub enum Error {
    /// The proposed session algorithm is unknown or disabled.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The session handle is stale or was never issued.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Malformed collection or item label.
    #[error("Invalid label: {0}")]
    InvalidLabel(String),

    /// Retrieval blocked by the lock state of the item or its collection.
    #[error("Item is locked: {0}")]
    ItemLocked(String),

    /// Mutation blocked because the target collection is locked.
    #[error("Collection is locked: {0}")]
    CollectionLocked(String),

    /// Cryptographic integrity failure.
    ///
    /// Carries no detail so that a wrong key cannot be told apart from a
    /// corrupted ciphertext.
    #[error("Decryption failed")]
    DecryptionFailed,

    /// The session's transport mode does not satisfy the retrieval policy.
    #[error("Insufficient session security: {0}")]
    InsufficientSessionSecurity(String),

    /// Collection or item not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation not permitted.
    #[error("Not permitted: {0}")]
    NotPermitted(String),

    /// Cryptographic operation failed for a reason other than integrity.
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable D-Bus style error name for transports that report errors by name.
    pub fn dbus_name(&self) -> &'static str {
        match self {
            Error::UnsupportedAlgorithm(_) => "org.freedesktop.DBus.Error.NotSupported",
            Error::SessionNotFound(_) => "org.freedesktop.Secret.Error.NoSession",
            Error::InvalidLabel(_) | Error::InvalidInput(_) => {
                "org.freedesktop.DBus.Error.InvalidArgs"
            }
            Error::ItemLocked(_) | Error::CollectionLocked(_) => {
                "org.freedesktop.Secret.Error.IsLocked"
            }
            Error::NotFound(_) => "org.freedesktop.Secret.Error.NoSuchObject",
            Error::DecryptionFailed => "org.freedesktop.Secret.Error.DecryptionFailed",
            Error::InsufficientSessionSecurity(_) | Error::NotPermitted(_) => {
                "org.freedesktop.DBus.Error.AccessDenied"
            }
            Error::Crypto(_) | Error::Serialization(_) | Error::Io(_) => {
                "org.freedesktop.DBus.Error.Failed"
            }
        }
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decryption_failed_has_no_detail() {
        assert_eq!(Error::DecryptionFailed.to_string(), "Decryption failed");
    }

    #[test]
    fn test_lock_errors_share_dbus_name() {
        assert_eq!(
            Error::ItemLocked("a".into()).dbus_name(),
            Error::CollectionLocked("b".into()).dbus_name()
        );
    }
}
