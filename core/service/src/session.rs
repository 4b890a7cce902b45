//! Session management.
//!
//! Sessions hold the negotiated cipher for one client connection. Keys are
//! zeroized when the last reference to a session is dropped, so closing a
//! session never pulls a key out from under an operation still using it.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use secretd_common::{Error, Result, SERVICE_PATH};
use secretd_crypto::{Algorithm, KeyNegotiator, SessionCipher};

/// Session handle for tracking active sessions.
///
/// Rendered as `/org/freedesktop/secrets/session/<uuid>`; random, so
/// handles are unique for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionHandle(String);

impl SessionHandle {
    /// Generate a new unique session handle.
    pub fn new() -> Self {
        Self(format!(
            "{}/session/{}",
            SERVICE_PATH,
            Uuid::new_v4().simple()
        ))
    }

    /// Parse a handle received from a client.
    ///
    /// Only the shape is checked; whether the session exists is a lookup.
    pub fn parse(path: &str) -> Result<Self> {
        let token = path
            .strip_prefix(SERVICE_PATH)
            .and_then(|rest| rest.strip_prefix("/session/"))
            .ok_or_else(|| Error::SessionNotFound(path.to_string()))?;
        if token.is_empty() || token.contains('/') {
            return Err(Error::SessionNotFound(path.to_string()));
        }
        Ok(Self(path.to_string()))
    }

    /// Get the handle string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SessionHandle {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<SessionHandle> for String {
    fn from(handle: SessionHandle) -> Self {
        handle.0
    }
}

/// A live session.
///
/// The negotiated algorithm is fixed at creation.
#[derive(Debug)]
pub struct Session {
    handle: SessionHandle,
    cipher: SessionCipher,
}

impl Session {
    /// Get the session handle.
    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    /// The negotiated algorithm.
    pub fn algorithm(&self) -> Algorithm {
        self.cipher.algorithm()
    }

    /// The cipher bound to this session.
    pub fn cipher(&self) -> &SessionCipher {
        &self.cipher
    }

    /// Whether secrets on this session are encrypted in transit.
    pub fn is_encrypted(&self) -> bool {
        self.cipher.is_encrypted()
    }
}

/// Result of opening a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedSession {
    pub handle: SessionHandle,
    pub algorithm: Algorithm,
    /// Server public output of the exchange; empty for plain sessions.
    pub server_public: Vec<u8>,
}

/// Owner of the session table.
pub trait SessionRegistry: Send + Sync {
    /// Negotiate and register a new session.
    ///
    /// # Errors
    /// - `UnsupportedAlgorithm` if the algorithm is unknown or disabled
    /// - `InvalidInput` if the client input is malformed
    /// - `NotPermitted` if the session cap is reached
    fn open(&self, proposed: &str, client_public: &[u8]) -> Result<OpenedSession>;

    /// Close a session. Unknown or already closed handles are a no-op.
    ///
    /// Returns whether a session was removed.
    fn close(&self, handle: &SessionHandle) -> bool;

    /// Look up a live session.
    ///
    /// # Errors
    /// - `SessionNotFound` for unknown or closed handles
    fn lookup(&self, handle: &SessionHandle) -> Result<Arc<Session>>;

    /// Close every session. Returns how many were closed.
    fn close_all(&self) -> usize;

    /// Number of live sessions.
    fn len(&self) -> usize;

    /// Whether no session is live.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lock-guarded session table.
pub struct SessionManager {
    sessions: RwLock<HashMap<SessionHandle, Arc<Session>>>,
    negotiator: Arc<dyn KeyNegotiator>,
    max_sessions: Option<usize>,
}

impl SessionManager {
    /// Create an empty session table.
    pub fn new(negotiator: Arc<dyn KeyNegotiator>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            negotiator,
            max_sessions: None,
        }
    }

    /// Cap the number of concurrently live sessions.
    pub fn with_max_sessions(mut self, max_sessions: Option<usize>) -> Self {
        self.max_sessions = max_sessions;
        self
    }
}

impl SessionRegistry for SessionManager {
    fn open(&self, proposed: &str, client_public: &[u8]) -> Result<OpenedSession> {
        let negotiated = self.negotiator.negotiate(proposed, client_public)?;
        let algorithm = negotiated.algorithm();
        let session = Session {
            handle: SessionHandle::new(),
            cipher: negotiated.cipher,
        };
        let handle = session.handle.clone();

        let mut sessions = self.sessions.write();
        if let Some(max) = self.max_sessions {
            if sessions.len() >= max {
                return Err(Error::NotPermitted(format!(
                    "Session limit of {} reached",
                    max
                )));
            }
        }
        sessions.insert(handle.clone(), Arc::new(session));
        drop(sessions);

        info!(session = %handle, algorithm = %algorithm, "Opened session");
        Ok(OpenedSession {
            handle,
            algorithm,
            server_public: negotiated.server_public,
        })
    }

    fn close(&self, handle: &SessionHandle) -> bool {
        let removed = self.sessions.write().remove(handle);
        match removed {
            Some(_) => {
                info!(session = %handle, "Closed session");
                true
            }
            None => {
                debug!(session = %handle, "Close of unknown session ignored");
                false
            }
        }
    }

    fn lookup(&self, handle: &SessionHandle) -> Result<Arc<Session>> {
        self.sessions
            .read()
            .get(handle)
            .cloned()
            .ok_or_else(|| Error::SessionNotFound(handle.to_string()))
    }

    fn close_all(&self) -> usize {
        let drained: Vec<_> = self.sessions.write().drain().collect();
        if !drained.is_empty() {
            info!(sessions = drained.len(), "Closed all sessions");
        }
        drained.len()
    }

    fn len(&self) -> usize {
        self.sessions.read().len()
    }
}
