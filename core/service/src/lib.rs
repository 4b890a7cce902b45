//! Session handling and the service facade for secretd.
//!
//! This module provides:
//! - The session manager, which owns the process-wide session table
//! - Service configuration, including the retrieval policy for plain sessions
//! - [`SecretService`], the single surface an RPC transport calls into
//!
//! # Architecture
//! The facade composes four collaborators, each behind a trait: a
//! [`KeyNegotiator`](secretd_crypto::KeyNegotiator), a [`SessionRegistry`],
//! a [`CollectionStore`](secretd_store::CollectionStore) and an
//! [`AttributeSearch`](secretd_store::AttributeSearch). Any of them can be
//! swapped without touching the facade.

pub mod config;
pub mod service;
pub mod session;

pub use config::{PlainPrivatePolicy, ServiceConfig};
pub use service::{ItemProperties, RetrievedSecret, SecretService};
pub use session::{OpenedSession, Session, SessionHandle, SessionManager, SessionRegistry};
