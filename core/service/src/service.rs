//! The service facade.
//!
//! [`SecretService`] is the only surface an RPC transport talks to. It owns
//! no state of its own beyond configuration; sessions, collections and
//! search live in the collaborators it was constructed with.

use std::sync::Arc;
use tracing::{debug, warn};

use secretd_common::{CollectionId, Error, ItemId, Result};
use secretd_crypto::{Algorithm, KeyNegotiator, Secret, StandardNegotiator};
use secretd_store::{
    AttributeSearch, AttributeSearchEngine, Attributes, CollectionInfo, CollectionStore,
    ItemInfo, LockTarget, MemoryStore, NewItem, SearchResult, DEFAULT_CONTENT_TYPE,
};

use crate::config::{PlainPrivatePolicy, ServiceConfig};
use crate::session::{OpenedSession, Session, SessionHandle, SessionManager, SessionRegistry};

/// Properties of an item being created.
#[derive(Debug, Clone, Default)]
pub struct ItemProperties {
    pub label: String,
    pub attributes: Attributes,
    /// Defaults to `text/plain`.
    pub content_type: Option<String>,
}

/// One secret returned by [`SecretService::retrieve_secrets`].
#[derive(Debug, Clone)]
pub struct RetrievedSecret {
    pub item: ItemId,
    pub content_type: String,
    /// Encoded for the requesting session.
    pub secret: Secret,
}

/// Secret storage service facade.
pub struct SecretService {
    config: ServiceConfig,
    negotiator: Arc<dyn KeyNegotiator>,
    sessions: Arc<dyn SessionRegistry>,
    store: Arc<dyn CollectionStore>,
    search: Arc<dyn AttributeSearch>,
}

impl SecretService {
    /// Create a service with the standard components.
    ///
    /// # Errors
    /// - `InvalidInput` if the configuration does not validate
    /// - `InvalidLabel` if the configured default collection label is malformed
    pub fn new(config: ServiceConfig) -> Result<Self> {
        config.validate()?;

        let negotiator: Arc<dyn KeyNegotiator> =
            Arc::new(StandardNegotiator::with_algorithms(config.algorithms.clone()));
        let sessions = Arc::new(
            SessionManager::new(Arc::clone(&negotiator)).with_max_sessions(config.max_sessions),
        );

        let service = Self::with_components(
            config,
            negotiator,
            sessions,
            Arc::new(MemoryStore::new()),
            Arc::new(AttributeSearchEngine::new()),
        );

        if let Some(label) = service.config.default_collection.clone() {
            service.create_collection(&label, false)?;
        }

        Ok(service)
    }

    /// Create a service from explicit components.
    ///
    /// `sessions` should negotiate through the same backend as `negotiator`,
    /// which is used to encode and decode secrets on those sessions.
    pub fn with_components(
        config: ServiceConfig,
        negotiator: Arc<dyn KeyNegotiator>,
        sessions: Arc<dyn SessionRegistry>,
        store: Arc<dyn CollectionStore>,
        search: Arc<dyn AttributeSearch>,
    ) -> Self {
        Self {
            config,
            negotiator,
            sessions,
            store,
            search,
        }
    }

    /// Get the service configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Algorithms clients may propose.
    pub fn algorithms(&self) -> Vec<Algorithm> {
        self.negotiator.algorithms()
    }

    /// Open a session.
    ///
    /// # Errors
    /// - `UnsupportedAlgorithm` if the algorithm is unknown or disabled
    /// - `InvalidInput` if the client input is malformed
    /// - `NotPermitted` if the session cap is reached
    pub fn open_session(&self, algorithm: &str, client_public: &[u8]) -> Result<OpenedSession> {
        self.sessions.open(algorithm, client_public)
    }

    /// Close a session. Never fails; returns whether a session was removed.
    pub fn close_session(&self, handle: &SessionHandle) -> bool {
        self.sessions.close(handle)
    }

    /// Create a collection. Does not require a session.
    ///
    /// # Errors
    /// - `InvalidLabel` if the label is malformed
    pub fn create_collection(&self, label: &str, private: bool) -> Result<CollectionId> {
        self.store.create_collection(label, private)
    }

    /// Change a collection's label.
    ///
    /// # Errors
    /// - `InvalidLabel` if the label is malformed
    /// - `NotFound` if the collection does not exist
    pub fn set_collection_label(&self, id: CollectionId, label: &str) -> Result<()> {
        self.store.set_collection_label(id, label)
    }

    /// Delete a collection and its items.
    pub fn delete_collection(&self, id: CollectionId) -> Result<()> {
        self.store.delete_collection(id)
    }

    /// Metadata of every collection, in creation order.
    pub fn list_collections(&self) -> Vec<CollectionInfo> {
        self.store.list_collections()
    }

    /// Metadata of every item in a collection.
    pub fn list_items(&self, collection: CollectionId) -> Result<Vec<ItemInfo>> {
        self.store.list_items(collection)
    }

    /// Lock every collection. Never fails and never destroys data.
    pub fn lock_service(&self) {
        if let Err(e) = self.store.lock(LockTarget::All) {
            // a store that cannot lock everything must still not fail the call
            warn!(error = %e, "Service-wide lock reported an error");
        }
    }

    /// Lock collections or items, in order.
    ///
    /// Targets before a failing one stay locked.
    ///
    /// # Errors
    /// - `NotFound` for an unknown collection or item
    pub fn lock(&self, targets: &[LockTarget]) -> Result<()> {
        targets
            .iter()
            .try_for_each(|&target| self.store.lock(target))
    }

    /// Unlock collections or items, in order.
    ///
    /// # Errors
    /// - `NotFound` for an unknown collection or item
    /// - `NotPermitted` for [`LockTarget::All`]
    pub fn unlock(&self, targets: &[LockTarget]) -> Result<()> {
        targets
            .iter()
            .try_for_each(|&target| self.store.unlock(target))
    }

    /// Search every collection. Never fails; no match is an empty result.
    pub fn search_collections(&self, fields: &Attributes) -> SearchResult {
        let snapshot = self.store.snapshot();
        self.search.search(&snapshot, fields)
    }

    /// Search one collection.
    ///
    /// # Errors
    /// - `NotFound` if the collection does not exist
    pub fn search_items(&self, collection: CollectionId, fields: &Attributes) -> Result<SearchResult> {
        let snapshot = self.store.snapshot_collection(collection)?;
        Ok(self.search.search_collection(&snapshot, fields))
    }

    /// Create an item from a secret encoded for `session`.
    ///
    /// # Errors
    /// - `SessionNotFound` if the session is not live
    /// - `DecryptionFailed` if the secret does not open with the session key
    /// - `NotFound` if the collection does not exist
    /// - `CollectionLocked` if the collection is locked
    /// - `InvalidLabel` if the label is malformed
    pub fn create_item(
        &self,
        session: &SessionHandle,
        collection: CollectionId,
        properties: ItemProperties,
        secret: &Secret,
        replace: bool,
    ) -> Result<ItemId> {
        let session = self.sessions.lookup(session)?;
        let plaintext = self.negotiator.decrypt(session.cipher(), secret)?;

        self.store.add_item(
            collection,
            NewItem {
                label: properties.label,
                attributes: properties.attributes,
                secret: plaintext,
                content_type: properties
                    .content_type
                    .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
                replace,
            },
        )
    }

    /// Delete an item.
    pub fn delete_item(&self, id: ItemId) -> Result<()> {
        self.store.remove_item(id)
    }

    /// Retrieve secrets for the given items, encoded for `session`.
    ///
    /// All or nothing: the first failing item fails the whole call.
    ///
    /// # Errors
    /// - `SessionNotFound` if the session is not live
    /// - `NotFound` for an unknown item
    /// - `ItemLocked` for an effectively locked item
    /// - `InsufficientSessionSecurity` when policy denies a plain session
    ///   access to a private collection
    /// - `DecryptionFailed` if a sealed payload fails authentication
    pub fn retrieve_secrets(
        &self,
        session: &SessionHandle,
        items: &[ItemId],
    ) -> Result<Vec<RetrievedSecret>> {
        // held until every secret is encoded, so a concurrent close cannot
        // zeroize the key mid-call
        let session = self.sessions.lookup(session)?;

        let mut secrets = Vec::with_capacity(items.len());
        for &id in items {
            let info = self.store.item_info(id)?;
            if info.locked {
                return Err(Error::ItemLocked(id.to_path()));
            }

            let collection = self.store.collection_info(id.collection())?;
            self.authorize(&session, &collection)?;

            let stored = self.store.read_secret(id)?;
            let secret = self
                .negotiator
                .encrypt(session.cipher(), stored.plaintext.as_bytes())?;

            secrets.push(RetrievedSecret {
                item: id,
                content_type: stored.content_type,
                secret,
            });
        }

        debug!(session = %session.handle(), count = secrets.len(), "Retrieved secrets");
        Ok(secrets)
    }

    /// Close every session. Returns how many were closed.
    pub fn shutdown(&self) -> usize {
        self.sessions.close_all()
    }

    fn authorize(&self, session: &Session, collection: &CollectionInfo) -> Result<()> {
        if collection.private
            && !session.is_encrypted()
            && self.config.plain_private_policy == PlainPrivatePolicy::Deny
        {
            warn!(
                session = %session.handle(),
                collection = %collection.id,
                "Denied plain session access to private collection"
            );
            return Err(Error::InsufficientSessionSecurity(format!(
                "{} requires an encrypted session",
                collection.id
            )));
        }
        Ok(())
    }
}

impl Drop for SecretService {
    fn drop(&mut self) {
        self.shutdown();
    }
}
