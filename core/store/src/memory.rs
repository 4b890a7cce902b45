//! In-memory collection store.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, info};
use zeroize::Zeroize;

use secretd_common::{CollectionId, Error, ItemId, Result, SensitiveBytes};
use secretd_crypto::{aead, StoreKey};

use crate::model::{
    validate_label, Attributes, CollectionInfo, CollectionSnapshot, ItemInfo, StoreSnapshot,
};
use crate::store::{CollectionStore, LockTarget, NewItem, StoredSecret};

struct Item {
    id: ItemId,
    label: String,
    attributes: Attributes,
    content_type: String,
    /// nonce || ciphertext || tag under the item's derived key
    sealed: Vec<u8>,
    locked: bool,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
}

impl Item {
    fn is_locked(&self, collection_locked: bool) -> bool {
        collection_locked || self.locked
    }

    fn info(&self, collection_locked: bool) -> ItemInfo {
        ItemInfo {
            id: self.id,
            label: self.label.clone(),
            attributes: self.attributes.clone(),
            content_type: self.content_type.clone(),
            locked: self.is_locked(collection_locked),
            created: self.created,
            modified: self.modified,
        }
    }
}

impl Drop for Item {
    fn drop(&mut self) {
        self.sealed.zeroize();
    }
}

struct Collection {
    id: CollectionId,
    label: String,
    private: bool,
    locked: bool,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
    /// Creation order; sequence numbers are increasing.
    items: Vec<Item>,
    next_item: u64,
}

impl Collection {
    fn info(&self) -> CollectionInfo {
        CollectionInfo {
            id: self.id,
            label: self.label.clone(),
            private: self.private,
            locked: self.locked,
            item_count: self.items.len(),
            created: self.created,
            modified: self.modified,
        }
    }

    fn snapshot(&self) -> CollectionSnapshot {
        CollectionSnapshot {
            info: self.info(),
            items: self.items.iter().map(|i| i.info(self.locked)).collect(),
        }
    }

    fn position(&self, id: ItemId) -> Result<usize> {
        if id.collection() != self.id {
            return Err(Error::NotFound(format!("Item not found: {}", id)));
        }
        self.items
            .binary_search_by_key(&id.sequence(), |i| i.id.sequence())
            .map_err(|_| Error::NotFound(format!("Item not found: {}", id)))
    }

    fn item(&self, id: ItemId) -> Result<&Item> {
        let pos = self.position(id)?;
        Ok(&self.items[pos])
    }

    fn item_mut(&mut self, id: ItemId) -> Result<&mut Item> {
        let pos = self.position(id)?;
        Ok(&mut self.items[pos])
    }
}

#[derive(Default)]
struct StoreState {
    /// Creation order; sequence numbers are increasing.
    collections: Vec<Collection>,
    next_collection: u64,
}

impl StoreState {
    fn position(&self, id: CollectionId) -> Result<usize> {
        self.collections
            .binary_search_by_key(&id.sequence(), |c| c.id.sequence())
            .map_err(|_| Error::NotFound(format!("Collection not found: {}", id)))
    }

    fn collection(&self, id: CollectionId) -> Result<&Collection> {
        let pos = self.position(id)?;
        Ok(&self.collections[pos])
    }

    fn collection_mut(&mut self, id: CollectionId) -> Result<&mut Collection> {
        let pos = self.position(id)?;
        Ok(&mut self.collections[pos])
    }
}

/// In-memory collection store.
///
/// All state is lost on drop. Item payloads are sealed with
/// XChaCha20-Poly1305 under a key derived per item from a random store
/// key, so plaintext only exists transiently while an item is added or read.
///
/// # Thread Safety
///
/// The store keeps its state behind a single `RwLock`; every mutation holds
/// the write lock for its whole read/modify/write and every read holds the
/// read lock for the whole view it returns.
pub struct MemoryStore {
    state: RwLock<StoreState>,
    key: StoreKey,
}

impl MemoryStore {
    /// Create an empty store with a freshly generated store key.
    pub fn new() -> Self {
        Self::with_key(StoreKey::generate())
    }

    /// Create an empty store sealing items under the given key.
    pub fn with_key(key: StoreKey) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            key,
        }
    }

    fn seal(&self, id: ItemId, plaintext: &[u8]) -> Result<Vec<u8>> {
        let item_key = self.key.derive_item_key(id.to_path().as_bytes());
        aead::encrypt(item_key.as_bytes(), plaintext)
    }

    fn unseal(&self, id: ItemId, sealed: &[u8]) -> Result<SensitiveBytes> {
        let item_key = self.key.derive_item_key(id.to_path().as_bytes());
        aead::decrypt(item_key.as_bytes(), sealed).map(SensitiveBytes::new)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CollectionStore for MemoryStore {
    fn create_collection(&self, label: &str, private: bool) -> Result<CollectionId> {
        validate_label(label)?;

        let mut state = self.state.write();
        state.next_collection += 1;
        let id = CollectionId::new(state.next_collection);
        let now = Utc::now();

        state.collections.push(Collection {
            id,
            label: label.to_string(),
            private,
            locked: false,
            created: now,
            modified: now,
            items: Vec::new(),
            next_item: 0,
        });

        info!(collection = %id, label, private, "Created collection");
        Ok(id)
    }

    fn delete_collection(&self, id: CollectionId) -> Result<()> {
        let mut state = self.state.write();
        let pos = state.position(id)?;
        let removed = state.collections.remove(pos);

        info!(collection = %id, items = removed.items.len(), "Deleted collection");
        Ok(())
    }

    fn set_collection_label(&self, id: CollectionId, label: &str) -> Result<()> {
        validate_label(label)?;

        let mut state = self.state.write();
        let collection = state.collection_mut(id)?;
        collection.label = label.to_string();
        collection.modified = Utc::now();

        info!(collection = %id, label, "Relabelled collection");
        Ok(())
    }

    fn lock(&self, target: LockTarget) -> Result<()> {
        let mut state = self.state.write();
        match target {
            LockTarget::All => {
                for collection in &mut state.collections {
                    collection.locked = true;
                }
                info!(collections = state.collections.len(), "Locked all collections");
            }
            LockTarget::Collection(id) => {
                state.collection_mut(id)?.locked = true;
                info!(collection = %id, "Locked collection");
            }
            LockTarget::Item(id) => {
                state.collection_mut(id.collection())?.item_mut(id)?.locked = true;
                debug!(item = %id, "Locked item");
            }
        }
        Ok(())
    }

    fn unlock(&self, target: LockTarget) -> Result<()> {
        let mut state = self.state.write();
        match target {
            LockTarget::All => {
                return Err(Error::NotPermitted(
                    "Collections must be unlocked individually".to_string(),
                ));
            }
            LockTarget::Collection(id) => {
                let collection = state.collection_mut(id)?;
                if !collection.locked {
                    debug!(collection = %id, "Collection already unlocked");
                    return Ok(());
                }
                collection.locked = false;
                for item in &mut collection.items {
                    item.locked = false;
                }
                info!(collection = %id, "Unlocked collection");
            }
            LockTarget::Item(id) => {
                state.collection_mut(id.collection())?.item_mut(id)?.locked = false;
                debug!(item = %id, "Unlocked item");
            }
        }
        Ok(())
    }

    fn list_collections(&self) -> Vec<CollectionInfo> {
        self.state
            .read()
            .collections
            .iter()
            .map(Collection::info)
            .collect()
    }

    fn collection_info(&self, id: CollectionId) -> Result<CollectionInfo> {
        Ok(self.state.read().collection(id)?.info())
    }

    fn list_items(&self, collection: CollectionId) -> Result<Vec<ItemInfo>> {
        Ok(self.snapshot_collection(collection)?.items)
    }

    fn item_info(&self, id: ItemId) -> Result<ItemInfo> {
        let state = self.state.read();
        let collection = state.collection(id.collection())?;
        Ok(collection.item(id)?.info(collection.locked))
    }

    fn add_item(&self, collection_id: CollectionId, item: NewItem) -> Result<ItemId> {
        validate_label(&item.label)?;

        let mut state = self.state.write();
        let collection = state.collection_mut(collection_id)?;
        if collection.locked {
            return Err(Error::CollectionLocked(collection_id.to_path()));
        }
        let now = Utc::now();

        if item.replace {
            if let Some(existing) = collection
                .items
                .iter_mut()
                .find(|i| i.attributes == item.attributes)
            {
                if existing.locked {
                    return Err(Error::ItemLocked(existing.id.to_path()));
                }
                let sealed = self.seal(existing.id, item.secret.as_bytes())?;
                let mut old = std::mem::replace(&mut existing.sealed, sealed);
                old.zeroize();
                existing.label = item.label;
                existing.content_type = item.content_type;
                existing.modified = now;
                let id = existing.id;
                collection.modified = now;

                debug!(item = %id, "Replaced item");
                return Ok(id);
            }
        }

        collection.next_item += 1;
        let id = ItemId::new(collection_id, collection.next_item);
        let sealed = self.seal(id, item.secret.as_bytes())?;

        collection.items.push(Item {
            id,
            label: item.label,
            attributes: item.attributes,
            content_type: item.content_type,
            sealed,
            locked: false,
            created: now,
            modified: now,
        });
        collection.modified = now;

        debug!(item = %id, "Added item");
        Ok(id)
    }

    fn remove_item(&self, id: ItemId) -> Result<()> {
        let mut state = self.state.write();
        let collection = state.collection_mut(id.collection())?;
        let pos = collection.position(id)?;
        collection.items.remove(pos);
        collection.modified = Utc::now();

        debug!(item = %id, "Removed item");
        Ok(())
    }

    fn read_secret(&self, id: ItemId) -> Result<StoredSecret> {
        let state = self.state.read();
        let collection = state.collection(id.collection())?;
        let item = collection.item(id)?;
        if item.is_locked(collection.locked) {
            return Err(Error::ItemLocked(id.to_path()));
        }

        Ok(StoredSecret {
            item: id,
            content_type: item.content_type.clone(),
            plaintext: self.unseal(id, &item.sealed)?,
        })
    }

    fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            collections: self
                .state
                .read()
                .collections
                .iter()
                .map(Collection::snapshot)
                .collect(),
        }
    }

    fn snapshot_collection(&self, id: CollectionId) -> Result<CollectionSnapshot> {
        Ok(self.state.read().collection(id)?.snapshot())
    }
}
