//! Collection store trait definition.

use secretd_common::{CollectionId, ItemId, Result, SensitiveBytes};

use crate::model::{Attributes, CollectionInfo, CollectionSnapshot, ItemInfo, StoreSnapshot};

/// Target of a lock or unlock request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockTarget {
    /// Every collection in the store.
    All,
    /// A single collection.
    Collection(CollectionId),
    /// A single item.
    Item(ItemId),
}

/// Input for adding an item to a collection.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub label: String,
    pub attributes: Attributes,
    pub secret: SensitiveBytes,
    pub content_type: String,
    /// Replace an existing item with exactly the same attributes.
    pub replace: bool,
}

/// Plaintext read back from the store for one item.
#[derive(Debug)]
pub struct StoredSecret {
    pub item: ItemId,
    pub content_type: String,
    pub plaintext: SensitiveBytes,
}

/// Storage backend for collections and their items.
///
/// Implementations must make every call atomic with respect to every other
/// call: a mutation observes a consistent prior state, and a snapshot never
/// mixes states from before and after a concurrent mutation.
pub trait CollectionStore: Send + Sync {
    /// Create an empty, unlocked collection.
    ///
    /// Duplicate labels are permitted; collections are identified by id.
    ///
    /// # Errors
    /// - `InvalidLabel` if the label is malformed
    fn create_collection(&self, label: &str, private: bool) -> Result<CollectionId>;

    /// Delete a collection and every item in it.
    ///
    /// # Errors
    /// - `NotFound` if the collection does not exist
    fn delete_collection(&self, id: CollectionId) -> Result<()>;

    /// Change a collection's label.
    ///
    /// # Errors
    /// - `InvalidLabel` if the label is malformed
    /// - `NotFound` if the collection does not exist
    fn set_collection_label(&self, id: CollectionId, label: &str) -> Result<()>;

    /// Lock a collection, an item, or every collection.
    ///
    /// Locking never destroys data and is idempotent.
    ///
    /// # Errors
    /// - `NotFound` if a named collection or item does not exist
    fn lock(&self, target: LockTarget) -> Result<()>;

    /// Unlock a collection or an item.
    ///
    /// Unlocking a collection also clears the lock flags of its items.
    /// Unlocking an item inside a locked collection leaves it effectively
    /// locked.
    ///
    /// # Errors
    /// - `NotFound` if the collection or item does not exist
    /// - `NotPermitted` for [`LockTarget::All`]
    fn unlock(&self, target: LockTarget) -> Result<()>;

    /// Metadata of every collection, in creation order.
    fn list_collections(&self) -> Vec<CollectionInfo>;

    /// Metadata of one collection.
    fn collection_info(&self, id: CollectionId) -> Result<CollectionInfo>;

    /// Metadata of every item in a collection, in creation order.
    fn list_items(&self, collection: CollectionId) -> Result<Vec<ItemInfo>>;

    /// Metadata of one item.
    fn item_info(&self, id: ItemId) -> Result<ItemInfo>;

    /// Add an item, or replace a matching one when `item.replace` is set.
    ///
    /// # Errors
    /// - `NotFound` if the collection does not exist
    /// - `CollectionLocked` if the collection is locked
    /// - `InvalidLabel` if the label is malformed
    fn add_item(&self, collection: CollectionId, item: NewItem) -> Result<ItemId>;

    /// Remove an item.
    ///
    /// # Errors
    /// - `NotFound` if the item does not exist
    fn remove_item(&self, id: ItemId) -> Result<()>;

    /// Unseal an item's secret.
    ///
    /// # Errors
    /// - `NotFound` if the item does not exist
    /// - `ItemLocked` if the item is effectively locked
    /// - `DecryptionFailed` if the sealed payload fails authentication
    fn read_secret(&self, id: ItemId) -> Result<StoredSecret>;

    /// Capture every collection and item at one instant.
    fn snapshot(&self) -> StoreSnapshot;

    /// Capture one collection and its items at one instant.
    fn snapshot_collection(&self, id: CollectionId) -> Result<CollectionSnapshot>;
}
