//! Metadata views of collections and items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use secretd_common::{CollectionId, Error, ItemId, Result};

/// Attribute mapping of an item. Keys are unique.
pub type Attributes = BTreeMap<String, String>;

/// Content type assigned to items created without one.
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// Metadata of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub id: CollectionId,
    pub label: String,
    /// Metadata for retrieval policy; otherwise behaves like any collection.
    pub private: bool,
    pub locked: bool,
    pub item_count: usize,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

/// Metadata of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInfo {
    pub id: ItemId,
    pub label: String,
    pub attributes: Attributes,
    pub content_type: String,
    /// Effective lock state: the item's own flag or its collection's.
    pub locked: bool,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

/// One collection and its items, captured at a single instant.
#[derive(Debug, Clone)]
pub struct CollectionSnapshot {
    pub info: CollectionInfo,
    /// Items in creation order.
    pub items: Vec<ItemInfo>,
}

/// Every collection, captured at a single instant, in creation order.
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    pub collections: Vec<CollectionSnapshot>,
}

impl StoreSnapshot {
    /// Iterate over every item in collection order, then item order.
    pub fn items(&self) -> impl Iterator<Item = &ItemInfo> {
        self.collections.iter().flat_map(|c| c.items.iter())
    }
}

/// Check a collection or item label.
///
/// # Errors
/// - `InvalidLabel` if the label is empty or whitespace only
/// - `InvalidLabel` if it contains control characters
pub fn validate_label(label: &str) -> Result<()> {
    if label.trim().is_empty() {
        return Err(Error::InvalidLabel("Label cannot be empty".to_string()));
    }
    if label.chars().any(char::is_control) {
        return Err(Error::InvalidLabel(
            "Label cannot contain control characters".to_string(),
        ));
    }
    Ok(())
}
