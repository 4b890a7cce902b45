//! Common types used throughout secretd.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

/// Object path of the service itself.
pub const SERVICE_PATH: &str = "/org/freedesktop/secrets";

/// Prefix shared by every collection path.
pub const COLLECTION_PREFIX: &str = "/org/freedesktop/secrets/collection";

/// Identifier of a collection.
///
/// Rendered as `/org/freedesktop/secrets/collection/<n>` where `n` is a
/// sequence number handed out by the store and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CollectionId(u64);

impl CollectionId {
    /// Create a collection id from its sequence number.
    pub fn new(sequence: u64) -> Self {
        Self(sequence)
    }

    /// Get the sequence number.
    pub fn sequence(&self) -> u64 {
        self.0
    }

    /// Get the object path.
    pub fn to_path(&self) -> String {
        format!("{}/{}", COLLECTION_PREFIX, self.0)
    }

    /// Parse an object path into a CollectionId.
    ///
    /// # Errors
    /// - Returns error if the path is not under the collection prefix
    /// - Returns error if the trailing component is not a sequence number
    pub fn parse(path: &str) -> crate::Result<Self> {
        let rest = strip_collection_prefix(path)?;
        if rest.contains('/') {
            return Err(crate::Error::InvalidInput(format!(
                "Not a collection path: {}",
                path
            )));
        }
        parse_sequence(rest, path).map(Self)
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_path())
    }
}

impl TryFrom<String> for CollectionId {
    type Error = crate::Error;

    fn try_from(value: String) -> crate::Result<Self> {
        Self::parse(&value)
    }
}

impl From<CollectionId> for String {
    fn from(id: CollectionId) -> Self {
        id.to_path()
    }
}

/// Identifier of an item.
///
/// The item path nests under its collection's path, so the id always names
/// its parent: `/org/freedesktop/secrets/collection/<n>/<m>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemId {
    collection: CollectionId,
    sequence: u64,
}

impl ItemId {
    /// Create an item id inside the given collection.
    pub fn new(collection: CollectionId, sequence: u64) -> Self {
        Self {
            collection,
            sequence,
        }
    }

    /// The collection that owns this item.
    pub fn collection(&self) -> CollectionId {
        self.collection
    }

    /// Sequence number within the collection.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Get the object path.
    pub fn to_path(&self) -> String {
        format!("{}/{}", self.collection.to_path(), self.sequence)
    }

    /// Parse an object path into an ItemId.
    pub fn parse(path: &str) -> crate::Result<Self> {
        let rest = strip_collection_prefix(path)?;
        let (collection, item) = rest.split_once('/').ok_or_else(|| {
            crate::Error::InvalidInput(format!("Not an item path: {}", path))
        })?;
        if item.contains('/') {
            return Err(crate::Error::InvalidInput(format!(
                "Not an item path: {}",
                path
            )));
        }
        Ok(Self {
            collection: CollectionId(parse_sequence(collection, path)?),
            sequence: parse_sequence(item, path)?,
        })
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_path())
    }
}

impl TryFrom<String> for ItemId {
    type Error = crate::Error;

    fn try_from(value: String) -> crate::Result<Self> {
        Self::parse(&value)
    }
}

impl From<ItemId> for String {
    fn from(id: ItemId) -> Self {
        id.to_path()
    }
}

fn strip_collection_prefix(path: &str) -> crate::Result<&str> {
    path.strip_prefix(COLLECTION_PREFIX)
        .and_then(|rest| rest.strip_prefix('/'))
        .ok_or_else(|| crate::Error::InvalidInput(format!("Not a collection path: {}", path)))
}

fn parse_sequence(component: &str, path: &str) -> crate::Result<u64> {
    // u64::from_str accepts a leading '+', which would give one object two paths
    if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
        return Err(crate::Error::InvalidInput(format!(
            "Invalid path component in {}",
            path
        )));
    }
    component
        .parse()
        .map_err(|_| crate::Error::InvalidInput(format!("Invalid path component in {}", path)))
}

/// Sensitive data wrapper that zeroizes on drop.
#[derive(Clone, PartialEq, Eq, Zeroize)]
#[zeroize(drop)]
pub struct SensitiveBytes(Vec<u8>);

impl SensitiveBytes {
    /// Create new sensitive bytes.
    pub fn new(data: Vec<u8>) -> Self {
        Self(data)
    }

    /// Get a reference to the inner bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Get the length.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&[u8]> for SensitiveBytes {
    fn from(data: &[u8]) -> Self {
        Self(data.to_vec())
    }
}

impl fmt::Debug for SensitiveBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SensitiveBytes([REDACTED; {} bytes])", self.0.len())
    }
}
