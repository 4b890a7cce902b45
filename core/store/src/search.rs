//! Attribute search over collection snapshots.

use serde::{Deserialize, Serialize};

use secretd_common::ItemId;

use crate::model::{Attributes, CollectionSnapshot, ItemInfo, StoreSnapshot};

/// Matching items, partitioned by effective lock state.
///
/// Both sequences follow collection creation order, then item creation
/// order. They never carry secret payloads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Matches that can be retrieved immediately.
    pub unlocked: Vec<ItemId>,
    /// Matches that require an unlock first.
    pub locked: Vec<ItemId>,
}

impl SearchResult {
    /// Total number of matches.
    pub fn len(&self) -> usize {
        self.unlocked.len() + self.locked.len()
    }

    /// Whether nothing matched.
    pub fn is_empty(&self) -> bool {
        self.unlocked.is_empty() && self.locked.is_empty()
    }

    fn push(&mut self, item: &ItemInfo) {
        if item.locked {
            self.locked.push(item.id);
        } else {
            self.unlocked.push(item.id);
        }
    }
}

/// Whether an item's attributes satisfy a query.
///
/// Every query key must be present with an identical value; extra item
/// attributes are ignored. An empty query matches everything.
pub fn matches(attributes: &Attributes, fields: &Attributes) -> bool {
    fields
        .iter()
        .all(|(key, value)| attributes.get(key) == Some(value))
}

/// Search capability used by the service facade.
pub trait AttributeSearch: Send + Sync {
    /// Search every collection in a snapshot.
    fn search(&self, snapshot: &StoreSnapshot, fields: &Attributes) -> SearchResult;

    /// Search a single collection.
    fn search_collection(&self, collection: &CollectionSnapshot, fields: &Attributes) -> SearchResult {
        let mut result = SearchResult::default();
        collection
            .items
            .iter()
            .filter(|item| matches(&item.attributes, fields))
            .for_each(|item| result.push(item));
        result
    }
}

/// Exact-match attribute search.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeSearchEngine;

impl AttributeSearchEngine {
    pub fn new() -> Self {
        Self
    }
}

impl AttributeSearch for AttributeSearchEngine {
    fn search(&self, snapshot: &StoreSnapshot, fields: &Attributes) -> SearchResult {
        let mut result = SearchResult::default();
        snapshot
            .items()
            .filter(|item| matches(&item.attributes, fields))
            .for_each(|item| result.push(item));
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::model::DEFAULT_CONTENT_TYPE;
    use crate::store::{CollectionStore, LockTarget, NewItem};
    use proptest::prelude::*;
    use secretd_common::{CollectionId, SensitiveBytes};

    fn attrs(pairs: &[(&str, &str)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn add(store: &MemoryStore, collection: CollectionId, pairs: &[(&str, &str)]) -> ItemId {
        store
            .add_item(
                collection,
                NewItem {
                    label: "item".to_string(),
                    attributes: attrs(pairs),
                    secret: SensitiveBytes::from(&b"pw"[..]),
                    content_type: DEFAULT_CONTENT_TYPE.to_string(),
                    replace: false,
                },
            )
            .unwrap()
    }

    #[test]
    fn test_matches() {
        let item = attrs(&[("user", "alice"), ("service", "mail")]);

        assert!(matches(&item, &attrs(&[])));
        assert!(matches(&item, &attrs(&[("user", "alice")])));
        assert!(matches(&item, &attrs(&[("user", "alice"), ("service", "mail")])));
        assert!(!matches(&item, &attrs(&[("user", "bob")])));
        assert!(!matches(&item, &attrs(&[("host", "example.org")])));
        assert!(!matches(&item, &attrs(&[("user", "Alice")])));
    }

    #[test]
    fn test_empty_store() {
        let result = AttributeSearchEngine.search(&StoreSnapshot::default(), &attrs(&[]));
        assert!(result.is_empty());
    }

    #[test]
    fn test_order_follows_creation_not_labels() {
        let store = MemoryStore::new();
        let zeta = store.create_collection("zeta", false).unwrap();
        let alpha = store.create_collection("alpha", false).unwrap();

        let z1 = add(&store, zeta, &[("k", "v")]);
        let a1 = add(&store, alpha, &[("k", "v")]);
        let z2 = add(&store, zeta, &[("k", "v")]);

        let result = AttributeSearchEngine.search(&store.snapshot(), &attrs(&[("k", "v")]));
        assert_eq!(result.unlocked, vec![z1, z2, a1]);
        assert!(result.locked.is_empty());
    }

    #[test]
    fn test_partition_by_lock_state() {
        let store = MemoryStore::new();
        let open = store.create_collection("open", false).unwrap();
        let closed = store.create_collection("closed", false).unwrap();

        let a = add(&store, open, &[("user", "alice")]);
        let b = add(&store, closed, &[("user", "alice")]);
        let c = add(&store, open, &[("user", "alice")]);
        store.lock(LockTarget::Collection(closed)).unwrap();
        store.lock(LockTarget::Item(c)).unwrap();

        let result = AttributeSearchEngine.search(&store.snapshot(), &attrs(&[("user", "alice")]));
        assert_eq!(result.unlocked, vec![a]);
        assert_eq!(result.locked, vec![c, b]);
    }

    #[test]
    fn test_search_collection() {
        let store = MemoryStore::new();
        let one = store.create_collection("one", false).unwrap();
        let two = store.create_collection("two", false).unwrap();
        let a = add(&store, one, &[("user", "alice")]);
        add(&store, two, &[("user", "alice")]);

        let snapshot = store.snapshot_collection(one).unwrap();
        let result = AttributeSearchEngine.search_collection(&snapshot, &attrs(&[("user", "alice")]));
        assert_eq!(result.unlocked, vec![a]);
    }

    proptest! {
        #[test]
        fn prop_superset_matches_and_mismatch_does_not(
            fields in proptest::collection::btree_map("[a-c]{1,2}", "[x-z]{0,2}", 0..4),
            extra in proptest::collection::btree_map("[d-f]{1,2}", "[x-z]{0,2}", 0..3),
        ) {
            let mut superset = fields.clone();
            superset.extend(extra);
            prop_assert!(matches(&superset, &fields));

            for key in fields.keys() {
                let mut missing = superset.clone();
                missing.remove(key);
                prop_assert!(!matches(&missing, &fields));

                let mut differing = superset.clone();
                differing.insert(key.clone(), "different".to_string());
                prop_assert!(!matches(&differing, &fields));
            }
        }
    }
}
