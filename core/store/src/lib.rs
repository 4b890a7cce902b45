//! Collection storage and attribute search for secretd.
//!
//! This module provides a trait-based interface for collection stores, an
//! in-memory implementation that seals every item payload at rest, and the
//! search engine that partitions matching items by lock state.
//!
//! # Design Principles
//! - Lock state belongs to collections and items, never to sessions
//! - Every mutation is a single read/modify/write under the store lock
//! - Searches run on a snapshot taken under one read lock
//! - Metadata views never carry secret material

pub mod memory;
pub mod model;
pub mod search;
pub mod store;

pub use memory::MemoryStore;
pub use model::{
    validate_label, Attributes, CollectionInfo, CollectionSnapshot, ItemInfo, StoreSnapshot,
    DEFAULT_CONTENT_TYPE,
};
pub use search::{AttributeSearch, AttributeSearchEngine, SearchResult};
pub use store::{CollectionStore, LockTarget, NewItem, StoredSecret};
