//! In-process cache for resolved bundles and lists.
//!
//! Two independent maps keyed by [`ItemId`]:
//!
//! - the [`CacheStore`], a plain key/value mapping with no expiry that hosts
//!   may replace with their own implementation;
//! - the [`MetadataTable`], which tracks when each item was last refreshed,
//!   how long it stays fresh and its ETag.

pub mod metadata;

use dashmap::DashMap;

use crate::item::{ItemId, Payload};

pub use metadata::{CacheMetadata, MetadataTable, unix_now};

/// Key/value mapping for resolved items.
///
/// No TTL and no eviction. Implementations must be safe for concurrent
/// unsynchronized calls.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &ItemId) -> Option<Payload>;

    fn set(&self, key: ItemId, value: Payload);
}

/// Default [`CacheStore`] backed by a sharded concurrent map.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<ItemId, Payload>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &ItemId) -> Option<Payload> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn set(&self, key: ItemId, value: Payload) {
        self.entries.insert(key, value);
    }
}
