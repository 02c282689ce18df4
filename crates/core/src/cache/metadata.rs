//! Per-item revalidation metadata.
//!
//! Records are copied in and out of the table whole. Readers get a snapshot
//! they own; writers replace the stored record in one step. Nothing ever
//! holds a reference into the table across an update.

use dashmap::DashMap;

use crate::item::ItemId;

/// Current time as unix seconds.
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Revalidation state of one cached item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheMetadata {
    /// Unix seconds of the last successful or not-modified response.
    pub last_update: i64,
    /// Seconds the item stays fresh after `last_update`.
    pub ttl_secs: i64,
    /// Validator to send as `If-None-Match`.
    pub etag: Option<String>,
}

impl CacheMetadata {
    /// A record that has never been refreshed, so it is already expired.
    pub fn new(ttl_secs: i64) -> Self {
        Self { last_update: 0, ttl_secs, etag: None }
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        now - self.last_update >= self.ttl_secs
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(unix_now())
    }
}

/// Concurrent map from item identity to [`CacheMetadata`].
#[derive(Debug)]
pub struct MetadataTable {
    records: DashMap<ItemId, CacheMetadata>,
    default_ttl_secs: i64,
}

impl MetadataTable {
    pub fn new(default_ttl_secs: i64) -> Self {
        Self { records: DashMap::new(), default_ttl_secs }
    }

    pub fn default_ttl_secs(&self) -> i64 {
        self.default_ttl_secs
    }

    /// Snapshot of the record for `id`, creating a default one on first access.
    pub fn get(&self, id: &ItemId) -> CacheMetadata {
        if let Some(record) = self.records.get(id) {
            return record.value().clone();
        }
        self.records
            .entry(id.clone())
            .or_insert_with(|| CacheMetadata::new(self.default_ttl_secs))
            .value()
            .clone()
    }

    /// Snapshot of the record for `id` without creating one.
    pub fn peek(&self, id: &ItemId) -> Option<CacheMetadata> {
        self.records.get(id).map(|record| record.value().clone())
    }

    /// Replace the record for `id`.
    pub fn set(&self, id: ItemId, record: CacheMetadata) {
        self.records.insert(id, record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
