//! In-process cache backend
//!
//! Entries live in a concurrent map keyed by fingerprint, with a secondary
//! per-collection key index so invalidation can evict collection-wide
//! without scanning the value map.

use dashmap::DashMap;
use packrat_core::{CacheStorage, CachedValue, Result};
use std::collections::HashSet;

/// DashMap-backed cache backend
///
/// Suitable for single-process deployments and tests. Safe for concurrent
/// read/insert/evict; no lock is held across calls.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: DashMap<String, CachedValue>,
    by_collection: DashMap<String, HashSet<String>>,
}

impl MemoryStorage {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries (test observability)
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the backend holds no entries
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl CacheStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<CachedValue>> {
        Ok(self.values.get(key).map(|entry| entry.clone()))
    }

    fn set(&self, key: &str, collection: &str, value: CachedValue) -> Result<()> {
        self.values.insert(key.to_string(), value);
        self.by_collection
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string());
        Ok(())
    }

    fn invalidate(&self, collection: &str) -> Result<()> {
        if let Some((_, keys)) = self.by_collection.remove(collection) {
            for key in keys {
                self.values.remove(&key);
            }
        }
        Ok(())
    }
}
