//! Collection handle cache and cache-aware decoration
//!
//! The CollectionCache resolves a collection handle once per name and hands
//! out the same handle for the driver's lifetime (handle identity is
//! stable across calls). Each handle is a [`CachedCollection`]: an explicit
//! decorator over the raw store handle that adds read-through caching and
//! write-path invalidation when a cache backend is configured, and is a
//! plain pass-through when it is not.

use dashmap::DashMap;
use packrat_cache::{OpKind, ReadCache};
use packrat_core::{
    CachedValue, Condition, Document, Projection, Result, StoreCollection, StoreConnection,
};
use std::sync::Arc;
use tracing::debug;

/// Per-name cache of resolved collection handles
///
/// Owned by the driver instance; no handle outlives its driver.
pub struct CollectionCache {
    handles: DashMap<String, Arc<CachedCollection>>,
    cache: Option<Arc<ReadCache>>,
}

impl CollectionCache {
    /// An empty handle cache, wrapping handles with the given read cache
    pub fn new(cache: Option<Arc<ReadCache>>) -> Self {
        CollectionCache {
            handles: DashMap::new(),
            cache,
        }
    }

    /// Resolve a collection handle, reusing the cached one when present
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails to resolve the collection.
    pub fn get(
        &self,
        connection: &Arc<dyn StoreConnection>,
        name: &str,
    ) -> Result<Arc<CachedCollection>> {
        if let Some(handle) = self.handles.get(name) {
            debug!(collection = name, "returning cached collection handle");
            return Ok(handle.clone());
        }

        // Resolve against the store with no map lock held. Concurrent
        // callers may resolve the same name twice; the first insert wins so
        // handle identity stays stable.
        debug!(collection = name, "resolving collection handle");
        let raw = connection.collection(name)?;
        let handle = Arc::new(CachedCollection {
            name: name.to_string(),
            raw,
            cache: self.cache.clone(),
        });
        Ok(self
            .handles
            .entry(name.to_string())
            .or_insert(handle)
            .clone())
    }
}

/// Cache-aware decorator over a raw collection handle
///
/// Reads consult the read cache first; writes invalidate the collection's
/// cache entries before dispatching to the store. Without a configured
/// backend every method degrades to the plain store-native call.
pub struct CachedCollection {
    name: String,
    raw: Arc<dyn StoreCollection>,
    cache: Option<Arc<ReadCache>>,
}

impl CachedCollection {
    /// The collection name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read-through find
    ///
    /// # Errors
    ///
    /// Returns an error if the store reports a failure.
    pub fn find(&self, condition: &Condition, fields: &Projection) -> Result<Vec<Document>> {
        let Some(cache) = &self.cache else {
            return self.raw.find(condition, fields);
        };

        if let Some(CachedValue::Documents(docs)) =
            cache.lookup(OpKind::Query, &self.name, condition, fields)
        {
            return Ok(docs);
        }

        let docs = self.raw.find(condition, fields)?;
        cache.store(
            OpKind::Query,
            &self.name,
            condition,
            fields,
            CachedValue::Documents(docs.clone()),
        );
        Ok(docs)
    }

    /// Insert, invalidating the collection's cache entries first
    ///
    /// # Errors
    ///
    /// Returns an error if the store reports a failure.
    pub fn insert(&self, values: Vec<Document>) -> Result<Vec<Document>> {
        if let Some(cache) = &self.cache {
            cache.invalidate(&self.name);
        }
        self.raw.insert(values)
    }

    /// Update, invalidating the collection's cache entries first
    ///
    /// Upsert stays off: updates never create documents as a side effect.
    ///
    /// # Errors
    ///
    /// Returns an error if the store reports a failure.
    pub fn update(&self, condition: &Condition, changes: &Document, multi: bool) -> Result<u64> {
        if let Some(cache) = &self.cache {
            cache.invalidate(&self.name);
        }
        self.raw.update(condition, changes, multi, false)
    }

    /// Remove, invalidating the collection's cache entries first
    ///
    /// # Errors
    ///
    /// Returns an error if the store reports a failure.
    pub fn remove(&self, condition: &Condition) -> Result<u64> {
        if let Some(cache) = &self.cache {
            cache.invalidate(&self.name);
        }
        self.raw.remove(condition)
    }

    /// Count, served from the cache when a backend is configured
    ///
    /// Without a backend this is the store-native count.
    ///
    /// # Errors
    ///
    /// Returns an error if the store reports a failure.
    pub fn count(&self) -> Result<u64> {
        let Some(cache) = &self.cache else {
            return self.raw.count();
        };

        let condition = Condition::new();
        let fields = Projection::new();
        if let Some(CachedValue::Count(count)) =
            cache.lookup(OpKind::Count, &self.name, &condition, &fields)
        {
            return Ok(count);
        }

        let count = self.raw.count()?;
        cache.store(
            OpKind::Count,
            &self.name,
            &condition,
            &fields,
            CachedValue::Count(count),
        );
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;
    use packrat_cache::MemoryStorage;
    use serde_json::json;

    fn document(value: serde_json::Value) -> Document {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn connection_with_docs() -> (Arc<dyn StoreConnection>, MemoryStore) {
        let store = MemoryStore::new();
        store.seed(
            "users",
            vec![
                document(json!({"_id": 1, "user": "u1", "pass": "p1"})),
                document(json!({"_id": 2, "user": "u2", "pass": "p2"})),
            ],
        );
        (Arc::new(store.clone()), store)
    }

    fn cached() -> Option<Arc<ReadCache>> {
        Some(Arc::new(ReadCache::new(
            Arc::new(MemoryStorage::new()),
            None,
        )))
    }

    #[test]
    fn test_handle_identity_stable() {
        let (connection, _) = connection_with_docs();
        let collections = CollectionCache::new(None);

        let first = collections.get(&connection, "users").unwrap();
        let second = collections.get(&connection, "users").unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let other = collections.get(&connection, "posts").unwrap();
        assert!(!Arc::ptr_eq(&first, &other));
    }

    #[test]
    fn test_handle_identity_stable_under_concurrent_resolution() {
        let (connection, _) = connection_with_docs();
        let collections = Arc::new(CollectionCache::new(None));

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let connection = connection.clone();
                let collections = collections.clone();
                std::thread::spawn(move || collections.get(&connection, "users").unwrap())
            })
            .collect();
        let handles: Vec<_> = workers
            .into_iter()
            .map(|worker| worker.join().unwrap())
            .collect();

        for handle in &handles[1..] {
            assert!(Arc::ptr_eq(&handles[0], handle));
        }
    }

    #[test]
    fn test_find_read_through() {
        let (connection, store) = connection_with_docs();
        let collections = CollectionCache::new(cached());
        let users = collections.get(&connection, "users").unwrap();
        let condition = Condition::new().field("user", "u1");

        let first = users.find(&condition, &Projection::new()).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(store.find_calls(), 1);

        // Served from cache; the store is not contacted again.
        let second = users.find(&condition, &Projection::new()).unwrap();
        assert_eq!(second, first);
        assert_eq!(store.find_calls(), 1);
    }

    #[test]
    fn test_write_invalidates_before_dispatch() {
        let (connection, store) = connection_with_docs();
        let collections = CollectionCache::new(cached());
        let users = collections.get(&connection, "users").unwrap();
        let condition = Condition::new().field("user", "u1");

        users.find(&condition, &Projection::new()).unwrap();
        assert_eq!(store.find_calls(), 1);

        let mut changes = Document::new();
        changes.insert("pass".to_string(), json!("p9"));
        users.update(&condition, &changes, true).unwrap();

        // The next read misses the cache and observes the write.
        let docs = users.find(&condition, &Projection::new()).unwrap();
        assert_eq!(store.find_calls(), 2);
        assert_eq!(docs[0].get("pass"), Some(&json!("p9")));
    }

    #[test]
    fn test_count_cached_when_enabled() {
        let (connection, store) = connection_with_docs();
        let collections = CollectionCache::new(cached());
        let users = collections.get(&connection, "users").unwrap();

        assert_eq!(users.count().unwrap(), 2);
        assert_eq!(users.count().unwrap(), 2);
        assert_eq!(store.count_calls(), 1);
    }

    #[test]
    fn test_count_native_when_disabled() {
        let (connection, store) = connection_with_docs();
        let collections = CollectionCache::new(None);
        let users = collections.get(&connection, "users").unwrap();

        assert_eq!(users.count().unwrap(), 2);
        assert_eq!(users.count().unwrap(), 2);
        assert_eq!(store.count_calls(), 2);
    }

    #[test]
    fn test_pass_through_without_backend() {
        let (connection, store) = connection_with_docs();
        let collections = CollectionCache::new(None);
        let users = collections.get(&connection, "users").unwrap();
        let condition = Condition::new().field("user", "u1");

        users.find(&condition, &Projection::new()).unwrap();
        users.find(&condition, &Projection::new()).unwrap();
        assert_eq!(store.find_calls(), 2);
    }
}
