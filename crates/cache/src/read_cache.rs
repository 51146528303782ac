//! Read-through cache and write-path invalidation
//!
//! The read path computes a [`Fingerprint`] for
//! {operation kind, collection, condition, fields}; a hit is served without
//! contacting the store, a miss falls through and the result is stored
//! under the fingerprint keyed to its collection.
//!
//! The write path (`invalidate`) evicts every entry for the affected
//! collection and runs synchronously before the write is dispatched, so no
//! read can observe a cache entry that predates a completed write on the
//! same driver instance.
//!
//! A failing backend never fails an operation: read failures are treated
//! as a miss, write-side failures are logged and swallowed.

use crate::fingerprint::{Fingerprint, OpKind};
use packrat_core::{CacheStorage, CachedValue, Condition, Projection};
use std::sync::Arc;
use tracing::warn;

/// Read-through cache over a [`CacheStorage`] backend
pub struct ReadCache {
    storage: Arc<dyn CacheStorage>,
    prefix: Option<String>,
}

impl ReadCache {
    /// Wrap a backend, optionally namespacing keys with a prefix
    pub fn new(storage: Arc<dyn CacheStorage>, prefix: Option<String>) -> Self {
        ReadCache { storage, prefix }
    }

    /// Consult the cache for a read request
    ///
    /// Returns None on miss and on backend failure (forced miss).
    pub fn lookup(
        &self,
        op: OpKind,
        collection: &str,
        condition: &Condition,
        fields: &Projection,
    ) -> Option<CachedValue> {
        let key = self.key(op, collection, condition, fields);
        match self.storage.get(key.as_str()) {
            Ok(hit) => hit,
            Err(err) => {
                warn!(%err, collection, key = %key, "cache read failed, treating as miss");
                None
            }
        }
    }

    /// Store a read result under its fingerprint
    pub fn store(
        &self,
        op: OpKind,
        collection: &str,
        condition: &Condition,
        fields: &Projection,
        value: CachedValue,
    ) {
        let key = self.key(op, collection, condition, fields);
        if let Err(err) = self.storage.set(key.as_str(), collection, value) {
            warn!(%err, collection, key = %key, "cache write failed, result not cached");
        }
    }

    /// Invalidation hook: evict every entry for the collection
    ///
    /// Called by every mutating operation before it executes against the
    /// store.
    pub fn invalidate(&self, collection: &str) {
        if let Err(err) = self.storage.invalidate(collection) {
            warn!(%err, collection, "cache invalidation failed");
        }
    }

    fn key(
        &self,
        op: OpKind,
        collection: &str,
        condition: &Condition,
        fields: &Projection,
    ) -> Fingerprint {
        Fingerprint::compute(self.prefix.as_deref(), op, collection, condition, fields)
    }
}
