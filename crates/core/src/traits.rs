//! Collaborator traits for cache backends and the external store
//!
//! This module defines the contracts the driver consumes but does not
//! implement:
//! - CacheStorage: a cache backend (`get`/`set`/`invalidate`)
//! - StoreConnection / StoreCollection: the opaque document store reached
//!   through a connection handle
//! - Connector: opens a connection, including the pre-flight reachability
//!   probe
//!
//! Swapping implementations must never break upper layers; all methods must
//! be safe to call concurrently from multiple threads (Send + Sync).

use crate::condition::Condition;
use crate::config::DriverConfig;
use crate::error::Result;
use crate::types::{Document, Projection};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A cached read result
///
/// Read operations and counts share one cache key space; the payload enum
/// keeps them apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CachedValue {
    /// Result snapshot of a document read
    Documents(Vec<Document>),
    /// Result snapshot of a count
    Count(u64),
}

/// Cache backend contract
///
/// Entries are keyed by fingerprint and indexed by collection name so that
/// a write to a collection can evict every cached read over it. Absence of
/// a configured backend disables all caching behavior without affecting
/// correctness.
///
/// Backend failures are never a veto path: the driver treats a failing
/// `get` as a miss and logs failing `set`/`invalidate` calls.
pub trait CacheStorage: Send + Sync {
    /// Fetch a cached result by fingerprint
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    fn get(&self, key: &str) -> Result<Option<CachedValue>>;

    /// Store a result under a fingerprint, indexed by collection
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    fn set(&self, key: &str, collection: &str, value: CachedValue) -> Result<()>;

    /// Evict every entry associated with a collection
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    fn invalidate(&self, collection: &str) -> Result<()>;
}

/// Raw primitives of one named collection within the store
///
/// This is the store-native surface the driver decorates with cache-aware
/// variants. Implementations speak the actual store protocol; the driver
/// treats them as opaque.
pub trait StoreCollection: Send + Sync {
    /// Fetch documents matching a condition, projected to the given fields
    ///
    /// An empty projection returns whole documents.
    ///
    /// # Errors
    ///
    /// Returns an error if the store reports a failure.
    fn find(&self, condition: &Condition, fields: &Projection) -> Result<Vec<Document>>;

    /// Insert documents, returning them with assigned primary keys
    ///
    /// # Errors
    ///
    /// Returns an error if the store reports a failure.
    fn insert(&self, values: Vec<Document>) -> Result<Vec<Document>>;

    /// Apply field changes to matching documents
    ///
    /// Returns the number of documents affected. With `upsert` off, a
    /// condition matching nothing affects zero documents and is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns an error if the store reports a failure.
    fn update(
        &self,
        condition: &Condition,
        changes: &Document,
        multi: bool,
        upsert: bool,
    ) -> Result<u64>;

    /// Delete matching documents, returning the number removed
    ///
    /// # Errors
    ///
    /// Returns an error if the store reports a failure.
    fn remove(&self, condition: &Condition) -> Result<u64>;

    /// Store-native count of all documents in the collection
    ///
    /// # Errors
    ///
    /// Returns an error if the store reports a failure.
    fn count(&self) -> Result<u64>;
}

/// A live link to one database instance
pub trait StoreConnection: Send + Sync {
    /// Resolve a collection handle by name
    ///
    /// # Errors
    ///
    /// Returns an error if the store reports a failure.
    fn collection(&self, name: &str) -> Result<Arc<dyn StoreCollection>>;
}

/// Opens connections to the store
///
/// The driver invokes `probe` before `connect`; a probe failure
/// short-circuits connection setup and is surfaced to every queued
/// operation.
pub trait Connector: Send + Sync {
    /// Pre-flight reachability check
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the store is unreachable.
    fn probe(&self, config: &DriverConfig) -> Result<()>;

    /// Open the connection
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the connection cannot be
    /// established.
    fn connect(&self, config: &DriverConfig) -> Result<Arc<dyn StoreConnection>>;
}
