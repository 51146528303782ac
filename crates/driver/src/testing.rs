//! In-memory reference store
//!
//! A small, correct document store used as the opaque external store in
//! unit and integration tests. It implements the `StoreConnection` /
//! `StoreCollection` contracts over a concurrent map and counts the raw
//! calls it receives so tests can assert which requests actually reached
//! the store.

use dashmap::DashMap;
use packrat_core::{
    Condition, Connector, Document, DocumentId, DriverConfig, Error, IdMatch, IdValue, Projection,
    Result, StoreCollection, StoreConnection, STORE_ID_FIELD,
};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct MemoryInner {
    collections: DashMap<String, Vec<Document>>,
    find_calls: AtomicU64,
    count_calls: AtomicU64,
    write_calls: AtomicU64,
}

/// In-memory document store
///
/// Clone-friendly; clones share the same data and counters.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

impl MemoryStore {
    /// An empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a collection (test setup)
    pub fn seed(&self, collection: &str, docs: Vec<Document>) {
        self.inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .extend(docs);
    }

    /// Raw find requests received so far
    pub fn find_calls(&self) -> u64 {
        self.inner.find_calls.load(Ordering::SeqCst)
    }

    /// Raw count requests received so far
    pub fn count_calls(&self) -> u64 {
        self.inner.count_calls.load(Ordering::SeqCst)
    }

    /// Raw write requests (insert/update/remove) received so far
    pub fn write_calls(&self) -> u64 {
        self.inner.write_calls.load(Ordering::SeqCst)
    }

    /// Snapshot of a collection's documents
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.inner
            .collections
            .get(collection)
            .map(|entry| entry.clone())
            .unwrap_or_default()
    }
}

impl StoreConnection for MemoryStore {
    fn collection(&self, name: &str) -> Result<Arc<dyn StoreCollection>> {
        Ok(Arc::new(MemoryCollection {
            inner: self.inner.clone(),
            name: name.to_string(),
        }))
    }
}

struct MemoryCollection {
    inner: Arc<MemoryInner>,
    name: String,
}

impl StoreCollection for MemoryCollection {
    fn find(&self, condition: &Condition, fields: &Projection) -> Result<Vec<Document>> {
        self.inner.find_calls.fetch_add(1, Ordering::SeqCst);
        let docs = self
            .inner
            .collections
            .get(&self.name)
            .map(|entry| entry.clone())
            .unwrap_or_default();
        Ok(docs
            .into_iter()
            .filter(|doc| matches(doc, condition))
            .map(|doc| project(doc, fields))
            .collect())
    }

    fn insert(&self, values: Vec<Document>) -> Result<Vec<Document>> {
        self.inner.write_calls.fetch_add(1, Ordering::SeqCst);
        let mut entry = self
            .inner
            .collections
            .entry(self.name.clone())
            .or_default();
        let mut inserted = Vec::with_capacity(values.len());
        for mut doc in values {
            if !doc.contains_key(STORE_ID_FIELD) {
                doc.insert(
                    STORE_ID_FIELD.to_string(),
                    Value::String(DocumentId::new().to_string()),
                );
            }
            entry.push(doc.clone());
            inserted.push(doc);
        }
        Ok(inserted)
    }

    fn update(
        &self,
        condition: &Condition,
        changes: &Document,
        multi: bool,
        upsert: bool,
    ) -> Result<u64> {
        self.inner.write_calls.fetch_add(1, Ordering::SeqCst);
        let mut affected = 0;
        if let Some(mut entry) = self.inner.collections.get_mut(&self.name) {
            for doc in entry.iter_mut() {
                if matches(doc, condition) {
                    for (field, value) in changes {
                        doc.insert(field.clone(), value.clone());
                    }
                    affected += 1;
                    if !multi {
                        break;
                    }
                }
            }
        }

        if affected == 0 && upsert {
            let mut doc = match condition.to_query() {
                Value::Object(map) => map,
                _ => Document::new(),
            };
            for (field, value) in changes {
                doc.insert(field.clone(), value.clone());
            }
            self.insert(vec![doc])?;
            affected = 1;
        }
        Ok(affected)
    }

    fn remove(&self, condition: &Condition) -> Result<u64> {
        self.inner.write_calls.fetch_add(1, Ordering::SeqCst);
        let mut removed = 0;
        if let Some(mut entry) = self.inner.collections.get_mut(&self.name) {
            let before = entry.len();
            entry.retain(|doc| !matches(doc, condition));
            removed = (before - entry.len()) as u64;
        }
        Ok(removed)
    }

    fn count(&self) -> Result<u64> {
        self.inner.count_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .inner
            .collections
            .get(&self.name)
            .map(|entry| entry.len() as u64)
            .unwrap_or(0))
    }
}

fn matches(doc: &Document, condition: &Condition) -> bool {
    if let Some(id_match) = condition.id_match() {
        let Some(actual) = doc.get(STORE_ID_FIELD) else {
            return false;
        };
        let hit = match id_match {
            IdMatch::Eq(value) => *actual == value.to_json(),
            IdMatch::In(values) => values.iter().any(|value| *actual == value.to_json()),
        };
        if !hit {
            return false;
        }
    }
    condition
        .fields()
        .iter()
        .all(|(field, value)| doc.get(field) == Some(value))
}

fn project(doc: Document, fields: &Projection) -> Document {
    if fields.is_empty() {
        return doc;
    }
    doc.into_iter()
        .filter(|(key, _)| key.as_str() == STORE_ID_FIELD || fields.iter().any(|f| f == key))
        .collect()
}

/// Connector over a [`MemoryStore`]
///
/// The probe succeeds by default; `with_probe_failure` makes connection
/// setup fail with the given error, for exercising the failure path of the
/// init barrier.
#[derive(Clone)]
pub struct MemoryConnector {
    store: MemoryStore,
    probe_failure: Option<Error>,
}

impl MemoryConnector {
    /// Connector that hands out the given store
    pub fn new(store: MemoryStore) -> Self {
        MemoryConnector {
            store,
            probe_failure: None,
        }
    }

    /// Make the pre-flight probe fail with the given error
    pub fn with_probe_failure(mut self, failure: Error) -> Self {
        self.probe_failure = Some(failure);
        self
    }
}

impl Connector for MemoryConnector {
    fn probe(&self, _config: &DriverConfig) -> Result<()> {
        match &self.probe_failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(()),
        }
    }

    fn connect(&self, _config: &DriverConfig) -> Result<Arc<dyn StoreConnection>> {
        Ok(Arc::new(self.store.clone()))
    }
}
