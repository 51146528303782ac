//! The driver operation surface
//!
//! A [`Driver`] exposes the ten-operation contract over one configured
//! store. Every operation is callback-style: the call registers with the
//! init barrier and the callback fires with the result once the connection
//! has settled (immediately, once it has). A connection failure is replayed
//! to every operation's callback as the same captured error.
//!
//! Each operation takes an options struct naming the collection plus the
//! operation's arguments. Missing required options are validation errors
//! surfaced through the callback; the store is never contacted for an
//! invalid call.

use crate::batch::Batch;
use crate::collection::{CachedCollection, CollectionCache};
use crate::connection::ConnectionManager;
use packrat_cache::ReadCache;
use packrat_core::{
    id_condition, Condition, Connector, Document, DriverConfig, Error, IdInput, Projection,
    Result,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Options for an insert
#[derive(Debug, Clone, Default)]
pub struct InsertInto {
    /// Target collection
    pub collection: String,
    /// Documents to insert
    pub values: Option<Vec<Document>>,
}

impl InsertInto {
    /// Insert into the given collection
    pub fn new(collection: impl Into<String>) -> Self {
        InsertInto {
            collection: collection.into(),
            ..Default::default()
        }
    }

    /// The documents to insert
    pub fn values(mut self, values: Vec<Document>) -> Self {
        self.values = Some(values);
        self
    }
}

/// Options for a condition-based update
#[derive(Debug, Clone, Default)]
pub struct UpdateWhere {
    /// Target collection
    pub collection: String,
    /// Documents to update
    pub condition: Option<Condition>,
    /// Field changes to apply
    pub values: Document,
    /// Update every match (default) or only the first
    pub multi: Option<bool>,
}

impl UpdateWhere {
    /// Update in the given collection
    pub fn new(collection: impl Into<String>) -> Self {
        UpdateWhere {
            collection: collection.into(),
            ..Default::default()
        }
    }

    /// The documents to update
    pub fn condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// The field changes to apply
    pub fn values(mut self, values: Document) -> Self {
        self.values = values;
        self
    }

    /// Update every match or only the first
    pub fn multi(mut self, multi: bool) -> Self {
        self.multi = Some(multi);
        self
    }
}

/// Options for an id-based update
#[derive(Debug, Clone, Default)]
pub struct UpdateById {
    /// Target collection
    pub collection: String,
    /// Identifier of the documents to update
    pub id: Option<IdInput>,
    /// Field changes to apply
    pub values: Document,
    /// Update every match (default) or only the first
    pub multi: Option<bool>,
}

impl UpdateById {
    /// Update in the given collection
    pub fn new(collection: impl Into<String>) -> Self {
        UpdateById {
            collection: collection.into(),
            ..Default::default()
        }
    }

    /// The identifier to update by
    pub fn id(mut self, id: impl Into<IdInput>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// The field changes to apply
    pub fn values(mut self, values: Document) -> Self {
        self.values = values;
        self
    }

    /// Update every match or only the first
    pub fn multi(mut self, multi: bool) -> Self {
        self.multi = Some(multi);
        self
    }
}

/// Options for a condition-based delete
#[derive(Debug, Clone, Default)]
pub struct DeleteWhere {
    /// Target collection
    pub collection: String,
    /// Documents to delete
    pub condition: Option<Condition>,
}

impl DeleteWhere {
    /// Delete from the given collection
    pub fn new(collection: impl Into<String>) -> Self {
        DeleteWhere {
            collection: collection.into(),
            ..Default::default()
        }
    }

    /// The documents to delete
    pub fn condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }
}

/// Options for an id-based delete
#[derive(Debug, Clone, Default)]
pub struct DeleteById {
    /// Target collection
    pub collection: String,
    /// Identifier of the documents to delete
    pub id: Option<IdInput>,
}

impl DeleteById {
    /// Delete from the given collection
    pub fn new(collection: impl Into<String>) -> Self {
        DeleteById {
            collection: collection.into(),
            ..Default::default()
        }
    }

    /// The identifier to delete by
    pub fn id(mut self, id: impl Into<IdInput>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Options for a condition-based read
#[derive(Debug, Clone, Default)]
pub struct QueryWhere {
    /// Target collection
    pub collection: String,
    /// Predicate to match; required
    pub condition: Option<Condition>,
    /// Projected field names; empty means all fields
    pub fields: Projection,
}

impl QueryWhere {
    /// Read from the given collection
    pub fn new(collection: impl Into<String>) -> Self {
        QueryWhere {
            collection: collection.into(),
            ..Default::default()
        }
    }

    /// The predicate to match
    pub fn condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Project results to the given fields
    pub fn fields(mut self, fields: Projection) -> Self {
        self.fields = fields;
        self
    }
}

/// Options for an id-based read
#[derive(Debug, Clone, Default)]
pub struct QueryById {
    /// Target collection
    pub collection: String,
    /// Identifier of the documents to read
    pub id: Option<IdInput>,
    /// Projected field names; empty means all fields
    pub fields: Projection,
}

impl QueryById {
    /// Read from the given collection
    pub fn new(collection: impl Into<String>) -> Self {
        QueryById {
            collection: collection.into(),
            ..Default::default()
        }
    }

    /// The identifier to read by
    pub fn id(mut self, id: impl Into<IdInput>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Project results to the given fields
    pub fn fields(mut self, fields: Projection) -> Self {
        self.fields = fields;
        self
    }
}

/// Options for a whole-collection read
#[derive(Debug, Clone, Default)]
pub struct QueryAll {
    /// Target collection
    pub collection: String,
    /// Projected field names; empty means all fields
    pub fields: Projection,
}

impl QueryAll {
    /// Read every document of the given collection
    pub fn new(collection: impl Into<String>) -> Self {
        QueryAll {
            collection: collection.into(),
            ..Default::default()
        }
    }

    /// Project results to the given fields
    pub fn fields(mut self, fields: Projection) -> Self {
        self.fields = fields;
        self
    }
}

/// Options for an id-existence check
#[derive(Debug, Clone, Default)]
pub struct IdExists {
    /// Target collection
    pub collection: String,
    /// Identifiers to check; a scalar checks a single id
    pub ids: Option<IdInput>,
    /// Projected field names for the returned documents; empty means all
    pub fields: Projection,
}

impl IdExists {
    /// Check ids against the given collection
    pub fn new(collection: impl Into<String>) -> Self {
        IdExists {
            collection: collection.into(),
            ..Default::default()
        }
    }

    /// The identifiers to check
    pub fn ids(mut self, ids: impl Into<IdInput>) -> Self {
        self.ids = Some(ids.into());
        self
    }

    /// Project returned documents to the given fields
    pub fn fields(mut self, fields: Projection) -> Self {
        self.fields = fields;
        self
    }
}

/// Options for a collection count
#[derive(Debug, Clone, Default)]
pub struct Count {
    /// Target collection
    pub collection: String,
}

impl Count {
    /// Count documents in the given collection
    pub fn new(collection: impl Into<String>) -> Self {
        Count {
            collection: collection.into(),
        }
    }
}

/// Result of an id-existence check
///
/// One entry per requested id, keyed by its string form: the found
/// document, or None for ids with no document (including ids dropped
/// during normalization).
pub type IdMap = BTreeMap<String, Option<Document>>;

/// Cache-aware document-store driver
///
/// Cheap to clone; clones share the connection, the collection handle
/// cache, and the read cache.
#[derive(Clone)]
pub struct Driver {
    inner: Arc<DriverInner>,
}

impl Driver {
    /// Open a driver against the configured store
    ///
    /// Returns immediately; the connection is established on a background
    /// thread and operations issued in the meantime are queued.
    pub fn open(config: DriverConfig, connector: Arc<dyn Connector>) -> Self {
        let cache = config.storage.clone().map(|storage| {
            Arc::new(ReadCache::new(storage, config.cache_prefix.clone()))
        });
        let collections = CollectionCache::new(cache);
        let manager = ConnectionManager::open(config, connector);
        Driver {
            inner: Arc::new(DriverInner {
                manager,
                collections,
            }),
        }
    }

    /// Register a readiness observer
    ///
    /// Fires exactly once with the connection outcome, in arrival order
    /// relative to queued operations.
    pub fn on_ready<F>(&self, observer: F)
    where
        F: FnOnce(Result<()>) + Send + 'static,
    {
        self.inner.manager.on_ready(observer);
    }

    /// Start a batch of operations over this driver
    pub fn batch(&self) -> Batch {
        Batch::new(self.clone())
    }

    /// Insert documents, reporting them back with assigned primary keys
    pub fn insert_into<C>(&self, options: InsertInto, callback: C)
    where
        C: FnOnce(Result<Vec<Document>>) + Send + 'static,
    {
        self.run(move |inner| inner.insert_into(options), callback);
    }

    /// Update documents matching a condition, reporting the affected count
    pub fn update_where<C>(&self, options: UpdateWhere, callback: C)
    where
        C: FnOnce(Result<u64>) + Send + 'static,
    {
        self.run(move |inner| inner.update_where(options), callback);
    }

    /// Update documents by identifier, reporting the affected count
    pub fn update_by_id<C>(&self, options: UpdateById, callback: C)
    where
        C: FnOnce(Result<u64>) + Send + 'static,
    {
        self.run(move |inner| inner.update_by_id(options), callback);
    }

    /// Delete documents matching a condition, reporting the removed count
    pub fn delete_where<C>(&self, options: DeleteWhere, callback: C)
    where
        C: FnOnce(Result<u64>) + Send + 'static,
    {
        self.run(move |inner| inner.delete_where(options), callback);
    }

    /// Delete documents by identifier, reporting the removed count
    pub fn delete_by_id<C>(&self, options: DeleteById, callback: C)
    where
        C: FnOnce(Result<u64>) + Send + 'static,
    {
        self.run(move |inner| inner.delete_by_id(options), callback);
    }

    /// Read documents matching a condition
    pub fn query_where<C>(&self, options: QueryWhere, callback: C)
    where
        C: FnOnce(Result<Vec<Document>>) + Send + 'static,
    {
        self.run(move |inner| inner.query_where(options), callback);
    }

    /// Read documents by identifier
    pub fn query_by_id<C>(&self, options: QueryById, callback: C)
    where
        C: FnOnce(Result<Vec<Document>>) + Send + 'static,
    {
        self.run(move |inner| inner.query_by_id(options), callback);
    }

    /// Read every document of a collection
    pub fn query_all<C>(&self, options: QueryAll, callback: C)
    where
        C: FnOnce(Result<Vec<Document>>) + Send + 'static,
    {
        self.run(move |inner| inner.query_all(options), callback);
    }

    /// Check which of the given ids exist
    pub fn id_exists<C>(&self, options: IdExists, callback: C)
    where
        C: FnOnce(Result<IdMap>) + Send + 'static,
    {
        self.run(move |inner| inner.id_exists(options), callback);
    }

    /// Count documents in a collection
    pub fn count<C>(&self, options: Count, callback: C)
    where
        C: FnOnce(Result<u64>) + Send + 'static,
    {
        self.run(move |inner| inner.count(options), callback);
    }

    /// Gate an operation behind the init barrier
    ///
    /// A connection failure short-circuits: the callback receives the
    /// captured error and `execute` never runs.
    pub(crate) fn run<T, E, C>(&self, execute: E, callback: C)
    where
        T: Send + 'static,
        E: FnOnce(&DriverInner) -> Result<T> + Send + 'static,
        C: FnOnce(Result<T>) + Send + 'static,
    {
        let inner = self.inner.clone();
        self.inner.manager.submit(move |outcome| match outcome {
            Ok(()) => callback(execute(&inner)),
            Err(err) => callback(Err(err.clone())),
        });
    }
}

/// Shared state and synchronous operation bodies of one driver instance
pub(crate) struct DriverInner {
    manager: ConnectionManager,
    collections: CollectionCache,
}

impl DriverInner {
    fn collection(&self, name: &str) -> Result<Arc<CachedCollection>> {
        let connection = self.manager.connection()?;
        self.collections.get(&connection, name)
    }

    pub(crate) fn insert_into(&self, options: InsertInto) -> Result<Vec<Document>> {
        let values = match options.values {
            Some(values) if !values.is_empty() => values,
            _ => {
                return Err(Error::Validation {
                    operation: "insert_into",
                    field: "values",
                })
            }
        };
        self.collection(&options.collection)?.insert(values)
    }

    pub(crate) fn update_where(&self, options: UpdateWhere) -> Result<u64> {
        let condition = options.condition.ok_or(Error::Validation {
            operation: "update_where",
            field: "condition",
        })?;
        let multi = options.multi.unwrap_or(true);
        self.collection(&options.collection)?
            .update(&condition, &options.values, multi)
    }

    pub(crate) fn update_by_id(&self, options: UpdateById) -> Result<u64> {
        let id = options.id.ok_or(Error::Validation {
            operation: "update_by_id",
            field: "id",
        })?;
        let condition = id_condition(&id)?;
        self.update_where(UpdateWhere {
            collection: options.collection,
            condition: Some(condition),
            values: options.values,
            multi: options.multi,
        })
    }

    pub(crate) fn delete_where(&self, options: DeleteWhere) -> Result<u64> {
        let condition = options.condition.ok_or(Error::Validation {
            operation: "delete_where",
            field: "condition",
        })?;
        self.collection(&options.collection)?.remove(&condition)
    }

    pub(crate) fn delete_by_id(&self, options: DeleteById) -> Result<u64> {
        let id = options.id.ok_or(Error::Validation {
            operation: "delete_by_id",
            field: "id",
        })?;
        let condition = id_condition(&id)?;
        self.collection(&options.collection)?.remove(&condition)
    }

    pub(crate) fn query_where(&self, options: QueryWhere) -> Result<Vec<Document>> {
        let condition = options.condition.ok_or(Error::Validation {
            operation: "query_where",
            field: "condition",
        })?;
        // An id sub-condition replaces every other filter on the call.
        let condition = if condition.id_match().is_some() {
            condition.without_fields()
        } else {
            condition
        };
        self.collection(&options.collection)?
            .find(&condition, &options.fields)
    }

    pub(crate) fn query_by_id(&self, options: QueryById) -> Result<Vec<Document>> {
        let id = options.id.ok_or(Error::Validation {
            operation: "query_by_id",
            field: "id",
        })?;
        let condition = id_condition(&id)?;
        self.query_where(QueryWhere {
            collection: options.collection,
            condition: Some(condition),
            fields: options.fields,
        })
    }

    pub(crate) fn query_all(&self, options: QueryAll) -> Result<Vec<Document>> {
        // Unlike query_where, the match-all condition is supplied here.
        self.query_where(QueryWhere {
            collection: options.collection,
            condition: Some(Condition::new()),
            fields: options.fields,
        })
    }

    pub(crate) fn id_exists(&self, options: IdExists) -> Result<IdMap> {
        let ids = match options.ids {
            None | Some(IdInput::Condition(_)) => {
                return Err(Error::Validation {
                    operation: "id_exists",
                    field: "ids",
                })
            }
            // A scalar checks a single id.
            Some(scalar @ (IdInput::Int(_) | IdInput::Oid(_) | IdInput::Str(_))) => {
                vec![scalar]
            }
            Some(IdInput::List(items)) => items,
        };

        let mut map = IdMap::new();
        for id in &ids {
            if let Some(key) = requested_key(id) {
                map.entry(key).or_insert(None);
            }
        }

        // The projection always keeps the primary key, so the mapping keys
        // survive any field list.
        let condition = id_condition(&IdInput::List(ids))?;
        let found = self
            .collection(&options.collection)?
            .find(&condition, &options.fields)?;
        for doc in found {
            let key = doc
                .get(packrat_core::STORE_ID_FIELD)
                .and_then(id_value_key);
            if let Some(key) = key {
                map.insert(key, Some(doc));
            }
        }
        Ok(map)
    }

    pub(crate) fn count(&self, options: Count) -> Result<u64> {
        self.collection(&options.collection)?.count()
    }
}

// String key for a requested id. Lists and conditions have no scalar key;
// unparseable strings keep their raw form so the caller sees them reported
// as absent.
fn requested_key(id: &IdInput) -> Option<String> {
    match id {
        IdInput::Int(n) => Some(n.to_string()),
        IdInput::Oid(oid) => Some(oid.to_string()),
        IdInput::Str(s) => Some(
            packrat_core::DocumentId::from_string(s)
                .map(|oid| oid.to_string())
                .unwrap_or_else(|| s.clone()),
        ),
        IdInput::List(_) | IdInput::Condition(_) => None,
    }
}

fn id_value_key(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => n.as_i64().map(|n| n.to_string()),
        Value::String(s) => Some(
            packrat_core::DocumentId::from_string(s)
                .map(|oid| oid.to_string())
                .unwrap_or_else(|| s.clone()),
        ),
        _ => None,
    }
}
