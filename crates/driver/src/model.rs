//! Model adapter
//!
//! The [`ModelAdapter`] exposes the five-verb contract (insert, get,
//! get_all, save, delete) consumed by an external model layer. It owns the
//! id-field translation: the model addresses documents through `id`, the
//! store through `_id`, and nothing crosses the boundary un-renamed.
//!
//! The model layer's property pipeline is a collaborator trait
//! ([`ModelHooks`]); the adapter invokes the hooks but does not implement
//! them.

use crate::driver::{DeleteById, Driver, InsertInto, QueryAll, QueryWhere, UpdateById};
use packrat_core::{
    id_condition, Document, Error, IdInput, IdValue, Result, MODEL_ID_FIELD, STORE_ID_FIELD,
};
use serde_json::Value;
use std::sync::Arc;

/// Property pipeline and collection binding supplied by the model layer
///
/// `validate_properties`, `convert_types`, and `set_defaults` run, in that
/// order, on every insert; `property_check` runs on condition-based gets
/// (required-field checks relaxed versus insert). The default hook bodies
/// accept everything unchanged.
pub trait ModelHooks: Send + Sync {
    /// The collection backing this model
    fn collection(&self) -> &str;

    /// Reject documents with missing or malformed properties
    ///
    /// # Errors
    ///
    /// Returns an error describing the rejected property.
    fn validate_properties(&self, _properties: &Document) -> Result<()> {
        Ok(())
    }

    /// Coerce property values into their declared types
    fn convert_types(&self, _properties: &mut Document) {}

    /// Fill in defaults for absent properties
    fn set_defaults(&self, _properties: &mut Document) {}

    /// Check a query's field filters against the model's properties
    ///
    /// # Errors
    ///
    /// Returns an error for filters over unknown properties.
    fn property_check(&self, _fields: &Document) -> Result<()> {
        Ok(())
    }
}

/// Result shape of a model get
#[derive(Debug, Clone, PartialEq)]
pub enum ModelFetch {
    /// Single lookup: the matching document, if any
    One(Option<Document>),
    /// List fan-out: one entry per requested id, in input order
    Many(Vec<Option<Document>>),
}

/// Five-verb adapter between the model layer and the driver
///
/// Cheap to clone; clones share the driver and hooks.
#[derive(Clone)]
pub struct ModelAdapter {
    driver: Driver,
    hooks: Arc<dyn ModelHooks>,
}

impl ModelAdapter {
    /// Bind a model's hooks to a driver
    pub fn new(driver: Driver, hooks: Arc<dyn ModelHooks>) -> Self {
        ModelAdapter { driver, hooks }
    }

    /// Insert one document, reporting its assigned id
    ///
    /// Runs the property pipeline, renames the model id field to the store
    /// key, and inserts.
    pub fn insert<C>(&self, properties: Document, callback: C)
    where
        C: FnOnce(Result<IdValue>) + Send + 'static,
    {
        let hooks = self.hooks.clone();
        self.driver.run(
            move |inner| {
                hooks.validate_properties(&properties)?;
                let mut properties = properties;
                hooks.convert_types(&mut properties);
                hooks.set_defaults(&mut properties);
                rename_field(&mut properties, MODEL_ID_FIELD, STORE_ID_FIELD);

                let inserted = inner.insert_into(InsertInto {
                    collection: hooks.collection().to_string(),
                    values: Some(vec![properties]),
                })?;
                inserted
                    .first()
                    .and_then(|doc| doc.get(STORE_ID_FIELD))
                    .and_then(IdValue::from_json)
                    .ok_or_else(|| {
                        Error::Adapter("insert did not report an assigned id".to_string())
                    })
            },
            callback,
        );
    }

    /// Fetch by id, condition, or list of ids
    ///
    /// A scalar or condition yields [`ModelFetch::One`]; zero matches is a
    /// None result, not an error. A list fans out into one lookup per
    /// element and yields [`ModelFetch::Many`] in input order, with
    /// non-conforming elements reported as None.
    pub fn get<C>(&self, input: impl Into<IdInput>, callback: C)
    where
        C: FnOnce(Result<ModelFetch>) + Send + 'static,
    {
        let input = input.into();
        let hooks = self.hooks.clone();
        self.driver.run(
            move |inner| match input {
                IdInput::List(items) => {
                    let mut results = Vec::with_capacity(items.len());
                    for item in items {
                        let condition = match &item {
                            IdInput::List(_) | IdInput::Condition(_) => None,
                            scalar => id_condition(scalar).ok(),
                        };
                        results.push(match condition {
                            None => None,
                            Some(condition) => inner
                                .query_where(QueryWhere {
                                    collection: hooks.collection().to_string(),
                                    condition: Some(condition),
                                    fields: Vec::new(),
                                })?
                                .into_iter()
                                .next()
                                .map(into_model_document),
                        });
                    }
                    Ok(ModelFetch::Many(results))
                }
                IdInput::Condition(condition) => {
                    hooks.property_check(condition.fields())?;
                    let docs = inner.query_where(QueryWhere {
                        collection: hooks.collection().to_string(),
                        condition: Some(condition),
                        fields: Vec::new(),
                    })?;
                    Ok(ModelFetch::One(
                        docs.into_iter().next().map(into_model_document),
                    ))
                }
                scalar => {
                    let condition = id_condition(&scalar)?;
                    let docs = inner.query_where(QueryWhere {
                        collection: hooks.collection().to_string(),
                        condition: Some(condition),
                        fields: Vec::new(),
                    })?;
                    Ok(ModelFetch::One(
                        docs.into_iter().next().map(into_model_document),
                    ))
                }
            },
            callback,
        );
    }

    /// Fetch every document of the model's collection, model-shaped
    pub fn get_all<C>(&self, callback: C)
    where
        C: FnOnce(Result<Vec<Document>>) + Send + 'static,
    {
        let hooks = self.hooks.clone();
        self.driver.run(
            move |inner| {
                let docs = inner.query_all(QueryAll {
                    collection: hooks.collection().to_string(),
                    fields: Vec::new(),
                })?;
                Ok(docs.into_iter().map(into_model_document).collect())
            },
            callback,
        );
    }

    /// Persist changes to an existing document
    ///
    /// The model id field is required; it addresses the document and is
    /// stripped from the update payload.
    pub fn save<C>(&self, properties: Document, callback: C)
    where
        C: FnOnce(Result<u64>) + Send + 'static,
    {
        let hooks = self.hooks.clone();
        self.driver.run(
            move |inner| {
                let mut properties = properties;
                let id_value = properties.remove(MODEL_ID_FIELD).ok_or_else(|| {
                    Error::Adapter(format!("save requires the '{}' field", MODEL_ID_FIELD))
                })?;
                let id = id_input_from_json(&id_value).ok_or_else(|| {
                    Error::Adapter(format!("wrong value for '{}': {}", MODEL_ID_FIELD, id_value))
                })?;
                inner.update_by_id(UpdateById {
                    collection: hooks.collection().to_string(),
                    id: Some(id),
                    values: properties,
                    multi: None,
                })
            },
            callback,
        );
    }

    /// Delete by id or list of ids
    ///
    /// A condition input is a caller error on this verb.
    pub fn delete<C>(&self, input: impl Into<IdInput>, callback: C)
    where
        C: FnOnce(Result<u64>) + Send + 'static,
    {
        let input = input.into();
        let hooks = self.hooks.clone();
        self.driver.run(
            move |inner| {
                if matches!(input, IdInput::Condition(_)) {
                    return Err(Error::Adapter(
                        "delete accepts ids, not conditions".to_string(),
                    ));
                }
                inner.delete_by_id(DeleteById {
                    collection: hooks.collection().to_string(),
                    id: Some(input),
                })
            },
            callback,
        );
    }
}

/// Reshape a stored document for the model layer
///
/// Renames the store's primary-key field to the model-facing id field.
pub fn into_model_document(mut doc: Document) -> Document {
    rename_field(&mut doc, STORE_ID_FIELD, MODEL_ID_FIELD);
    doc
}

fn rename_field(doc: &mut Document, from: &str, to: &str) {
    if let Some(value) = doc.remove(from) {
        doc.insert(to.to_string(), value);
    }
}

fn id_input_from_json(value: &Value) -> Option<IdInput> {
    match value {
        Value::Number(n) => n.as_i64().map(IdInput::Int),
        Value::String(s) => Some(IdInput::Str(s.clone())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryConnector, MemoryStore};
    use packrat_core::{Condition, DriverConfig};
    use serde_json::json;
    use std::sync::mpsc;

    fn document(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    struct NoteHooks;

    impl ModelHooks for NoteHooks {
        fn collection(&self) -> &str {
            "notes"
        }

        fn validate_properties(&self, properties: &Document) -> Result<()> {
            if properties.contains_key("title") {
                Ok(())
            } else {
                Err(Error::Validation {
                    operation: "insert",
                    field: "title",
                })
            }
        }

        fn set_defaults(&self, properties: &mut Document) {
            properties
                .entry("archived".to_string())
                .or_insert(json!(false));
        }

        fn property_check(&self, fields: &Document) -> Result<()> {
            for field in fields.keys() {
                if field != "title" && field != "archived" {
                    return Err(Error::Adapter(format!("unknown property '{}'", field)));
                }
            }
            Ok(())
        }
    }

    fn adapter(store: &MemoryStore) -> ModelAdapter {
        let driver = Driver::open(
            DriverConfig::default(),
            Arc::new(MemoryConnector::new(store.clone())),
        );
        ModelAdapter::new(driver, Arc::new(NoteHooks))
    }

    macro_rules! call {
        ($adapter:expr, $verb:ident $(, $arg:expr)?) => {{
            let (tx, rx) = mpsc::channel();
            $adapter.$verb($($arg,)? move |result| {
                let _ = tx.send(result);
            });
            rx.recv().expect("callback dropped")
        }};
    }

    #[test]
    fn test_insert_returns_assigned_id_and_applies_defaults() {
        let store = MemoryStore::new();
        let adapter = adapter(&store);

        let id = call!(adapter, insert, document(json!({"title": "first"}))).unwrap();
        assert!(matches!(id, IdValue::Oid(_)));

        let docs = store.documents("notes");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].get("archived"), Some(&json!(false)));
    }

    #[test]
    fn test_insert_renames_model_id() {
        let store = MemoryStore::new();
        let adapter = adapter(&store);

        let id = call!(
            adapter,
            insert,
            document(json!({"id": 7, "title": "keyed"}))
        )
        .unwrap();
        assert_eq!(id, IdValue::Int(7));

        let docs = store.documents("notes");
        assert_eq!(docs[0].get("_id"), Some(&json!(7)));
        assert!(!docs[0].contains_key("id"));
    }

    #[test]
    fn test_insert_validation_failure_never_reaches_store() {
        let store = MemoryStore::new();
        let adapter = adapter(&store);

        let result = call!(adapter, insert, document(json!({"body": "untitled"})));
        assert!(result.is_err());
        assert_eq!(store.write_calls(), 0);
    }

    #[test]
    fn test_get_scalar_reshapes_id() {
        let store = MemoryStore::new();
        store.seed(
            "notes",
            vec![document(json!({"_id": 1, "title": "first"}))],
        );
        let adapter = adapter(&store);

        let fetched = call!(adapter, get, 1).unwrap();
        let ModelFetch::One(Some(doc)) = fetched else {
            panic!("expected a single document");
        };
        assert_eq!(doc.get("id"), Some(&json!(1)));
        assert!(!doc.contains_key("_id"));
    }

    #[test]
    fn test_get_zero_matches_is_none() {
        let store = MemoryStore::new();
        let adapter = adapter(&store);
        assert_eq!(call!(adapter, get, 99).unwrap(), ModelFetch::One(None));
    }

    #[test]
    fn test_get_list_fans_out_in_input_order() {
        let store = MemoryStore::new();
        store.seed(
            "notes",
            vec![
                document(json!({"_id": 1, "title": "first"})),
                document(json!({"_id": 2, "title": "second"})),
            ],
        );
        let adapter = adapter(&store);

        let input = vec![IdInput::Int(2), IdInput::Int(9), IdInput::Int(1)];
        let ModelFetch::Many(results) = call!(adapter, get, input).unwrap() else {
            panic!("expected a list result");
        };
        assert_eq!(results.len(), 3);
        assert_eq!(
            results[0].as_ref().and_then(|d| d.get("title")),
            Some(&json!("second"))
        );
        assert!(results[1].is_none());
        assert_eq!(
            results[2].as_ref().and_then(|d| d.get("title")),
            Some(&json!("first"))
        );
    }

    #[test]
    fn test_get_condition_checked_against_properties() {
        let store = MemoryStore::new();
        store.seed(
            "notes",
            vec![document(json!({"_id": 1, "title": "first"}))],
        );
        let adapter = adapter(&store);

        let fetched = call!(
            adapter,
            get,
            Condition::new().field("title", "first")
        )
        .unwrap();
        assert!(matches!(fetched, ModelFetch::One(Some(_))));

        let result = call!(adapter, get, Condition::new().field("rating", 5));
        assert!(matches!(result, Err(Error::Adapter(_))));
    }

    #[test]
    fn test_get_all_reshapes_every_document() {
        let store = MemoryStore::new();
        store.seed(
            "notes",
            vec![
                document(json!({"_id": 1, "title": "first"})),
                document(json!({"_id": 2, "title": "second"})),
            ],
        );
        let adapter = adapter(&store);

        let docs = call!(adapter, get_all).unwrap();
        assert_eq!(docs.len(), 2);
        for doc in docs {
            assert!(doc.contains_key("id"));
            assert!(!doc.contains_key("_id"));
        }
    }

    #[test]
    fn test_save_updates_by_id_and_strips_it_from_changes() {
        let store = MemoryStore::new();
        store.seed(
            "notes",
            vec![document(json!({"_id": 1, "title": "first"}))],
        );
        let adapter = adapter(&store);

        let affected = call!(
            adapter,
            save,
            document(json!({"id": 1, "title": "renamed"}))
        )
        .unwrap();
        assert_eq!(affected, 1);

        let docs = store.documents("notes");
        assert_eq!(docs[0].get("title"), Some(&json!("renamed")));
        assert_eq!(docs[0].get("_id"), Some(&json!(1)));
        assert!(!docs[0].contains_key("id"));
    }

    #[test]
    fn test_save_with_id_only_payload_is_accepted() {
        let store = MemoryStore::new();
        store.seed(
            "notes",
            vec![document(json!({"_id": 1, "title": "first"}))],
        );
        let adapter = adapter(&store);

        let affected = call!(adapter, save, document(json!({"id": 1}))).unwrap();
        assert_eq!(affected, 1);
        assert_eq!(store.documents("notes")[0].get("title"), Some(&json!("first")));
    }

    #[test]
    fn test_save_requires_id() {
        let store = MemoryStore::new();
        let adapter = adapter(&store);
        let result = call!(adapter, save, document(json!({"title": "orphan"})));
        assert!(matches!(result, Err(Error::Adapter(_))));
    }

    #[test]
    fn test_save_rejects_non_scalar_id() {
        let store = MemoryStore::new();
        let adapter = adapter(&store);
        let result = call!(
            adapter,
            save,
            document(json!({"id": {"nested": true}, "title": "odd"}))
        );
        assert!(matches!(result, Err(Error::Adapter(_))));
    }

    #[test]
    fn test_delete_scalar_and_list() {
        let store = MemoryStore::new();
        store.seed(
            "notes",
            vec![
                document(json!({"_id": 1, "title": "first"})),
                document(json!({"_id": 2, "title": "second"})),
                document(json!({"_id": 3, "title": "third"})),
            ],
        );
        let adapter = adapter(&store);

        assert_eq!(call!(adapter, delete, 1).unwrap(), 1);
        let rest = vec![IdInput::Int(2), IdInput::Int(3)];
        assert_eq!(call!(adapter, delete, rest).unwrap(), 2);
        assert!(store.documents("notes").is_empty());
    }

    #[test]
    fn test_delete_rejects_conditions() {
        let store = MemoryStore::new();
        let adapter = adapter(&store);
        let result = call!(adapter, delete, Condition::new().field("title", "x"));
        assert!(matches!(result, Err(Error::Adapter(_))));
    }
}
