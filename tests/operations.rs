//! The full operation surface through the public API.

use packrat::testing::{MemoryConnector, MemoryStore};
use packrat::{
    Condition, Count, DeleteById, DeleteWhere, Document, DocumentId, Driver, DriverConfig, Error,
    IdExists, IdInput, InsertInto, QueryAll, QueryById, QueryWhere, UpdateById, UpdateWhere,
};
use serde_json::json;
use std::sync::mpsc;
use std::sync::Arc;

fn document(value: serde_json::Value) -> Document {
    match value {
        serde_json::Value::Object(map) => map,
        _ => panic!("expected object"),
    }
}

fn open(store: &MemoryStore) -> Driver {
    Driver::open(
        DriverConfig::default(),
        Arc::new(MemoryConnector::new(store.clone())),
    )
}

macro_rules! call {
    ($driver:expr, $op:ident, $options:expr) => {{
        let (tx, rx) = mpsc::channel();
        $driver.$op($options, move |result| {
            let _ = tx.send(result);
        });
        rx.recv().expect("callback dropped")
    }};
}

#[test]
fn insert_then_query_roundtrip() {
    let store = MemoryStore::new();
    let driver = open(&store);

    let inserted = call!(
        driver,
        insert_into,
        InsertInto::new("posts").values(vec![
            document(json!({"title": "one"})),
            document(json!({"title": "two"})),
        ])
    )
    .unwrap();
    assert_eq!(inserted.len(), 2);

    // Assigned ids are canonical and usable for id-based reads.
    let id = inserted[0].get("_id").and_then(|v| v.as_str()).unwrap();
    assert!(DocumentId::from_string(id).is_some());

    let docs = call!(
        driver,
        query_by_id,
        QueryById::new("posts").id(id.to_string())
    )
    .unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].get("title"), Some(&json!("one")));
}

#[test]
fn update_and_delete_report_affected_counts() {
    let store = MemoryStore::new();
    store.seed(
        "users",
        vec![
            document(json!({"_id": 1, "role": "admin"})),
            document(json!({"_id": 2, "role": "admin"})),
            document(json!({"_id": 3, "role": "guest"})),
        ],
    );
    let driver = open(&store);

    let update = UpdateWhere::new("users")
        .condition(Condition::new().field("role", "admin"))
        .values(document(json!({"audited": true})));
    assert_eq!(call!(driver, update_where, update).unwrap(), 2);

    assert_eq!(
        call!(
            driver,
            update_by_id,
            UpdateById::new("users")
                .id(3)
                .values(document(json!({"audited": true})))
        )
        .unwrap(),
        1
    );

    assert_eq!(
        call!(
            driver,
            delete_where,
            DeleteWhere::new("users").condition(Condition::new().field("role", "guest"))
        )
        .unwrap(),
        1
    );
    assert_eq!(
        call!(
            driver,
            delete_by_id,
            DeleteById::new("users").id(vec![IdInput::Int(1), IdInput::Int(2)])
        )
        .unwrap(),
        2
    );
    assert_eq!(call!(driver, count, Count::new("users")).unwrap(), 0);
}

#[test]
fn id_sub_condition_replaces_other_filters() {
    let store = MemoryStore::new();
    store.seed(
        "users",
        vec![document(json!({"_id": 1, "user": "u1"}))],
    );
    let driver = open(&store);

    let options = QueryWhere::new("users")
        .condition(Condition::id(1).field("user", "somebody-else"));
    let docs = call!(driver, query_where, options).unwrap();
    assert_eq!(docs.len(), 1);
}

#[test]
fn query_all_and_projection() {
    let store = MemoryStore::new();
    store.seed(
        "users",
        vec![
            document(json!({"_id": 1, "user": "u1", "pass": "p1"})),
            document(json!({"_id": 2, "user": "u2", "pass": "p2"})),
        ],
    );
    let driver = open(&store);

    let docs = call!(
        driver,
        query_all,
        QueryAll::new("users").fields(vec!["user".to_string()])
    )
    .unwrap();
    assert_eq!(docs.len(), 2);
    for doc in docs {
        assert!(doc.contains_key("_id"));
        assert!(doc.contains_key("user"));
        assert!(!doc.contains_key("pass"));
    }
}

#[test]
fn id_exists_reports_every_requested_id() {
    let store = MemoryStore::new();
    store.seed(
        "users",
        vec![
            document(json!({"_id": 1, "user": "u1"})),
            document(json!({"_id": 2, "user": "u2"})),
        ],
    );
    let driver = open(&store);

    let map = call!(
        driver,
        id_exists,
        IdExists::new("users").ids(vec![IdInput::Int(1), IdInput::Int(2), IdInput::Int(3)])
    )
    .unwrap();
    assert_eq!(map.len(), 3);
    assert!(map["1"].is_some());
    assert!(map["2"].is_some());
    assert!(map["3"].is_none());
}

#[test]
fn invalid_scalar_id_errors_but_list_is_lenient() {
    let store = MemoryStore::new();
    store.seed("users", vec![document(json!({"_id": 1, "user": "u1"}))]);
    let driver = open(&store);

    let result = call!(
        driver,
        query_by_id,
        QueryById::new("users").id("not-a-canonical-id")
    );
    assert_eq!(
        result.unwrap_err(),
        Error::InvalidId("not-a-canonical-id".to_string())
    );

    // The same string inside a list is dropped instead.
    let docs = call!(
        driver,
        query_by_id,
        QueryById::new("users").id(vec![IdInput::Int(1), IdInput::from("not-a-canonical-id")])
    )
    .unwrap();
    assert_eq!(docs.len(), 1);
}

#[test]
fn missing_required_options_are_validation_errors() {
    let store = MemoryStore::new();
    let driver = open(&store);

    assert!(matches!(
        call!(driver, insert_into, InsertInto::new("users")),
        Err(Error::Validation { .. })
    ));
    assert!(matches!(
        call!(driver, update_where, UpdateWhere::new("users")),
        Err(Error::Validation { .. })
    ));
    assert!(matches!(
        call!(driver, query_where, QueryWhere::new("users")),
        Err(Error::Validation { .. })
    ));
    assert!(matches!(
        call!(driver, delete_where, DeleteWhere::new("users")),
        Err(Error::Validation { .. })
    ));
    assert!(matches!(
        call!(driver, query_by_id, QueryById::new("users")),
        Err(Error::Validation { .. })
    ));
    assert!(matches!(
        call!(driver, id_exists, IdExists::new("users")),
        Err(Error::Validation { .. })
    ));
    // Nothing reached the store.
    assert_eq!(store.write_calls(), 0);
    assert_eq!(store.find_calls(), 0);
}
