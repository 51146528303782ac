//! Batch façade
//!
//! A [`Batch`] collects several operations against one driver and runs them
//! together behind a single barrier pass. Operations execute in declaration
//! order; the first failure stops the batch and is reported as the batch's
//! error. On success the callback receives one [`BatchResult`] per
//! operation, in declaration order.

use crate::driver::{
    Count, DeleteById, DeleteWhere, Driver, IdExists, IdMap, InsertInto, QueryAll, QueryById,
    QueryWhere, UpdateById, UpdateWhere,
};
use packrat_core::{Document, Result};

enum BatchOp {
    InsertInto(InsertInto),
    UpdateWhere(UpdateWhere),
    UpdateById(UpdateById),
    DeleteWhere(DeleteWhere),
    DeleteById(DeleteById),
    QueryWhere(QueryWhere),
    QueryById(QueryById),
    QueryAll(QueryAll),
    IdExists(IdExists),
    Count(Count),
}

/// Result of one operation within a batch
#[derive(Debug, Clone, PartialEq)]
pub enum BatchResult {
    /// Documents read or inserted
    Documents(Vec<Document>),
    /// Documents affected by an update or delete
    Affected(u64),
    /// Per-id existence map
    IdMap(IdMap),
    /// Collection count
    Count(u64),
}

/// An ordered list of operations to run together
///
/// Built with the chainable `push` methods, then consumed by [`Batch::run`].
pub struct Batch {
    driver: Driver,
    ops: Vec<BatchOp>,
}

impl Batch {
    pub(crate) fn new(driver: Driver) -> Self {
        Batch {
            driver,
            ops: Vec::new(),
        }
    }

    /// Number of operations declared so far
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether the batch is empty
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Add an insert
    pub fn insert_into(mut self, options: InsertInto) -> Self {
        self.ops.push(BatchOp::InsertInto(options));
        self
    }

    /// Add a condition-based update
    pub fn update_where(mut self, options: UpdateWhere) -> Self {
        self.ops.push(BatchOp::UpdateWhere(options));
        self
    }

    /// Add an id-based update
    pub fn update_by_id(mut self, options: UpdateById) -> Self {
        self.ops.push(BatchOp::UpdateById(options));
        self
    }

    /// Add a condition-based delete
    pub fn delete_where(mut self, options: DeleteWhere) -> Self {
        self.ops.push(BatchOp::DeleteWhere(options));
        self
    }

    /// Add an id-based delete
    pub fn delete_by_id(mut self, options: DeleteById) -> Self {
        self.ops.push(BatchOp::DeleteById(options));
        self
    }

    /// Add a condition-based read
    pub fn query_where(mut self, options: QueryWhere) -> Self {
        self.ops.push(BatchOp::QueryWhere(options));
        self
    }

    /// Add an id-based read
    pub fn query_by_id(mut self, options: QueryById) -> Self {
        self.ops.push(BatchOp::QueryById(options));
        self
    }

    /// Add a whole-collection read
    pub fn query_all(mut self, options: QueryAll) -> Self {
        self.ops.push(BatchOp::QueryAll(options));
        self
    }

    /// Add an id-existence check
    pub fn id_exists(mut self, options: IdExists) -> Self {
        self.ops.push(BatchOp::IdExists(options));
        self
    }

    /// Add a collection count
    pub fn count(mut self, options: Count) -> Self {
        self.ops.push(BatchOp::Count(options));
        self
    }

    /// Run the batch
    ///
    /// Operations execute in declaration order. The first failing operation
    /// stops the batch; operations declared after it do not run.
    pub fn run<C>(self, callback: C)
    where
        C: FnOnce(Result<Vec<BatchResult>>) + Send + 'static,
    {
        let Batch { driver, ops } = self;
        driver.run(
            move |inner| {
                let mut results = Vec::with_capacity(ops.len());
                for op in ops {
                    results.push(match op {
                        BatchOp::InsertInto(options) => {
                            BatchResult::Documents(inner.insert_into(options)?)
                        }
                        BatchOp::UpdateWhere(options) => {
                            BatchResult::Affected(inner.update_where(options)?)
                        }
                        BatchOp::UpdateById(options) => {
                            BatchResult::Affected(inner.update_by_id(options)?)
                        }
                        BatchOp::DeleteWhere(options) => {
                            BatchResult::Affected(inner.delete_where(options)?)
                        }
                        BatchOp::DeleteById(options) => {
                            BatchResult::Affected(inner.delete_by_id(options)?)
                        }
                        BatchOp::QueryWhere(options) => {
                            BatchResult::Documents(inner.query_where(options)?)
                        }
                        BatchOp::QueryById(options) => {
                            BatchResult::Documents(inner.query_by_id(options)?)
                        }
                        BatchOp::QueryAll(options) => {
                            BatchResult::Documents(inner.query_all(options)?)
                        }
                        BatchOp::IdExists(options) => {
                            BatchResult::IdMap(inner.id_exists(options)?)
                        }
                        BatchOp::Count(options) => BatchResult::Count(inner.count(options)?),
                    });
                }
                Ok(results)
            },
            callback,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryConnector, MemoryStore};
    use packrat_core::{DriverConfig, Error};
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

    fn run(batch: Batch) -> Result<Vec<BatchResult>> {
        let (tx, rx) = mpsc::channel();
        batch.run(move |result| {
            let _ = tx.send(result);
        });
        rx.recv().expect("batch callback dropped")
    }

    #[test]
    fn test_results_in_declaration_order() {
        let store = MemoryStore::new();
        let driver = open(&store);

        let batch = driver
            .batch()
            .insert_into(
                InsertInto::new("users").values(vec![document(json!({"_id": 1, "user": "u1"}))]),
            )
            .update_by_id(
                UpdateById::new("users")
                    .id(1)
                    .values(document(json!({"pass": "p1"}))),
            )
            .query_all(QueryAll::new("users"))
            .count(Count::new("users"));
        assert_eq!(batch.len(), 4);

        let results = run(batch).unwrap();
        assert_eq!(results.len(), 4);
        assert!(matches!(&results[0], BatchResult::Documents(docs) if docs.len() == 1));
        assert_eq!(results[1], BatchResult::Affected(1));
        assert!(
            matches!(&results[2], BatchResult::Documents(docs) if docs[0].get("pass") == Some(&json!("p1")))
        );
        assert_eq!(results[3], BatchResult::Count(1));
    }

    #[test]
    fn test_first_failure_stops_the_batch() {
        let store = MemoryStore::new();
        store.seed("users", vec![document(json!({"_id": 1, "user": "u1"}))]);
        let driver = open(&store);

        let batch = driver
            .batch()
            .query_all(QueryAll::new("users"))
            // Missing values: validation failure mid-batch.
            .insert_into(InsertInto::new("users"))
            .delete_by_id(DeleteById::new("users").id(1));

        let err = run(batch).unwrap_err();
        assert_eq!(
            err,
            Error::Validation {
                operation: "insert_into",
                field: "values",
            }
        );
        // The delete declared after the failure never ran.
        assert_eq!(store.documents("users").len(), 1);
    }

    #[test]
    fn test_empty_batch() {
        let store = MemoryStore::new();
        let driver = open(&store);
        let batch = driver.batch();
        assert!(batch.is_empty());
        assert_eq!(run(batch).unwrap(), vec![]);
    }
}
