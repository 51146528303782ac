//! Packrat - caching document-store driver
//!
//! Packrat is a driver for an opaque document store that adds read-through
//! result caching with write-path invalidation, a connection init barrier
//! that queues operations issued before the connection is ready, and a
//! model adapter translating between the model layer's id convention and
//! the store's primary-key convention.
//!
//! # Quick Start
//!
//! ```ignore
//! use packrat::{Driver, DriverConfig, MemoryStorage, QueryWhere, Condition};
//! use std::sync::Arc;
//!
//! let config = DriverConfig::new("db1.internal", 27017, "app")
//!     .with_storage(Arc::new(MemoryStorage::new()))
//!     .with_cache_prefix("app1");
//!
//! // The connector supplies the store protocol; the driver supplies
//! // gating, caching, and the operation surface.
//! let driver = Driver::open(config, connector);
//!
//! driver.query_where(
//!     QueryWhere::new("users").condition(Condition::new().field("user", "alice")),
//!     |result| println!("{:?}", result),
//! );
//! ```
//!
//! # Architecture
//!
//! Operations flow through the [`InitBarrier`] until the connection
//! settles, then through the per-name [`CollectionCache`]; reads consult
//! the [`ReadCache`] first and writes invalidate the affected collection
//! before dispatch. The [`ModelAdapter`] sits on top and exposes the
//! five-verb model contract.

pub use packrat_cache::{Fingerprint, MemoryStorage, OpKind, ReadCache};
pub use packrat_core::{
    id_condition, CacheStorage, CachedValue, Condition, Connector, Document, DocumentId,
    DriverConfig, Error, IdInput, IdMatch, IdValue, Projection, Result, StoreCollection,
    StoreConnection, MODEL_ID_FIELD, STORE_ID_FIELD,
};
pub use packrat_driver::{
    check_port, into_model_document, Batch, BatchResult, CachedCollection, CollectionCache,
    ConnectionManager, Count, DeleteById, DeleteWhere, Driver, IdExists, IdMap, InitBarrier,
    InsertInto, ModelAdapter, ModelFetch, ModelHooks, QueryAll, QueryById, QueryWhere,
    TcpConnector, UpdateById, UpdateWhere,
};

/// In-memory reference store for tests and examples
pub mod testing {
    pub use packrat_driver::testing::{MemoryConnector, MemoryStore};
}
