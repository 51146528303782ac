//! Packrat driver: gated, cache-aware CRUD over an opaque document store
//!
//! This crate assembles the driver from the core types and the read cache:
//! - InitBarrier: queue-and-replay gate for operations issued before the
//!   connection settles
//! - ConnectionManager: opens the connection on a background thread and
//!   settles the barrier exactly once
//! - CollectionCache / CachedCollection: per-name handle cache with
//!   cache-aware primitives
//! - Driver: the ten-operation contract surface
//! - Batch: declare several operations, run them together
//! - ModelAdapter: the five-verb contract consumed by the model layer
//! - testing: in-memory reference store used as the opaque external store
//!   in tests

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod barrier;
pub mod batch;
pub mod collection;
pub mod connection;
pub mod driver;
pub mod model;
pub mod testing;

pub use barrier::InitBarrier;
pub use batch::{Batch, BatchResult};
pub use collection::{CachedCollection, CollectionCache};
pub use connection::{check_port, ConnectionManager, TcpConnector};
pub use driver::{
    Count, DeleteById, DeleteWhere, Driver, IdExists, IdMap, InsertInto, QueryAll, QueryById,
    QueryWhere, UpdateById, UpdateWhere,
};
pub use model::{into_model_document, ModelAdapter, ModelFetch, ModelHooks};
