//! Core types and traits for the Packrat driver
//!
//! This crate defines the foundational types used throughout the system:
//! - DocumentId: canonical primary-key type (UUID v4 newtype)
//! - IdValue / IdInput: identifier values and the heterogeneous id argument
//! - Document: schema-less document representation
//! - Condition: normalized query predicate with an explicit id-matching form
//! - DriverConfig: connection and cache configuration
//! - Error: error type hierarchy
//! - Traits: collaborator contracts (CacheStorage, StoreConnection,
//!   StoreCollection, Connector)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod condition;
pub mod config;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types and traits
pub use condition::{id_condition, Condition, IdInput, IdMatch};
pub use config::DriverConfig;
pub use error::{Error, Result};
pub use traits::{CacheStorage, CachedValue, Connector, StoreCollection, StoreConnection};
pub use types::{Document, DocumentId, IdValue, Projection, MODEL_ID_FIELD, STORE_ID_FIELD};
