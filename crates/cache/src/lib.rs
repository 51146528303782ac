//! Read-through result cache for the Packrat driver
//!
//! This crate provides:
//! - Fingerprint: deterministic cache key derived from
//!   {operation kind, collection, condition, projected fields}
//! - ReadCache: the read-through cache and its write-path invalidation hook
//! - MemoryStorage: an in-process cache backend
//!
//! Eviction is collection-wide: any write to a collection evicts every
//! cached read over it, regardless of which documents the write touched.
//! There is no TTL; invalidation is the only eviction trigger.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod fingerprint;
pub mod memory;
pub mod read_cache;

pub use fingerprint::{Fingerprint, OpKind};
pub use memory::MemoryStorage;
pub use read_cache::ReadCache;
