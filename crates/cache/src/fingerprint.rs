//! Cache key fingerprinting
//!
//! A fingerprint is a deterministic encoding of
//! {operation kind, collection, condition, projected fields}. Two logically
//! identical read requests always produce the same fingerprint; the
//! projection list is sorted and deduplicated first so field order on the
//! call site does not matter.
//!
//! Rendered form: `{prefix:}{collection}:{op}:{xxh3 hex}`. The collection
//! name stays visible in the key so external backends can invalidate by
//! collection with a plain prefix scan.

use packrat_core::{Condition, Projection};
use std::fmt;
use xxhash_rust::xxh3::xxh3_64;

/// Read operation kind, part of the cache key space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// Document read (`find`)
    Query,
    /// Collection count
    Count,
}

impl OpKind {
    fn as_str(&self) -> &'static str {
        match self {
            OpKind::Query => "query",
            OpKind::Count => "count",
        }
    }
}

/// Deterministic cache key for one read request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint for a read request
    pub fn compute(
        prefix: Option<&str>,
        op: OpKind,
        collection: &str,
        condition: &Condition,
        fields: &Projection,
    ) -> Self {
        let mut sorted = fields.clone();
        sorted.sort();
        sorted.dedup();

        // Condition::to_query renders with deterministic key order.
        let payload = format!(
            "{}|{}|{}|{}",
            op.as_str(),
            collection,
            condition.to_query(),
            sorted.join(",")
        );
        let digest = xxh3_64(payload.as_bytes());

        let key = match prefix {
            Some(prefix) => format!("{}:{}:{}:{:016x}", prefix, collection, op.as_str(), digest),
            None => format!("{}:{}:{:016x}", collection, op.as_str(), digest),
        };
        Fingerprint(key)
    }

    /// The rendered key
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
