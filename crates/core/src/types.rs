//! Foundational types for the Packrat driver
//!
//! This module defines:
//! - DocumentId: canonical primary-key type (UUID v4 newtype)
//! - IdValue: an identifier value as stored under the primary-key field
//! - Document: schema-less document representation
//! - Projection: list of projected field names

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Store-native primary-key field name.
pub const STORE_ID_FIELD: &str = "_id";

/// Model-facing id field name.
///
/// The model layer addresses documents through this field; the adapter
/// renames it to [`STORE_ID_FIELD`] before anything reaches the store.
pub const MODEL_ID_FIELD: &str = "id";

/// A schema-less document.
///
/// The default (BTree-backed) `serde_json` map gives deterministic key
/// ordering, which cache fingerprinting relies on.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Projected field names for a read. Empty means all fields.
///
/// The primary-key field is always included in projected results.
pub type Projection = Vec<String>;

/// Canonical primary-key type for stored documents
///
/// A DocumentId is a wrapper around a UUID v4, the store's native opaque
/// identifier. Callers may also address documents with plain integers; see
/// [`IdValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Create a new random DocumentId using UUID v4
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a DocumentId from raw bytes
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Parse a DocumentId from a string representation
    ///
    /// Accepts standard UUID format (with or without hyphens).
    /// Returns None if the string is not a valid UUID.
    pub fn from_string(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }

    /// Get the raw bytes of this DocumentId
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An identifier value as stored under the primary-key field
///
/// The store accepts either caller-assigned integers or canonical
/// [`DocumentId`]s as primary keys. The JSON rendering is a bare number or
/// the hyphenated UUID string respectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdValue {
    /// Caller-assigned integer id
    Int(i64),
    /// Canonical opaque id
    Oid(DocumentId),
}

impl IdValue {
    /// Render this id as the JSON value stored under the primary-key field
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            IdValue::Int(n) => serde_json::Value::from(*n),
            IdValue::Oid(id) => serde_json::Value::String(id.to_string()),
        }
    }

    /// Read an id back from a stored JSON value
    ///
    /// Returns None if the value is neither an integer nor a canonical id
    /// string.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_i64().map(IdValue::Int),
            serde_json::Value::String(s) => DocumentId::from_string(s).map(IdValue::Oid),
            _ => None,
        }
    }
}

impl fmt::Display for IdValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdValue::Int(n) => write!(f, "{}", n),
            IdValue::Oid(id) => write!(f, "{}", id),
        }
    }
}

impl From<i64> for IdValue {
    fn from(n: i64) -> Self {
        IdValue::Int(n)
    }
}

impl From<DocumentId> for IdValue {
    fn from(id: DocumentId) -> Self {
        IdValue::Oid(id)
    }
}
