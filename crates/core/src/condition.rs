//! Query conditions and identifier normalization
//!
//! A [`Condition`] is a normalized predicate over document fields. It always
//! carries the id-matching form explicitly (`{_id: value}` or
//! `{_id: {$in: [values]}}`) so that every layer can reason about id-based
//! lookups without inspecting raw field maps.
//!
//! [`IdInput`] is the heterogeneous identifier argument accepted by by-id
//! operations: a scalar integer, a canonical id, a string, a list of any of
//! those, or an already-built condition. [`id_condition`] normalizes it.
//!
//! List normalization is deliberately lenient: non-conforming elements are
//! silently dropped rather than reported as a size mismatch. A scalar string
//! that does not parse is an error for the calling operation. This asymmetry
//! mirrors the observed behavior of consumers of batch id lookups.

use crate::error::{Error, Result};
use crate::types::{Document, DocumentId, IdValue, STORE_ID_FIELD};
use serde_json::Value;

/// Id-matching form of a condition
#[derive(Debug, Clone, PartialEq)]
pub enum IdMatch {
    /// Match the single document with this id
    Eq(IdValue),
    /// Match every document whose id is in this set
    In(Vec<IdValue>),
}

/// A normalized query predicate over document fields
///
/// Immutable once constructed. The id component, when present, is kept
/// separate from ordinary field equality filters; by-id lookups take
/// absolute precedence over other filters on the same call (see
/// [`Condition::without_fields`]).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Condition {
    id: Option<IdMatch>,
    fields: Document,
}

impl Condition {
    /// An empty condition matching every document
    pub fn new() -> Self {
        Self::default()
    }

    /// Condition matching the single document with the given id
    pub fn id(value: impl Into<IdValue>) -> Self {
        Condition {
            id: Some(IdMatch::Eq(value.into())),
            fields: Document::new(),
        }
    }

    /// Condition matching every document whose id is in the given set
    pub fn id_in(values: Vec<IdValue>) -> Self {
        Condition {
            id: Some(IdMatch::In(values)),
            fields: Document::new(),
        }
    }

    /// Add a field equality filter (builder style)
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Build a condition from a raw field map
    ///
    /// A `_id` entry is pulled out into the explicit id component. Accepted
    /// id shapes: integer, canonical id string, or an array of those (with
    /// the lenient element handling of [`id_condition`]). Any other `_id`
    /// shape is an [`Error::InvalidId`].
    pub fn from_fields(mut fields: Document) -> Result<Self> {
        let id = match fields.remove(STORE_ID_FIELD) {
            None => None,
            Some(value) => Some(id_match_from_json(&value)?),
        };
        Ok(Condition { id, fields })
    }

    /// The id component, if this condition is id-based
    pub fn id_match(&self) -> Option<&IdMatch> {
        self.id.as_ref()
    }

    /// Ordinary field equality filters
    pub fn fields(&self) -> &Document {
        &self.fields
    }

    /// Whether this condition matches every document
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.fields.is_empty()
    }

    /// Strip ordinary field filters, keeping only the id component
    ///
    /// Used by read operations: an id sub-condition fully replaces any other
    /// filters passed alongside it.
    pub fn without_fields(&self) -> Condition {
        Condition {
            id: self.id.clone(),
            fields: Document::new(),
        }
    }

    /// Render the canonical JSON query form of this condition
    ///
    /// The id component renders as `{"_id": value}` or
    /// `{"_id": {"$in": [values]}}`. Key order is deterministic, which the
    /// cache fingerprint relies on.
    pub fn to_query(&self) -> Value {
        let mut query = self.fields.clone();
        match &self.id {
            None => {}
            Some(IdMatch::Eq(value)) => {
                query.insert(STORE_ID_FIELD.to_string(), value.to_json());
            }
            Some(IdMatch::In(values)) => {
                let set: Vec<Value> = values.iter().map(IdValue::to_json).collect();
                let mut membership = Document::new();
                membership.insert("$in".to_string(), Value::Array(set));
                query.insert(STORE_ID_FIELD.to_string(), Value::Object(membership));
            }
        }
        Value::Object(query)
    }
}

fn id_match_from_json(value: &Value) -> Result<IdMatch> {
    match value {
        Value::Array(items) => Ok(IdMatch::In(lenient_id_values(items))),
        Value::Object(map) => match map.get("$in") {
            Some(Value::Array(items)) => Ok(IdMatch::In(lenient_id_values(items))),
            _ => Err(Error::InvalidId(value.to_string())),
        },
        scalar => scalar_id_value(scalar)
            .map(IdMatch::Eq)
            .ok_or_else(|| Error::InvalidId(scalar.to_string())),
    }
}

fn scalar_id_value(value: &Value) -> Option<IdValue> {
    match value {
        Value::Number(n) => n.as_i64().map(IdValue::Int),
        Value::String(s) => DocumentId::from_string(s).map(IdValue::Oid),
        _ => None,
    }
}

// Non-conforming elements are dropped, not reported.
fn lenient_id_values(items: &[Value]) -> Vec<IdValue> {
    items.iter().filter_map(scalar_id_value).collect()
}

/// The heterogeneous identifier argument accepted by by-id operations
#[derive(Debug, Clone, PartialEq)]
pub enum IdInput {
    /// Caller-assigned integer id
    Int(i64),
    /// Canonical opaque id
    Oid(DocumentId),
    /// String form of a canonical id
    Str(String),
    /// List of identifiers, normalized element-wise
    List(Vec<IdInput>),
    /// An already-built condition, passed through unchanged
    Condition(Condition),
}

impl From<i64> for IdInput {
    fn from(n: i64) -> Self {
        IdInput::Int(n)
    }
}

impl From<DocumentId> for IdInput {
    fn from(id: DocumentId) -> Self {
        IdInput::Oid(id)
    }
}

impl From<IdValue> for IdInput {
    fn from(value: IdValue) -> Self {
        match value {
            IdValue::Int(n) => IdInput::Int(n),
            IdValue::Oid(id) => IdInput::Oid(id),
        }
    }
}

impl From<&str> for IdInput {
    fn from(s: &str) -> Self {
        IdInput::Str(s.to_string())
    }
}

impl From<String> for IdInput {
    fn from(s: String) -> Self {
        IdInput::Str(s)
    }
}

impl From<Vec<IdInput>> for IdInput {
    fn from(items: Vec<IdInput>) -> Self {
        IdInput::List(items)
    }
}

impl From<Condition> for IdInput {
    fn from(condition: Condition) -> Self {
        IdInput::Condition(condition)
    }
}

/// Normalize an identifier argument into a store-native condition
///
/// - Integer or canonical id: `{_id: value}` unchanged.
/// - String: parsed into the canonical id type; a string that does not
///   parse is an [`Error::InvalidId`] surfaced by the calling operation.
/// - List: each element normalized per the scalar rules, producing
///   `{_id: {$in: [values]}}`; non-conforming elements (unparseable
///   strings, nested lists, conditions) are silently dropped.
/// - Condition: returned unchanged (pass-through).
pub fn id_condition(input: &IdInput) -> Result<Condition> {
    match input {
        IdInput::Int(n) => Ok(Condition::id(*n)),
        IdInput::Oid(id) => Ok(Condition::id(*id)),
        IdInput::Str(s) => DocumentId::from_string(s)
            .map(Condition::id)
            .ok_or_else(|| Error::InvalidId(s.clone())),
        IdInput::List(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    IdInput::Int(n) => values.push(IdValue::Int(*n)),
                    IdInput::Oid(id) => values.push(IdValue::Oid(*id)),
                    IdInput::Str(s) => {
                        if let Some(id) = DocumentId::from_string(s) {
                            values.push(IdValue::Oid(id));
                        }
                    }
                    // Nested lists and conditions are dropped like any other
                    // non-conforming element.
                    IdInput::List(_) | IdInput::Condition(_) => {}
                }
            }
            Ok(Condition::id_in(values))
        }
        IdInput::Condition(condition) => Ok(condition.clone()),
    }
}
