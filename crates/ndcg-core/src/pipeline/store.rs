//! Judgment stores.
//!
//! A judgment store hands out `(query_id, query, ideal_ranking)` records
//! selected by a caller-supplied filter document. [`JsonJudgmentStore`] keeps
//! each collection as a JSON array of documents on disk.
//!
//! # Filter Language
//!
//! | Form | Matches when |
//! |------|--------------|
//! | `{"field": value}` | field equals value, or is an array containing it |
//! | `{"field": {"$eq": value}}` | same as above |
//! | `{"field": {"$ne": value}}` | the equality above does not hold |
//! | `{"field": {"$in": [v1, v2]}}` | field equals any listed value |
//! | `{"field": {"$exists": bool}}` | field presence matches the flag |
//!
//! Dotted field names (`meta.kind`) descend into nested objects. All
//! conditions of a filter must hold.

use crate::error::StoreError;
use crate::evaluation::DocId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One stored judgment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgmentRecord {
    pub query_id: String,
    /// Query text or any other query value (e.g. an embedding)
    pub query: Value,
    /// Raw judgment entries, best first
    #[serde(default)]
    pub ideal_ranking: Vec<Value>,
}

impl JudgmentRecord {
    /// Extracts a record from a stored document.
    ///
    /// Returns `None` when the document has no usable `query_id` or `query`.
    pub fn from_document(doc: &Value) -> Option<Self> {
        let query_id = doc
            .get("query_id")
            .and_then(DocId::from_value)
            .map(|id| id.to_string())
            .filter(|id| !id.is_empty())?;
        let query = doc.get("query").filter(|q| !is_blank(q))?.clone();
        let ideal_ranking = match doc.get("ideal_ranking") {
            Some(Value::Array(entries)) => entries.clone(),
            _ => Vec::new(),
        };
        Some(Self {
            query_id,
            query,
            ideal_ranking,
        })
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Source of ground-truth judgments.
pub trait JudgmentStore {
    /// Returns the records matching `filter`, keyed by query id.
    ///
    /// When several documents share a query id the last one wins.
    fn fetch(&self, filter: &Value) -> Result<BTreeMap<String, JudgmentRecord>, StoreError>;
}

/// Directory-backed store: `<root>/<database>/<collection>.json`.
#[derive(Debug, Clone)]
pub struct JsonJudgmentStore {
    path: PathBuf,
}

impl JsonJudgmentStore {
    pub fn new(root: impl AsRef<Path>, database: &str, collection: &str) -> Self {
        Self {
            path: root
                .as_ref()
                .join(database)
                .join(format!("{collection}.json")),
        }
    }

    /// File backing the collection.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_documents(&self) -> Result<Vec<Value>, StoreError> {
        if !self.path.exists() {
            return Err(StoreError::NotFound(self.path.display().to_string()));
        }
        let text = std::fs::read_to_string(&self.path)
            .map_err(|e| StoreError::IoError(format!("{}: {}", self.path.display(), e)))?;
        serde_json::from_str(&text)
            .map_err(|e| StoreError::SerializationError(format!("{}: {}", self.path.display(), e)))
    }
}

impl JudgmentStore for JsonJudgmentStore {
    fn fetch(&self, filter: &Value) -> Result<BTreeMap<String, JudgmentRecord>, StoreError> {
        let documents = self.load_documents()?;
        let records = select(&documents, filter)?;
        info!(
            "Retrieved {} queries from {}",
            records.len(),
            self.path.display()
        );
        Ok(records)
    }
}

/// Store over documents held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryJudgmentStore {
    documents: Vec<Value>,
}

impl InMemoryJudgmentStore {
    pub fn new(documents: Vec<Value>) -> Self {
        Self { documents }
    }

    pub fn insert(&mut self, document: Value) {
        self.documents.push(document);
    }
}

impl JudgmentStore for InMemoryJudgmentStore {
    fn fetch(&self, filter: &Value) -> Result<BTreeMap<String, JudgmentRecord>, StoreError> {
        select(&self.documents, filter)
    }
}

fn select(documents: &[Value], filter: &Value) -> Result<BTreeMap<String, JudgmentRecord>, StoreError> {
    let mut records = BTreeMap::new();
    for doc in documents {
        if !matches_filter(doc, filter)? {
            continue;
        }
        match JudgmentRecord::from_document(doc) {
            Some(record) => {
                records.insert(record.query_id.clone(), record);
            }
            None => debug!("Skipping judgment without query_id or query"),
        }
    }
    Ok(records)
}

/// Returns true if `doc` satisfies every condition of `filter`.
///
/// # Errors
///
/// [`StoreError::InvalidFilter`] if the filter is not an object or uses an
/// unsupported operator.
pub fn matches_filter(doc: &Value, filter: &Value) -> Result<bool, StoreError> {
    let conditions = filter
        .as_object()
        .ok_or_else(|| StoreError::InvalidFilter(format!("expected an object, found {filter}")))?;

    for (field, condition) in conditions {
        if field.starts_with('$') {
            return Err(StoreError::InvalidFilter(format!(
                "unsupported top-level operator {field}"
            )));
        }
        if !matches_condition(lookup(doc, field), condition)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |current, key| current.get(key))
}

fn matches_condition(field: Option<&Value>, condition: &Value) -> Result<bool, StoreError> {
    let operators = match condition {
        Value::Object(map) if is_operator_object(map) => map,
        _ => return Ok(equals(field, condition)),
    };

    for (op, operand) in operators {
        let ok = match op.as_str() {
            "$eq" => equals(field, operand),
            "$ne" => !equals(field, operand),
            "$in" => match operand {
                Value::Array(options) => options.iter().any(|v| equals(field, v)),
                _ => {
                    return Err(StoreError::InvalidFilter(
                        "$in needs an array".to_string(),
                    ))
                }
            },
            "$exists" => match operand {
                Value::Bool(flag) => field.is_some() == *flag,
                _ => {
                    return Err(StoreError::InvalidFilter(
                        "$exists needs a boolean".to_string(),
                    ))
                }
            },
            other => {
                return Err(StoreError::InvalidFilter(format!(
                    "unsupported operator {other}"
                )))
            }
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn is_operator_object(map: &Map<String, Value>) -> bool {
    !map.is_empty() && map.keys().all(|k| k.starts_with('$'))
}

/// Equality with array membership: `{"tags": "a"}` matches `tags: ["a", "b"]`.
fn equals(field: Option<&Value>, expected: &Value) -> bool {
    match field {
        None => expected.is_null(),
        Some(actual) if actual == expected => true,
        Some(Value::Array(items)) => items.iter().any(|item| item == expected),
        Some(_) => false,
    }
}
