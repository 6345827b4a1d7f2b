//! Core data types: document identifiers, scoring methods and ground truth.

use crate::error::EvalError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Canonical document identifier.
///
/// Producers hand out ids in several shapes for the same logical document:
/// plain strings, integers, or extended-JSON wrappers such as
/// `{"$oid": "..."}`. Every shape is reduced to one string form on the way
/// in, so map lookups never depend on which producer supplied the id.
///
/// # Examples
///
/// ```
/// use ndcg_core::DocId;
/// use serde_json::json;
///
/// let a = DocId::from_value(&json!({"$oid": "64b7f0c2"})).unwrap();
/// let b = DocId::from("64b7f0c2");
/// assert_eq!(a, b);
/// assert_eq!(DocId::from_value(&json!(42)), Some(DocId::from(42u64)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DocId(String);

impl DocId {
    /// Creates an id from an already-canonical string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Canonicalizes a JSON value into an id.
    ///
    /// Returns `None` for values that cannot name a document: `null`,
    /// booleans, arrays, and objects other than `$oid` / `$numberLong`
    /// wrappers.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self(s.clone())),
            Value::Number(n) => Some(Self(canonical_number(n))),
            Value::Object(map) => ["$oid", "$numberLong", "$numberInt"]
                .iter()
                .find_map(|key| map.get(*key))
                .and_then(|inner| match inner {
                    Value::String(s) => Some(Self(s.clone())),
                    Value::Number(n) => Some(Self(canonical_number(n))),
                    _ => None,
                }),
            Value::Null | Value::Bool(_) | Value::Array(_) => None,
        }
    }

    /// Returns the canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Integral floats render like integers so `5` and `5.0` name the same document.
fn canonical_number(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.007_199_254_740_992e15 => {
            (f as i64).to_string()
        }
        _ => n.to_string(),
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for DocId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<u64> for DocId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl From<i64> for DocId {
    fn from(n: i64) -> Self {
        Self(n.to_string())
    }
}

impl<'de> Deserialize<'de> for DocId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        DocId::from_value(&value).ok_or_else(|| {
            serde::de::Error::custom(format!("not a document id: {}", value))
        })
    }
}

/// Policy for turning ground truth into relevance scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMethod {
    /// Relevant documents score 1, everything else 0
    Binary,
    /// The document at ideal position i scores 1/i
    InverseRank,
    /// The document at 0-indexed ideal position i scores 2^(base - i)
    Decay,
    /// Scores are supplied explicitly with the ground truth
    #[serde(rename = "score", alias = "explicit_score")]
    ExplicitScore,
}

impl ScoringMethod {
    /// Every method, in CLI listing order.
    pub const ALL: [ScoringMethod; 4] = [
        ScoringMethod::Binary,
        ScoringMethod::InverseRank,
        ScoringMethod::Decay,
        ScoringMethod::ExplicitScore,
    ];

    /// Returns the wire name used on the command line and in JSON.
    pub fn name(&self) -> &'static str {
        match self {
            ScoringMethod::Binary => "binary",
            ScoringMethod::InverseRank => "inverse_rank",
            ScoringMethod::Decay => "decay",
            ScoringMethod::ExplicitScore => "score",
        }
    }

    /// Returns true if relevance depends on position in a best-first ranking.
    pub fn is_rank_based(&self) -> bool {
        matches!(self, ScoringMethod::InverseRank | ScoringMethod::Decay)
    }
}

impl fmt::Display for ScoringMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScoringMethod {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "binary" => Ok(ScoringMethod::Binary),
            "inverse_rank" => Ok(ScoringMethod::InverseRank),
            "decay" => Ok(ScoringMethod::Decay),
            "score" | "explicit_score" => Ok(ScoringMethod::ExplicitScore),
            other => Err(EvalError::InvalidMethod(other.to_string())),
        }
    }
}

/// Ground-truth relevance judgment for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "entries", rename_all = "snake_case")]
pub enum GroundTruth {
    /// Unordered set of relevant documents
    RelevantSet(BTreeSet<DocId>),
    /// Documents in ideal order, most relevant first
    IdealRanking(Vec<DocId>),
    /// Documents paired with explicit relevance scores
    ScoredRanking(Vec<(DocId, f64)>),
}

/// Object keys that may carry the document id of a judgment entry.
const ID_FIELDS: [&str; 3] = ["doc_id", "_id", "id"];

impl GroundTruth {
    /// Builds a relevant set from any id-like values.
    pub fn relevant_set<I, D>(ids: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<DocId>,
    {
        GroundTruth::RelevantSet(ids.into_iter().map(Into::into).collect())
    }

    /// Builds an ideal ranking from any id-like values, best first.
    pub fn ideal_ranking<I, D>(ids: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<DocId>,
    {
        GroundTruth::IdealRanking(ids.into_iter().map(Into::into).collect())
    }

    /// Builds a scored ranking from (id, score) pairs.
    pub fn scored<I, D>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (D, f64)>,
        D: Into<DocId>,
    {
        GroundTruth::ScoredRanking(pairs.into_iter().map(|(id, s)| (id.into(), s)).collect())
    }

    /// Parses raw judgment entries as stored alongside a query.
    ///
    /// For [`ScoringMethod::ExplicitScore`] every entry must be a
    /// `[doc_id, score]` pair or an object with an id field and a `score`.
    /// For the other methods entries are document ids (or documents with an
    /// id field) in best-first order.
    ///
    /// # Errors
    ///
    /// [`EvalError::MalformedGroundTruth`] naming the first entry with the
    /// wrong shape. Nothing is coerced.
    pub fn from_entries(entries: &[Value], method: ScoringMethod) -> Result<Self, EvalError> {
        match method {
            ScoringMethod::ExplicitScore => entries
                .iter()
                .enumerate()
                .map(|(index, entry)| parse_scored_entry(index, entry))
                .collect::<Result<Vec<_>, _>>()
                .map(GroundTruth::ScoredRanking),
            _ => entries
                .iter()
                .enumerate()
                .map(|(index, entry)| {
                    entry_id(entry)
                        .ok_or_else(|| malformed(index, entry, "expected a document id"))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(GroundTruth::IdealRanking),
        }
    }

    /// Number of judged entries.
    pub fn len(&self) -> usize {
        match self {
            GroundTruth::RelevantSet(set) => set.len(),
            GroundTruth::IdealRanking(ids) => ids.len(),
            GroundTruth::ScoredRanking(pairs) => pairs.len(),
        }
    }

    /// Returns true if nothing was judged.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Judged ids in their stored order.
    pub fn ids(&self) -> Vec<&DocId> {
        match self {
            GroundTruth::RelevantSet(set) => set.iter().collect(),
            GroundTruth::IdealRanking(ids) => ids.iter().collect(),
            GroundTruth::ScoredRanking(pairs) => pairs.iter().map(|(id, _)| id).collect(),
        }
    }
}

fn entry_id(entry: &Value) -> Option<DocId> {
    if let Value::Object(map) = entry {
        if let Some(inner) = ID_FIELDS.iter().find_map(|key| map.get(*key)) {
            return DocId::from_value(inner);
        }
    }
    DocId::from_value(entry)
}

fn parse_scored_entry(index: usize, entry: &Value) -> Result<(DocId, f64), EvalError> {
    let (id_value, score_value) = match entry {
        Value::Array(pair) if pair.len() == 2 => (&pair[0], &pair[1]),
        Value::Object(map) => {
            let id = ID_FIELDS
                .iter()
                .find_map(|key| map.get(*key))
                .ok_or_else(|| malformed(index, entry, "object has no doc_id field"))?;
            let score = map
                .get("score")
                .ok_or_else(|| malformed(index, entry, "object has no score field"))?;
            (id, score)
        }
        _ => return Err(malformed(index, entry, "expected a (doc_id, score) pair")),
    };

    let id = DocId::from_value(id_value)
        .ok_or_else(|| malformed(index, entry, "first element is not a document id"))?;
    let score = match score_value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| malformed(index, entry, "score is not a number"))?;

    if !score.is_finite() || score < 0.0 {
        return Err(malformed(
            index,
            entry,
            "score must be a finite, non-negative number",
        ));
    }
    Ok((id, score))
}

fn malformed(index: usize, entry: &Value, reason: &str) -> EvalError {
    EvalError::MalformedGroundTruth {
        index,
        entry: entry.to_string(),
        reason: reason.to_string(),
    }
}
