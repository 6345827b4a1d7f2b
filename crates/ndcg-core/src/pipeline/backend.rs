//! Search backends.
//!
//! A [`SearchBackend`] executes a rendered query and returns result ids in
//! ranked order. Retrieval itself lives outside this crate; the provided
//! [`RecordedBackend`] replays responses captured from a real engine.

use super::template::RenderedQuery;
use crate::error::BackendError;
use crate::evaluation::DocId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::info;

/// Executes rendered queries.
pub trait SearchBackend {
    /// Returns result ids, best first.
    fn execute(&self, query: &RenderedQuery) -> Result<Vec<DocId>, BackendError>;
}

impl<F> SearchBackend for F
where
    F: Fn(&RenderedQuery) -> Result<Vec<DocId>, BackendError>,
{
    fn execute(&self, query: &RenderedQuery) -> Result<Vec<DocId>, BackendError> {
        self(query)
    }
}

/// Extracts ids from engine results.
///
/// Each result is a document carrying `_id` or a bare id. Results without a
/// usable id (missing, null or empty) are dropped.
pub fn result_ids(results: &[Value]) -> Vec<DocId> {
    results
        .iter()
        .filter_map(|doc| match doc {
            Value::Object(map) => map.get("_id").and_then(DocId::from_value),
            other => DocId::from_value(other),
        })
        .filter(|id| !id.as_str().is_empty())
        .collect()
}

/// One captured engine response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    /// Rendered stages the response was captured for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<Vec<Value>>,
    /// Query value the response was captured for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<Value>,
    /// Index the response was captured for (any index when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    /// Raw engine results, best first
    pub results: Vec<Value>,
}

impl Recording {
    fn matches_pipeline(&self, query: &RenderedQuery) -> bool {
        self.pipeline.as_deref() == Some(query.stages.as_slice())
    }

    fn matches_query(&self, query: &RenderedQuery) -> bool {
        self.query.as_ref() == Some(&query.query)
            && self
                .index
                .as_deref()
                .map_or(true, |index| index == query.index_name)
    }
}

/// Replays recorded engine responses.
///
/// A rendered query is answered by the first recording captured for exactly
/// the same stages, falling back to the first recording for the same query
/// value and index.
#[derive(Debug, Clone, Default)]
pub struct RecordedBackend {
    recordings: Vec<Recording>,
}

impl RecordedBackend {
    pub fn new(recordings: Vec<Recording>) -> Self {
        Self { recordings }
    }

    /// Loads recordings from a JSON array file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BackendError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| BackendError::IoError(format!("{}: {}", path.display(), e)))?;
        let recordings: Vec<Recording> = serde_json::from_str(&text)
            .map_err(|e| BackendError::SerializationError(format!("{}: {}", path.display(), e)))?;
        info!(
            "Loaded {} recorded responses from {}",
            recordings.len(),
            path.display()
        );
        Ok(Self::new(recordings))
    }

    pub fn len(&self) -> usize {
        self.recordings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recordings.is_empty()
    }
}

impl SearchBackend for RecordedBackend {
    fn execute(&self, query: &RenderedQuery) -> Result<Vec<DocId>, BackendError> {
        self.recordings
            .iter()
            .find(|r| r.matches_pipeline(query))
            .or_else(|| self.recordings.iter().find(|r| r.matches_query(query)))
            .map(|r| result_ids(&r.results))
            .ok_or_else(|| BackendError::NoResults(query.query.to_string()))
    }
}
