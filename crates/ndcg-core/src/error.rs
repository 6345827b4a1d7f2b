//! Error types for ndcg-core.
//!
//! This module defines the errors raised by the evaluation engine and by the
//! collaborator boundary (templates, judgment stores, result backends).

use thiserror::Error;

/// Errors that can occur while scoring a ranking.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// Scoring method name not recognized
    #[error("Invalid scoring method: {0} (expected binary, inverse_rank, decay or score)")]
    InvalidMethod(String),
    /// Ground-truth entry has the wrong shape for the scoring method
    #[error("Malformed ground truth entry {index} ({entry}): {reason}")]
    MalformedGroundTruth {
        /// Zero-based position of the offending entry
        index: usize,
        /// Compact rendering of the offending entry
        entry: String,
        /// What is wrong with it
        reason: String,
    },
    /// Method needs a best-first ordering but the ground truth is an unordered set
    #[error("Scoring method {0} requires an ordered ideal ranking")]
    UnorderedGroundTruth(String),
}

/// Errors that can occur while loading or rendering a query template.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Template file missing
    #[error("Template file not found: {0}")]
    NotFound(String),
    /// Failed to read template file
    #[error("Failed to read template: {0}")]
    Io(#[from] std::io::Error),
    /// Template is not valid JSON
    #[error("Template is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// JSON has neither a stage array nor a `pipeline` key
    #[error("Invalid template format: {0}")]
    InvalidFormat(String),
}

/// Errors that can occur while retrieving judgments.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store location does not exist
    #[error("Store not found: {0}")]
    NotFound(String),
    /// I/O error reading a collection
    #[error("I/O error: {0}")]
    IoError(String),
    /// Collection content could not be decoded
    #[error("Serialization error: {0}")]
    SerializationError(String),
    /// Filter is not an object or uses an unsupported operator
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
}

/// Errors that can occur while executing a rendered query.
#[derive(Debug, Error)]
pub enum BackendError {
    /// I/O error reading recorded results
    #[error("I/O error: {0}")]
    IoError(String),
    /// Recorded results could not be decoded
    #[error("Serialization error: {0}")]
    SerializationError(String),
    /// No recorded response for this query
    #[error("No recorded results for query: {0}")]
    NoResults(String),
}
