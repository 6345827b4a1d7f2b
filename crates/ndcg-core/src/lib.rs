//! # NDCG Core
//!
//! Platform-independent library for scoring the quality of a ranked result
//! list against ground-truth relevance judgments.
//!
//! This crate provides the relevance scoring and DCG/IDCG algorithms used by
//! the `ndcg-eval` command-line tool, designed to be reusable from any
//! harness that can materialize ranked lists and judgments.
//!
//! ## Modules
//!
//! - [`evaluation`] - Relevance scoring, DCG/IDCG, NDCG and batch aggregation
//! - [`pipeline`] - Query templates, judgment stores and result backends
//! - [`config`] - Production configuration constants and policy choices
//! - [`error`] - Error types for evaluation and the collaborator boundary

pub mod config;
pub mod error;
pub mod evaluation;
pub mod pipeline;

pub use error::{BackendError, EvalError, StoreError, TemplateError};
pub use evaluation::{
    BatchAggregator, BatchResult, DocId, EvalOptions, GroundTruth, NdcgEvaluator, RelevanceMap,
    ScoringMethod,
};
