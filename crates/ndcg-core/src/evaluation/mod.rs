//! Ranking-quality evaluation with the NDCG family of metrics.
//!
//! This module scores a ranked list of document ids against ground-truth
//! relevance judgments. It never retrieves or ranks documents itself.
//!
//! # Pipeline
//!
//! ```text
//! GroundTruth ──score──▶ RelevanceMap ──┬──▶ DCG@k ──┐
//!                                        └──▶ IDCG@k ─┴──▶ NDCG@k ──▶ BatchResult
//! ```
//!
//! # Scoring Methods
//!
//! | Method | Ground truth | Relevance |
//! |--------|--------------|-----------|
//! | `binary` | set or ranking | 1 for judged documents (first k of a ranking) |
//! | `inverse_rank` | ranking | 1/i at ideal position i |
//! | `decay` | ranking | 2^(base - i) at 0-indexed position i, base = max(1, log₂N + 1) |
//! | `score` | (id, score) pairs | the explicit score |
//!
//! # Example
//!
//! ```
//! use ndcg_core::evaluation::{evaluate, DocId, GroundTruth, ScoringMethod};
//!
//! let ranked: Vec<DocId> = ["y", "x", "z"].into_iter().map(DocId::from).collect();
//! let truth = GroundTruth::ideal_ranking(["x", "y", "z"]);
//!
//! let ndcg = evaluate(&ranked, &truth, 3, ScoringMethod::InverseRank).unwrap();
//! assert!((ndcg - 0.876).abs() < 1e-3);
//! ```
//!
//! # Tracing
//!
//! Every computation can narrate its steps to a [`TraceSink`]; see [`trace`].

pub mod batch;
pub mod clicks;
pub mod gain;
pub mod ndcg;
pub mod relevance;
pub mod trace;
pub mod types;

pub use batch::{evaluate_batch, BatchAccumulator, BatchAggregator, BatchResult, ScoreBand};
pub use clicks::{ndcg_with_clicks, ClickStats};
pub use gain::{dcg, dcg_at_k, discount, idcg, idcg_at_k, ndcg_of_grades};
pub use ndcg::{evaluate, normalize, EvalOptions, NdcgEvaluator, QueryScore};
pub use relevance::{
    decay_base, decay_relevance, score, BinaryPolicy, DecayPolicy, ExplicitScorePolicy,
    InverseRankPolicy, RelevanceMap, RelevanceScorer, ScoringPolicy,
};
pub use trace::{GainStep, LogTrace, NoopTrace, RecordingTrace, TraceEvent, TraceSink};
pub use types::{DocId, GroundTruth, ScoringMethod};
