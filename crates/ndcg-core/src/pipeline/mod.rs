//! Collaborator boundary around the evaluation engine.
//!
//! The engine only scores rankings it is given. This module supplies the
//! pieces that produce those rankings and their judgments:
//!
//! - [`template`] - query templates with `{{QUERY}}` / `{{INDEX_NAME}}` substitution
//! - [`store`] - judgment stores selected by a filter document
//! - [`backend`] - execution of rendered queries (recorded responses only)
//! - [`runner`] - ties the three together and feeds the batch aggregator

pub mod backend;
pub mod runner;
pub mod store;
pub mod template;

pub use backend::{result_ids, RecordedBackend, Recording, SearchBackend};
pub use runner::{run_evaluation, EvaluationRun, EvaluationRunner, RunProgress};
pub use store::{matches_filter, InMemoryJudgmentStore, JsonJudgmentStore, JudgmentRecord, JudgmentStore};
pub use template::{QueryTemplate, RenderedQuery};
