//! End-to-end evaluation of a query template.
//!
//! ```text
//! JudgmentStore ──fetch──▶ records ──render──▶ SearchBackend ──▶ ranked ids
//!                              │                                      │
//!                              └──────── ground truth ────────────────┴──▶ BatchAggregator
//! ```

use super::backend::SearchBackend;
use super::store::{JudgmentRecord, JudgmentStore};
use super::template::QueryTemplate;
use crate::error::StoreError;
use crate::evaluation::{
    BatchAggregator, BatchResult, DocId, EvalOptions, GroundTruth, NoopTrace, TraceSink,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Progress through the queries of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunProgress {
    /// Queries executed so far, including failed ones
    pub completed: usize,
    pub total: usize,
}

impl RunProgress {
    /// Returns the completion percentage (0.0 to 100.0).
    pub fn percent_complete(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.completed as f64 / self.total as f64) * 100.0
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EvaluationRun {
    /// Batch scores; `failures` also lists judgments that could not be parsed
    pub result: BatchResult,
    /// Ranked ids per evaluated query
    pub ranked: BTreeMap<String, Vec<DocId>>,
    /// Ground truth per evaluated query
    pub truths: BTreeMap<String, GroundTruth>,
    /// Queries whose execution failed, with the reason
    pub execution_failures: BTreeMap<String, String>,
}

/// Runs a query template against every selected judgment.
pub struct EvaluationRunner<'a> {
    template: &'a QueryTemplate,
    store: &'a dyn JudgmentStore,
    backend: &'a dyn SearchBackend,
    index_name: String,
    options: EvalOptions,
}

impl<'a> EvaluationRunner<'a> {
    pub fn new(
        template: &'a QueryTemplate,
        store: &'a dyn JudgmentStore,
        backend: &'a dyn SearchBackend,
        index_name: impl Into<String>,
        options: EvalOptions,
    ) -> Self {
        Self {
            template,
            store,
            backend,
            index_name: index_name.into(),
            options,
        }
    }

    /// Runs without tracing or progress reporting.
    pub fn run(&self, filter: &Value) -> Result<EvaluationRun, StoreError> {
        self.run_with(filter, &mut NoopTrace, |_| {})
    }

    /// Runs the evaluation.
    ///
    /// A query whose execution fails is logged and skipped. A query whose
    /// judgment entries do not fit the scoring method is reported in
    /// `result.failures`. Neither aborts the run.
    ///
    /// # Errors
    ///
    /// Only when the judgment store cannot be read or the filter is invalid.
    pub fn run_with(
        &self,
        filter: &Value,
        sink: &mut dyn TraceSink,
        mut on_progress: impl FnMut(RunProgress),
    ) -> Result<EvaluationRun, StoreError> {
        let records = self.store.fetch(filter)?;
        let total = records.len();
        info!(
            "Evaluating {} queries with {} scoring at k={}",
            total, self.options.method, self.options.k
        );

        let mut run = EvaluationRun::default();
        let mut parse_failures = BTreeMap::new();

        for (i, (query_id, record)) in records.iter().enumerate() {
            let rendered = self.template.render(&record.query, &self.index_name);
            match self.backend.execute(&rendered) {
                Ok(ids) => match self.ground_truth(record) {
                    Ok(truth) => {
                        run.ranked.insert(query_id.clone(), ids);
                        run.truths.insert(query_id.clone(), truth);
                    }
                    Err(e) => {
                        warn!("Query {} has unusable judgments: {}", query_id, e);
                        parse_failures.insert(query_id.clone(), e.to_string());
                    }
                },
                Err(e) => {
                    warn!("Failed to execute pipeline for query {}: {}", query_id, e);
                    run.execution_failures
                        .insert(query_id.clone(), e.to_string());
                }
            }
            on_progress(RunProgress {
                completed: i + 1,
                total,
            });
        }

        let aggregator = BatchAggregator::new(self.options);
        run.result = aggregator.evaluate_batch_traced(&run.ranked, &run.truths, sink);
        run.result.failures.extend(parse_failures);
        Ok(run)
    }

    fn ground_truth(&self, record: &JudgmentRecord) -> Result<GroundTruth, crate::EvalError> {
        GroundTruth::from_entries(&record.ideal_ranking, self.options.method)
    }
}

/// Runs a template over every judgment matching `filter`.
pub fn run_evaluation(
    template: &QueryTemplate,
    store: &dyn JudgmentStore,
    backend: &dyn SearchBackend,
    index_name: &str,
    options: EvalOptions,
    filter: &Value,
) -> Result<EvaluationRun, StoreError> {
    EvaluationRunner::new(template, store, backend, index_name, options).run(filter)
}
