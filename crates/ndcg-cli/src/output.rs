//! Output formatting for evaluation reports.
//!
//! Supports both human-readable terminal output and JSON for scripting.

use anyhow::{Context, Result};
use ndcg_core::evaluation::{score, DocId, GroundTruth, ScoreBand};
use ndcg_core::pipeline::EvaluationRun;
use ndcg_core::ScoringMethod;
use serde::Serialize;
use std::collections::BTreeMap;

/// Width of the document id columns in the side-by-side table
const ID_COLUMN_WIDTH: usize = 28;

/// JSON output structure for an evaluation run
#[derive(Serialize)]
pub struct JsonReport<'a> {
    pub k: usize,
    pub scoring: ScoringMethod,
    pub average_ndcg: f64,
    pub evaluated: usize,
    pub assessment: ScoreBand,
    pub band_counts: BTreeMap<ScoreBand, usize>,
    pub scores: &'a BTreeMap<String, f64>,
    /// Queries whose judgments did not fit the scoring method
    pub failures: &'a BTreeMap<String, String>,
    /// Queries whose search could not be executed
    pub execution_failures: &'a BTreeMap<String, String>,
}

impl<'a> JsonReport<'a> {
    pub fn new(run: &'a EvaluationRun, k: usize, scoring: ScoringMethod) -> Self {
        Self {
            k,
            scoring,
            average_ndcg: run.result.average,
            evaluated: run.result.evaluated,
            assessment: run.result.average_band(),
            band_counts: run.result.band_counts().into_iter().collect(),
            scores: &run.result.scores,
            failures: &run.result.failures,
            execution_failures: &run.execution_failures,
        }
    }
}

/// Formats an evaluation run as JSON.
pub fn format_json(run: &EvaluationRun, k: usize, scoring: ScoringMethod) -> Result<String> {
    serde_json::to_string_pretty(&JsonReport::new(run, k, scoring))
        .context("Failed to serialize evaluation report")
}

/// Formats an evaluation run for the terminal.
///
/// With `debug`, per-query scores and a ranked-vs-ideal table precede the
/// summary.
pub fn format_human(run: &EvaluationRun, k: usize, scoring: ScoringMethod, debug: bool) -> String {
    let result = &run.result;
    let mut output = String::new();

    output.push_str("NDCG Evaluation Results\n");
    output.push_str(&format!("{}\n", "=".repeat(50)));

    if debug && result.evaluated > 0 {
        output.push_str("Individual Query Scores:\n");
        for (query_id, ndcg) in &result.scores {
            output.push_str(&format!(
                "  {}: {:.4} [{}]\n",
                query_id,
                ndcg,
                ScoreBand::classify(*ndcg)
            ));
        }
        output.push('\n');

        for (query_id, ranked) in &run.ranked {
            if let Some(truth) = run.truths.get(query_id) {
                output.push_str(&side_by_side(query_id, ranked, truth, k, scoring));
                output.push('\n');
            }
        }
    }

    output.push_str(&format!("Average NDCG@{}: {:.4}\n", k, result.average));
    output.push_str(&format!("Total queries evaluated: {}\n", result.evaluated));

    if result.evaluated > 0 {
        let counts = result
            .band_counts()
            .into_iter()
            .map(|(band, n)| format!("{}: {}", band, n))
            .collect::<Vec<_>>()
            .join(", ");
        output.push_str(&format!("Score distribution: {}\n", counts));
    }

    if !result.failures.is_empty() {
        output.push_str(&format!(
            "\n{} quer{} with unusable judgments:\n",
            result.failures.len(),
            if result.failures.len() == 1 { "y" } else { "ies" }
        ));
        for (query_id, reason) in &result.failures {
            output.push_str(&format!("  {}: {}\n", query_id, reason));
        }
    }

    if !run.execution_failures.is_empty() {
        output.push_str(&format!(
            "\nSkipped {} quer{} that failed to execute\n",
            run.execution_failures.len(),
            if run.execution_failures.len() == 1 { "y" } else { "ies" }
        ));
    }

    output.push_str(&format!(
        "\nPerformance Assessment: {} ({:.1}%)\n",
        result.average_band(),
        result.average * 100.0
    ));
    output.push_str(&"=".repeat(60));
    output
}

/// Renders the top-k ranked ids next to the top-k ideal ids.
fn side_by_side(
    query_id: &str,
    ranked: &[DocId],
    truth: &GroundTruth,
    k: usize,
    scoring: ScoringMethod,
) -> String {
    let ideal: Vec<DocId> = match score(truth, scoring) {
        Ok(map) => map.ideal_order().take(k).cloned().collect(),
        Err(_) => truth.ids().into_iter().take(k).cloned().collect(),
    };

    let mut output = format!("Query {}:\n", query_id);
    output.push_str(&format!(
        "  {:>4}  {:<w$}  {:<w$}\n",
        "Rank",
        "Ranked",
        "Ideal",
        w = ID_COLUMN_WIDTH
    ));
    for position in 0..k.min(ranked.len().max(ideal.len())) {
        let got = ranked.get(position).map(DocId::as_str).unwrap_or("-");
        let want = ideal.get(position).map(DocId::as_str).unwrap_or("-");
        let marker = if got == want { "=" } else { " " };
        output.push_str(&format!(
            "  {:>4}  {:<w$}  {:<w$} {}\n",
            position + 1,
            truncate_id(got),
            truncate_id(want),
            marker,
            w = ID_COLUMN_WIDTH
        ));
    }
    output
}

/// Shortens an id to the column width, adding ellipsis if needed.
fn truncate_id(id: &str) -> String {
    if id.chars().count() <= ID_COLUMN_WIDTH {
        id.to_string()
    } else {
        let head: String = id.chars().take(ID_COLUMN_WIDTH - 3).collect();
        format!("{}...", head)
    }
}
