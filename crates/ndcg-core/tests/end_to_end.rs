//! End-to-end evaluation over on-disk judgments and recorded responses.
//!
//! Run with: `cargo test -p ndcg-core --test end_to_end`

use ndcg_core::config::{DEFAULT_EVAL_DATABASE, JUDGMENT_COLLECTION};
use ndcg_core::evaluation::{RecordingTrace, ScoreBand, TraceEvent};
use ndcg_core::pipeline::{
    EvaluationRunner, JsonJudgmentStore, QueryTemplate, RecordedBackend,
};
use ndcg_core::{DocId, EvalOptions, ScoringMethod};
use serde_json::json;
use std::fs;
use tempfile::TempDir;

// ============================================================================
// Fixtures
// ============================================================================

struct Fixture {
    _dir: TempDir,
    template: QueryTemplate,
    store: JsonJudgmentStore,
    backend: RecordedBackend,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    let pipeline = root.join("pipeline.json");
    fs::write(
        &pipeline,
        json!({
            "pipeline": [
                {"$search": {"index": "{{INDEX_NAME}}", "text": {"query": "{{QUERY}}", "path": "body"}}},
                {"$limit": 10},
                {"$project": {"_id": 1}}
            ]
        })
        .to_string(),
    )
    .unwrap();

    let db = root.join(DEFAULT_EVAL_DATABASE);
    fs::create_dir_all(&db).unwrap();
    fs::write(
        db.join(format!("{JUDGMENT_COLLECTION}.json")),
        json!([
            {"query_id": "shoes", "query": "red shoes", "type": "text",
             "ideal_ranking": ["a", "c", "e"]},
            {"query_id": "hats", "query": "wool hat", "type": "text",
             "ideal_ranking": [{"$oid": "h1"}, {"$oid": "h2"}]},
            {"query_id": "lost", "query": "nothing recorded", "type": "text",
             "ideal_ranking": ["z"]},
            {"query_id": "vec", "query": [0.5, 0.25], "type": "vector",
             "ideal_ranking": ["v1"]}
        ])
        .to_string(),
    )
    .unwrap();

    let recordings = root.join("recordings.json");
    fs::write(
        &recordings,
        json!([
            {"query": "red shoes", "index": "text_idx",
             "results": [{"_id": "a"}, {"_id": "b"}, {"_id": "c"}, {"_id": "d"}, {"_id": "e"}]},
            {"query": "wool hat",
             "results": [{"_id": {"$oid": "h1"}}, {"_id": null}, {"_id": {"$oid": "h2"}}]},
            {"query": [0.5, 0.25], "results": [{"_id": "v1"}]}
        ])
        .to_string(),
    )
    .unwrap();

    Fixture {
        template: QueryTemplate::load(&pipeline).unwrap(),
        store: JsonJudgmentStore::new(root, DEFAULT_EVAL_DATABASE, JUDGMENT_COLLECTION),
        backend: RecordedBackend::load(&recordings).unwrap(),
        _dir: dir,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_binary_run_over_text_queries() {
    let f = fixture();
    let runner = EvaluationRunner::new(
        &f.template,
        &f.store,
        &f.backend,
        "text_idx",
        EvalOptions::new(5, ScoringMethod::Binary),
    );
    let run = runner.run(&json!({"type": "text"})).unwrap();

    assert_eq!(run.result.evaluated, 2);
    assert!((run.result.scores["shoes"] - 0.8855).abs() < 1e-4);
    assert!((run.result.scores["hats"] - 1.0).abs() < 1e-12);
    assert!((run.result.average - (0.8855 + 1.0) / 2.0).abs() < 1e-4);

    // No recording for "lost": logged and skipped, not scored
    assert!(run.execution_failures.contains_key("lost"));
    assert!(!run.result.scores.contains_key("lost"));
    assert_eq!(run.ranked["hats"], vec![DocId::from("h1"), DocId::from("h2")]);
}

#[test]
fn test_vector_query_substitution() {
    let f = fixture();
    let runner = EvaluationRunner::new(
        &f.template,
        &f.store,
        &f.backend,
        "vector_idx",
        EvalOptions::new(3, ScoringMethod::InverseRank),
    );
    let run = runner.run(&json!({"type": "vector"})).unwrap();
    assert_eq!(run.result.evaluated, 1);
    assert!((run.result.scores["vec"] - 1.0).abs() < 1e-12);
}

#[test]
fn test_trace_covers_each_scored_query() {
    let f = fixture();
    let runner = EvaluationRunner::new(
        &f.template,
        &f.store,
        &f.backend,
        "text_idx",
        EvalOptions::new(5, ScoringMethod::Decay),
    );
    let mut trace = RecordingTrace::new();
    let mut updates = 0;
    let run = runner
        .run_with(&json!({"type": "text"}), &mut trace, |_| updates += 1)
        .unwrap();

    assert_eq!(updates, 3);
    let started = trace
        .events
        .iter()
        .filter(|e| matches!(e, TraceEvent::QueryStarted { .. }))
        .count();
    assert_eq!(started, run.result.evaluated);
    assert_eq!(trace.completions().len(), run.result.evaluated);
}

#[test]
fn test_band_summary() {
    let f = fixture();
    let runner = EvaluationRunner::new(
        &f.template,
        &f.store,
        &f.backend,
        "text_idx",
        EvalOptions::new(5, ScoringMethod::Binary),
    );
    let result = runner.run(&json!({"type": "text"})).unwrap().result;
    assert_eq!(result.average_band(), ScoreBand::Excellent);
    assert_eq!(result.band_counts()[0], (ScoreBand::Excellent, 2));
}

#[test]
fn test_explicit_score_with_id_only_judgments_reports_failures() {
    let f = fixture();
    let runner = EvaluationRunner::new(
        &f.template,
        &f.store,
        &f.backend,
        "text_idx",
        EvalOptions::new(5, ScoringMethod::ExplicitScore),
    );
    let run = runner.run(&json!({"type": "text"})).unwrap();
    assert_eq!(run.result.evaluated, 0);
    assert_eq!(run.result.average, 0.0);
    assert_eq!(run.result.failures.len(), 2);
}
