//! Batch evaluation across many queries.
//!
//! Ranked lists and ground truth are keyed by query id. Only queries present
//! on both sides are evaluated; a query whose ground truth does not fit the
//! scoring method is recorded as a failure and left out of the average
//! instead of aborting the batch.

use super::ndcg::{EvalOptions, NdcgEvaluator};
use super::trace::{NoopTrace, TraceEvent, TraceSink};
use super::types::{DocId, GroundTruth};
use crate::config::{EXCELLENT_THRESHOLD, FAIR_THRESHOLD, GOOD_THRESHOLD};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// Qualitative band for an NDCG score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl ScoreBand {
    /// Bands from best to worst.
    pub const ALL: [ScoreBand; 4] = [
        ScoreBand::Excellent,
        ScoreBand::Good,
        ScoreBand::Fair,
        ScoreBand::Poor,
    ];

    pub fn classify(ndcg: f64) -> Self {
        if ndcg >= EXCELLENT_THRESHOLD {
            ScoreBand::Excellent
        } else if ndcg >= GOOD_THRESHOLD {
            ScoreBand::Good
        } else if ndcg >= FAIR_THRESHOLD {
            ScoreBand::Fair
        } else {
            ScoreBand::Poor
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScoreBand::Excellent => "Excellent",
            ScoreBand::Good => "Good",
            ScoreBand::Fair => "Fair",
            ScoreBand::Poor => "Poor",
        }
    }

    /// Inclusive lower bound of the band.
    pub fn lower_bound(&self) -> f64 {
        match self {
            ScoreBand::Excellent => EXCELLENT_THRESHOLD,
            ScoreBand::Good => GOOD_THRESHOLD,
            ScoreBand::Fair => FAIR_THRESHOLD,
            ScoreBand::Poor => 0.0,
        }
    }
}

impl fmt::Display for ScoreBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of a batch evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchResult {
    /// NDCG per evaluated query, keyed by query id
    pub scores: BTreeMap<String, f64>,
    /// Mean of `scores`, 0.0 when nothing was evaluated
    pub average: f64,
    /// Number of queries in `scores`
    pub evaluated: usize,
    /// Queries whose ground truth could not be scored, with the reason
    pub failures: BTreeMap<String, String>,
}

impl BatchResult {
    /// Number of evaluated queries in each band, best band first.
    pub fn band_counts(&self) -> Vec<(ScoreBand, usize)> {
        ScoreBand::ALL
            .iter()
            .map(|band| {
                let count = self
                    .scores
                    .values()
                    .filter(|&&s| ScoreBand::classify(s) == *band)
                    .count();
                (*band, count)
            })
            .collect()
    }

    /// Band of the average score.
    pub fn average_band(&self) -> ScoreBand {
        ScoreBand::classify(self.average)
    }
}

/// Partial batch outcome.
///
/// Accumulators combine with [`BatchAccumulator::merge`], which is
/// associative and independent of the order queries were visited in.
#[derive(Debug, Clone, Default)]
pub struct BatchAccumulator {
    scores: BTreeMap<String, f64>,
    failures: BTreeMap<String, String>,
}

impl BatchAccumulator {
    pub fn record_score(&mut self, query_id: &str, ndcg: f64) {
        self.scores.insert(query_id.to_string(), ndcg);
    }

    pub fn record_failure(&mut self, query_id: &str, error: impl fmt::Display) {
        self.failures.insert(query_id.to_string(), error.to_string());
    }

    pub fn merge(mut self, other: Self) -> Self {
        self.scores.extend(other.scores);
        self.failures.extend(other.failures);
        self
    }

    /// Finalizes the batch, summing scores in query-id order.
    pub fn finish(self) -> BatchResult {
        let evaluated = self.scores.len();
        let average = if evaluated == 0 {
            0.0
        } else {
            self.scores.values().sum::<f64>() / evaluated as f64
        };
        BatchResult {
            scores: self.scores,
            average,
            evaluated,
            failures: self.failures,
        }
    }
}

/// Evaluates ranked lists for many queries and averages the scores.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchAggregator {
    evaluator: NdcgEvaluator,
}

impl BatchAggregator {
    pub fn new(options: EvalOptions) -> Self {
        Self {
            evaluator: NdcgEvaluator::new(options),
        }
    }

    pub fn options(&self) -> &EvalOptions {
        self.evaluator.options()
    }

    /// Evaluates every query that has both a ranked list and ground truth.
    pub fn evaluate_batch(
        &self,
        ranked: &BTreeMap<String, Vec<DocId>>,
        truths: &BTreeMap<String, GroundTruth>,
    ) -> BatchResult {
        self.evaluate_batch_traced(ranked, truths, &mut NoopTrace)
    }

    /// Like [`evaluate_batch`](Self::evaluate_batch), narrating every query to `sink`.
    pub fn evaluate_batch_traced(
        &self,
        ranked: &BTreeMap<String, Vec<DocId>>,
        truths: &BTreeMap<String, GroundTruth>,
        sink: &mut dyn TraceSink,
    ) -> BatchResult {
        let mut acc = BatchAccumulator::default();
        for (query_id, list) in ranked {
            let Some(truth) = truths.get(query_id) else {
                debug!("Skipping query {}: no ground truth", query_id);
                continue;
            };
            sink.record(TraceEvent::QueryStarted {
                query_id: query_id.clone(),
            });
            match self.evaluator.evaluate_traced(list, truth, sink) {
                Ok(score) => acc.record_score(query_id, score.ndcg),
                Err(e) => {
                    warn!("Query {} not scored: {}", query_id, e);
                    sink.record(TraceEvent::QueryFailed {
                        query_id: query_id.clone(),
                        error: e.to_string(),
                    });
                    acc.record_failure(query_id, e);
                }
            }
        }
        acc.finish()
    }

    /// Evaluates queries in parallel on the rayon thread pool.
    ///
    /// Produces the same result as [`evaluate_batch`](Self::evaluate_batch).
    #[cfg(feature = "parallel")]
    pub fn evaluate_par(
        &self,
        ranked: &BTreeMap<String, Vec<DocId>>,
        truths: &BTreeMap<String, GroundTruth>,
    ) -> BatchResult {
        use rayon::prelude::*;

        ranked
            .par_iter()
            .filter_map(|(query_id, list)| truths.get(query_id).map(|t| (query_id, list, t)))
            .fold(BatchAccumulator::default, |mut acc, (query_id, list, truth)| {
                match self.evaluator.evaluate(list, truth) {
                    Ok(ndcg) => acc.record_score(query_id, ndcg),
                    Err(e) => acc.record_failure(query_id, e),
                }
                acc
            })
            .reduce(BatchAccumulator::default, BatchAccumulator::merge)
            .finish()
    }
}

/// Batch evaluation with the canonical policies.
pub fn evaluate_batch(
    ranked: &BTreeMap<String, Vec<DocId>>,
    truths: &BTreeMap<String, GroundTruth>,
    options: EvalOptions,
) -> BatchResult {
    BatchAggregator::new(options).evaluate_batch(ranked, truths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::trace::RecordingTrace;
    use crate::evaluation::types::ScoringMethod;

    fn ranked(entries: &[(&str, &[&str])]) -> BTreeMap<String, Vec<DocId>> {
        entries
            .iter()
            .map(|(q, ids)| (q.to_string(), ids.iter().map(|s| DocId::from(*s)).collect()))
            .collect()
    }

    fn truths(entries: Vec<(&str, GroundTruth)>) -> BTreeMap<String, GroundTruth> {
        entries.into_iter().map(|(q, t)| (q.to_string(), t)).collect()
    }

    #[test]
    fn test_batch_average() {
        let lists = ranked(&[("q1", &["a", "b"]), ("q2", &["x", "y"])]);
        let gt = truths(vec![
            ("q1", GroundTruth::ideal_ranking(["a", "b"])),
            ("q2", GroundTruth::ideal_ranking(["z"])),
        ]);
        let result = evaluate_batch(&lists, &gt, EvalOptions::new(2, ScoringMethod::Binary));

        assert_eq!(result.evaluated, 2);
        assert!((result.scores["q1"] - 1.0).abs() < 1e-12);
        assert_eq!(result.scores["q2"], 0.0);
        assert!((result.average - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_missing_ground_truth_is_skipped() {
        let lists = ranked(&[("q1", &["a"]), ("q2", &["b"])]);
        let gt = truths(vec![
            ("q1", GroundTruth::ideal_ranking(["a"])),
            ("q3", GroundTruth::ideal_ranking(["c"])),
        ]);
        let result = evaluate_batch(&lists, &gt, EvalOptions::default());

        assert_eq!(result.evaluated, 1);
        assert!(!result.scores.contains_key("q2"));
        assert!(!result.scores.contains_key("q3"));
        assert!(result.failures.is_empty());
        assert!((result.average - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_ground_truth_counts_as_zero() {
        let lists = ranked(&[("q1", &["a"]), ("q2", &["b"])]);
        let gt = truths(vec![
            ("q1", GroundTruth::ideal_ranking(["a"])),
            ("q2", GroundTruth::ideal_ranking(Vec::<&str>::new())),
        ]);
        let result = evaluate_batch(&lists, &gt, EvalOptions::default());

        assert_eq!(result.evaluated, 2);
        assert_eq!(result.scores["q2"], 0.0);
        assert!((result.average - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_empty_batch_average_is_zero() {
        let result = evaluate_batch(&BTreeMap::new(), &BTreeMap::new(), EvalOptions::default());
        assert_eq!(result.evaluated, 0);
        assert_eq!(result.average, 0.0);
    }

    #[test]
    fn test_malformed_query_does_not_abort_batch() {
        let lists = ranked(&[("bad", &["a"]), ("good", &["a"])]);
        let gt = truths(vec![
            ("bad", GroundTruth::ideal_ranking(["a"])),
            ("good", GroundTruth::scored([("a", 2.0)])),
        ]);
        let mut trace = RecordingTrace::new();
        let result = BatchAggregator::new(EvalOptions::new(3, ScoringMethod::ExplicitScore))
            .evaluate_batch_traced(&lists, &gt, &mut trace);

        assert_eq!(result.evaluated, 1);
        assert!(result.failures["bad"].contains("Malformed"));
        assert!((result.average - 1.0).abs() < 1e-12);
        assert!(trace
            .events
            .iter()
            .any(|e| matches!(e, TraceEvent::QueryFailed { query_id, .. } if query_id == "bad")));
    }

    #[test]
    fn test_accumulator_merge_is_order_independent() {
        let mut a = BatchAccumulator::default();
        a.record_score("q1", 0.25);
        let mut b = BatchAccumulator::default();
        b.record_score("q2", 0.75);
        b.record_failure("q3", "broken");

        let ab = a.clone().merge(b.clone()).finish();
        let ba = b.merge(a).finish();
        assert_eq!(ab, ba);
        assert_eq!(ab.evaluated, 2);
        assert!((ab.average - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_score_bands() {
        assert_eq!(ScoreBand::classify(0.8), ScoreBand::Excellent);
        assert_eq!(ScoreBand::classify(0.79), ScoreBand::Good);
        assert_eq!(ScoreBand::classify(0.6), ScoreBand::Good);
        assert_eq!(ScoreBand::classify(0.4), ScoreBand::Fair);
        assert_eq!(ScoreBand::classify(0.0), ScoreBand::Poor);
    }

    #[test]
    fn test_band_counts() {
        let mut acc = BatchAccumulator::default();
        acc.record_score("a", 0.9);
        acc.record_score("b", 0.85);
        acc.record_score("c", 0.1);
        let result = acc.finish();

        let counts = result.band_counts();
        assert_eq!(counts[0], (ScoreBand::Excellent, 2));
        assert_eq!(counts[3], (ScoreBand::Poor, 1));
        assert_eq!(result.average_band(), ScoreBand::Good);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_sequential() {
        let names: Vec<String> = (0..50).map(|i| format!("q{i}")).collect();
        let lists: BTreeMap<String, Vec<DocId>> = names
            .iter()
            .enumerate()
            .map(|(i, q)| (q.clone(), (0..i % 7).map(|d| DocId::from(d as u64)).collect()))
            .collect();
        let gt: BTreeMap<String, GroundTruth> = names
            .iter()
            .map(|q| (q.clone(), GroundTruth::ideal_ranking([3u64, 1, 4, 5])))
            .collect();

        let aggregator = BatchAggregator::new(EvalOptions::new(5, ScoringMethod::Decay));
        assert_eq!(
            aggregator.evaluate_batch(&lists, &gt),
            aggregator.evaluate_par(&lists, &gt)
        );
    }
}
