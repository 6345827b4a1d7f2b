//! Single-query NDCG evaluation.

use super::gain::{dcg_at_k, idcg_at_k};
use super::relevance::RelevanceMap;
use super::trace::{NoopTrace, TraceEvent, TraceSink};
use super::types::{DocId, GroundTruth, ScoringMethod};
use crate::config::{
    BinaryMembership, DecayExponent, BINARY_MEMBERSHIP, DECAY_EXPONENT, DEFAULT_K,
    NORMALIZE_TOLERANCE,
};
use crate::error::EvalError;
use serde::{Deserialize, Serialize};

/// Options for an evaluation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalOptions {
    /// Cutoff position (NDCG@k)
    pub k: usize,
    /// Scoring method applied to the ground truth
    pub method: ScoringMethod,
    /// Which judged documents count for binary DCG
    pub binary_membership: BinaryMembership,
    /// Treatment of the decay exponent
    pub decay_exponent: DecayExponent,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            method: ScoringMethod::Binary,
            binary_membership: BINARY_MEMBERSHIP,
            decay_exponent: DECAY_EXPONENT,
        }
    }
}

impl EvalOptions {
    /// Options for `method` at cutoff `k` with the canonical policies.
    pub fn new(k: usize, method: ScoringMethod) -> Self {
        Self {
            k,
            method,
            ..Self::default()
        }
    }

    /// Sets the cutoff position.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Sets the scoring method.
    pub fn with_method(mut self, method: ScoringMethod) -> Self {
        self.method = method;
        self
    }

    /// Sets the binary membership policy.
    pub fn with_binary_membership(mut self, membership: BinaryMembership) -> Self {
        self.binary_membership = membership;
        self
    }

    /// Sets the decay exponent policy.
    pub fn with_decay_exponent(mut self, exponent: DecayExponent) -> Self {
        self.decay_exponent = exponent;
        self
    }
}

/// DCG, IDCG and NDCG for one query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QueryScore {
    pub dcg: f64,
    pub idcg: f64,
    pub ndcg: f64,
}

/// Divides DCG by IDCG, yielding 0.0 when IDCG is not positive.
///
/// IDCG bounds DCG, so the quotient only leaves [0, 1] through rounding;
/// anything beyond [`NORMALIZE_TOLERANCE`] is a bug upstream.
#[inline]
pub fn normalize(dcg: f64, idcg: f64) -> f64 {
    if idcg > 0.0 {
        let ratio = dcg / idcg;
        debug_assert!(
            ratio <= 1.0 + NORMALIZE_TOLERANCE,
            "DCG {dcg} exceeds IDCG {idcg}"
        );
        ratio.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Scores ranked lists against ground truth.
///
/// The evaluator holds only its options; every call builds a fresh relevance
/// map and drops it before returning.
///
/// # Example
///
/// ```
/// use ndcg_core::{DocId, EvalOptions, GroundTruth, NdcgEvaluator, ScoringMethod};
///
/// let evaluator = NdcgEvaluator::new(EvalOptions::new(5, ScoringMethod::Binary));
/// let ranked: Vec<DocId> = ["a", "b", "c", "d", "e"].into_iter().map(DocId::from).collect();
/// let truth = GroundTruth::ideal_ranking(["a", "c", "e"]);
///
/// let ndcg = evaluator.evaluate(&ranked, &truth).unwrap();
/// assert!((ndcg - 0.8855).abs() < 1e-4);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct NdcgEvaluator {
    options: EvalOptions,
}

impl NdcgEvaluator {
    pub fn new(options: EvalOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &EvalOptions {
        &self.options
    }

    /// Builds the relevance map for `truth` under the configured method.
    pub fn score_map(&self, truth: &GroundTruth) -> Result<RelevanceMap, EvalError> {
        self.options
            .method
            .policy(&self.options)
            .relevance_map(truth)
    }

    /// Computes NDCG@k in [0, 1].
    ///
    /// # Errors
    ///
    /// Only when the ground truth does not fit the scoring method. An empty
    /// ground truth, an empty ranked list or k = 0 all score 0.0.
    pub fn evaluate(&self, ranked: &[DocId], truth: &GroundTruth) -> Result<f64, EvalError> {
        self.evaluate_traced(ranked, truth, &mut NoopTrace)
            .map(|score| score.ndcg)
    }

    /// Computes DCG, IDCG and NDCG, narrating every step to `sink`.
    pub fn evaluate_traced(
        &self,
        ranked: &[DocId],
        truth: &GroundTruth,
        sink: &mut dyn TraceSink,
    ) -> Result<QueryScore, EvalError> {
        let policy = self.options.method.policy(&self.options);
        let map = policy.relevance_map(truth)?;
        let k = self.options.k;

        for (i, (doc_id, relevance)) in map.iter().enumerate() {
            sink.record(TraceEvent::RelevanceAssigned {
                rank: i + 1,
                doc_id: doc_id.clone(),
                relevance,
            });
        }

        let dcg = dcg_at_k(ranked, &map, k, policy.as_ref(), sink);
        let idcg = idcg_at_k(&map, k, policy.as_ref(), sink);
        let ndcg = normalize(dcg, idcg);

        sink.record(TraceEvent::Completed { dcg, idcg, ndcg });
        Ok(QueryScore { dcg, idcg, ndcg })
    }
}

/// Computes NDCG@k with the canonical policies.
///
/// # Errors
///
/// See [`NdcgEvaluator::evaluate`].
pub fn evaluate(
    ranked: &[DocId],
    truth: &GroundTruth,
    k: usize,
    method: ScoringMethod,
) -> Result<f64, EvalError> {
    NdcgEvaluator::new(EvalOptions::new(k, method)).evaluate(ranked, truth)
}
