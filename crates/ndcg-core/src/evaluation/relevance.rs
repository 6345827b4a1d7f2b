//! Relevance scoring: ground truth + scoring method -> relevance map.
//!
//! Each [`ScoringMethod`] is backed by a [`ScoringPolicy`] implementation.
//! The policy owns three decisions for its method:
//!
//! 1. How ground truth becomes per-document relevance ([`ScoringPolicy::relevance_map`])
//! 2. What relevance a ranked document earns at cutoff k ([`ScoringPolicy::relevance`])
//! 3. Which relevance sequence is the best attainable ([`ScoringPolicy::ideal_relevances`])
//!
//! | Method | Relevance of ideal position i | Ideal sequence |
//! |--------|-------------------------------|----------------|
//! | binary | 1 | sorted, first min(k, n) |
//! | inverse_rank | 1 / i | ideal order, first min(k, n) |
//! | decay | 2^(base - i + 1) | ideal order, first min(k, n) |
//! | score | explicit | sorted, first min(k, n) |

use super::ndcg::EvalOptions;
use super::types::{DocId, GroundTruth, ScoringMethod};
use crate::config::{BinaryMembership, DecayExponent, DECAY_SCALING_FACTOR, MONOTONIC_TOLERANCE};
use crate::error::EvalError;
use std::collections::HashMap;

/// Per-document relevance derived from one query's ground truth.
///
/// Entries are kept in canonical best-first order (ideal ranking order for
/// ordered ground truth, descending score for scored rankings). Duplicate ids
/// keep their first occurrence. Documents not present resolve to 0.
#[derive(Debug, Clone, PartialEq)]
pub struct RelevanceMap {
    method: ScoringMethod,
    ordered: bool,
    entries: Vec<(DocId, f64)>,
    positions: HashMap<DocId, usize>,
}

impl RelevanceMap {
    fn from_entries(method: ScoringMethod, ordered: bool, entries: Vec<(DocId, f64)>) -> Self {
        let mut positions = HashMap::with_capacity(entries.len());
        let mut kept = Vec::with_capacity(entries.len());
        for (id, relevance) in entries {
            if positions.contains_key(&id) {
                continue;
            }
            positions.insert(id.clone(), kept.len());
            kept.push((id, relevance));
        }
        Self {
            method,
            ordered,
            entries: kept,
            positions,
        }
    }

    /// Relevance of a document, 0 when it was not judged.
    pub fn get(&self, id: &DocId) -> f64 {
        self.positions
            .get(id)
            .map(|&idx| self.entries[idx].1)
            .unwrap_or(0.0)
    }

    /// 1-indexed rank of a document in the canonical order.
    pub fn rank_of(&self, id: &DocId) -> Option<usize> {
        self.positions.get(id).map(|idx| idx + 1)
    }

    /// Returns true if the document was judged.
    pub fn contains(&self, id: &DocId) -> bool {
        self.positions.contains_key(id)
    }

    /// Method the map was built for.
    pub fn method(&self) -> ScoringMethod {
        self.method
    }

    /// Returns true if the ground truth carried a best-first order.
    pub fn is_ordered(&self) -> bool {
        self.ordered
    }

    /// Number of judged documents.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no document was judged.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (id, relevance) pairs in canonical best-first order.
    pub fn iter(&self) -> impl Iterator<Item = (&DocId, f64)> {
        self.entries.iter().map(|(id, rel)| (id, *rel))
    }

    /// Ids in canonical best-first order.
    pub fn ideal_order(&self) -> impl Iterator<Item = &DocId> {
        self.entries.iter().map(|(id, _)| id)
    }

    /// Relevance values in canonical best-first order.
    pub fn relevances(&self) -> impl Iterator<Item = f64> + '_ {
        self.entries.iter().map(|(_, rel)| *rel)
    }
}

/// Polymorphic scoring interface implemented once per [`ScoringMethod`].
pub trait ScoringPolicy: Send + Sync {
    /// Method this policy implements.
    fn method(&self) -> ScoringMethod;

    /// Converts ground truth into a relevance map.
    fn relevance_map(&self, truth: &GroundTruth) -> Result<RelevanceMap, EvalError>;

    /// Relevance earned by a ranked document when evaluating at cutoff `k`.
    fn relevance(&self, map: &RelevanceMap, id: &DocId, _k: usize) -> f64 {
        map.get(id)
    }

    /// Best attainable relevance sequence at cutoff `k`, at most `k` long.
    fn ideal_relevances(&self, map: &RelevanceMap, k: usize) -> Vec<f64>;
}

impl ScoringMethod {
    /// Returns the scoring policy for this method under the given options.
    pub fn policy(&self, options: &EvalOptions) -> Box<dyn ScoringPolicy> {
        match self {
            ScoringMethod::Binary => Box::new(BinaryPolicy {
                membership: options.binary_membership,
            }),
            ScoringMethod::InverseRank => Box::new(InverseRankPolicy),
            ScoringMethod::Decay => Box::new(DecayPolicy {
                exponent: options.decay_exponent,
            }),
            ScoringMethod::ExplicitScore => Box::new(ExplicitScorePolicy),
        }
    }
}

// ============================================================================
// Binary
// ============================================================================

/// Relevant documents score 1.
#[derive(Debug, Clone, Copy)]
pub struct BinaryPolicy {
    pub membership: BinaryMembership,
}

impl ScoringPolicy for BinaryPolicy {
    fn method(&self) -> ScoringMethod {
        ScoringMethod::Binary
    }

    fn relevance_map(&self, truth: &GroundTruth) -> Result<RelevanceMap, EvalError> {
        let ordered = !matches!(truth, GroundTruth::RelevantSet(_));
        let entries: Vec<(DocId, f64)> = match truth {
            // The ideal prefix is the k best-scored ids, not the stored order
            GroundTruth::ScoredRanking(pairs) => best_first(pairs.clone())
                .into_iter()
                .map(|(id, _)| (id, 1.0))
                .collect(),
            other => other.ids().into_iter().map(|id| (id.clone(), 1.0)).collect(),
        };
        Ok(RelevanceMap::from_entries(
            ScoringMethod::Binary,
            ordered,
            entries,
        ))
    }

    fn relevance(&self, map: &RelevanceMap, id: &DocId, k: usize) -> f64 {
        let member = match (self.membership, map.is_ordered()) {
            (BinaryMembership::IdealPrefix, true) => map.rank_of(id).is_some_and(|r| r <= k),
            _ => map.contains(id),
        };
        if member {
            1.0
        } else {
            0.0
        }
    }

    fn ideal_relevances(&self, map: &RelevanceMap, k: usize) -> Vec<f64> {
        sorted_prefix(map.relevances(), k)
    }
}

// ============================================================================
// Inverse rank
// ============================================================================

/// The document at ideal position i scores 1/i.
#[derive(Debug, Clone, Copy)]
pub struct InverseRankPolicy;

impl ScoringPolicy for InverseRankPolicy {
    fn method(&self) -> ScoringMethod {
        ScoringMethod::InverseRank
    }

    fn relevance_map(&self, truth: &GroundTruth) -> Result<RelevanceMap, EvalError> {
        let mut ids = ordered_ids(truth, ScoringMethod::InverseRank)?;
        dedup_in_order(&mut ids);
        let entries = ids
            .into_iter()
            .enumerate()
            .map(|(i, id)| (id, 1.0 / (i + 1) as f64))
            .collect();
        Ok(RelevanceMap::from_entries(
            ScoringMethod::InverseRank,
            true,
            entries,
        ))
    }

    fn ideal_relevances(&self, map: &RelevanceMap, k: usize) -> Vec<f64> {
        ideal_prefix(map, k)
    }
}

// ============================================================================
// Decay
// ============================================================================

/// The document at 1-indexed ideal position i scores 2^(base - (i - 1)).
///
/// The top document earns `2^base`.
#[derive(Debug, Clone, Copy)]
pub struct DecayPolicy {
    pub exponent: DecayExponent,
}

/// Adaptive decay base for an ideal ranking of `n` documents.
///
/// `max(1, DECAY_SCALING_FACTOR * log2(n) + 1)`, so longer rankings give the
/// top document a proportionally larger share of the gain.
pub fn decay_base(n: usize) -> f64 {
    if n == 0 {
        return 1.0;
    }
    (DECAY_SCALING_FACTOR * (n as f64).log2() + 1.0).max(1.0)
}

/// Decay relevance at 1-indexed ideal position `rank`.
///
/// The exponent counts from `base` at rank 1, so with N = 8 the ranks score
/// 16, 8, 4, 2, 1, ... and the clamped variant drops to 0 from rank 5.
pub fn decay_relevance(rank: usize, base: f64, exponent: DecayExponent) -> f64 {
    let power = base - rank.saturating_sub(1) as f64;
    match exponent {
        DecayExponent::Unclamped => power.exp2(),
        DecayExponent::ClampedAtZero if power > 0.0 => power.exp2(),
        DecayExponent::ClampedAtZero => 0.0,
    }
}

impl ScoringPolicy for DecayPolicy {
    fn method(&self) -> ScoringMethod {
        ScoringMethod::Decay
    }

    fn relevance_map(&self, truth: &GroundTruth) -> Result<RelevanceMap, EvalError> {
        let mut ids = ordered_ids(truth, ScoringMethod::Decay)?;
        dedup_in_order(&mut ids);
        let base = decay_base(ids.len());
        let entries = ids
            .into_iter()
            .enumerate()
            .map(|(i, id)| (id, decay_relevance(i + 1, base, self.exponent)))
            .collect();
        Ok(RelevanceMap::from_entries(ScoringMethod::Decay, true, entries))
    }

    fn ideal_relevances(&self, map: &RelevanceMap, k: usize) -> Vec<f64> {
        ideal_prefix(map, k)
    }
}

// ============================================================================
// Explicit score
// ============================================================================

/// Relevance comes straight from the ground truth.
#[derive(Debug, Clone, Copy)]
pub struct ExplicitScorePolicy;

impl ScoringPolicy for ExplicitScorePolicy {
    fn method(&self) -> ScoringMethod {
        ScoringMethod::ExplicitScore
    }

    fn relevance_map(&self, truth: &GroundTruth) -> Result<RelevanceMap, EvalError> {
        let pairs = match truth {
            GroundTruth::ScoredRanking(pairs) => pairs.clone(),
            other => {
                return match other.ids().first() {
                    Some(first) => Err(EvalError::MalformedGroundTruth {
                        index: 0,
                        entry: format!("\"{}\"", first),
                        reason: "expected a (doc_id, score) pair".to_string(),
                    }),
                    None => Ok(RelevanceMap::from_entries(
                        ScoringMethod::ExplicitScore,
                        true,
                        Vec::new(),
                    )),
                };
            }
        };

        if let Some((index, (id, score))) = pairs
            .iter()
            .enumerate()
            .find(|(_, (_, s))| !s.is_finite() || *s < 0.0)
        {
            return Err(EvalError::MalformedGroundTruth {
                index,
                entry: format!("[\"{}\", {}]", id, score),
                reason: "score must be a finite, non-negative number".to_string(),
            });
        }

        Ok(RelevanceMap::from_entries(
            ScoringMethod::ExplicitScore,
            true,
            best_first(pairs),
        ))
    }

    fn ideal_relevances(&self, map: &RelevanceMap, k: usize) -> Vec<f64> {
        sorted_prefix(map.relevances(), k)
    }
}

// ============================================================================
// RelevanceScorer
// ============================================================================

/// Converts ground truth into relevance maps.
///
/// The scorer is stateless: calling [`RelevanceScorer::score`] twice with the
/// same inputs yields equal maps.
#[derive(Debug, Clone, Copy)]
pub struct RelevanceScorer {
    options: EvalOptions,
}

impl RelevanceScorer {
    pub fn new(options: EvalOptions) -> Self {
        Self { options }
    }

    /// Scores ground truth under `method`.
    ///
    /// # Errors
    ///
    /// - [`EvalError::MalformedGroundTruth`] for explicit scores without proper pairs
    /// - [`EvalError::UnorderedGroundTruth`] for rank-based methods given a set
    pub fn score(
        &self,
        truth: &GroundTruth,
        method: ScoringMethod,
    ) -> Result<RelevanceMap, EvalError> {
        method.policy(&self.options).relevance_map(truth)
    }

    /// Scores ground truth under a method given by name.
    ///
    /// # Errors
    ///
    /// [`EvalError::InvalidMethod`] if `method` is not a known name.
    pub fn score_named(&self, truth: &GroundTruth, method: &str) -> Result<RelevanceMap, EvalError> {
        self.score(truth, method.parse()?)
    }
}

impl Default for RelevanceScorer {
    fn default() -> Self {
        Self::new(EvalOptions::default())
    }
}

/// Scores ground truth with the canonical policies.
pub fn score(truth: &GroundTruth, method: ScoringMethod) -> Result<RelevanceMap, EvalError> {
    RelevanceScorer::default().score(truth, method)
}

// ============================================================================
// Helpers
// ============================================================================

fn ordered_ids(truth: &GroundTruth, method: ScoringMethod) -> Result<Vec<DocId>, EvalError> {
    match truth {
        GroundTruth::RelevantSet(_) => Err(EvalError::UnorderedGroundTruth(
            method.name().to_string(),
        )),
        GroundTruth::IdealRanking(ids) => Ok(ids.clone()),
        GroundTruth::ScoredRanking(pairs) => Ok(pairs.iter().map(|(id, _)| id.clone()).collect()),
    }
}

fn dedup_in_order(ids: &mut Vec<DocId>) {
    let mut seen = std::collections::HashSet::new();
    ids.retain(|id| seen.insert(id.clone()));
}

/// First occurrence of each id, then descending by score (stable for ties).
fn best_first(mut pairs: Vec<(DocId, f64)>) -> Vec<(DocId, f64)> {
    let mut seen = std::collections::HashSet::new();
    pairs.retain(|(id, _)| seen.insert(id.clone()));
    pairs.sort_by(|a, b| b.1.total_cmp(&a.1));
    pairs
}

/// Highest `k` values, descending.
fn sorted_prefix(values: impl Iterator<Item = f64>, k: usize) -> Vec<f64> {
    let mut values: Vec<f64> = values.collect();
    values.sort_by(|a, b| b.total_cmp(a));
    values.truncate(k);
    values
}

/// First `k` values in ideal order, which never increase by construction.
fn ideal_prefix(map: &RelevanceMap, k: usize) -> Vec<f64> {
    let prefix: Vec<f64> = map.relevances().take(k).collect();
    debug_assert!(
        prefix
            .windows(2)
            .all(|w| w[1] <= w[0] + MONOTONIC_TOLERANCE),
        "ideal relevances must not increase with position"
    );
    prefix
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> DocId {
        DocId::from(s)
    }

    #[test]
    fn test_binary_assigns_one_to_members() {
        let map = score(&GroundTruth::ideal_ranking(["a", "b"]), ScoringMethod::Binary).unwrap();
        assert_eq!(map.get(&id("a")), 1.0);
        assert_eq!(map.get(&id("b")), 1.0);
        assert_eq!(map.get(&id("z")), 0.0);
    }

    #[test]
    fn test_binary_prefix_membership() {
        let options = EvalOptions::default();
        let policy = ScoringMethod::Binary.policy(&options);
        let map = policy
            .relevance_map(&GroundTruth::ideal_ranking(["a", "b", "c"]))
            .unwrap();

        // "c" sits at ideal rank 3, outside a cutoff of 2
        assert_eq!(policy.relevance(&map, &id("b"), 2), 1.0);
        assert_eq!(policy.relevance(&map, &id("c"), 2), 0.0);
        assert_eq!(policy.relevance(&map, &id("c"), 3), 1.0);
    }

    #[test]
    fn test_binary_full_set_membership() {
        let options = EvalOptions {
            binary_membership: BinaryMembership::FullSet,
            ..EvalOptions::default()
        };
        let policy = ScoringMethod::Binary.policy(&options);
        let map = policy
            .relevance_map(&GroundTruth::ideal_ranking(["a", "b", "c"]))
            .unwrap();
        assert_eq!(policy.relevance(&map, &id("c"), 2), 1.0);
    }

    #[test]
    fn test_binary_relevant_set_ignores_cutoff() {
        let options = EvalOptions::default();
        let policy = ScoringMethod::Binary.policy(&options);
        let map = policy
            .relevance_map(&GroundTruth::relevant_set(["x", "y", "z"]))
            .unwrap();
        assert!(!map.is_ordered());
        assert_eq!(policy.relevance(&map, &id("z"), 1), 1.0);
        assert_eq!(policy.ideal_relevances(&map, 2), vec![1.0, 1.0]);
    }

    #[test]
    fn test_inverse_rank_scores() {
        let map = score(
            &GroundTruth::ideal_ranking(["x", "y", "z"]),
            ScoringMethod::InverseRank,
        )
        .unwrap();
        assert!((map.get(&id("x")) - 1.0).abs() < 1e-12);
        assert!((map.get(&id("y")) - 0.5).abs() < 1e-12);
        assert!((map.get(&id("z")) - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_inverse_rank_rejects_unordered_set() {
        let result = score(&GroundTruth::relevant_set(["x"]), ScoringMethod::InverseRank);
        assert_eq!(
            result.unwrap_err(),
            EvalError::UnorderedGroundTruth("inverse_rank".to_string())
        );
    }

    #[test]
    fn test_duplicate_ids_keep_first_position() {
        let map = score(
            &GroundTruth::ideal_ranking(["x", "y", "x"]),
            ScoringMethod::InverseRank,
        )
        .unwrap();
        assert_eq!(map.len(), 2);
        assert!((map.get(&id("x")) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_decay_base() {
        assert_eq!(decay_base(0), 1.0);
        assert_eq!(decay_base(1), 1.0);
        assert!((decay_base(8) - 4.0).abs() < 1e-12);
        assert!((decay_base(3) - (3f64.log2() + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_decay_scores_strictly_decrease() {
        let ids: Vec<String> = (0..40).map(|i| format!("d{i}")).collect();
        let map = score(&GroundTruth::ideal_ranking(ids), ScoringMethod::Decay).unwrap();
        let rels: Vec<f64> = map.relevances().collect();
        assert!(rels.iter().all(|&r| r > 0.0));
        assert!(rels.windows(2).all(|w| w[1] < w[0]));
    }

    #[test]
    fn test_decay_eight_documents() {
        // N = 8 -> base = 4 -> 2^4, 2^3, 2^2, 2^1, 2^0, 2^-1, ...
        let ids: Vec<String> = (1..=8).map(|i| format!("d{i}")).collect();
        let map = score(&GroundTruth::ideal_ranking(ids), ScoringMethod::Decay).unwrap();
        let rels: Vec<f64> = map.relevances().collect();
        assert_eq!(&rels[..6], &[16.0, 8.0, 4.0, 2.0, 1.0, 0.5]);
    }

    #[test]
    fn test_decay_clamped_policy_zeroes_tail() {
        assert_eq!(decay_relevance(1, 4.0, DecayExponent::ClampedAtZero), 16.0);
        assert_eq!(decay_relevance(4, 4.0, DecayExponent::ClampedAtZero), 2.0);
        assert_eq!(decay_relevance(5, 4.0, DecayExponent::ClampedAtZero), 0.0);
        assert_eq!(decay_relevance(6, 4.0, DecayExponent::ClampedAtZero), 0.0);
        assert_eq!(decay_relevance(5, 4.0, DecayExponent::Unclamped), 1.0);
    }

    #[test]
    fn test_decay_clamped_map_eight_documents() {
        let options = EvalOptions::default().with_decay_exponent(DecayExponent::ClampedAtZero);
        let ids: Vec<String> = (1..=8).map(|i| format!("d{i}")).collect();
        let map = RelevanceScorer::new(options)
            .score(&GroundTruth::ideal_ranking(ids), ScoringMethod::Decay)
            .unwrap();
        let rels: Vec<f64> = map.relevances().collect();
        assert_eq!(rels, vec![16.0, 8.0, 4.0, 2.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_binary_scored_ranking_prefix_is_best_scored() {
        let options = EvalOptions::default();
        let policy = ScoringMethod::Binary.policy(&options);
        let map = policy
            .relevance_map(&GroundTruth::scored([("a", 1.0), ("b", 5.0)]))
            .unwrap();

        let order: Vec<&str> = map.ideal_order().map(DocId::as_str).collect();
        assert_eq!(order, vec!["b", "a"]);
        assert_eq!(policy.relevance(&map, &id("b"), 1), 1.0);
        assert_eq!(policy.relevance(&map, &id("a"), 1), 0.0);
    }

    #[test]
    fn test_explicit_score_sorts_best_first() {
        let map = score(
            &GroundTruth::scored([("a", 1.0), ("b", 3.0), ("c", 2.0)]),
            ScoringMethod::ExplicitScore,
        )
        .unwrap();
        let order: Vec<&str> = map.ideal_order().map(DocId::as_str).collect();
        assert_eq!(order, vec!["b", "c", "a"]);
        assert_eq!(map.get(&id("c")), 2.0);
    }

    #[test]
    fn test_explicit_score_rejects_ids_without_scores() {
        let err = score(
            &GroundTruth::ideal_ranking(["a", "b"]),
            ScoringMethod::ExplicitScore,
        )
        .unwrap_err();
        assert!(matches!(err, EvalError::MalformedGroundTruth { index: 0, .. }));
    }

    #[test]
    fn test_explicit_score_rejects_negative() {
        let err = score(
            &GroundTruth::scored([("a", 1.0), ("b", -2.0)]),
            ScoringMethod::ExplicitScore,
        )
        .unwrap_err();
        assert!(matches!(err, EvalError::MalformedGroundTruth { index: 1, .. }));
    }

    #[test]
    fn test_score_named_unknown_method() {
        let truth = GroundTruth::ideal_ranking(["a"]);
        let err = RelevanceScorer::default()
            .score_named(&truth, "reciprocal")
            .unwrap_err();
        assert_eq!(err, EvalError::InvalidMethod("reciprocal".to_string()));
    }

    #[test]
    fn test_score_is_pure() {
        let truth = GroundTruth::ideal_ranking(["a", "b", "c", "d"]);
        for method in [
            ScoringMethod::Binary,
            ScoringMethod::InverseRank,
            ScoringMethod::Decay,
        ] {
            assert_eq!(score(&truth, method), score(&truth, method));
        }
    }

    #[test]
    fn test_policy_method_matches() {
        let options = EvalOptions::default();
        for method in ScoringMethod::ALL {
            assert_eq!(method.policy(&options).method(), method);
        }
    }
}
