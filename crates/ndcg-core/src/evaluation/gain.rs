//! Discounted cumulative gain.
//!
//! # Formula
//!
//! ```text
//! DCG@k  = Σ rel(doc_i) / log₂(i + 1)   for i in 1..=k
//! IDCG@k = DCG@k of the best attainable relevance sequence
//! ```
//!
//! Gain is linear in relevance. Positions past the end of a short ranked list
//! contribute 0, so a list shorter than k is never an error. A document that
//! repeats in the ranked list keeps its positions but earns gain only at its
//! first occurrence, so IDCG@k bounds DCG@k.

use super::ndcg::EvalOptions;
use super::relevance::{RelevanceMap, ScoringPolicy};
use super::trace::{GainStep, NoopTrace, TraceEvent, TraceSink};
use super::types::DocId;
use std::collections::HashSet;

/// Discount factor for a 1-indexed position: log₂(position + 1).
#[inline]
pub fn discount(position: usize) -> f64 {
    (position as f64 + 1.0).log2()
}

/// Computes DCG@k of a ranked list, reporting each step to `sink`.
pub fn dcg_at_k(
    ranked: &[DocId],
    map: &RelevanceMap,
    k: usize,
    policy: &dyn ScoringPolicy,
    sink: &mut dyn TraceSink,
) -> f64 {
    let mut total = 0.0;
    let mut credited = HashSet::new();
    for (i, doc) in ranked.iter().take(k).enumerate() {
        let position = i + 1;
        let relevance = if credited.insert(doc) {
            policy.relevance(map, doc, k)
        } else {
            0.0
        };
        let discount = discount(position);
        let gain = relevance / discount;
        total += gain;
        sink.record(TraceEvent::DcgStep(GainStep {
            position,
            doc_id: Some(doc.clone()),
            relevance,
            discount,
            gain,
            running_total: total,
        }));
    }

    if ranked.len() < k {
        sink.record(TraceEvent::Padded {
            first: ranked.len() + 1,
            last: k,
        });
    }
    total
}

/// Computes IDCG@k from the policy's ideal relevance sequence.
pub fn idcg_at_k(
    map: &RelevanceMap,
    k: usize,
    policy: &dyn ScoringPolicy,
    sink: &mut dyn TraceSink,
) -> f64 {
    let mut total = 0.0;
    for (i, relevance) in policy.ideal_relevances(map, k).into_iter().enumerate() {
        let position = i + 1;
        let discount = discount(position);
        let gain = relevance / discount;
        total += gain;
        sink.record(TraceEvent::IdcgStep(GainStep {
            position,
            doc_id: None,
            relevance,
            discount,
            gain,
            running_total: total,
        }));
    }
    total
}

/// DCG@k under the canonical policy for the map's method.
pub fn dcg(ranked: &[DocId], map: &RelevanceMap, k: usize) -> f64 {
    let policy = map.method().policy(&EvalOptions::default());
    dcg_at_k(ranked, map, k, policy.as_ref(), &mut NoopTrace)
}

/// IDCG@k under the canonical policy for the map's method.
pub fn idcg(map: &RelevanceMap, k: usize) -> f64 {
    let policy = map.method().policy(&EvalOptions::default());
    idcg_at_k(map, k, policy.as_ref(), &mut NoopTrace)
}

/// NDCG@k of relevance grades already in ranked order.
///
/// The ideal ordering is the same grades sorted descending. Returns 0.0 when
/// no grade in the list is positive.
///
/// # Example
///
/// ```
/// use ndcg_core::evaluation::ndcg_of_grades;
///
/// assert!((ndcg_of_grades(&[3.0, 2.0, 1.0], 3) - 1.0).abs() < 1e-12);
/// assert_eq!(ndcg_of_grades(&[0.0, 0.0], 2), 0.0);
/// ```
pub fn ndcg_of_grades(grades: &[f64], k: usize) -> f64 {
    let dcg = sum_discounted(grades.iter().copied().take(k));

    let mut ideal = grades.to_vec();
    ideal.sort_by(|a, b| b.total_cmp(a));
    let idcg = sum_discounted(ideal.into_iter().take(k));

    super::ndcg::normalize(dcg, idcg)
}

fn sum_discounted(relevances: impl Iterator<Item = f64>) -> f64 {
    relevances
        .enumerate()
        .map(|(i, rel)| rel / discount(i + 1))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::relevance::score;
    use crate::evaluation::trace::RecordingTrace;
    use crate::evaluation::types::{GroundTruth, ScoringMethod};

    fn ids(names: &[&str]) -> Vec<DocId> {
        names.iter().map(|s| DocId::from(*s)).collect()
    }

    #[test]
    fn test_discount() {
        assert_eq!(discount(1), 1.0);
        assert_eq!(discount(3), 2.0);
        assert!((discount(2) - 3f64.log2()).abs() < 1e-12);
    }

    #[test]
    fn test_binary_dcg_and_idcg() {
        let map = score(&GroundTruth::ideal_ranking(["a", "c", "e"]), ScoringMethod::Binary).unwrap();
        let ranked = ids(&["a", "b", "c", "d", "e"]);

        let d = dcg(&ranked, &map, 5);
        let i = idcg(&map, 5);
        assert!((d - 1.8869).abs() < 1e-4, "dcg = {d}");
        assert!((i - 2.1309).abs() < 1e-4, "idcg = {i}");
    }

    #[test]
    fn test_inverse_rank_dcg_and_idcg() {
        let map = score(
            &GroundTruth::ideal_ranking(["x", "y", "z"]),
            ScoringMethod::InverseRank,
        )
        .unwrap();
        let ranked = ids(&["y", "x", "z"]);

        assert!((dcg(&ranked, &map, 3) - 1.298).abs() < 1e-3);
        assert!((idcg(&map, 3) - 1.482).abs() < 1e-3);
    }

    #[test]
    fn test_short_list_pads_with_zero() {
        let map = score(&GroundTruth::ideal_ranking(["id1", "id3"]), ScoringMethod::Binary).unwrap();
        let ranked = ids(&["id1", "id2", "id3"]);
        let options = EvalOptions::default();
        let policy = ScoringMethod::Binary.policy(&options);

        let mut trace = RecordingTrace::new();
        let at_ten = dcg_at_k(&ranked, &map, 10, policy.as_ref(), &mut trace);
        let at_three = dcg(&ranked, &map, 3);

        assert!((at_ten - at_three).abs() < 1e-12);
        assert_eq!(trace.dcg_steps().len(), 3);
        assert!(trace
            .events
            .contains(&TraceEvent::Padded { first: 4, last: 10 }));
    }

    #[test]
    fn test_binary_prefix_cutoff_excludes_deep_members() {
        // "c" is relevant but sits at ideal rank 3, outside k = 2
        let map = score(&GroundTruth::ideal_ranking(["a", "b", "c"]), ScoringMethod::Binary).unwrap();
        let ranked = ids(&["c", "a"]);
        let d = dcg(&ranked, &map, 2);
        assert!((d - 1.0 / 3f64.log2()).abs() < 1e-12);
    }

    #[test]
    fn test_repeated_document_credited_once() {
        let truth = GroundTruth::ideal_ranking(["a", "b", "c"]);
        let map = score(&truth, ScoringMethod::InverseRank).unwrap();
        let repeated = ids(&["a", "a", "a"]);

        // Only position 1 earns gain; the repeats hold their slots at 0
        assert!((dcg(&repeated, &map, 3) - 1.0).abs() < 1e-12);
        assert!(dcg(&repeated, &map, 3) <= idcg(&map, 3));

        let options = EvalOptions::default();
        let policy = ScoringMethod::InverseRank.policy(&options);
        let mut trace = RecordingTrace::new();
        dcg_at_k(&repeated, &map, 3, policy.as_ref(), &mut trace);
        let rels: Vec<f64> = trace.dcg_steps().iter().map(|s| s.relevance).collect();
        assert_eq!(rels, vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_all_zero_scores_give_zero_dcg() {
        let map = score(
            &GroundTruth::scored([("a", 0.0), ("b", 0.0)]),
            ScoringMethod::ExplicitScore,
        )
        .unwrap();
        let ranked = ids(&["a", "b"]);
        assert_eq!(dcg(&ranked, &map, 2), 0.0);
        assert_eq!(idcg(&map, 2), 0.0);
    }

    #[test]
    fn test_idcg_of_empty_map_is_zero() {
        let map = score(&GroundTruth::ideal_ranking(Vec::<&str>::new()), ScoringMethod::Decay).unwrap();
        assert_eq!(idcg(&map, 10), 0.0);
    }

    #[test]
    fn test_idcg_trace_running_total() {
        let map = score(
            &GroundTruth::scored([("a", 1.0), ("b", 3.0)]),
            ScoringMethod::ExplicitScore,
        )
        .unwrap();
        let options = EvalOptions::default();
        let policy = ScoringMethod::ExplicitScore.policy(&options);
        let mut trace = RecordingTrace::new();
        let total = idcg_at_k(&map, 5, policy.as_ref(), &mut trace);

        let steps = trace.idcg_steps();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].relevance, 3.0);
        assert!((steps[1].running_total - total).abs() < 1e-12);
    }

    #[test]
    fn test_ndcg_of_grades() {
        assert!((ndcg_of_grades(&[1.0, 1.0, 0.0], 3) - 1.0).abs() < 1e-12);
        let reversed = ndcg_of_grades(&[0.0, 1.0], 2);
        assert!((reversed - 1.0 / 3f64.log2()).abs() < 1e-12);
        assert_eq!(ndcg_of_grades(&[], 5), 0.0);
    }
}
