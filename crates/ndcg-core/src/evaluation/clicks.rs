//! Click-through relevance.
//!
//! Implicit feedback stands in for human judgments: a document is relevant
//! when it collected at least `threshold` clicks.

use super::gain::ndcg_of_grades;
use super::types::DocId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Click counts observed for one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickStats {
    pub clicks: u64,
    /// Times the document was shown, if tracked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impressions: Option<u64>,
}

impl ClickStats {
    pub fn new(clicks: u64) -> Self {
        Self {
            clicks,
            impressions: None,
        }
    }

    /// Click-through rate, when impressions are known and non-zero.
    pub fn ctr(&self) -> Option<f64> {
        self.impressions
            .filter(|&n| n > 0)
            .map(|n| self.clicks as f64 / n as f64)
    }
}

/// NDCG@k with binary relevance derived from click counts.
///
/// The top-k documents are graded 1 when their click count reaches
/// `threshold` and 0 otherwise, padded with zeros to length k. Returns 0.0
/// for an empty ranked list or empty click data.
pub fn ndcg_with_clicks(
    ranked: &[DocId],
    clicks: &HashMap<DocId, ClickStats>,
    threshold: u64,
    k: usize,
) -> f64 {
    if ranked.is_empty() || clicks.is_empty() {
        return 0.0;
    }

    let mut grades: Vec<f64> = ranked
        .iter()
        .take(k)
        .map(|id| match clicks.get(id) {
            Some(stats) if stats.clicks >= threshold => 1.0,
            _ => 0.0,
        })
        .collect();
    grades.resize(k, 0.0);

    ndcg_of_grades(&grades, k)
}
