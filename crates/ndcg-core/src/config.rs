//! Production configuration constants.
//!
//! This module contains the constants that pin down the numerical policies of
//! the evaluator. Every place in the crate that needs one of these choices
//! reads it from here, so a policy can only change in one spot.
//!
//! # Usage
//!
//! ```
//! use ndcg_core::config::{BinaryMembership, BINARY_MEMBERSHIP, DEFAULT_K};
//!
//! assert_eq!(DEFAULT_K, 10);
//! assert_eq!(BINARY_MEMBERSHIP, BinaryMembership::IdealPrefix);
//! ```

use serde::{Deserialize, Serialize};

// =============================================================================
// Evaluation Defaults
// =============================================================================

/// Default evaluation cutoff (NDCG@10).
pub const DEFAULT_K: usize = 10;

/// Multiplier applied to `log2(N)` when computing the decay base.
///
/// Fixed at 1.0: `base = max(1, DECAY_SCALING_FACTOR * log2(N) + 1)`.
pub const DECAY_SCALING_FACTOR: f64 = 1.0;

/// Absolute tolerance used when asserting that ideal relevances never increase.
pub const MONOTONIC_TOLERANCE: f64 = 1e-12;

/// Rounding slack allowed above 1.0 before an NDCG ratio is clamped.
pub const NORMALIZE_TOLERANCE: f64 = 1e-9;

// =============================================================================
// Policy Choices
// =============================================================================

/// Which documents count as relevant for binary DCG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryMembership {
    /// Only the first k entries of the ideal ranking are relevant.
    ///
    /// A document that is judged relevant but sits beyond the cutoff in the
    /// ideal ranking earns nothing.
    IdealPrefix,
    /// Every document in the ideal ranking is relevant, regardless of cutoff.
    FullSet,
}

/// How the decay exponent `base - i` is treated before exponentiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecayExponent {
    /// `2^(base - i)` as-is for 0-indexed position i; relevance stays strictly positive.
    Unclamped,
    /// Exponents at or below zero yield relevance 0.
    ClampedAtZero,
}

/// Canonical binary membership policy.
pub const BINARY_MEMBERSHIP: BinaryMembership = BinaryMembership::IdealPrefix;

/// Canonical decay exponent policy.
pub const DECAY_EXPONENT: DecayExponent = DecayExponent::Unclamped;

// =============================================================================
// Score Bands
// =============================================================================

/// Lower bound (inclusive) of an "excellent" NDCG score.
pub const EXCELLENT_THRESHOLD: f64 = 0.8;

/// Lower bound (inclusive) of a "good" NDCG score.
pub const GOOD_THRESHOLD: f64 = 0.6;

/// Lower bound (inclusive) of a "fair" NDCG score.
pub const FAIR_THRESHOLD: f64 = 0.4;

// =============================================================================
// Collaborator Boundary Defaults
// =============================================================================

/// Placeholder replaced with the live query value.
pub const QUERY_PLACEHOLDER: &str = "{{QUERY}}";

/// Placeholder replaced with the search index name.
pub const INDEX_NAME_PLACEHOLDER: &str = "{{INDEX_NAME}}";

/// Database holding the judgment collection.
pub const DEFAULT_EVAL_DATABASE: &str = "search_evaluation";

/// Database holding the searched documents.
pub const DEFAULT_SEARCH_DATABASE: &str = "search_evaluation";

/// Collection holding the searched documents.
pub const DEFAULT_SEARCH_COLLECTION: &str = "documents";

/// Search index name substituted into templates.
pub const DEFAULT_SEARCH_INDEX: &str = "text_search_index";

/// Collection holding ideal rankings.
pub const JUDGMENT_COLLECTION: &str = "ideal_rankings";
