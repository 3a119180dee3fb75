//! Title similarity policies for bibliographic resolution
//!
//! Every policy compares normalized titles and returns a score in [0, 1].
//! The resolver treats the policy as pluggable; [`SimilarityMetric`] selects
//! one of the built-in policies from configuration.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use strsim::{jaro_winkler, normalized_levenshtein};

use crate::normalization::normalize_title;

/// A title similarity measure
pub trait TitleSimilarity: Send + Sync {
    /// Score `candidate` against the reference's normalized title
    fn score(&self, normalized_query: &str, candidate_title: &str) -> f64;
}

/// Built-in similarity policies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SimilarityMetric {
    /// Jaccard overlap of word sets
    TokenSet,
    /// Normalized Levenshtein ratio
    EditRatio,
    /// 0.6 Jaro-Winkler + 0.4 Levenshtein
    Blended,
    /// Highest of edit ratio and token-set overlap
    BestOf,
}

impl SimilarityMetric {
    pub fn score(self, a: &str, b: &str) -> f64 {
        let norm_a = normalize_title(a);
        let norm_b = normalize_title(b);

        if norm_a.is_empty() || norm_b.is_empty() {
            return 0.0;
        }
        if norm_a == norm_b {
            return 1.0;
        }

        let score = match self {
            SimilarityMetric::TokenSet => token_set_overlap(&norm_a, &norm_b),
            SimilarityMetric::EditRatio => normalized_levenshtein(&norm_a, &norm_b),
            SimilarityMetric::Blended => {
                // Jaro-Winkler for overall shape, Levenshtein for exact characters
                jaro_winkler(&norm_a, &norm_b) * 0.6 + normalized_levenshtein(&norm_a, &norm_b) * 0.4
            }
            SimilarityMetric::BestOf => {
                normalized_levenshtein(&norm_a, &norm_b).max(token_set_overlap(&norm_a, &norm_b))
            }
        };

        score.clamp(0.0, 1.0)
    }
}

impl TitleSimilarity for SimilarityMetric {
    fn score(&self, normalized_query: &str, candidate_title: &str) -> f64 {
        SimilarityMetric::score(*self, normalized_query, candidate_title)
    }
}

/// Jaccard overlap of the word sets of two normalized titles
fn token_set_overlap(a: &str, b: &str) -> f64 {
    let words_a: HashSet<&str> = a.split_whitespace().collect();
    let words_b: HashSet<&str> = b.split_whitespace().collect();

    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }

    let shared = words_a.intersection(&words_b).count();
    let union = words_a.union(&words_b).count();
    shared as f64 / union as f64
}
