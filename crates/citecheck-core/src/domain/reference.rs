//! References, citation markers and resolution results

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// One parsed bibliography entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// 1-based enumeration number as written in the list
    pub index: u32,
    /// Entry text with the enumeration prefix removed
    pub raw_text: String,
    /// Title as extracted, before normalization
    pub title: String,
    /// Lower-cased, punctuation-stripped title; empty when no title was found
    pub normalized_title: String,
}

impl Reference {
    /// Titles normalizing to fewer than two characters keep an empty `normalized_title`
    pub fn new(index: u32, raw_text: impl Into<String>, title: impl Into<String>) -> Self {
        let title = title.into();
        let mut normalized_title = crate::normalization::normalize_title(&title);
        if normalized_title.chars().count() < 2 {
            normalized_title.clear();
        }
        Self {
            index,
            raw_text: raw_text.into(),
            title,
            normalized_title,
        }
    }

    /// Whether a usable title was extracted
    pub fn has_title(&self) -> bool {
        !self.normalized_title.is_empty()
    }
}

/// One occurrence of a citation mark in body text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationMarker {
    /// Referenced indices, never empty
    pub referenced_indices: BTreeSet<u32>,
    /// Sentence containing the marker
    pub context_sentence: String,
    /// Byte offset of the marker in the body text
    pub position: usize,
    /// Marker text as written, e.g. `[2, 4-6]`
    pub raw: String,
}

impl CitationMarker {
    pub fn cites(&self, index: u32) -> bool {
        self.referenced_indices.contains(&index)
    }
}

/// A candidate accepted by the resolver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedRecord {
    /// Identifier in the external index (arXiv id, DOI, ...)
    pub external_id: String,
    /// Title as the index reports it
    pub title: String,
    /// Title similarity in [0, 1], at or above the acceptance threshold
    pub similarity_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Why a reference was left unresolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnresolvedReason {
    /// No usable title was extracted, so nothing was queried
    EmptyTitle,
    /// The index returned no candidates
    NoCandidates,
    /// The best candidate scored below the threshold
    BelowThreshold { best_score: f64, best_title: String },
    /// The lookup failed after retries (or timed out)
    LookupFailed { message: String },
    /// The search service was already marked as down
    ServiceUnavailable,
}

impl UnresolvedReason {
    /// True for collaborator failures, false for genuine absence of a match
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            UnresolvedReason::LookupFailed { .. } | UnresolvedReason::ServiceUnavailable
        )
    }
}

/// Resolver output for one reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchResult {
    Resolved(MatchedRecord),
    Unresolved { reason: UnresolvedReason },
}

impl MatchResult {
    pub fn unresolved(reason: UnresolvedReason) -> Self {
        MatchResult::Unresolved { reason }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, MatchResult::Resolved(_))
    }

    pub fn record(&self) -> Option<&MatchedRecord> {
        match self {
            MatchResult::Resolved(record) => Some(record),
            MatchResult::Unresolved { .. } => None,
        }
    }

    pub fn unresolved_reason(&self) -> Option<&UnresolvedReason> {
        match self {
            MatchResult::Resolved(_) => None,
            MatchResult::Unresolved { reason } => Some(reason),
        }
    }
}

/// A reference paired with its resolution, as listed in the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceResolution {
    pub index: u32,
    pub title: String,
    pub result: MatchResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_normalizes_title() {
        let reference = Reference::new(1, "raw", "Deep Residual Learning, for Images!");
        assert_eq!(reference.normalized_title, "deep residual learning for images");
        assert!(reference.has_title());

        let empty = Reference::new(2, "raw", "");
        assert!(!empty.has_title());

        let too_short = Reference::new(3, "raw", "X.");
        assert_eq!(too_short.title, "X.");
        assert!(!too_short.has_title());
    }

    #[test]
    fn test_failure_reasons_are_distinguishable() {
        assert!(UnresolvedReason::ServiceUnavailable.is_failure());
        assert!(UnresolvedReason::LookupFailed {
            message: "timeout".to_string()
        }
        .is_failure());
        assert!(!UnresolvedReason::NoCandidates.is_failure());
        assert!(!UnresolvedReason::BelowThreshold {
            best_score: 0.4,
            best_title: "x".to_string()
        }
        .is_failure());
    }

    #[test]
    fn test_match_result_json_shape() {
        let result = MatchResult::unresolved(UnresolvedReason::NoCandidates);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "unresolved");
        assert_eq!(json["reason"]["kind"], "no_candidates");
    }
}
