//! Verification outcomes

use serde::{Deserialize, Serialize};

/// Why a (marker, reference) pair was not judged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// The reference could not be resolved
    Unresolved,
    /// The marker points at an index the reference list does not have
    ReferenceNotInList,
    /// The resolved record carried no usable text
    EvidenceUnavailable,
    /// The judge kept answering in an unparsable format
    UnparsableVerdict,
    /// The judge call failed after retries (or timed out)
    JudgeFailed { message: String },
    /// The judge service was already marked as down
    ServiceUnavailable,
}

impl SkipReason {
    /// True when the pair could have been judged but a collaborator failed
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            SkipReason::UnparsableVerdict
                | SkipReason::JudgeFailed { .. }
                | SkipReason::ServiceUnavailable
        )
    }
}

/// Judgement for one (citing sentence, reference) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// The sentence is supported by the reference
    Verified,
    /// The judge found the sentence unsupported
    Flagged,
    /// Not checked
    Skipped { reason: SkipReason },
}

impl Verdict {
    pub fn skipped(reason: SkipReason) -> Self {
        Verdict::Skipped { reason }
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            Verdict::Verified => OutcomeKind::Verified,
            Verdict::Flagged => OutcomeKind::Flagged,
            Verdict::Skipped { .. } => OutcomeKind::Skipped,
        }
    }
}

/// Outcome kind without payload, used for counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Verified,
    Flagged,
    Skipped,
}

/// Verification result for one marker occurrence and one referenced index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    /// Byte offset of the citing marker in the body text
    pub marker_position: usize,
    pub reference_index: u32,
    pub citing_sentence: String,
    #[serde(flatten)]
    pub verdict: Verdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    /// Judge confidence in [0, 1], when the judge reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl VerificationOutcome {
    pub fn new(
        marker_position: usize,
        reference_index: u32,
        citing_sentence: impl Into<String>,
        verdict: Verdict,
    ) -> Self {
        Self {
            marker_position,
            reference_index,
            citing_sentence: citing_sentence.into(),
            verdict,
            rationale: None,
            confidence: None,
        }
    }

    /// Builder: set rationale
    pub fn with_rationale(mut self, rationale: Option<String>) -> Self {
        self.rationale = rationale;
        self
    }

    /// Builder: set confidence
    pub fn with_confidence(mut self, confidence: Option<f64>) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn kind(&self) -> OutcomeKind {
        self.verdict.kind()
    }
}
