//! The aggregate report returned at the end of a run

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{OutcomeKind, ReferenceResolution, VerificationOutcome};

/// Run-level health flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunHealth {
    /// False once the search collaborator was treated as down
    pub search_available: bool,
    /// False once the judge collaborator was treated as down
    pub judge_available: bool,
    /// True when the run stopped early on a cancellation signal
    pub cancelled: bool,
}

impl Default for RunHealth {
    fn default() -> Self {
        Self {
            search_available: true,
            judge_available: true,
            cancelled: false,
        }
    }
}

impl RunHealth {
    pub fn is_healthy(&self) -> bool {
        self.search_available && self.judge_available && !self.cancelled
    }
}

/// Verification outcome counts grouped by kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub verified: usize,
    pub flagged: usize,
    pub skipped: usize,
}

impl OutcomeCounts {
    pub fn record(&mut self, kind: OutcomeKind) {
        match kind {
            OutcomeKind::Verified => self.verified += 1,
            OutcomeKind::Flagged => self.flagged += 1,
            OutcomeKind::Skipped => self.skipped += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.verified + self.flagged + self.skipped
    }

    /// Pairs the judge actually decided on
    pub fn judged(&self) -> usize {
        self.verified + self.flagged
    }
}

/// Citation accuracy report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// False when the run was cancelled before all work was issued
    pub complete: bool,
    pub health: RunHealth,
    pub total_references: usize,
    pub total_marker_occurrences: usize,
    /// Distinct indices targeted by at least one marker
    pub cited_indices: BTreeSet<u32>,
    /// References no marker points at
    pub uncited: BTreeSet<u32>,
    /// Indices cited by more than one marker occurrence, with counts
    pub duplicates: BTreeMap<u32, usize>,
    /// Indices cited in the body but missing from the reference list
    pub dangling: BTreeSet<u32>,
    /// Resolved references / total references
    pub resolution_rate: f64,
    /// References left unresolved because a lookup failed (not because nothing matched)
    pub resolution_failures: usize,
    pub outcome_counts: OutcomeCounts,
    /// Verified / (verified + flagged); absent when nothing was judged
    pub accuracy_rate: Option<f64>,
    pub resolutions: Vec<ReferenceResolution>,
    /// Sorted by marker position, then reference index
    pub outcomes: Vec<VerificationOutcome>,
}

impl Report {
    /// Outcomes the judge flagged as unsupported
    pub fn flagged(&self) -> impl Iterator<Item = &VerificationOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.kind() == OutcomeKind::Flagged)
    }

    /// Outcomes that could not be checked
    pub fn skipped(&self) -> impl Iterator<Item = &VerificationOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.kind() == OutcomeKind::Skipped)
    }

    /// Resolution entry for a reference index
    pub fn resolution(&self, index: u32) -> Option<&ReferenceResolution> {
        self.resolutions.iter().find(|r| r.index == index)
    }

    /// True only for a complete, healthy run in which every pair was judged
    /// and nothing was flagged.
    pub fn is_clean(&self) -> bool {
        self.complete
            && self.health.is_healthy()
            && self.outcome_counts.flagged == 0
            && self.outcome_counts.skipped == 0
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
