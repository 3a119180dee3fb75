//! Domain models for citecheck
//!
//! Records produced by one pipeline run. All of them serialize with serde so
//! a front-end can emit the final [`Report`] as JSON.

mod outcome;
mod reference;
mod report;

pub use outcome::{OutcomeKind, SkipReason, Verdict, VerificationOutcome};
pub use reference::{
    CitationMarker, MatchResult, MatchedRecord, Reference, ReferenceResolution, UnresolvedReason,
};
pub use report::{OutcomeCounts, Report, RunHealth};
