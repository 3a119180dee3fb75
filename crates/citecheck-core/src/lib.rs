//! citecheck-core: citation verification pipeline
//!
//! This library provides:
//! - Citation marker parsing (numeric brackets, author-year) with context sentences
//! - Reference list splitting and title extraction
//! - Bibliographic resolution with pluggable title similarity
//! - Relevance verification through an injected judge
//! - Aggregation into a serializable accuracy report
//!
//! External services are reached through the [`BibliographicSearch`] and
//! [`RelevanceJudge`] traits. arXiv and Crossref sources ship behind the
//! `http` feature.

pub mod aggregate;
pub mod config;
pub mod document;
pub mod domain;
pub mod error;
pub mod http;
pub mod markers;
pub mod normalization;
pub mod pipeline;
pub mod references;
pub mod resolver;
pub mod retry;
pub mod similarity;
pub mod sources;
pub mod verifier;

// Re-export main types for convenience
pub use aggregate::aggregate;
pub use config::CheckConfig;
pub use document::{Document, DocumentTextSource, PagedText};
pub use domain::{
    CitationMarker, MatchResult, MatchedRecord, OutcomeCounts, OutcomeKind, Reference,
    ReferenceResolution, Report, RunHealth, SkipReason, UnresolvedReason, Verdict,
    VerificationOutcome,
};
pub use error::{CheckError, ConfigError, Result};
pub use markers::{MarkerGrammar, MarkerParser, MarkerStyle};
pub use pipeline::{CitationChecker, Progress, ProgressCallback, Stage};
pub use references::extract_references;
pub use resolver::{ResolutionCache, Resolver};
pub use retry::{OutageBreaker, RetryError, RetryPolicy, Transient};
pub use similarity::{SimilarityMetric, TitleSimilarity};
pub use sources::{BibliographicSearch, Candidate, SourceError, SourceMetadata};
pub use verifier::{
    CitationPair, Evidence, JudgeError, JudgeRequest, JudgeVerdict, RelevanceJudge,
    VerificationMode, Verifier,
};

#[cfg(feature = "http")]
pub use http::HttpClient;
#[cfg(feature = "http")]
pub use sources::{ArxivSource, CrossrefSource};
