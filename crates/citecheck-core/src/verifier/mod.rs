//! Relevance verification of (citing sentence, resolved reference) pairs
//!
//! The [`Verifier`] builds the evidence for each pair, asks a
//! [`RelevanceJudge`] for a verdict, and turns every collaborator problem
//! into a `Skipped` outcome rather than a guessed verdict.

pub mod prompt;
pub mod verdict;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::CheckConfig;
use crate::domain::{MatchResult, MatchedRecord, SkipReason, Verdict, VerificationOutcome};
use crate::retry::{OutageBreaker, RetryError, RetryPolicy, Transient};

pub use prompt::{build_batch_prompt, build_prompt, SYSTEM_PROMPT};
pub use verdict::{parse_batch_verdicts, parse_verdict};

/// How much of the resolved record is shown to the judge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerificationMode {
    /// Title only
    #[default]
    Lightweight,
    /// Title plus abstract when the index supplied one
    Standard,
}

/// What the judge gets to see about the cited source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub title: String,
    pub abstract_text: Option<String>,
}

/// One question for the judge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeRequest {
    pub citing_sentence: String,
    pub evidence: Evidence,
    /// Ask for the bare output format after an unreadable reply
    pub strict_format: bool,
}

impl JudgeRequest {
    pub fn new(citing_sentence: impl Into<String>, evidence: Evidence) -> Self {
        Self {
            citing_sentence: citing_sentence.into(),
            evidence,
            strict_format: false,
        }
    }

    /// The same request with `strict_format` set
    pub fn strict(mut self) -> Self {
        self.strict_format = true;
        self
    }
}

/// The judge's answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeVerdict {
    pub supported: bool,
    pub rationale: Option<String>,
    pub confidence: Option<f64>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum JudgeError {
    #[error("Judge request failed: {message}")]
    Transport { message: String },
    #[error("Judge rate limited")]
    RateLimited { retry_after: Option<Duration> },
    #[error("Judge timed out")]
    Timeout,
    #[error("Unreadable verdict: {raw:?}")]
    MalformedVerdict { raw: String },
    #[error("Batch reply had {got} verdicts for {expected} requests")]
    BatchSizeMismatch { expected: usize, got: usize },
    #[error("Judge rejected the request: {message}")]
    Rejected { message: String },
}

impl JudgeError {
    /// The reply arrived but could not be read
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            JudgeError::MalformedVerdict { .. } | JudgeError::BatchSizeMismatch { .. }
        )
    }
}

impl Transient for JudgeError {
    fn is_transient(&self) -> bool {
        matches!(
            self,
            JudgeError::Transport { .. } | JudgeError::RateLimited { .. } | JudgeError::Timeout
        )
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            JudgeError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// A collaborator that decides whether a source supports a sentence
#[async_trait]
pub trait RelevanceJudge: Send + Sync {
    async fn judge(&self, request: &JudgeRequest) -> Result<JudgeVerdict, JudgeError>;

    /// Judge several requests in one call; results are in request order
    async fn judge_batch(
        &self,
        requests: &[JudgeRequest],
    ) -> Result<Vec<Result<JudgeVerdict, JudgeError>>, JudgeError> {
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            results.push(self.judge(request).await);
        }
        Ok(results)
    }

    /// Whether `judge_batch` is cheaper than individual calls
    fn supports_batching(&self) -> bool {
        false
    }
}

/// The marker side of a verification pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationPair {
    pub marker_position: usize,
    pub reference_index: u32,
    pub citing_sentence: String,
}

impl CitationPair {
    fn outcome(&self, verdict: Verdict) -> VerificationOutcome {
        VerificationOutcome::new(
            self.marker_position,
            self.reference_index,
            self.citing_sentence.clone(),
            verdict,
        )
    }

    fn skipped(&self, reason: SkipReason) -> VerificationOutcome {
        self.outcome(Verdict::skipped(reason))
    }

    fn judged(&self, verdict: JudgeVerdict) -> VerificationOutcome {
        let kind = if verdict.supported {
            Verdict::Verified
        } else {
            Verdict::Flagged
        };
        self.outcome(kind)
            .with_rationale(verdict.rationale)
            .with_confidence(verdict.confidence)
    }
}

/// Checks citation pairs with a [`RelevanceJudge`]
pub struct Verifier {
    judge: Arc<dyn RelevanceJudge>,
    mode: VerificationMode,
    retry: RetryPolicy,
    breaker: OutageBreaker,
    max_concurrency: usize,
}

impl Verifier {
    pub fn new(judge: Arc<dyn RelevanceJudge>, config: &CheckConfig) -> Self {
        Self {
            judge,
            mode: config.verification_mode,
            retry: config.retry_policy(),
            breaker: OutageBreaker::new(config.outage_threshold),
            max_concurrency: config.max_concurrency.max(1),
        }
    }

    /// False once the outage breaker has tripped
    pub fn is_available(&self) -> bool {
        !self.breaker.is_tripped()
    }

    /// Whether pairs are sent to the judge in batches
    pub fn uses_batching(&self) -> bool {
        self.judge.supports_batching()
    }

    /// Evidence for a resolved record under the configured mode
    pub fn evidence_for(&self, record: &MatchedRecord) -> Option<Evidence> {
        let title = record.title.trim();
        if title.is_empty() {
            return None;
        }
        let abstract_text = match self.mode {
            VerificationMode::Lightweight => None,
            VerificationMode::Standard => record
                .abstract_text
                .as_deref()
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(str::to_string),
        };
        Some(Evidence {
            title: title.to_string(),
            abstract_text,
        })
    }

    /// Request for a pair, or the outcome when no judge call is needed
    fn prepare(
        &self,
        pair: &CitationPair,
        result: &MatchResult,
    ) -> Result<JudgeRequest, VerificationOutcome> {
        let Some(record) = result.record() else {
            return Err(pair.skipped(SkipReason::Unresolved));
        };
        let Some(evidence) = self.evidence_for(record) else {
            return Err(pair.skipped(SkipReason::EvidenceUnavailable));
        };
        if self.breaker.is_tripped() {
            return Err(pair.skipped(SkipReason::ServiceUnavailable));
        }
        Ok(JudgeRequest::new(pair.citing_sentence.clone(), evidence))
    }

    /// Verify one pair. Never fails: problems become `Skipped` reasons.
    pub async fn verify(&self, pair: &CitationPair, result: &MatchResult) -> VerificationOutcome {
        match self.prepare(pair, result) {
            Ok(request) => self.judge_pair(pair, request).await,
            Err(outcome) => outcome,
        }
    }

    /// Verify several pairs, returning outcomes in input order
    ///
    /// Uses one `judge_batch` call when the judge supports batching; a reply
    /// that cannot be read as a whole falls back to per-pair calls.
    pub async fn verify_batch(
        &self,
        items: &[(CitationPair, MatchResult)],
    ) -> Vec<VerificationOutcome> {
        let mut outcomes: Vec<Option<VerificationOutcome>> = vec![None; items.len()];
        let mut pending: Vec<(usize, JudgeRequest)> = Vec::new();
        for (i, (pair, result)) in items.iter().enumerate() {
            match self.prepare(pair, result) {
                Ok(request) => pending.push((i, request)),
                Err(outcome) => outcomes[i] = Some(outcome),
            }
        }

        if self.uses_batching() && pending.len() > 1 {
            let requests: Vec<JudgeRequest> = pending.iter().map(|(_, r)| r.clone()).collect();
            let reply = self
                .retry
                .run("judge batch", || self.judge.judge_batch(&requests))
                .await;

            match reply {
                Ok(results) if results.len() == requests.len() => {
                    self.breaker.record_success();
                    let mut retry_alone = Vec::new();
                    for ((i, request), result) in pending.into_iter().zip(results) {
                        let pair = &items[i].0;
                        match result {
                            Ok(verdict) => outcomes[i] = Some(pair.judged(verdict)),
                            Err(e) if e.is_malformed() => {
                                retry_alone.push((i, request.strict()))
                            }
                            Err(e) => {
                                outcomes[i] = Some(pair.skipped(SkipReason::JudgeFailed {
                                    message: e.to_string(),
                                }))
                            }
                        }
                    }
                    pending = retry_alone;
                }
                Ok(results) => {
                    warn!(
                        "Batch reply had {} verdicts for {} requests, judging pairs one by one",
                        results.len(),
                        requests.len()
                    );
                }
                Err(RetryError::Permanent(e)) if e.is_malformed() => {
                    warn!("Unreadable batch reply ({}), judging pairs one by one", e);
                }
                Err(e) => {
                    if self.breaker.record_failure() {
                        warn!("Judge service marked unavailable after repeated failures");
                    }
                    let message = e.to_string();
                    for (i, _) in pending.drain(..) {
                        outcomes[i] = Some(items[i].0.skipped(SkipReason::JudgeFailed {
                            message: message.clone(),
                        }));
                    }
                }
            }
        }

        let judged: Vec<(usize, VerificationOutcome)> = stream::iter(pending)
            .map(|(i, request)| async move { (i, self.judge_pair(&items[i].0, request).await) })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;
        for (i, outcome) in judged {
            outcomes[i] = Some(outcome);
        }

        outcomes.into_iter().flatten().collect()
    }

    /// Judge one prepared request, with one strict-format retry for unreadable replies
    ///
    /// A request that is already strict gets no further retry.
    async fn judge_pair(&self, pair: &CitationPair, request: JudgeRequest) -> VerificationOutcome {
        if self.breaker.is_tripped() {
            return pair.skipped(SkipReason::ServiceUnavailable);
        }

        let label = format!(
            "judge reference [{}] at {}",
            pair.reference_index, pair.marker_position
        );
        let first = self.call(&label, &request).await;
        let reply = match first {
            Err(RetryError::Permanent(e)) if e.is_malformed() && !request.strict_format => {
                debug!("{}: unreadable verdict, retrying in strict format", label);
                let strict = request.strict();
                self.call(&label, &strict).await
            }
            other => other,
        };

        match reply {
            Ok(verdict) => {
                self.breaker.record_success();
                pair.judged(verdict)
            }
            Err(RetryError::Permanent(e)) if e.is_malformed() => {
                // The service answered; only the format was wrong
                self.breaker.record_success();
                warn!("{}: verdict still unreadable after strict retry", label);
                pair.skipped(SkipReason::UnparsableVerdict)
            }
            Err(e) => {
                if self.breaker.record_failure() {
                    warn!("Judge service marked unavailable after repeated failures");
                }
                pair.skipped(SkipReason::JudgeFailed {
                    message: e.to_string(),
                })
            }
        }
    }

    async fn call(
        &self,
        label: &str,
        request: &JudgeRequest,
    ) -> Result<JudgeVerdict, RetryError<JudgeError>> {
        self.retry.run(label, || self.judge.judge(request)).await
    }
}
