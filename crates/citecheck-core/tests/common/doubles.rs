//! Deterministic in-memory collaborators

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use citecheck_core::http::HttpError;
use citecheck_core::{
    BibliographicSearch, Candidate, CheckConfig, JudgeError, JudgeRequest, JudgeVerdict,
    RelevanceJudge, SourceError, SourceMetadata,
};

/// Config with tiny backoffs so retry paths finish quickly
pub fn fast_config() -> CheckConfig {
    CheckConfig {
        retry_limit: 1,
        initial_backoff_ms: 1,
        max_backoff_ms: 2,
        timeout_ms: 2_000,
        ..CheckConfig::default()
    }
}

/// Search double: returns the candidates registered under the first key the
/// query contains, or nothing
#[derive(Default)]
pub struct StubSearch {
    records: Vec<(String, Vec<Candidate>)>,
    failure: Option<SourceError>,
    pub calls: AtomicUsize,
    pub queries: Mutex<Vec<String>>,
}

impl StubSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(mut self, key: &str, candidate: Candidate) -> Self {
        self.records.push((key.to_string(), vec![candidate]));
        self
    }

    /// Every query gets `candidates`
    pub fn returning(candidates: Vec<Candidate>) -> Self {
        Self {
            records: vec![(String::new(), candidates)],
            ..Self::default()
        }
    }

    /// Every call fails with `error`
    pub fn failing(error: SourceError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BibliographicSearch for StubSearch {
    fn metadata(&self) -> SourceMetadata {
        SourceMetadata {
            id: "stub",
            name: "Stub",
            description: "In-memory search",
            base_url: "",
            rate_limit_per_second: 0.0,
            requires_api_key: false,
        }
    }

    async fn search(
        &self,
        query_title: &str,
        max_results: u32,
    ) -> Result<Vec<Candidate>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query_title.to_string());
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        Ok(self
            .records
            .iter()
            .find(|(key, _)| query_title.contains(key.as_str()))
            .map(|(_, candidates)| {
                candidates
                    .iter()
                    .take(max_results as usize)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Transient network failure
pub fn network_error() -> SourceError {
    SourceError::Http(HttpError::RequestFailed {
        message: "connection reset".to_string(),
    })
}

/// Judge double: supports everything except titles containing one of
/// `unsupported`
#[derive(Default)]
pub struct StubJudge {
    unsupported: Vec<String>,
    batching: bool,
    /// Drop the last verdict of every batch reply
    short_batches: bool,
    /// Answer every call with an unreadable verdict
    malformed: bool,
    /// Only requests in strict format get a readable verdict
    strict_only: bool,
    pub calls: AtomicUsize,
    /// `strict_format` of every single-pair call, in call order
    pub strict_flags: Mutex<Vec<bool>>,
    pub batch_calls: AtomicUsize,
    pub judged_titles: Mutex<Vec<String>>,
}

impl StubJudge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flagging(mut self, title_fragment: &str) -> Self {
        self.unsupported.push(title_fragment.to_string());
        self
    }

    pub fn batching(mut self) -> Self {
        self.batching = true;
        self
    }

    pub fn with_short_batches(mut self) -> Self {
        self.short_batches = true;
        self
    }

    pub fn malformed(mut self) -> Self {
        self.malformed = true;
        self
    }

    pub fn answering_only_strict(mut self) -> Self {
        self.strict_only = true;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn batch_call_count(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    fn decide(&self, request: &JudgeRequest) -> Result<JudgeVerdict, JudgeError> {
        self.judged_titles
            .lock()
            .unwrap()
            .push(request.evidence.title.clone());
        if self.malformed || (self.strict_only && !request.strict_format) {
            return Err(JudgeError::MalformedVerdict {
                raw: "it depends".to_string(),
            });
        }
        let flagged = self
            .unsupported
            .iter()
            .any(|fragment| request.evidence.title.contains(fragment.as_str()));
        Ok(JudgeVerdict {
            supported: !flagged,
            rationale: flagged.then(|| "different topic".to_string()),
            confidence: Some(0.9),
        })
    }
}

#[async_trait]
impl RelevanceJudge for StubJudge {
    async fn judge(&self, request: &JudgeRequest) -> Result<JudgeVerdict, JudgeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.strict_flags
            .lock()
            .unwrap()
            .push(request.strict_format);
        tokio::time::sleep(Duration::from_millis(1)).await;
        self.decide(request)
    }

    async fn judge_batch(
        &self,
        requests: &[JudgeRequest],
    ) -> Result<Vec<Result<JudgeVerdict, JudgeError>>, JudgeError> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        let mut results: Vec<_> = requests.iter().map(|r| self.decide(r)).collect();
        if self.short_batches {
            results.pop();
        }
        Ok(results)
    }

    fn supports_batching(&self) -> bool {
        self.batching
    }
}
