//! Bibliographic resolution: reference -> best-matching record
//!
//! Each reference's normalized title is sent to the search collaborator,
//! every candidate is scored with the configured [`TitleSimilarity`], and the
//! best candidate is accepted when it reaches the threshold.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::config::CheckConfig;
use crate::domain::{MatchResult, MatchedRecord, Reference, UnresolvedReason};
use crate::retry::{OutageBreaker, RetryPolicy};
use crate::similarity::TitleSimilarity;
use crate::sources::{BibliographicSearch, Candidate};

/// Resolution results keyed by normalized title
///
/// Cloning shares the same map, so one cache can serve several runs.
#[derive(Debug, Clone, Default)]
pub struct ResolutionCache {
    inner: Arc<Mutex<HashMap<String, MatchResult>>>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, normalized_title: &str) -> Option<MatchResult> {
        let map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.get(normalized_title).cloned()
    }

    /// Store `result` unless an entry exists; returns the entry that is kept
    pub fn insert_if_absent(&self, normalized_title: &str, result: MatchResult) -> MatchResult {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.entry(normalized_title.to_string())
            .or_insert(result)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolves references against a bibliographic search collaborator
pub struct Resolver {
    search: Arc<dyn BibliographicSearch>,
    similarity: Arc<dyn TitleSimilarity>,
    threshold: f64,
    max_candidates: u32,
    venue_allow_list: Vec<String>,
    retry: RetryPolicy,
    breaker: OutageBreaker,
    cache: Option<ResolutionCache>,
}

impl Resolver {
    pub fn new(search: Arc<dyn BibliographicSearch>, config: &CheckConfig) -> Self {
        Self {
            search,
            similarity: Arc::new(config.similarity_metric),
            threshold: config.similarity_threshold,
            max_candidates: config.max_candidates,
            venue_allow_list: config
                .venue_allow_list
                .iter()
                .map(|v| v.to_lowercase())
                .collect(),
            retry: config.retry_policy(),
            breaker: OutageBreaker::new(config.outage_threshold),
            cache: None,
        }
    }

    /// Builder: replace the similarity policy
    pub fn with_similarity(mut self, similarity: Arc<dyn TitleSimilarity>) -> Self {
        self.similarity = similarity;
        self
    }

    /// Builder: share a resolution cache
    pub fn with_cache(mut self, cache: ResolutionCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// False once the outage breaker has tripped
    pub fn is_available(&self) -> bool {
        !self.breaker.is_tripped()
    }

    /// Resolve one reference. Never fails: problems become `Unresolved` reasons.
    pub async fn resolve(&self, reference: &Reference) -> MatchResult {
        if !reference.has_title() {
            return MatchResult::unresolved(UnresolvedReason::EmptyTitle);
        }
        let key = reference.normalized_title.as_str();

        if let Some(cached) = self.cache.as_ref().and_then(|c| c.get(key)) {
            debug!("Cache hit for reference [{}]", reference.index);
            return cached;
        }

        if self.breaker.is_tripped() {
            return MatchResult::unresolved(UnresolvedReason::ServiceUnavailable);
        }

        let label = format!("search for reference [{}]", reference.index);
        let outcome = self
            .retry
            .run(&label, || self.search.search(key, self.max_candidates))
            .await;

        match outcome {
            Ok(candidates) => {
                self.breaker.record_success();
                let result = select_best(
                    key,
                    &candidates,
                    self.similarity.as_ref(),
                    self.threshold,
                    &self.venue_allow_list,
                );
                debug!(
                    "Reference [{}]: {} candidates, resolved = {}",
                    reference.index,
                    candidates.len(),
                    result.is_resolved()
                );
                match &self.cache {
                    Some(cache) => cache.insert_if_absent(key, result),
                    None => result,
                }
            }
            Err(e) => {
                if self.breaker.record_failure() {
                    warn!("Search service marked unavailable after repeated failures");
                }
                MatchResult::unresolved(UnresolvedReason::LookupFailed {
                    message: e.to_string(),
                })
            }
        }
    }
}

/// Pick the best-scoring candidate and apply the threshold (inclusive)
///
/// Ties go to a candidate whose venue is on `venue_allow_list` (lowercased
/// entries), then to the earlier candidate.
pub fn select_best(
    normalized_title: &str,
    candidates: &[Candidate],
    similarity: &dyn TitleSimilarity,
    threshold: f64,
    venue_allow_list: &[String],
) -> MatchResult {
    let preferred = |candidate: &Candidate| {
        candidate.venue.as_ref().is_some_and(|venue| {
            let venue = venue.to_lowercase();
            venue_allow_list
                .iter()
                .any(|allowed| venue.contains(allowed.as_str()))
        })
    };

    let mut best: Option<(&Candidate, f64, bool)> = None;
    for candidate in candidates {
        let score = similarity.score(normalized_title, &candidate.title);
        let is_preferred = preferred(candidate);
        let better = match best {
            None => true,
            Some((_, best_score, best_preferred)) => {
                score > best_score || (score == best_score && is_preferred && !best_preferred)
            }
        };
        if better {
            best = Some((candidate, score, is_preferred));
        }
    }

    match best {
        None => MatchResult::unresolved(UnresolvedReason::NoCandidates),
        Some((candidate, score, _)) if score >= threshold => MatchResult::Resolved(MatchedRecord {
            external_id: candidate.external_id.clone(),
            title: candidate.title.clone(),
            similarity_score: score,
            abstract_text: candidate.abstract_text.clone(),
            venue: candidate.venue.clone(),
            url: candidate.url.clone(),
        }),
        Some((candidate, score, _)) => MatchResult::unresolved(UnresolvedReason::BelowThreshold {
            best_score: score,
            best_title: candidate.title.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::SimilarityMetric;

    /// Scores by exact lookup so tests control ties precisely
    struct FixedScores(Vec<(&'static str, f64)>);

    impl TitleSimilarity for FixedScores {
        fn score(&self, _query: &str, candidate_title: &str) -> f64 {
            self.0
                .iter()
                .find(|(title, _)| *title == candidate_title)
                .map(|(_, s)| *s)
                .unwrap_or(0.0)
        }
    }

    #[test]
    fn test_no_candidates() {
        let result = select_best("anything", &[], &SimilarityMetric::BestOf, 0.8, &[]);
        assert_eq!(
            result,
            MatchResult::unresolved(UnresolvedReason::NoCandidates)
        );
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let scores = FixedScores(vec![("a", 0.8)]);
        let candidates = vec![Candidate::new("id-a", "a")];
        assert!(select_best("q", &candidates, &scores, 0.8, &[]).is_resolved());

        let below = FixedScores(vec![("a", 0.7999)]);
        let result = select_best("q", &candidates, &below, 0.8, &[]);
        assert!(matches!(
            result.unresolved_reason(),
            Some(UnresolvedReason::BelowThreshold { best_title, .. }) if best_title == "a"
        ));
    }

    #[test]
    fn test_highest_score_wins() {
        let scores = FixedScores(vec![("a", 0.86), ("b", 0.95), ("c", 0.9)]);
        let candidates = vec![
            Candidate::new("id-a", "a"),
            Candidate::new("id-b", "b"),
            Candidate::new("id-c", "c"),
        ];
        let result = select_best("q", &candidates, &scores, 0.85, &[]);
        assert_eq!(result.record().unwrap().external_id, "id-b");
        assert_eq!(result.record().unwrap().similarity_score, 0.95);
    }

    #[test]
    fn test_ties_prefer_allowed_venue_then_first_seen() {
        let scores = FixedScores(vec![("a", 0.9), ("b", 0.9), ("c", 0.9)]);
        let candidates = vec![
            Candidate::new("id-a", "a").with_venue("Some Workshop"),
            Candidate::new("id-b", "b").with_venue("arXiv:cs.CV"),
            Candidate::new("id-c", "c").with_venue("arXiv:cs.LG"),
        ];

        let first_seen = select_best("q", &candidates, &scores, 0.85, &[]);
        assert_eq!(first_seen.record().unwrap().external_id, "id-a");

        let allow = vec!["arxiv:cs".to_string()];
        let preferred = select_best("q", &candidates, &scores, 0.85, &allow);
        assert_eq!(preferred.record().unwrap().external_id, "id-b");
    }

    #[test]
    fn test_cache_keeps_first_entry() {
        let cache = ResolutionCache::new();
        let first = MatchResult::unresolved(UnresolvedReason::NoCandidates);
        let second = MatchResult::unresolved(UnresolvedReason::EmptyTitle);

        assert_eq!(cache.insert_if_absent("t", first.clone()), first);
        assert_eq!(cache.insert_if_absent("t", second), first);
        assert_eq!(cache.len(), 1);

        // Clones share the same map
        let shared = cache.clone();
        assert_eq!(shared.get("t"), Some(first));
    }
}
