//! End-to-end citation check
//!
//! Orchestrates extraction, resolution, verification and aggregation.
//! Resolution and verification work is cut into batches of `batch_size`;
//! batches run one after another and items inside a batch run concurrently
//! (at most `max_concurrency` in flight). The cancellation token is checked
//! before each batch, so a cancelled run returns the partial report for the
//! batches that finished.

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::aggregate::aggregate;
use crate::config::CheckConfig;
use crate::document::DocumentTextSource;
use crate::domain::{
    CitationMarker, MatchResult, Reference, ReferenceResolution, Report, RunHealth, SkipReason,
    Verdict, VerificationOutcome,
};
use crate::error::Result;
use crate::markers::MarkerParser;
use crate::references::extract_references;
use crate::resolver::{ResolutionCache, Resolver};
use crate::similarity::TitleSimilarity;
use crate::sources::BibliographicSearch;
use crate::verifier::{CitationPair, RelevanceJudge, Verifier};

/// Pipeline stage reported with progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Resolving,
    Verifying,
}

/// Progress snapshot handed to the progress callback
#[derive(Debug, Clone)]
pub struct Progress {
    pub stage: Stage,
    /// Items finished so far across both stages; never decreases
    pub completed: usize,
    /// References plus (marker, index) pairs
    pub total: usize,
    /// Report over the work finished so far
    pub partial: Report,
}

/// Called after each resolved reference and each verified pair
pub type ProgressCallback = dyn Fn(&Progress) + Send + Sync;

/// Runs the citation check for documents
///
/// Collaborators are injected; each run builds its own resolver and verifier
/// so outage tracking starts fresh, while a cache given through
/// [`CitationChecker::with_cache`] is shared by all runs.
pub struct CitationChecker {
    config: CheckConfig,
    search: Arc<dyn BibliographicSearch>,
    judge: Arc<dyn RelevanceJudge>,
    similarity: Option<Arc<dyn TitleSimilarity>>,
    cache: Option<ResolutionCache>,
}

impl CitationChecker {
    /// Fails with `InvalidConfig` when the configuration does not validate
    pub fn new(
        config: CheckConfig,
        search: Arc<dyn BibliographicSearch>,
        judge: Arc<dyn RelevanceJudge>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            search,
            judge,
            similarity: None,
            cache: None,
        })
    }

    /// Builder: share a resolution cache across runs
    pub fn with_cache(mut self, cache: ResolutionCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Builder: replace the configured similarity metric
    pub fn with_similarity(mut self, similarity: Arc<dyn TitleSimilarity>) -> Self {
        self.similarity = Some(similarity);
        self
    }

    pub fn config(&self) -> &CheckConfig {
        &self.config
    }

    /// Check a document to completion
    pub async fn check(&self, document: &dyn DocumentTextSource) -> Result<Report> {
        self.check_with(document, &CancellationToken::new(), None)
            .await
    }

    /// Check a document with cancellation and progress reporting
    pub async fn check_with(
        &self,
        document: &dyn DocumentTextSource,
        cancel: &CancellationToken,
        progress: Option<&ProgressCallback>,
    ) -> Result<Report> {
        let body = document.get_body_text();
        let references = extract_references(&document.get_reference_list_text())?;
        let markers =
            MarkerParser::for_style(self.config.marker_style, &body, &references).collect_valid();
        info!(
            "Checking {} references and {} citation markers",
            references.len(),
            markers.len()
        );

        let mut run = Run {
            references: &references,
            markers: &markers,
            resolutions: Vec::with_capacity(references.len()),
            outcomes: Vec::new(),
            health: RunHealth::default(),
            completed: 0,
            total: references.len() + pair_count(&markers),
            progress,
        };

        let resolver = self.resolver();
        let verifier = Verifier::new(self.judge.clone(), &self.config);
        let concurrency = self.config.max_concurrency;

        info!("Resolving {} references", references.len());
        for batch in references.chunks(self.config.batch_size) {
            if cancel.is_cancelled() {
                info!("Cancelled during resolution");
                run.health.cancelled = true;
                break;
            }
            let mut resolved = stream::iter(batch)
                .map(|reference| {
                    let resolver = &resolver;
                    async move { (reference, resolver.resolve(reference).await) }
                })
                .buffer_unordered(concurrency);
            while let Some((reference, result)) = resolved.next().await {
                run.health.search_available = resolver.is_available();
                run.push_resolution(reference, result);
            }
        }
        run.health.search_available = resolver.is_available();

        if !run.health.cancelled {
            let pairs = citation_pairs(&markers, &run.resolutions);

            info!(
                "Verifying {} citation pairs (batching: {})",
                pairs.len(),
                verifier.uses_batching()
            );
            for batch in pairs.chunks(self.config.batch_size) {
                if cancel.is_cancelled() {
                    info!("Cancelled during verification");
                    run.health.cancelled = true;
                    break;
                }

                let mut judgeable = Vec::with_capacity(batch.len());
                for (pair, result) in batch {
                    match result {
                        Some(result) => judgeable.push((pair.clone(), result.clone())),
                        None => {
                            debug!(
                                "Marker cites [{}], which is not in the list",
                                pair.reference_index
                            );
                            run.push_outcome(VerificationOutcome::new(
                                pair.marker_position,
                                pair.reference_index,
                                pair.citing_sentence.clone(),
                                Verdict::skipped(SkipReason::ReferenceNotInList),
                            ));
                        }
                    }
                }

                if verifier.uses_batching() {
                    for outcome in verifier.verify_batch(&judgeable).await {
                        run.health.judge_available = verifier.is_available();
                        run.push_outcome(outcome);
                    }
                } else {
                    let mut verified = stream::iter(&judgeable)
                        .map(|(pair, result)| verifier.verify(pair, result))
                        .buffer_unordered(concurrency);
                    while let Some(outcome) = verified.next().await {
                        run.health.judge_available = verifier.is_available();
                        run.push_outcome(outcome);
                    }
                }
            }
        }
        run.health.judge_available = verifier.is_available();

        let report = run.report();
        info!(
            "Check finished: {} verified, {} flagged, {} skipped (complete: {})",
            report.outcome_counts.verified,
            report.outcome_counts.flagged,
            report.outcome_counts.skipped,
            report.complete
        );
        Ok(report)
    }

    fn resolver(&self) -> Resolver {
        let mut resolver = Resolver::new(self.search.clone(), &self.config);
        if let Some(similarity) = &self.similarity {
            resolver = resolver.with_similarity(similarity.clone());
        }
        if let Some(cache) = &self.cache {
            resolver = resolver.with_cache(cache.clone());
        }
        resolver
    }
}

/// One entry per (marker, referenced index), paired with that reference's
/// resolution; `None` when the index is not in the list
fn citation_pairs(
    markers: &[CitationMarker],
    resolutions: &[ReferenceResolution],
) -> Vec<(CitationPair, Option<MatchResult>)> {
    let by_index: HashMap<u32, &MatchResult> =
        resolutions.iter().map(|r| (r.index, &r.result)).collect();
    let mut pairs = Vec::new();
    for marker in markers {
        for &index in &marker.referenced_indices {
            let pair = CitationPair {
                marker_position: marker.position,
                reference_index: index,
                citing_sentence: marker.context_sentence.clone(),
            };
            pairs.push((pair, by_index.get(&index).map(|r| (*r).clone())));
        }
    }
    pairs
}

fn pair_count(markers: &[CitationMarker]) -> usize {
    markers.iter().map(|m| m.referenced_indices.len()).sum()
}

/// Mutable state of one run
struct Run<'a> {
    references: &'a [Reference],
    markers: &'a [CitationMarker],
    resolutions: Vec<ReferenceResolution>,
    outcomes: Vec<VerificationOutcome>,
    health: RunHealth,
    completed: usize,
    total: usize,
    progress: Option<&'a ProgressCallback>,
}

impl Run<'_> {
    fn push_resolution(&mut self, reference: &Reference, result: MatchResult) {
        self.resolutions.push(ReferenceResolution {
            index: reference.index,
            title: reference.title.clone(),
            result,
        });
        self.advance(Stage::Resolving);
    }

    fn push_outcome(&mut self, outcome: VerificationOutcome) {
        self.outcomes.push(outcome);
        self.advance(Stage::Verifying);
    }

    fn advance(&mut self, stage: Stage) {
        self.completed += 1;
        if let Some(callback) = self.progress {
            let mut partial = self.report();
            partial.complete = false;
            callback(&Progress {
                stage,
                completed: self.completed,
                total: self.total,
                partial,
            });
        }
    }

    fn report(&self) -> Report {
        aggregate(
            self.references,
            self.markers,
            &self.resolutions,
            &self.outcomes,
            self.health,
        )
    }
}
