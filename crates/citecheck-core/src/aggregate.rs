//! Aggregation of markers, resolutions and outcomes into a [`Report`]

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{
    CitationMarker, OutcomeCounts, Reference, ReferenceResolution, Report, RunHealth,
    VerificationOutcome,
};

/// Build the report for one run
///
/// Pure: the same inputs always give the same report. `resolutions` and
/// `outcomes` may cover only part of the document when the run was cut short;
/// `complete` is derived from `health.cancelled`.
pub fn aggregate(
    references: &[Reference],
    markers: &[CitationMarker],
    resolutions: &[ReferenceResolution],
    outcomes: &[VerificationOutcome],
    health: RunHealth,
) -> Report {
    let listed: BTreeSet<u32> = references.iter().map(|r| r.index).collect();

    let mut occurrences: BTreeMap<u32, usize> = BTreeMap::new();
    for marker in markers {
        for &index in &marker.referenced_indices {
            *occurrences.entry(index).or_default() += 1;
        }
    }
    let cited_indices: BTreeSet<u32> = occurrences.keys().copied().collect();
    let uncited = listed.difference(&cited_indices).copied().collect();
    let dangling = cited_indices.difference(&listed).copied().collect();
    let duplicates = occurrences
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .collect();

    let mut resolutions = resolutions.to_vec();
    resolutions.sort_by_key(|r| r.index);
    let resolved = resolutions.iter().filter(|r| r.result.is_resolved()).count();
    let resolution_failures = resolutions
        .iter()
        .filter(|r| r.result.unresolved_reason().is_some_and(|e| e.is_failure()))
        .count();
    let resolution_rate = if references.is_empty() {
        0.0
    } else {
        resolved as f64 / references.len() as f64
    };

    let mut outcomes = outcomes.to_vec();
    outcomes.sort_by_key(|o| (o.marker_position, o.reference_index));
    let mut outcome_counts = OutcomeCounts::default();
    for outcome in &outcomes {
        outcome_counts.record(outcome.kind());
    }
    let accuracy_rate = match outcome_counts.judged() {
        0 => None,
        judged => Some(outcome_counts.verified as f64 / judged as f64),
    };

    Report {
        complete: !health.cancelled,
        health,
        total_references: references.len(),
        total_marker_occurrences: markers.len(),
        cited_indices,
        uncited,
        duplicates,
        dangling,
        resolution_rate,
        resolution_failures,
        outcome_counts,
        accuracy_rate,
        resolutions,
        outcomes,
    }
}
