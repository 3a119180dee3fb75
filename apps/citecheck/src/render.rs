//! Report rendering

use std::fmt::Write;

use chrono::{DateTime, Utc};
use citecheck_core::{MatchResult, Report, SkipReason, UnresolvedReason, Verdict};
use serde::Serialize;

/// JSON envelope written by `--format json`
#[derive(Serialize)]
struct Envelope<'a> {
    document: &'a str,
    generated_at: DateTime<Utc>,
    #[serde(flatten)]
    report: &'a Report,
}

pub fn render_json(
    report: &Report,
    document: &str,
    generated_at: DateTime<Utc>,
) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&Envelope {
        document,
        generated_at,
        report,
    })
}

fn unresolved_label(reason: &UnresolvedReason) -> String {
    match reason {
        UnresolvedReason::EmptyTitle => "no title extracted".to_string(),
        UnresolvedReason::NoCandidates => "not found".to_string(),
        UnresolvedReason::BelowThreshold {
            best_score,
            best_title,
        } => format!("closest match {:.2}: {}", best_score, best_title),
        UnresolvedReason::LookupFailed { message } => format!("lookup failed: {}", message),
        UnresolvedReason::ServiceUnavailable => "search service unavailable".to_string(),
    }
}

fn skip_label(reason: &SkipReason) -> String {
    match reason {
        SkipReason::Unresolved => "reference unresolved".to_string(),
        SkipReason::ReferenceNotInList => "not in reference list".to_string(),
        SkipReason::EvidenceUnavailable => "no evidence text".to_string(),
        SkipReason::UnparsableVerdict => "unreadable verdict".to_string(),
        SkipReason::JudgeFailed { message } => format!("judge failed: {}", message),
        SkipReason::ServiceUnavailable => "judge unavailable".to_string(),
    }
}

fn percent(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}

fn join(indices: impl Iterator<Item = String>) -> String {
    indices.collect::<Vec<_>>().join(", ")
}

/// Human-readable summary
pub fn render_text(report: &Report, document: &str, generated_at: DateTime<Utc>) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail
    let _ = writeln!(out, "Citation check: {}", document);
    let _ = writeln!(out, "Generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S UTC"));
    if !report.complete {
        let _ = writeln!(out, "Status: INCOMPLETE (cancelled)");
    }
    if !report.health.search_available {
        let _ = writeln!(out, "Warning: search service went down during the run");
    }
    if !report.health.judge_available {
        let _ = writeln!(out, "Warning: judge went down during the run");
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "References:        {}", report.total_references);
    let _ = writeln!(out, "Citation markers:  {}", report.total_marker_occurrences);
    let _ = writeln!(
        out,
        "Resolved:          {} ({} lookup failures)",
        percent(report.resolution_rate),
        report.resolution_failures
    );
    let counts = &report.outcome_counts;
    let _ = writeln!(
        out,
        "Verified / flagged / skipped: {} / {} / {}",
        counts.verified, counts.flagged, counts.skipped
    );
    let accuracy = report
        .accuracy_rate
        .map(percent)
        .unwrap_or_else(|| "n/a".to_string());
    let _ = writeln!(out, "Accuracy:          {}", accuracy);

    if !report.uncited.is_empty() {
        let _ = writeln!(
            out,
            "Uncited:           {}",
            join(report.uncited.iter().map(u32::to_string))
        );
    }
    if !report.dangling.is_empty() {
        let _ = writeln!(
            out,
            "Missing from list: {}",
            join(report.dangling.iter().map(u32::to_string))
        );
    }
    if !report.duplicates.is_empty() {
        let _ = writeln!(
            out,
            "Cited repeatedly:  {}",
            join(
                report
                    .duplicates
                    .iter()
                    .map(|(index, count)| format!("[{}] x{}", index, count))
            )
        );
    }

    let unresolved: Vec<_> = report
        .resolutions
        .iter()
        .filter_map(|r| match &r.result {
            MatchResult::Unresolved { reason } => Some((r, reason)),
            MatchResult::Resolved(_) => None,
        })
        .collect();
    if !unresolved.is_empty() {
        let _ = writeln!(out, "\nUnresolved references:");
        for (resolution, reason) in unresolved {
            let _ = writeln!(
                out,
                "  [{}] {} ({})",
                resolution.index,
                resolution.title,
                unresolved_label(reason)
            );
        }
    }

    let flagged: Vec<_> = report.flagged().collect();
    if !flagged.is_empty() {
        let _ = writeln!(out, "\nFlagged citations:");
        for outcome in flagged {
            let _ = writeln!(
                out,
                "  [{}] {}",
                outcome.reference_index, outcome.citing_sentence
            );
            if let Some(rationale) = &outcome.rationale {
                let _ = writeln!(out, "      {}", rationale);
            }
        }
    }

    let skipped: Vec<_> = report
        .skipped()
        .filter_map(|o| match &o.verdict {
            Verdict::Skipped { reason } if reason.is_failure() => Some((o, reason)),
            _ => None,
        })
        .collect();
    if !skipped.is_empty() {
        let _ = writeln!(out, "\nCould not check:");
        for (outcome, reason) in skipped {
            let _ = writeln!(
                out,
                "  [{}] at byte {}: {}",
                outcome.reference_index,
                outcome.marker_position,
                skip_label(reason)
            );
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use citecheck_core::{aggregate, CitationMarker, Reference, ReferenceResolution, RunHealth};
    use citecheck_core::{MatchedRecord, VerificationOutcome};
    use std::collections::BTreeSet;

    fn sample_report(health: RunHealth) -> Report {
        let references = vec![
            Reference::new(1, "[1] A.", "Deep residual learning for image recognition"),
            Reference::new(2, "[2] B.", "A survey that does not exist"),
        ];
        let markers = vec![CitationMarker {
            referenced_indices: BTreeSet::from([1, 4]),
            context_sentence: "ResNets train deep nets [1, 4].".to_string(),
            position: 24,
            raw: "[1, 4]".to_string(),
        }];
        let resolutions = vec![
            ReferenceResolution {
                index: 1,
                title: references[0].title.clone(),
                result: MatchResult::Resolved(MatchedRecord {
                    external_id: "1512.03385".to_string(),
                    title: references[0].title.clone(),
                    similarity_score: 1.0,
                    abstract_text: None,
                    venue: None,
                    url: None,
                }),
            },
            ReferenceResolution {
                index: 2,
                title: references[1].title.clone(),
                result: MatchResult::unresolved(UnresolvedReason::NoCandidates),
            },
        ];
        let outcomes = vec![
            VerificationOutcome::new(24, 1, "ResNets train deep nets [1, 4].", Verdict::Flagged)
                .with_rationale(Some("different topic".to_string())),
            VerificationOutcome::new(
                24,
                4,
                "ResNets train deep nets [1, 4].",
                Verdict::skipped(SkipReason::ReferenceNotInList),
            ),
        ];
        aggregate(&references, &markers, &resolutions, &outcomes, health)
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_text_summary() {
        let text = render_text(&sample_report(RunHealth::default()), "paper.txt", at());
        assert!(text.contains("Generated: 2024-05-01 12:00:00 UTC"));
        assert!(text.contains("Resolved:          50.0%"));
        assert!(text.contains("Accuracy:          0.0%"));
        assert!(text.contains("Uncited:           2"));
        assert!(text.contains("Missing from list: 4"));
        assert!(text.contains("[2] A survey that does not exist (not found)"));
        assert!(text.contains("      different topic"));
        assert!(!text.contains("INCOMPLETE"));
        // Absence of a reference is not a collaborator failure
        assert!(!text.contains("Could not check"));
    }

    #[test]
    fn test_cancelled_run_is_marked() {
        let health = RunHealth {
            cancelled: true,
            ..RunHealth::default()
        };
        let text = render_text(&sample_report(health), "paper.txt", at());
        assert!(text.contains("Status: INCOMPLETE"));
    }

    #[test]
    fn test_json_envelope() {
        let json = render_json(&sample_report(RunHealth::default()), "paper.txt", at()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["document"], "paper.txt");
        assert_eq!(value["generated_at"], "2024-05-01T12:00:00Z");
        assert_eq!(value["total_references"], 2);
        assert_eq!(value["outcomes"][0]["verdict"], "flagged");
    }
}
