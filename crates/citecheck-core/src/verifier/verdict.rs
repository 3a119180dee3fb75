//! Parsing judge replies into verdicts
//!
//! Accepted forms:
//! - a JSON object `{"supported": true, "rationale": "...", "confidence": 0.9}`,
//!   bare or inside a code fence
//! - the tagged form `<yes>`, `<no: reason>`, `<是>`, `<否: reason>`; the last tag wins

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use super::{JudgeError, JudgeVerdict};

lazy_static! {
    static ref CODE_FENCE: Regex = Regex::new(r"(?s)```[a-zA-Z]*\s*(.*?)```").unwrap();
    static ref TAGGED: Regex =
        Regex::new(r"(?i)<\s*(yes|no|是|否)\s*(?:[:：]\s*([^>]*))?>").unwrap();
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    supported: bool,
    #[serde(default)]
    rationale: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

impl From<RawVerdict> for JudgeVerdict {
    fn from(raw: RawVerdict) -> Self {
        JudgeVerdict {
            supported: raw.supported,
            rationale: raw
                .rationale
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty()),
            confidence: raw
                .confidence
                .filter(|c| c.is_finite())
                .map(|c| c.clamp(0.0, 1.0)),
        }
    }
}

fn malformed(text: &str) -> JudgeError {
    JudgeError::MalformedVerdict {
        raw: text.chars().take(200).collect(),
    }
}

fn unfenced(text: &str) -> &str {
    CODE_FENCE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(text)
}

/// Parse a single-pair reply
pub fn parse_verdict(text: &str) -> Result<JudgeVerdict, JudgeError> {
    let body = unfenced(text).trim();

    if let (Some(start), Some(end)) = (body.find('{'), body.rfind('}')) {
        if start < end {
            if let Ok(raw) = serde_json::from_str::<RawVerdict>(&body[start..=end]) {
                return Ok(raw.into());
            }
        }
    }

    // The answer is the last tag; earlier ones may be quoted in the reasoning
    if let Some(caps) = TAGGED.captures_iter(body).last() {
        let supported = matches!(caps[1].to_lowercase().as_str(), "yes" | "是");
        let rationale = caps
            .get(2)
            .map(|m| m.as_str().trim().to_string())
            .filter(|r| !r.is_empty());
        return Ok(JudgeVerdict {
            supported,
            rationale,
            confidence: None,
        });
    }

    Err(malformed(text))
}

/// Parse a batched reply: a JSON array with one verdict per request, in order
///
/// A reply that is not an array of the expected length is malformed as a
/// whole; an array element that is not a verdict is malformed on its own.
pub fn parse_batch_verdicts(
    text: &str,
    expected: usize,
) -> Result<Vec<Result<JudgeVerdict, JudgeError>>, JudgeError> {
    let body = unfenced(text).trim();
    let (Some(start), Some(end)) = (body.find('['), body.rfind(']')) else {
        return Err(malformed(text));
    };
    if start >= end {
        return Err(malformed(text));
    }

    let items: Vec<serde_json::Value> =
        serde_json::from_str(&body[start..=end]).map_err(|_| malformed(text))?;
    if items.len() != expected {
        return Err(JudgeError::BatchSizeMismatch {
            expected,
            got: items.len(),
        });
    }

    Ok(items
        .into_iter()
        .map(|item| {
            let rendered = item.to_string();
            serde_json::from_value::<RawVerdict>(item)
                .map(JudgeVerdict::from)
                .map_err(|_| malformed(&rendered))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_verdict() {
        let verdict =
            parse_verdict(r#"{"supported": true, "rationale": "same method", "confidence": 0.8}"#)
                .unwrap();
        assert!(verdict.supported);
        assert_eq!(verdict.rationale.as_deref(), Some("same method"));
        assert_eq!(verdict.confidence, Some(0.8));
    }

    #[test]
    fn test_fenced_json_with_prose() {
        let reply = "Here is my answer:\n```json\n{\"supported\": false, \"rationale\": \"unrelated\"}\n```";
        let verdict = parse_verdict(reply).unwrap();
        assert!(!verdict.supported);
        assert_eq!(verdict.rationale.as_deref(), Some("unrelated"));
        assert_eq!(verdict.confidence, None);
    }

    #[test]
    fn test_confidence_is_clamped() {
        let verdict = parse_verdict(r#"{"supported": true, "confidence": 1.7}"#).unwrap();
        assert_eq!(verdict.confidence, Some(1.0));
    }

    #[test]
    fn test_tagged_verdicts() {
        assert!(parse_verdict("<yes>").unwrap().supported);
        assert!(parse_verdict("<是>").unwrap().supported);

        let no = parse_verdict("<no: the paper is about audio>").unwrap();
        assert!(!no.supported);
        assert_eq!(no.rationale.as_deref(), Some("the paper is about audio"));

        let fou = parse_verdict("<否：主题无关>").unwrap();
        assert!(!fou.supported);
        assert_eq!(fou.rationale.as_deref(), Some("主题无关"));
    }

    #[test]
    fn test_last_tag_is_the_answer() {
        let quoted = parse_verdict("This is not simply <yes>; <no: off-topic>").unwrap();
        assert!(!quoted.supported);
        assert_eq!(quoted.rationale.as_deref(), Some("off-topic"));

        let revised = parse_verdict("First thought <否: 不相关>, but on reflection <是>").unwrap();
        assert!(revised.supported);
        assert_eq!(revised.rationale, None);
    }

    #[test]
    fn test_malformed_verdict() {
        assert!(matches!(
            parse_verdict("I think it probably is relevant"),
            Err(JudgeError::MalformedVerdict { .. })
        ));
        assert!(matches!(
            parse_verdict(r#"{"relevant": "maybe"}"#),
            Err(JudgeError::MalformedVerdict { .. })
        ));
    }

    #[test]
    fn test_batch_verdicts() {
        let reply = r#"[{"supported": true}, {"oops": 1}, {"supported": false, "rationale": "no"}]"#;
        let results = parse_batch_verdicts(reply, 3).unwrap();
        assert!(results[0].as_ref().unwrap().supported);
        assert!(results[1].is_err());
        assert!(!results[2].as_ref().unwrap().supported);
    }

    #[test]
    fn test_batch_length_mismatch() {
        assert_eq!(
            parse_batch_verdicts(r#"[{"supported": true}]"#, 2).unwrap_err(),
            JudgeError::BatchSizeMismatch {
                expected: 2,
                got: 1
            }
        );
        assert!(parse_batch_verdicts("no array here", 1).is_err());
    }
}
