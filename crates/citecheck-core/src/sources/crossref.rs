//! Crossref search source
//!
//! API docs: https://api.crossref.org/swagger-ui/index.html
//! Rate limit: Polite pool with email header, ~50 req/sec

use std::time::Duration;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use super::traits::{BibliographicSearch, Candidate, SourceError, SourceMetadata};
use crate::http::{HttpClient, HttpError};

lazy_static! {
    static ref JATS_TAG: Regex = Regex::new(r"</?jats:[^>]+>").unwrap();
}

#[derive(Debug, Deserialize)]
struct CrossrefResponse {
    message: CrossrefWorkList,
}

#[derive(Debug, Deserialize)]
struct CrossrefWorkList {
    #[serde(default)]
    items: Vec<CrossrefWork>,
}

#[derive(Debug, Deserialize)]
struct CrossrefWork {
    #[serde(rename = "DOI")]
    doi: String,
    title: Option<Vec<String>>,
    author: Option<Vec<CrossrefAuthor>>,
    #[serde(rename = "container-title")]
    container_title: Option<Vec<String>>,
    #[serde(rename = "published-print")]
    published_print: Option<CrossrefDate>,
    #[serde(rename = "published-online")]
    published_online: Option<CrossrefDate>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    #[serde(rename = "URL")]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CrossrefAuthor {
    given: Option<String>,
    family: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CrossrefDate {
    #[serde(rename = "date-parts")]
    date_parts: Option<Vec<Vec<i32>>>,
}

pub struct CrossrefSource {
    client: HttpClient,
    base_url: String,
    mailto: Option<String>,
}

impl CrossrefSource {
    pub fn new(timeout: Duration) -> Result<Self, HttpError> {
        Ok(Self {
            client: HttpClient::new("citecheck/0.1 (reference checker)", timeout)?,
            base_url: "https://api.crossref.org/works".to_string(),
            mailto: None,
        })
    }

    /// Contact address for Crossref's polite pool
    pub fn with_mailto(mut self, mailto: impl Into<String>) -> Self {
        self.mailto = Some(mailto.into());
        self
    }

    /// Parse Crossref search response
    pub fn parse_search_response(json: &str) -> Result<Vec<Candidate>, SourceError> {
        let response: CrossrefResponse = serde_json::from_str(json)
            .map_err(|e| SourceError::Parse(format!("Invalid Crossref JSON: {}", e)))?;

        Ok(response
            .message
            .items
            .into_iter()
            .filter_map(parse_work)
            .collect())
    }
}

#[async_trait]
impl BibliographicSearch for CrossrefSource {
    fn metadata(&self) -> SourceMetadata {
        SourceMetadata {
            id: "crossref",
            name: "Crossref",
            description: "DOI registration agency with metadata for scholarly works",
            base_url: "https://api.crossref.org",
            rate_limit_per_second: 50.0,
            requires_api_key: false,
        }
    }

    async fn search(
        &self,
        query_title: &str,
        max_results: u32,
    ) -> Result<Vec<Candidate>, SourceError> {
        if query_title.trim().is_empty() {
            return Err(SourceError::InvalidQuery("empty title".to_string()));
        }

        let rows = max_results.to_string();
        let mut params = vec![
            ("query.bibliographic", query_title),
            ("rows", rows.as_str()),
            ("select", "DOI,title,author,container-title,published-print,published-online,abstract,URL"),
        ];
        if let Some(mailto) = &self.mailto {
            params.push(("mailto", mailto.as_str()));
        }

        let response = self
            .client
            .get_with_params(&self.base_url, &params)
            .await?
            .error_for_status()?;

        let candidates = Self::parse_search_response(&response.body)?;
        debug!(
            "Crossref returned {} candidates for {:?}",
            candidates.len(),
            query_title
        );
        Ok(candidates)
    }
}

fn parse_work(work: CrossrefWork) -> Option<Candidate> {
    let title = work.title.and_then(|t| t.into_iter().next())?;

    let authors = work
        .author
        .unwrap_or_default()
        .into_iter()
        .filter_map(|a| {
            let family = a.family?;
            Some(match a.given {
                Some(given) => format!("{} {}", given, family),
                None => family,
            })
        })
        .collect();

    let year = work
        .published_print
        .or(work.published_online)
        .and_then(|d| d.date_parts)
        .and_then(|dp| dp.first().cloned())
        .and_then(|parts| parts.first().copied());

    Some(Candidate {
        url: work
            .url
            .or_else(|| Some(format!("https://doi.org/{}", work.doi))),
        external_id: work.doi,
        title,
        // Crossref often includes XML/JATS markup
        abstract_text: work.abstract_text.map(|a| strip_jats_markup(&a)),
        venue: work.container_title.and_then(|t| t.into_iter().next()),
        authors,
        year,
    })
}

/// Strip JATS XML markup from Crossref abstracts
fn strip_jats_markup(text: &str) -> String {
    JATS_TAG.replace_all(text, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RESPONSE: &str = r#"{
        "status": "ok",
        "message": {
            "items": [{
                "DOI": "10.1109/cvpr.2016.90",
                "title": ["Deep Residual Learning for Image Recognition"],
                "author": [{"given": "Kaiming", "family": "He"}, {"family": "Anonymous"}],
                "container-title": ["2016 IEEE Conference on Computer Vision and Pattern Recognition (CVPR)"],
                "published-print": {"date-parts": [[2016, 6]]},
                "abstract": "<jats:p>Deeper networks are <jats:italic>harder</jats:italic> to train.</jats:p>"
            }, {
                "DOI": "10.1234/untitled"
            }]
        }
    }"#;

    #[test]
    fn test_parse_search_response() {
        let results = CrossrefSource::parse_search_response(SAMPLE_RESPONSE).unwrap();
        // The untitled work is dropped
        assert_eq!(results.len(), 1);

        let work = &results[0];
        assert_eq!(work.external_id, "10.1109/cvpr.2016.90");
        assert_eq!(work.authors, vec!["Kaiming He", "Anonymous"]);
        assert_eq!(work.year, Some(2016));
        assert_eq!(
            work.abstract_text.as_deref(),
            Some("Deeper networks are harder to train.")
        );
        assert_eq!(
            work.url.as_deref(),
            Some("https://doi.org/10.1109/cvpr.2016.90")
        );
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        assert!(matches!(
            CrossrefSource::parse_search_response("not json"),
            Err(SourceError::Parse(_))
        ));
    }

    #[test]
    fn test_strip_jats_markup() {
        let input = "<jats:p>This is <jats:italic>italic</jats:italic> text.</jats:p>";
        assert_eq!(strip_jats_markup(input), "This is italic text.");
    }
}
