//! Common traits for bibliographic search sources

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::http::HttpError;
use crate::retry::Transient;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("{0}")]
    Http(HttpError),
    #[error("Could not parse response: {0}")]
    Parse(String),
    #[error("Rate limited")]
    RateLimit { retry_after: Option<Duration> },
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

impl From<HttpError> for SourceError {
    fn from(e: HttpError) -> Self {
        match e {
            HttpError::RateLimited { retry_after } => SourceError::RateLimit { retry_after },
            other => SourceError::Http(other),
        }
    }
}

impl Transient for SourceError {
    fn is_transient(&self) -> bool {
        match self {
            SourceError::Http(e) => e.is_transient(),
            SourceError::RateLimit { .. } => true,
            SourceError::Parse(_) | SourceError::InvalidQuery(_) => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            SourceError::RateLimit { retry_after } => *retry_after,
            SourceError::Http(e) => e.retry_after(),
            _ => None,
        }
    }
}

/// Metadata about a source
#[derive(Debug, Clone, PartialEq)]
pub struct SourceMetadata {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub base_url: &'static str,
    pub rate_limit_per_second: f32,
    pub requires_api_key: bool,
}

/// One search hit as returned by a bibliographic index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub title: String,
    /// arXiv id, DOI, or whatever the index uses
    pub external_id: String,
    pub abstract_text: Option<String>,
    /// Journal, conference or primary category
    pub venue: Option<String>,
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub url: Option<String>,
}

impl Candidate {
    pub fn new(external_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    /// Builder: set abstract
    pub fn with_abstract(mut self, abstract_text: impl Into<String>) -> Self {
        self.abstract_text = Some(abstract_text.into());
        self
    }

    /// Builder: set venue
    pub fn with_venue(mut self, venue: impl Into<String>) -> Self {
        self.venue = Some(venue.into());
        self
    }
}

/// A bibliographic index that can be searched by title
#[async_trait]
pub trait BibliographicSearch: Send + Sync {
    fn metadata(&self) -> SourceMetadata;

    /// Candidates for a normalized title, best first as the index ranks them
    async fn search(&self, query_title: &str, max_results: u32)
        -> Result<Vec<Candidate>, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_maps_from_http() {
        let err: SourceError = HttpError::RateLimited {
            retry_after: Some(Duration::from_secs(2)),
        }
        .into();
        assert!(err.is_transient());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_parse_errors_are_permanent() {
        assert!(!SourceError::Parse("bad xml".to_string()).is_transient());
        assert!(!SourceError::from(HttpError::Status { status: 400 }).is_transient());
        assert!(SourceError::from(HttpError::Status { status: 500 }).is_transient());
    }
}
