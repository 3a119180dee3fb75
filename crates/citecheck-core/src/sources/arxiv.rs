//! arXiv search source with Atom feed parsing
//!
//! API docs: https://arxiv.org/help/api/user-manual
//! Rate limit: 1 request per 3 seconds

use std::time::Duration;

use async_trait::async_trait;
use lazy_static::lazy_static;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use tracing::debug;

use super::traits::{BibliographicSearch, Candidate, SourceError, SourceMetadata};
use crate::http::{HttpClient, HttpError};

lazy_static! {
    static ref ARXIV_NEW_ID: Regex = Regex::new(r"(\d{4}\.\d{4,5})(v\d+)?").unwrap();
    static ref ARXIV_OLD_ID: Regex = Regex::new(r"([a-z-]+/\d{7})").unwrap();
}

pub struct ArxivSource {
    client: HttpClient,
    base_url: String,
}

impl ArxivSource {
    pub fn new(timeout: Duration) -> Result<Self, HttpError> {
        Ok(Self {
            client: HttpClient::new("citecheck/0.1 (reference checker)", timeout)?,
            base_url: "http://export.arxiv.org/api/query".to_string(),
        })
    }

    /// Point at a different endpoint (mirrors, test servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl BibliographicSearch for ArxivSource {
    fn metadata(&self) -> SourceMetadata {
        SourceMetadata {
            id: "arxiv",
            name: "arXiv",
            description: "Open-access preprint server for physics, math, CS, and more",
            base_url: "https://arxiv.org",
            rate_limit_per_second: 0.33, // 1 per 3 seconds
            requires_api_key: false,
        }
    }

    async fn search(
        &self,
        query_title: &str,
        max_results: u32,
    ) -> Result<Vec<Candidate>, SourceError> {
        let api_query = build_title_query(query_title)?;
        let max_results = max_results.to_string();
        let params = [
            ("search_query", api_query.as_str()),
            ("max_results", max_results.as_str()),
            ("sortBy", "relevance"),
            ("sortOrder", "descending"),
        ];

        let response = self
            .client
            .get_with_params(&self.base_url, &params)
            .await?
            .error_for_status()?;

        let candidates = parse_atom_feed(&response.body)?;
        debug!("arXiv returned {} candidates for {:?}", candidates.len(), query_title);
        Ok(candidates)
    }
}

/// Title phrase query, `ti:"deep residual learning"`
pub fn build_title_query(title: &str) -> Result<String, SourceError> {
    let clean = title
        .trim()
        .trim_matches('"')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if clean.is_empty() {
        return Err(SourceError::InvalidQuery("empty title".to_string()));
    }
    if clean.contains(' ') {
        Ok(format!("ti:\"{}\"", clean))
    } else {
        Ok(format!("ti:{}", clean))
    }
}

/// Fields of the `<entry>` being read
#[derive(Default)]
struct EntryFields {
    id: String,
    title: String,
    summary: String,
    published: String,
    doi: Option<String>,
    authors: Vec<String>,
    web_url: Option<String>,
    primary_category: Option<String>,
}

impl EntryFields {
    fn into_candidate(self) -> Option<Candidate> {
        if self.title.is_empty() {
            return None;
        }

        let arxiv_id = extract_arxiv_id(&self.id);
        Some(Candidate {
            external_id: arxiv_id.unwrap_or(self.id),
            title: self.title,
            abstract_text: Some(self.summary).filter(|s| !s.is_empty()),
            venue: self.primary_category.map(|c| format!("arXiv:{}", c)),
            authors: self.authors,
            // published is YYYY-MM-DDTHH:MM:SSZ
            year: self.published.get(..4).and_then(|y| y.parse().ok()),
            url: self
                .web_url
                .or_else(|| self.doi.map(|d| format!("https://doi.org/{}", d))),
        })
    }

    /// Attributes of `<link>` and `<arxiv:primary_category>`, open or self-closing
    fn read_attributes(&mut self, e: &BytesStart) {
        match e.name().as_ref() {
            b"link" => {
                let mut href = None;
                let mut rel = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"href" => href = Some(String::from_utf8_lossy(&attr.value).to_string()),
                        b"rel" => rel = Some(String::from_utf8_lossy(&attr.value).to_string()),
                        _ => {}
                    }
                }
                if rel.as_deref() == Some("alternate") {
                    self.web_url = href;
                }
            }
            b"arxiv:primary_category" => {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"term" {
                        self.primary_category =
                            Some(String::from_utf8_lossy(&attr.value).to_string());
                    }
                }
            }
            _ => {}
        }
    }
}

/// Parse an arXiv Atom feed into candidates, in feed order
pub fn parse_atom_feed(xml: &str) -> Result<Vec<Candidate>, SourceError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut candidates = Vec::new();
    let mut buf = Vec::new();

    let mut entry: Option<EntryFields> = None;
    let mut current_element = String::new();
    let mut in_author = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match name.as_str() {
                    "entry" => entry = Some(EntryFields::default()),
                    "author" => in_author = true,
                    _ => {
                        if let Some(fields) = entry.as_mut() {
                            fields.read_attributes(e);
                        }
                    }
                }
                current_element = name;
            }
            Ok(Event::Empty(ref e)) => {
                if let Some(fields) = entry.as_mut() {
                    fields.read_attributes(e);
                }
            }
            Ok(Event::End(ref e)) => {
                match e.name().as_ref() {
                    b"entry" => {
                        if let Some(candidate) = entry.take().and_then(EntryFields::into_candidate)
                        {
                            candidates.push(candidate);
                        }
                    }
                    b"author" => in_author = false,
                    _ => {}
                }
                current_element.clear();
            }
            Ok(Event::Text(e)) => {
                if let Some(fields) = entry.as_mut() {
                    let text = e.unescape().unwrap_or_default().to_string();
                    match current_element.as_str() {
                        "id" => fields.id = text,
                        "title" => fields.title = clean_title(&text),
                        "summary" => fields.summary = clean_title(&text),
                        "published" => fields.published = text,
                        "name" if in_author => fields.authors.push(text),
                        "arxiv:doi" => fields.doi = Some(text),
                        _ => {}
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(SourceError::Parse(format!("XML parse error: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    Ok(candidates)
}

fn clean_title(title: &str) -> String {
    title.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract arXiv ID from URL or ID string
fn extract_arxiv_id(id: &str) -> Option<String> {
    // New format: 2301.12345
    if let Some(cap) = ARXIV_NEW_ID.captures(id) {
        return cap.get(1).map(|m| m.as_str().to_string());
    }
    // Old format: hep-th/9901001
    ARXIV_OLD_ID
        .captures(id)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}
