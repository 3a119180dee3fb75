//! Document text sources
//!
//! The pipeline only needs two strings: the body text (on which marker
//! offsets are measured) and the reference-list text.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref REFERENCES_HEADING: Regex = Regex::new(
        r"(?mi)^[ \t]*(?:\d+\.?[ \t]*)?(?:references|bibliography|works cited|参考文献)[ \t]*[:：]?[ \t]*$"
    )
    .unwrap();
}

/// Supplies the text of a document
pub trait DocumentTextSource: Send + Sync {
    fn get_body_text(&self) -> String;
    fn get_reference_list_text(&self) -> String;
}

/// A document already split into body segments and a reference list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub body_segments: Vec<String>,
    pub reference_list: String,
}

impl Document {
    pub fn new(body_segments: Vec<String>, reference_list: impl Into<String>) -> Self {
        Self {
            body_segments,
            reference_list: reference_list.into(),
        }
    }

    /// Single-segment document
    pub fn from_text(body: impl Into<String>, reference_list: impl Into<String>) -> Self {
        Self::new(vec![body.into()], reference_list)
    }
}

impl DocumentTextSource for Document {
    /// Segments joined with a newline
    fn get_body_text(&self) -> String {
        self.body_segments.join("\n")
    }

    fn get_reference_list_text(&self) -> String {
        self.reference_list.clone()
    }
}

/// Plain text pages of a whole document, reference list included
///
/// The reference list starts after the last "References" / "Bibliography" /
/// "参考文献" heading line. Without such a heading the whole text is body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PagedText {
    pages: Vec<String>,
}

impl PagedText {
    pub fn new(pages: Vec<String>) -> Self {
        Self { pages }
    }

    /// Split extracted text at form feeds, the usual page separator
    pub fn from_text(text: &str) -> Self {
        Self::new(text.split('\u{c}').map(str::to_string).collect())
    }

    pub fn get_pages(&self) -> &[String] {
        &self.pages
    }

    fn full_text(&self) -> String {
        self.pages.join("\n")
    }

    /// Byte range of the heading line, if any
    fn heading(text: &str) -> Option<(usize, usize)> {
        REFERENCES_HEADING
            .find_iter(text)
            .last()
            .map(|m| (m.start(), m.end()))
    }
}

impl DocumentTextSource for PagedText {
    fn get_body_text(&self) -> String {
        let text = self.full_text();
        match Self::heading(&text) {
            Some((start, _)) => text[..start].trim_end().to_string(),
            None => text,
        }
    }

    fn get_reference_list_text(&self) -> String {
        let text = self.full_text();
        match Self::heading(&text) {
            Some((_, end)) => text[end..].trim().to_string(),
            None => String::new(),
        }
    }
}
