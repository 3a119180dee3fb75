//! In-text citation marker parsing
//!
//! A [`MarkerParser`] scans body text with a [`MarkerGrammar`] and yields one
//! [`CitationMarker`] per occurrence, together with the sentence around it.
//! Iteration is lazy, and [`MarkerParser::markers`] can be called again to
//! restart from the beginning of the text.

mod author_year;
mod context;
mod numeric;

use std::collections::BTreeSet;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{CitationMarker, Reference};
use crate::error::{CheckError, Result};

pub use author_year::AuthorYearGrammar;
pub use context::sentence_around;
pub use numeric::{NumericBracketGrammar, MAX_RANGE_SPAN};

/// Citation marker conventions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarkerStyle {
    /// `[1]`, `[2, 3]`, `[4-6]`
    #[default]
    NumericBracket,
    /// `(Smith, 2020)`, `(Doe et al., 2019; Roe 2021)`
    AuthorYear,
}

/// How a grammar reads one candidate span
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interpretation {
    /// A citation of these reference indices
    Marker(BTreeSet<u32>),
    /// Looks like a citation but cannot be parsed
    Malformed(String),
    /// Ordinary text that happens to match the candidate pattern
    NotAMarker,
}

/// A citation marker convention
pub trait MarkerGrammar: Send + Sync {
    /// Byte ranges of candidate spans, in document order
    fn candidates<'t>(&'t self, body: &'t str) -> Box<dyn Iterator<Item = Range<usize>> + 't>;

    /// Decide what a candidate span means
    fn interpret(&self, raw: &str) -> Interpretation;
}

/// Scans one body text for citation markers
pub struct MarkerParser<'a> {
    body: &'a str,
    grammar: Box<dyn MarkerGrammar + 'a>,
}

impl<'a> MarkerParser<'a> {
    pub fn new(body: &'a str, grammar: Box<dyn MarkerGrammar + 'a>) -> Self {
        Self { body, grammar }
    }

    /// Parser for the numeric bracket convention
    pub fn numeric(body: &'a str) -> Self {
        Self::new(body, Box::new(NumericBracketGrammar))
    }

    /// Parser for a configured style; author-year markers are mapped through `references`
    pub fn for_style(style: MarkerStyle, body: &'a str, references: &[Reference]) -> Self {
        match style {
            MarkerStyle::NumericBracket => Self::numeric(body),
            MarkerStyle::AuthorYear => {
                Self::new(body, Box::new(AuthorYearGrammar::new(references)))
            }
        }
    }

    /// A fresh iterator over the markers, from the start of the text
    pub fn markers(&self) -> Markers<'_> {
        Markers {
            body: self.body,
            grammar: self.grammar.as_ref(),
            candidates: self.grammar.candidates(self.body),
        }
    }

    /// All well-formed markers; malformed ones are logged and skipped
    pub fn collect_valid(&self) -> Vec<CitationMarker> {
        let mut markers = Vec::new();
        for item in self.markers() {
            match item {
                Ok(marker) => markers.push(marker),
                Err(e) => warn!("Skipping citation marker: {}", e),
            }
        }
        debug!("Found {} citation markers", markers.len());
        markers
    }
}

/// Lazy marker iterator, see [`MarkerParser::markers`]
pub struct Markers<'p> {
    body: &'p str,
    grammar: &'p dyn MarkerGrammar,
    candidates: Box<dyn Iterator<Item = Range<usize>> + 'p>,
}

impl Iterator for Markers<'_> {
    type Item = Result<CitationMarker>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let span = self.candidates.next()?;
            let raw = &self.body[span.clone()];
            match self.grammar.interpret(raw) {
                Interpretation::NotAMarker => continue,
                Interpretation::Malformed(reason) => {
                    return Some(Err(CheckError::malformed(raw, reason)));
                }
                Interpretation::Marker(indices) => {
                    return Some(Ok(CitationMarker {
                        referenced_indices: indices,
                        context_sentence: sentence_around(self.body, span.start, span.end),
                        position: span.start,
                        raw: raw.to_string(),
                    }));
                }
            }
        }
    }
}
