//! Author-year markers: `(Smith, 2020)`, `(Doe et al., 2019; Roe and Poe 2021a)`
//!
//! Each part is mapped to the references whose raw text mentions the first
//! author's surname and the year.

use std::collections::BTreeSet;
use std::ops::Range;

use lazy_static::lazy_static;
use regex::Regex;

use super::{Interpretation, MarkerGrammar};
use crate::domain::Reference;

lazy_static! {
    static ref PARENTHETICAL: Regex = Regex::new(r"\([^()\n]{3,200}\)").unwrap();
    static ref CITATION_PART: Regex = Regex::new(
        r"^(?:see\s+|e\.g\.,?\s+|cf\.\s+)?(\p{Lu}[\p{L}'\-]+)(?:\s+et\s+al\.?|\s+(?:and|&)\s+\p{Lu}[\p{L}'\-]+)?,?\s+((?:19|20)\d{2})([a-z])?$"
    )
    .unwrap();
    static ref YEAR: Regex = Regex::new(r"\b(?:19|20)\d{2}[a-z]?\b").unwrap();
}

#[derive(Debug, Clone)]
struct IndexedEntry {
    index: u32,
    lowered: String,
}

/// Author-year marker grammar bound to one reference list
#[derive(Debug, Clone)]
pub struct AuthorYearGrammar {
    entries: Vec<IndexedEntry>,
}

impl AuthorYearGrammar {
    pub fn new(references: &[Reference]) -> Self {
        Self {
            entries: references
                .iter()
                .map(|r| IndexedEntry {
                    index: r.index,
                    lowered: r.raw_text.to_lowercase(),
                })
                .collect(),
        }
    }

    fn lookup(&self, surname: &str, year: &str, suffix: Option<&str>) -> Vec<u32> {
        let surname = surname.to_lowercase();
        let matches = |needle: &str| -> Vec<u32> {
            self.entries
                .iter()
                .filter(|e| e.lowered.contains(&surname) && e.lowered.contains(needle))
                .map(|e| e.index)
                .collect()
        };

        // "2019a" narrows the match when the list spells the suffix out
        if let Some(suffix) = suffix {
            let with_suffix = matches(&format!("{}{}", year, suffix));
            if !with_suffix.is_empty() {
                return with_suffix;
            }
        }
        matches(year)
    }
}

impl MarkerGrammar for AuthorYearGrammar {
    fn candidates<'t>(&'t self, body: &'t str) -> Box<dyn Iterator<Item = Range<usize>> + 't> {
        Box::new(PARENTHETICAL.find_iter(body).map(|m| m.range()))
    }

    fn interpret(&self, raw: &str) -> Interpretation {
        let inner = raw.trim_start_matches('(').trim_end_matches(')').trim();
        if !YEAR.is_match(inner) {
            return Interpretation::NotAMarker;
        }

        let parts: Vec<&str> = inner
            .split(';')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        let parsed: Vec<_> = parts.iter().map(|p| CITATION_PART.captures(p)).collect();

        if parsed.iter().all(Option::is_none) {
            // "(published in 2020)", "(n = 2021)" and similar
            return Interpretation::NotAMarker;
        }

        let mut indices = BTreeSet::new();
        for (part, captures) in parts.iter().zip(parsed) {
            let Some(caps) = captures else {
                return Interpretation::Malformed(format!("{:?} is not an author-year citation", part));
            };
            let surname = &caps[1];
            let year = &caps[2];
            let found = self.lookup(surname, year, caps.get(3).map(|m| m.as_str()));
            if found.is_empty() {
                return Interpretation::Malformed(format!(
                    "no reference matches {} {}",
                    surname, year
                ));
            }
            indices.extend(found);
        }

        Interpretation::Marker(indices)
    }
}
