//! Reference-list extraction
//!
//! Splits reference-list text into enumerated entries and derives a title
//! for each. Entries start at the beginning of a line with `[n]`, `n.` or
//! `(n)`; whichever convention has the most hits wins.

mod title;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, warn};

use crate::domain::Reference;
use crate::error::{CheckError, Result};
use crate::normalization::{collapse_whitespace, fix_hyphenation};

pub use title::extract_title;

lazy_static! {
    static ref BRACKET_PREFIX: Regex = Regex::new(r"^\s*\[(\d{1,4})\]\s*").unwrap();
    static ref DOTTED_PREFIX: Regex = Regex::new(r"^\s*(\d{1,4})\.\s+").unwrap();
    static ref PAREN_PREFIX: Regex = Regex::new(r"^\s*\((\d{1,4})\)\s*").unwrap();
}

/// Largest numbering gap tolerated for `n.` and `(n)` entries
const MAX_LOOSE_GAP: u32 = 3;

/// Enumeration convention of a reference list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Enumeration {
    Bracket,
    Dotted,
    Parenthesized,
}

impl Enumeration {
    const ALL: [Enumeration; 3] = [
        Enumeration::Bracket,
        Enumeration::Dotted,
        Enumeration::Parenthesized,
    ];

    fn prefix(self) -> &'static Regex {
        match self {
            Enumeration::Bracket => &BRACKET_PREFIX,
            Enumeration::Dotted => &DOTTED_PREFIX,
            Enumeration::Parenthesized => &PAREN_PREFIX,
        }
    }

    /// Whether `next` may follow `previous` as the next entry number
    fn accepts(self, previous: Option<u32>, next: u32) -> bool {
        let previous = previous.unwrap_or(0);
        if next <= previous {
            return false;
        }
        match self {
            Enumeration::Bracket => true,
            // Stray line-initial numbers (years, page numbers) jump too far
            Enumeration::Dotted | Enumeration::Parenthesized => next - previous <= MAX_LOOSE_GAP,
        }
    }
}

/// An entry start: line number, entry number, byte length of the prefix
#[derive(Debug, Clone, Copy)]
struct EntryStart {
    line: usize,
    index: u32,
    prefix_len: usize,
}

fn entry_starts(lines: &[&str], style: Enumeration) -> Vec<EntryStart> {
    let mut starts: Vec<EntryStart> = Vec::new();
    for (line_no, line) in lines.iter().enumerate() {
        let Some(caps) = style.prefix().captures(line) else {
            continue;
        };
        let Ok(index) = caps[1].parse::<u32>() else {
            continue;
        };
        if style.accepts(starts.last().map(|s| s.index), index) {
            starts.push(EntryStart {
                line: line_no,
                index,
                prefix_len: caps[0].len(),
            });
        }
    }
    starts
}

/// Parse reference-list text into references in list order
///
/// Empty text yields an empty list. Non-empty text in which no enumerated
/// entry can be found is an error.
pub fn extract_references(text: &str) -> Result<Vec<Reference>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let lines: Vec<&str> = text.lines().collect();

    // Ties go to the earlier convention in `ALL`
    let mut best: Vec<EntryStart> = Vec::new();
    let mut best_style = Enumeration::Bracket;
    for style in Enumeration::ALL {
        let starts = entry_starts(&lines, style);
        if starts.len() > best.len() {
            best = starts;
            best_style = style;
        }
    }

    if best.is_empty() {
        let non_empty = lines.iter().filter(|l| !l.trim().is_empty()).count();
        warn!("No enumerated entries in reference list ({} lines)", non_empty);
        return Err(CheckError::UnparsableReferenceList { lines: non_empty });
    }
    debug!(
        "Reference list uses {:?} numbering, {} entries",
        best_style,
        best.len()
    );

    let mut references = Vec::with_capacity(best.len());
    for (i, start) in best.iter().enumerate() {
        let end_line = best.get(i + 1).map(|s| s.line).unwrap_or(lines.len());
        let mut entry = lines[start.line][start.prefix_len..].to_string();
        for line in &lines[start.line + 1..end_line] {
            entry.push('\n');
            entry.push_str(line);
        }

        let raw_text = collapse_whitespace(&fix_hyphenation(&entry));
        let title = extract_title(&raw_text);
        let reference = Reference::new(start.index, raw_text, title);
        if !reference.has_title() {
            debug!("Reference [{}] has no usable title", reference.index);
        }
        references.push(reference);
    }

    Ok(references)
}
