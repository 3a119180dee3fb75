//! Title extraction from a single reference entry
//!
//! Handles the common layouts:
//! - IEEE: `K. He, "Deep residual learning," in CVPR, 2016.`
//! - ACM / NeurIPS: `K. He and J. Sun. 2016. Deep residual learning. In CVPR.`
//! - APA / Harvard: `He, K. (2016). Deep residual learning. Journal.`
//! - LNCS: `He, K., Sun, J.: Deep residual learning. In: CVPR (2016)`
//! - GB/T 7714: `何凯明, 等. 深度残差学习[J]. 计算机学报, 2016.`

use lazy_static::lazy_static;
use regex::Regex;

use crate::normalization::{collapse_whitespace, fix_hyphenation};

lazy_static! {
    static ref QUOTED: Regex =
        Regex::new(r#"[“"]([^“”"]{4,})[”"]"#).unwrap();
    static ref LNCS_AUTHORS_END: Regex = Regex::new(r"\b\p{Lu}\.:\s+").unwrap();
    static ref HARVARD_YEAR: Regex =
        Regex::new(r"\((?:19|20)\d{2}[a-z]?\)[.,:]?\s*").unwrap();
    static ref LEADING_YEAR: Regex =
        Regex::new(r"^\((?:19|20)\d{2}[a-z]?\)[.,:]?\s*").unwrap();
    static ref BARE_YEAR: Regex = Regex::new(r"^\(?(?:19|20)\d{2}[a-z]?\)?$").unwrap();
    static ref VENUE_MARKER: Regex = Regex::new(
        r"\[(?:J|C|M|D|R|N|P|S|Z|A|G|EB/OL|DB/OL|J/OL|M/OL|C/OL|CP/DK)\]|\s+In:\s|\s+In Proceedings|\s*arXiv preprint|\s*Proceedings of"
    )
    .unwrap();
}

/// Abbreviations that never end a segment
const MID_SENTENCE_ABBREVIATIONS: &[&str] = &[
    "vs", "e.g", "i.e", "cf", "fig", "figs", "eq", "eqs", "sec", "ch", "pt", "no", "vol", "pp",
    "ed", "eds",
];

/// Extract the display title of one entry (prefix already stripped)
pub fn extract_title(entry: &str) -> String {
    let text = collapse_whitespace(&fix_hyphenation(entry));

    if let Some(caps) = QUOTED.captures(&text) {
        return clean(&caps[1]);
    }

    if let Some(m) = LNCS_AUTHORS_END.find(&text) {
        let rest = &text[m.end()..];
        if let Some(first) = split_segments(rest).into_iter().next() {
            return clean(&first);
        }
    }

    let segments = split_segments(&text);
    let candidate = match segments.as_slice() {
        [] => String::new(),
        [only] => only.clone(),
        [authors, rest @ ..] => {
            // "Smith J (2020) Title ..." keeps the title in the author segment
            let harvard = HARVARD_YEAR
                .find(authors)
                .map(|m| authors[m.end()..].trim())
                .filter(|after| after.split_whitespace().count() >= 2);
            match harvard {
                Some(after) => after.to_string(),
                None => rest
                    .iter()
                    .find(|s| !BARE_YEAR.is_match(s.trim()))
                    .cloned()
                    .unwrap_or_default(),
            }
        }
    };

    clean(&LEADING_YEAR.replace(&candidate, ""))
}

/// Cut venue tails and trailing punctuation
fn clean(title: &str) -> String {
    let mut title = title.trim();
    if let Some(m) = VENUE_MARKER.find(title) {
        if m.start() > 0 {
            title = &title[..m.start()];
        }
    }
    title
        .trim()
        .trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ':' | '/'))
        .trim()
        .to_string()
}

/// Split at periods that end a sentence-like segment
///
/// A period after a single-letter initial only ends a segment when it is
/// followed by a capitalized word that is not itself part of a name list.
fn split_segments(text: &str) -> Vec<String> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let mut segments = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        current.push(*token);
        if token.ends_with('.') && is_boundary(&tokens, i) {
            push_segment(&mut segments, &current);
            current.clear();
        }
    }
    push_segment(&mut segments, &current);
    segments
}

fn push_segment(segments: &mut Vec<String>, tokens: &[&str]) {
    let joined = tokens.join(" ");
    let segment = joined.trim_end_matches('.').trim();
    if !segment.is_empty() {
        segments.push(segment.to_string());
    }
}

fn is_boundary(tokens: &[&str], i: usize) -> bool {
    let word = tokens[i]
        .trim_end_matches('.')
        .trim_start_matches(|c: char| matches!(c, '(' | '"' | '“'));
    if word.is_empty() {
        return true;
    }

    if is_initial(word) {
        let Some(next) = tokens.get(i + 1) else {
            return true;
        };
        let next_is_word = next.chars().next().is_some_and(char::is_uppercase)
            && next.chars().count() > 1
            && !next.ends_with(',')
            && !next.ends_with('.');
        let Some(after) = tokens.get(i + 2) else {
            return false;
        };
        let after_word = after.trim_end_matches(|c: char| c == '.' || c == ',');
        return next_is_word
            && !matches!(after_word, "and" | "&" | "et")
            && !is_initial(after_word);
    }

    let lowered = word.to_lowercase();
    if lowered == "al" {
        return true;
    }
    !MID_SENTENCE_ABBREVIATIONS.contains(&lowered.as_str())
}

/// `J`, `J.-P`, `M.A` style initials (letters never adjacent)
fn is_initial(word: &str) -> bool {
    let mut letters = 0;
    let mut previous_was_letter = false;
    for c in word.chars() {
        if c.is_alphabetic() {
            if !c.is_uppercase() || previous_was_letter {
                return false;
            }
            letters += 1;
            previous_was_letter = true;
        } else if c == '.' || c == '-' {
            previous_was_letter = false;
        } else {
            return false;
        }
    }
    letters > 0
}
