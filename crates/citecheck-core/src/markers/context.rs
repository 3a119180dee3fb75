//! Sentence context around a citation marker

use lazy_static::lazy_static;
use regex::Regex;

use crate::normalization::collapse_whitespace;

lazy_static! {
    static ref BLANK_LINE: Regex = Regex::new(r"\n[ \t\r]*\n").unwrap();
}

/// Words whose trailing period does not end a sentence (compared lowercased)
const ABBREVIATIONS: &[&str] = &[
    "al", "e.g", "i.e", "cf", "vs", "viz", "fig", "figs", "eq", "eqs", "sec", "ch", "tab", "no",
    "nos", "vol", "pp", "ref", "refs", "approx", "resp", "dr", "prof", "mr", "mrs", "ms", "jr",
    "st",
];

/// A sentence terminator: its byte offset and the offset just past it
#[derive(Debug, Clone, Copy)]
struct Stop {
    at: usize,
    after: usize,
}

/// The sentence containing the marker at `start..end`, whitespace collapsed
///
/// A marker placed right after a full stop (`... shown before. [3]`) belongs
/// to the sentence it follows.
pub fn sentence_around(body: &str, start: usize, end: usize) -> String {
    let para_start = BLANK_LINE.find_iter(&body[..start]).last().map(|m| m.end());
    let para_end = BLANK_LINE.find(&body[end..]).map(|m| end + m.start());
    let lower = para_start.unwrap_or(0);

    let (sentence_start, sentence_end) = match last_stop(body, lower, start) {
        Some(stop) if body[stop.after..start].trim().is_empty() => {
            let previous = last_stop(body, lower, stop.at)
                .map(|s| s.after)
                .or(para_start)
                .unwrap_or_else(|| line_start(body, stop.at));
            (previous, end)
        }
        found => {
            let from = found
                .map(|s| s.after)
                .or(para_start)
                .unwrap_or_else(|| line_start(body, start));
            let upper = para_end.unwrap_or(body.len());
            let to = next_stop(body, end, upper)
                .map(|s| s.after)
                .or(para_end)
                .unwrap_or_else(|| line_end(body, end));
            (from, to)
        }
    };

    collapse_whitespace(&body[sentence_start..sentence_end])
}

/// Nearest terminator in `body[lower..limit]`, scanning backwards
fn last_stop(body: &str, lower: usize, limit: usize) -> Option<Stop> {
    for (offset, c) in body[lower..limit].char_indices().rev() {
        let at = lower + offset;
        let after = at + c.len_utf8();
        if is_cjk_terminator(c) {
            return Some(Stop { at, after });
        }
        if matches!(c, '.' | '!' | '?') {
            let followed_by_break =
                after >= limit || body[after..].starts_with(|n: char| n.is_whitespace());
            if followed_by_break && !(c == '.' && is_non_terminal_period(body, at)) {
                return Some(Stop { at, after });
            }
        }
    }
    None
}

/// First terminator in `body[from..upper]`
fn next_stop(body: &str, from: usize, upper: usize) -> Option<Stop> {
    for (offset, c) in body[from..upper].char_indices() {
        let at = from + offset;
        let after = at + c.len_utf8();
        if is_cjk_terminator(c) {
            return Some(Stop { at, after });
        }
        if matches!(c, '.' | '!' | '?') {
            let rest = &body[after..];
            let followed_by_break = rest.is_empty() || rest.starts_with(|n: char| n.is_whitespace());
            if followed_by_break && !(c == '.' && is_non_terminal_period(body, at)) {
                return Some(Stop { at, after });
            }
        }
    }
    None
}

fn is_cjk_terminator(c: char) -> bool {
    matches!(c, '。' | '！' | '？')
}

/// Periods after abbreviations, single-letter initials and inside decimals
fn is_non_terminal_period(body: &str, at: usize) -> bool {
    let before = &body[..at];
    let word_start = before
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace() || matches!(c, '(' | '[' | '"'))
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    let word = &before[word_start..];
    if word.is_empty() {
        return false;
    }

    let mut chars = word.chars();
    if let (Some(only), None) = (chars.next(), chars.next()) {
        return only.is_uppercase();
    }

    if word.ends_with(|c: char| c.is_ascii_digit())
        && body[at + 1..].starts_with(|c: char| c.is_ascii_digit())
    {
        return true;
    }

    let lowered = word.to_lowercase();
    ABBREVIATIONS.contains(&lowered.as_str())
}

fn line_start(body: &str, pos: usize) -> usize {
    body[..pos].rfind('\n').map(|i| i + 1).unwrap_or(0)
}

fn line_end(body: &str, pos: usize) -> usize {
    body[pos..].find('\n').map(|i| pos + i).unwrap_or(body.len())
}
