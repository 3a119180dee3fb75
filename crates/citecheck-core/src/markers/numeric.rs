//! Numeric bracket markers: `[1]`, `[2, 3]`, `[4-6]`, `[1, 3–5]`

use std::collections::BTreeSet;
use std::ops::Range;

use lazy_static::lazy_static;
use regex::Regex;

use super::{Interpretation, MarkerGrammar};

/// Widest range a single marker may span
pub const MAX_RANGE_SPAN: u32 = 500;

lazy_static! {
    static ref BRACKET_GROUP: Regex = Regex::new(r"\[[^\[\]\n]{0,120}\]").unwrap();
}

/// List separators (ASCII and full-width forms used in CJK text)
fn is_list_separator(c: char) -> bool {
    matches!(c, ',' | '，' | '、' | ';' | '；')
}

/// Range dashes: hyphen, en dash, em dash
fn is_range_dash(c: char) -> bool {
    matches!(c, '-' | '–' | '—')
}

/// The `[n]` family of citation markers
#[derive(Debug, Clone, Copy, Default)]
pub struct NumericBracketGrammar;

impl MarkerGrammar for NumericBracketGrammar {
    fn candidates<'t>(&'t self, body: &'t str) -> Box<dyn Iterator<Item = Range<usize>> + 't> {
        Box::new(BRACKET_GROUP.find_iter(body).map(|m| m.range()))
    }

    fn interpret(&self, raw: &str) -> Interpretation {
        let inner = raw
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .unwrap_or(raw)
            .trim();

        let marker_like = inner.chars().any(|c| c.is_ascii_digit())
            && inner.chars().all(|c| {
                c.is_ascii_digit() || c.is_whitespace() || is_list_separator(c) || is_range_dash(c)
            });
        if !marker_like {
            return Interpretation::NotAMarker;
        }

        match parse_index_list(inner) {
            Ok(indices) => Interpretation::Marker(indices),
            Err(reason) => Interpretation::Malformed(reason),
        }
    }
}

fn parse_index_list(inner: &str) -> Result<BTreeSet<u32>, String> {
    let mut indices = BTreeSet::new();

    for item in inner.split(is_list_separator) {
        let item = item.trim();
        if item.is_empty() {
            return Err("empty item in index list".to_string());
        }

        if item.contains(is_range_dash) {
            let mut bounds = item.split(is_range_dash);
            let (low, high) = match (bounds.next(), bounds.next(), bounds.next()) {
                (Some(low), Some(high), None) => (parse_index(low)?, parse_index(high)?),
                _ => return Err(format!("range {:?} must have exactly two bounds", item)),
            };
            if high < low {
                return Err(format!("descending range {}-{}", low, high));
            }
            if high - low + 1 > MAX_RANGE_SPAN {
                return Err(format!(
                    "range {}-{} spans more than {} indices",
                    low, high, MAX_RANGE_SPAN
                ));
            }
            indices.extend(low..=high);
        } else {
            indices.insert(parse_index(item)?);
        }
    }

    Ok(indices)
}

fn parse_index(s: &str) -> Result<u32, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("missing range bound".to_string());
    }
    if !s.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("{:?} is not a single index", s));
    }
    let index: u32 = s
        .parse()
        .map_err(|_| format!("index {} is too large", s))?;
    if index == 0 {
        return Err("indices start at 1".to_string());
    }
    Ok(index)
}
