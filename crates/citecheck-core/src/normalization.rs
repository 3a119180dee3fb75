//! Text normalization for title matching and context extraction

use unicode_normalization::UnicodeNormalization;

/// Normalize a title for search and comparison
///
/// - Folds diacritics (NFKD, combining marks dropped)
/// - Converts to lowercase
/// - Replaces punctuation with spaces
/// - Collapses whitespace
///
/// Letters outside ASCII (CJK, Cyrillic, ...) are kept.
pub fn normalize_title(title: &str) -> String {
    let folded: String = title
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    collapse_whitespace(&folded.to_lowercase())
}

/// Collapse runs of whitespace into single spaces and trim the ends
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Join words split across lines by a hyphen ("recog-\nnition" -> "recognition")
pub fn fix_hyphenation(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '-' && result.chars().last().is_some_and(|p| p.is_alphabetic()) {
            // Look past the line break
            let mut lookahead = chars.clone();
            let mut saw_newline = false;
            while let Some(&n) = lookahead.peek() {
                if n == '\n' || n == '\r' {
                    saw_newline = true;
                    lookahead.next();
                } else if n == ' ' || n == '\t' {
                    lookahead.next();
                } else {
                    break;
                }
            }
            if saw_newline && lookahead.peek().is_some_and(|n| n.is_lowercase()) {
                chars = lookahead;
                continue;
            }
        }
        result.push(c);
    }

    result
}

fn is_combining_mark(c: char) -> bool {
    matches!(c,
        '\u{0300}'..='\u{036F}'
        | '\u{1AB0}'..='\u{1AFF}'
        | '\u{1DC0}'..='\u{1DFF}'
        | '\u{20D0}'..='\u{20FF}'
        | '\u{FE20}'..='\u{FE2F}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_title() {
        assert_eq!(
            normalize_title("The Quick Brown Fox"),
            "the quick brown fox"
        );
        assert_eq!(normalize_title("Machine   Learning"), "machine learning");
    }

    #[test]
    fn test_normalize_title_with_punctuation() {
        assert_eq!(normalize_title("Hello, World!"), "hello world");
        assert_eq!(normalize_title("Test: A Study"), "test a study");
        assert_eq!(normalize_title("Self-Attention"), "self attention");
    }

    #[test]
    fn test_normalize_title_with_diacritics() {
        assert_eq!(normalize_title("Études Françaises"), "etudes francaises");
        assert_eq!(normalize_title("Naïve Bayes"), "naive bayes");
    }

    #[test]
    fn test_normalize_title_keeps_cjk() {
        assert_eq!(normalize_title("图像超分辨率：综述"), "图像超分辨率 综述");
    }

    #[test]
    fn test_fix_hyphenation() {
        assert_eq!(
            fix_hyphenation("image recog-\nnition systems"),
            "image recognition systems"
        );
        // Hyphenated compounds survive
        assert_eq!(fix_hyphenation("state-of-the-art"), "state-of-the-art");
        assert_eq!(fix_hyphenation("Self-\nAttention"), "Self-\nAttention");
    }
}
