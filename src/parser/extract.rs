//! Single-answer extraction from free-form text fragments

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Whole-string binary choice: exactly one of A/a/B/b.
static LETTER_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[AaBb]$").unwrap());

/// First quantity-like token: optional currency sign, digits with
/// optional comma grouping, optional decimal part.
static NUMBER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$?([\d,]+(?:\.\d+)?)").unwrap());

/// A parsed answer to a single survey question.
///
/// A question that could not be parsed has no `Answer` at all — callers
/// represent that as `None` / an absent map key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Answer {
    /// Binary choice, always stored uppercased ('A' or 'B').
    Letter(char),
    /// Numeric quantity with thousands separators stripped.
    Number(f64),
}

impl Answer {
    /// Render for a CSV cell: letters verbatim, numbers to two decimals.
    pub fn csv_cell(&self) -> String {
        match self {
            Answer::Letter(c) => c.to_string(),
            Answer::Number(n) => format!("{:.2}", n),
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Answer::Letter(c) => write!(f, "{}", c),
            Answer::Number(n) => write!(f, "{}", n),
        }
    }
}

/// Extract a clean answer (a single letter or a number) from a text fragment.
///
/// Model replies are unstructured natural text, so extraction is
/// deliberately permissive: the first quantity-like token wins. Returns
/// `None` when the fragment contains neither a bare letter nor a number,
/// or when the numeric parse fails.
pub fn extract_answer(fragment: &str) -> Option<Answer> {
    let text = fragment.trim();
    if text.is_empty() {
        return None;
    }

    if LETTER_PATTERN.is_match(text) {
        let letter = text.chars().next()?.to_ascii_uppercase();
        return Some(Answer::Letter(letter));
    }

    let captures = NUMBER_PATTERN.captures(text)?;
    let digits = captures.get(1)?.as_str().replace(',', "");
    digits.parse::<f64>().ok().map(Answer::Number)
}
