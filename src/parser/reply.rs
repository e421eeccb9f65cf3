//! Multi-question reply parsing
//!
//! Models label their answers inconsistently: some emit `1: A`, some
//! `1. A`, and some just answer one question per line with no label at
//! all. The parser supports both conventions and never fails — a reply
//! that matches nothing simply produces an empty mapping.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::extract::{extract_answer, Answer};

/// Labeled answer line: question number, a colon or period separator,
/// then the answer fragment.
static LABELED_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})\s*[:.]\s*(.+)$").unwrap());

/// How answer lines are matched to question numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParserMode {
    /// Match labeled lines (`1: A` / `1. A`) first; if no line carries a
    /// label, fall back to positional assignment.
    #[default]
    Labeled,
    /// Treat the first N non-empty lines as answers to questions 1..N
    /// unconditionally. Some reasoning models answer this way.
    Positional,
}

/// Parse a full model reply into a question-number -> answer mapping.
///
/// The mapping may be partial: absent keys mean the question went
/// unanswered or unparseable. Keys are always within `1..=expected` and
/// there are never more than `expected` entries. When a question number
/// appears on more than one line, the first occurrence wins.
pub fn parse_reply(reply: &str, expected: usize, mode: ParserMode) -> BTreeMap<usize, Answer> {
    match mode {
        ParserMode::Labeled => parse_labeled(reply, expected),
        ParserMode::Positional => parse_positional(reply, expected),
    }
}

fn parse_labeled(reply: &str, expected: usize) -> BTreeMap<usize, Answer> {
    let mut answers = BTreeMap::new();
    let mut resolved: Vec<bool> = vec![false; expected + 1];
    let mut resolved_count = 0usize;
    let mut saw_label = false;

    for line in reply.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Some(captures) = LABELED_PATTERN.captures(line) else {
            tracing::trace!("skipping unmatched line: {:?}", line);
            continue;
        };
        saw_label = true;

        let Ok(question) = captures[1].parse::<usize>() else {
            continue;
        };
        if question < 1 || question > expected {
            tracing::debug!("ignoring out-of-range question number {}", question);
            continue;
        }
        if resolved[question] {
            tracing::debug!("ignoring duplicate answer line for Q{}", question);
            continue;
        }
        resolved[question] = true;
        resolved_count += 1;

        let fragment = captures[2].trim();
        match extract_answer(fragment) {
            Some(answer) => {
                tracing::info!("Q{}: {:?} -> {}", question, fragment, answer);
                answers.insert(question, answer);
            }
            None => {
                tracing::info!("Q{}: {:?} -> unparseable", question, fragment);
            }
        }

        // Nothing to gain from scanning past the last question.
        if resolved_count == expected {
            break;
        }
    }

    if !saw_label {
        tracing::debug!("no labeled answer lines found, using positional fallback");
        return parse_positional(reply, expected);
    }

    answers
}

fn parse_positional(reply: &str, expected: usize) -> BTreeMap<usize, Answer> {
    let mut answers = BTreeMap::new();

    let lines = reply
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(expected);

    for (question, line) in lines.enumerate().map(|(i, l)| (i + 1, l)) {
        match extract_answer(line) {
            Some(answer) => {
                tracing::info!("Q{}: {:?} -> {} (positional)", question, line, answer);
                answers.insert(question, answer);
            }
            None => {
                tracing::info!("Q{}: {:?} -> unparseable (positional)", question, line);
            }
        }
    }

    answers
}
