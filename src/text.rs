//! Cleanup of raw recognizer output.
//!
//! [`cleanup_text`] is pure and idempotent: running it on its own output
//! changes nothing.

use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Characters recognizers commonly emit in place of a letter or bracket.
/// Replaced only when both neighbours are ASCII letters, or for `|`, when it
/// starts a word
pub const CONFUSION_TABLE: [(char, char); 6] = [
    ('|', 'I'),
    ('{', '('),
    ('}', ')'),
    ('0', 'O'),
    ('1', 'I'),
    ('5', 'S'),
];

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

static SPACE_BEFORE_PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+([.,;:!?])").expect("punctuation pattern is valid"));

static APOSTROPHE_GAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w)\s+'\s*(\w)").expect("apostrophe pattern is valid"));

/// Normalize raw OCR text.
///
/// 1. Whitespace runs become one space, except runs holding two or more
///    newlines, which become a single paragraph break (`"\n\n"`).
/// 2. Confusion characters between letters are replaced (see [`CONFUSION_TABLE`]).
/// 3. Whitespace before `. , ; : ! ?` is removed.
/// 4. `it ' s` style gaps around apostrophes are closed.
/// 5. Leading and trailing whitespace is trimmed.
pub fn cleanup_text(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    let text = collapse_whitespace(text);
    let text = fix_confusions(&text);
    let text = SPACE_BEFORE_PUNCTUATION.replace_all(&text, "$1").into_owned();
    let text = close_apostrophe_gaps(text);

    text.trim().to_string()
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RUN
        .replace_all(text, |caps: &Captures| {
            if caps[0].matches('\n').count() >= 2 {
                "\n\n"
            } else {
                " "
            }
        })
        .into_owned()
}

/// Replace confusion characters using the neighbours from the input text.
///
/// A `|` that starts a word and runs into a letter is also read as `I`:
/// bars do not begin words in prose.
fn fix_confusions(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let is_letter = |c: Option<&char>| c.is_some_and(|c| c.is_ascii_alphabetic());

    chars
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let prev = i.checked_sub(1).and_then(|p| chars.get(p));
            let next = chars.get(i + 1);
            if !is_letter(next) {
                return c;
            }
            let fix = CONFUSION_TABLE
                .iter()
                .find(|(wrong, _)| *wrong == c)
                .map(|(_, right)| *right);
            match fix {
                Some(right) if is_letter(prev) => right,
                Some(right) if c == '|' && prev.map_or(true, |p| p.is_whitespace()) => right,
                _ => c,
            }
        })
        .collect()
}

/// Each replacement consumes the word character after the apostrophe, so
/// chained gaps (`a ' b ' c`) need another pass. Every pass shortens the text
fn close_apostrophe_gaps(mut text: String) -> String {
    loop {
        let fixed = APOSTROPHE_GAP.replace_all(&text, "${1}'${2}");
        if fixed == text {
            return text;
        }
        text = fixed.into_owned();
    }
}
