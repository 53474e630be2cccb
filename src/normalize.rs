//! Text normalization for comparison and embedding input.
//!
//! Every piece of text that reaches the embedder goes through `normalize`:
//! strip everything outside the permitted alphabet, collapse whitespace,
//! trim, lowercase.

use once_cell::sync::Lazy;
use regex::Regex;

/// Permitted alphabet: ASCII Latin letters, Cyrillic letters including the
/// Ukrainian і/ї/є/ґ forms, ASCII digits and whitespace.
static DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Zа-яА-ЯїЇєЄіІґҐ0-9\s]").expect("static charset regex"));

static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("static whitespace regex"));

/// Canonicalize free text for similarity comparison.
///
/// Idempotent: `normalize(normalize(x)) == normalize(x)`. Empty input (or
/// input made entirely of disallowed characters) yields an empty string.
pub fn normalize(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let stripped = DISALLOWED.replace_all(text, "");
    let collapsed = WHITESPACE.replace_all(&stripped, " ");
    collapsed.trim().to_lowercase()
}
