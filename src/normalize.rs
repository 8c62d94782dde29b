//! Whitespace and punctuation clean-up applied to chapter text before it is
//! sent to the summarizer, to keep the prompt's token footprint down.

use once_cell::sync::Lazy;
use regex::Regex;

static BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("Failed to compile BLANK_LINES regex"));
static SPACE_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r" {2,}").expect("Failed to compile SPACE_RUNS regex"));
static ELLIPSES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.{3,}").expect("Failed to compile ELLIPSES regex"));

/// Normalizes chapter text.
///
/// Blank-line padding collapses to a single newline, space runs to one space,
/// dot runs of three or more to exactly `...`, and the result is trimmed.
#[must_use]
pub fn normalize(text: &str) -> String {
    let text = BLANK_LINES.replace_all(text, "\n");
    let text = SPACE_RUNS.replace_all(&text, " ");
    let text = ELLIPSES.replace_all(&text, "...");
    text.trim().to_owned()
}
