//! Text processing utilities.

use std::sync::LazyLock;

use regex::Regex;

static TRAILING_SPACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[ \t\r]+\n").unwrap_or_else(|e| panic!("invalid regex: {e}"))
});

static BLANK_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").unwrap_or_else(|e| panic!("invalid regex: {e}")));

/// Strip trailing spaces and collapse runs of blank lines to one.
///
/// PDF extraction tends to emit both, which would otherwise waste chunk space.
pub fn normalize_whitespace(text: &str) -> String {
    let text = TRAILING_SPACE.replace_all(text, "\n");
    let text = BLANK_RUNS.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Check if content has any non-whitespace text.
pub fn has_content(content: &str) -> bool {
    content.chars().any(|c| !c.is_whitespace())
}
