use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9-]").expect("valid regex"));
static HYPHEN_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-{2,}").expect("valid regex"));

/// Derive a URL-safe slug from a human-readable name.
///
/// Output always matches `^[a-z0-9-]*$` with no leading, trailing or
/// repeated hyphens, and `slugify(slugify(x)) == slugify(x)`.
#[must_use]
pub fn slugify(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    let hyphenated = WHITESPACE.replace_all(&lowered, "-");
    let stripped = DISALLOWED.replace_all(&hyphenated, "");
    let collapsed = HYPHEN_RUNS.replace_all(&stripped, "-");
    collapsed.trim_matches('-').to_string()
}
