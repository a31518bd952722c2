use std::sync::LazyLock;

use regex::Regex;

static RE_DECORATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^\p{Alphabetic}\s]").expect("invalid regex: label decoration")
});

/// Removes every character that is neither a letter nor whitespace (flags,
/// punctuation, digits), trims the result and collapses inner runs of
/// whitespace to a single space.
pub fn normalize(raw: &str) -> String {
    RE_DECORATION
        .replace_all(raw, "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Case-folded [`normalize`], used to match target countries and as the
/// state key.
pub fn country_key(raw: &str) -> String {
    normalize(raw).to_lowercase()
}
