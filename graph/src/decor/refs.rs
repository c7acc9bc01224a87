use std::collections::BTreeSet;

/// Prefixes stripped from decoration entries, tried in order; first match wins
const PREFIX_RULES: &[&str] = &["tag: ", "refs/remotes/", "refs/heads/"];

const HEAD: &str = "HEAD";
const HEAD_POINTER: &str = "HEAD -> ";

/// Normalize a single decoration entry.
///
/// Returns `None` for entries that only name a symbolic HEAD
/// (`HEAD`, `origin/HEAD`, ...).
pub fn normalize_decoration(entry: &str) -> Option<&str> {
    let entry = entry.trim();
    let entry = entry.strip_prefix(HEAD_POINTER).unwrap_or(entry);

    let label = PREFIX_RULES
        .iter()
        .find_map(|prefix| entry.strip_prefix(prefix))
        .unwrap_or(entry);

    if label.is_empty() || label == HEAD || label.ends_with("/HEAD") {
        return None;
    }
    Some(label)
}

/// Parse git's `%d` decoration text, e.g. ` (HEAD -> main, tag: v1.0, origin/main)`,
/// into the set of labels that point at a commit.
pub fn parse_decorations(raw: &str) -> BTreeSet<String> {
    let inner = raw.trim();
    let inner = inner.strip_prefix('(').unwrap_or(inner);
    let inner = inner.strip_suffix(')').unwrap_or(inner);

    inner
        .split(", ")
        .filter_map(normalize_decoration)
        .map(str::to_string)
        .collect()
}
