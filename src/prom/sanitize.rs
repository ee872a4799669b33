// Metric name sanitizer
// Normalizes free-form call-site names into identifiers the Prometheus
// registry accepts.
//
// Numan Thabit 2025 Nov

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

static SEPARATOR_RUNS: Lazy<Regex> = Lazy::new(|| {
    Regex::new("[^A-Za-z0-9]+").expect("separator pattern is a valid regex")
});

/// Replaces every run of characters outside `[A-Za-z0-9]` with a single `_`
/// and trims `_` from both ends.
///
/// Idempotent: `sanitize(&sanitize(x)) == sanitize(x)`. Names that are
/// already canonical are returned borrowed.
pub fn sanitize(name: &str) -> Cow<'_, str> {
    if is_canonical(name) {
        return Cow::Borrowed(name);
    }
    let replaced = SEPARATOR_RUNS.replace_all(name, "_");
    Cow::Owned(replaced.trim_matches('_').to_owned())
}

fn is_canonical(name: &str) -> bool {
    let bytes = name.as_bytes();
    if bytes.first() == Some(&b'_') || bytes.last() == Some(&b'_') {
        return false;
    }
    let mut previous_separator = false;
    for &b in bytes {
        match b {
            b'_' if previous_separator => return false,
            b'_' => previous_separator = true,
            b if b.is_ascii_alphanumeric() => previous_separator = false,
            _ => return false,
        }
    }
    true
}
