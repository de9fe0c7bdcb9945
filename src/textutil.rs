use once_cell::sync::Lazy;
use regex::Regex;

static BACKTICK_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`{2,}").expect("backtick run"));

/// Collapses runs of two-or-more backticks to a single backtick, then appends
/// one trailing backtick if the count ends up odd. Keeps inline code from
/// breaking the surrounding markup after translation.
pub fn correct_backticks(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }

    let collapsed = BACKTICK_RUN_RE.replace_all(input, "`").into_owned();
    let count = collapsed.matches('`').count();
    if count % 2 != 0 {
        let mut out = collapsed;
        out.push('`');
        out
    } else {
        collapsed
    }
}
