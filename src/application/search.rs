//! Keyword matching helpers shared by every content kind.

use regex::Regex;

const WILDCARD: &str = "%";

/// Turn the `%` wildcard syntax into regular-expression syntax.
///
/// Everything else is passed through, so callers may use regex constructs
/// directly.
pub fn translate_pattern(pattern: &str) -> String {
    pattern.replace(WILDCARD, ".*")
}

/// Compile a wildcard pattern into an unanchored regex.
pub fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&translate_pattern(pattern))
}

/// Keywords containing `query`. An exact match is returned alone.
pub fn substring_matches<'a, I>(keywords: I, query: &str) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut matches = Vec::new();
    for keyword in keywords {
        if keyword == query {
            return vec![keyword.clone()];
        }
        if keyword.contains(query) {
            matches.push(keyword.clone());
        }
    }
    matches
}

/// Keywords matched anywhere by `pattern`, in list order.
pub fn pattern_matches<'a, I>(keywords: I, pattern: &Regex) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    keywords
        .into_iter()
        .filter(|keyword| pattern.is_match(keyword))
        .cloned()
        .collect()
}
