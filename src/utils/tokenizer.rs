use std::collections::HashSet;

/// Tokens of this length or shorter carry no search value and are dropped.
const MIN_TOKEN_LENGTH: usize = 3;

/// Characters stripped from the end of each token
const TRAILING_PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', ':', '"', '\''];

/// Tokenize searchable text.
///
/// Lowercases, treats `-` as a word break, splits on whitespace, strips
/// trailing punctuation and drops short tokens. The index builder and the
/// query evaluator both go through this function so lookups stay symmetric.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .replace('-', " ")
        .split_whitespace()
        .map(|word| word.trim_end_matches(TRAILING_PUNCTUATION))
        .filter(|word| word.chars().count() >= MIN_TOKEN_LENGTH)
        .map(str::to_string)
        .collect()
}

/// Unique tokens of a body, for posting-list construction
pub fn extract_tokens(text: &str) -> HashSet<String> {
    tokenize(text).into_iter().collect()
}

/// Normalize a tag for comparison.
///
/// Lowercase, trim, and collapse any run of whitespace and hyphens into a
/// single hyphen. `"Error  Handling"` and `"error--handling"` both become
/// `"error-handling"`.
pub fn normalize_tag(tag: &str) -> String {
    let mut out = String::with_capacity(tag.len());
    let mut in_separator = false;

    for ch in tag.trim().chars() {
        if ch.is_whitespace() || ch == '-' {
            in_separator = true;
            continue;
        }
        if in_separator {
            out.push('-');
            in_separator = false;
        }
        out.extend(ch.to_lowercase());
    }

    // A value made only of separators still normalizes to something comparable
    if in_separator && out.is_empty() {
        out.push('-');
    }

    out
}

/// Derive a display name from a file stem: `api-prompt` -> `Api Prompt`
pub fn name_from_stem(stem: &str) -> String {
    stem.split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    let mut titled: String = first.to_uppercase().collect();
                    titled.push_str(&chars.as_str().to_lowercase());
                    titled
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Rough LLM token estimate used for display: one token per four characters
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}
