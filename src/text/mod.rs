// src/text/mod.rs

use std::collections::HashSet;

/// Lower-cased, punctuation-stripped, whitespace-split tokens. Every
/// similarity measure in the crate goes through this one tokenizer.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

pub fn token_set(text: &str) -> HashSet<String> {
    tokenize(text).into_iter().collect()
}

/// Jaccard similarity over token sets; 0.0 when both sides are empty.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let set_a = token_set(a);
    let set_b = token_set(b);
    let union = set_a.union(&set_b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = set_a.intersection(&set_b).count();
    intersection as f64 / union as f64
}

/// Tokens of at least `min_len` characters, used for task-overlap checks.
pub fn extract_keywords(text: &str, min_len: usize) -> HashSet<String> {
    tokenize(text)
        .into_iter()
        .filter(|t| t.chars().count() >= min_len)
        .collect()
}

pub fn shared_token_count(a: &str, b: &str) -> usize {
    token_set(a).intersection(&token_set(b)).count()
}

pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

pub fn clip_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
