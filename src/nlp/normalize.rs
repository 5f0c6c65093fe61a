//! Text normalization ahead of embedding training.
//!
//! The transform always runs the same four steps in order: symbol stripping,
//! stopword removal (when the language has a list), a token length filter,
//! and singularization with a fallback to the filtered text.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use super::{singular, stopwords};

/// Shortest token kept, in characters.
pub const MIN_TOKEN_CHARS: usize = 4;
/// Tokens of this many characters or more are dropped.
pub const MAX_TOKEN_CHARS: usize = 20;

static SYMBOLS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,.;:]").expect("valid regex"));

/// Pure text cleaning used by the pipeline's workers.
pub trait Normalizer: Send + Sync {
    fn normalize(&self, text: &str, language: &str) -> String;
}

/// The default normalizer backed by [`normalize`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TextNormalizer;

impl Normalizer for TextNormalizer {
    fn normalize(&self, text: &str, language: &str) -> String {
        normalize(text, language)
    }
}

/// Clean `text` written in `language`. Never fails.
pub fn normalize(text: &str, language: &str) -> String {
    let stripped = strip_symbols(text);
    let without_stopwords = remove_stopwords(&stripped, language);
    let bounded = filter_length(&without_stopwords);
    match singular::singularize_text(&bounded, language) {
        Ok(singular) => singular,
        Err(err) => {
            trace!(%err, "keeping text without singularization");
            bounded
        }
    }
}

/// Replace commas, periods, semicolons and colons with spaces.
pub fn strip_symbols(text: &str) -> String {
    SYMBOLS.replace_all(text, " ").into_owned()
}

/// Drop stopwords (case-sensitive); languages without a list pass through.
pub fn remove_stopwords(text: &str, language: &str) -> String {
    match stopwords::for_language(language) {
        Some(list) => text
            .split_whitespace()
            .filter(|word| !list.contains(word))
            .collect::<Vec<_>>()
            .join(" "),
        None => text.to_string(),
    }
}

/// Keep tokens with `MIN_TOKEN_CHARS <= len < MAX_TOKEN_CHARS`.
pub fn filter_length(text: &str) -> String {
    text.split_whitespace()
        .filter(|word| {
            let len = word.chars().count();
            (MIN_TOKEN_CHARS..MAX_TOKEN_CHARS).contains(&len)
        })
        .collect::<Vec<_>>()
        .join(" ")
}
