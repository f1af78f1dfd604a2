//! Text Normalization
//!
//! Turns a free-text field into a comparable token sequence: lowercase,
//! punctuation stripped, whitespace collapsed, optional stop-word removal.

/// Common English words with no discriminating value in test case text.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "been", "being", "but", "by", "can", "could",
    "did", "do", "does", "for", "from", "had", "has", "have", "if", "in", "into", "is", "it",
    "its", "of", "on", "or", "should", "so", "than", "that", "the", "their", "then", "there",
    "these", "this", "those", "to", "was", "were", "will", "with", "would",
];

/// Returns true if `token` (already lowercased) is a stop word.
pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.binary_search(&token).is_ok()
}

/// Converts text fields into normalized token sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalizer {
    remove_stop_words: bool,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Normalizer {
    /// Create a normalizer.
    pub fn new(remove_stop_words: bool) -> Self {
        Self { remove_stop_words }
    }

    /// Whether stop words are removed.
    pub fn removes_stop_words(&self) -> bool {
        self.remove_stop_words
    }

    /// Normalize `text` into tokens.
    ///
    /// If stop-word removal would leave nothing from a non-empty text, the
    /// unfiltered tokens are returned so that "The" still compares as text.
    pub fn tokens(&self, text: &str) -> Vec<String> {
        let raw: Vec<String> = text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();

        if !self.remove_stop_words {
            return raw;
        }

        let filtered: Vec<String> = raw.iter().filter(|t| !is_stop_word(t)).cloned().collect();
        if filtered.is_empty() {
            raw
        } else {
            filtered
        }
    }

    /// Normalize `text` into a single space-joined string.
    pub fn normalize(&self, text: &str) -> String {
        self.tokens(text).join(" ")
    }
}
