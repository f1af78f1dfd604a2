//! Field Similarity Matching
//!
//! Provides a pluggable trait for scoring how similar two text fields are.
//! Every higher layer (step alignment, test case scoring, coverage) goes
//! through this seam, so swapping the similarity formula never touches the
//! alignment or classification code.
//!
//! # Architecture
//!
//! The `FieldMatcher` trait defines two operations:
//! - `canonicalize`: Normalize a field before comparison
//! - `similarity_score`: Return a numeric similarity (0.0 = unrelated, 1.0 = identical)
//!
//! # Default Behavior
//!
//! `BlendedMatcher` blends token-set overlap (Jaccard) with ordered-sequence
//! similarity (longest common subsequence ratio) over normalized tokens.
//! `ExactMatcher` is the strict alternative: 1.0 when canonical forms are
//! equal, 0.0 otherwise.

use crate::core::config::EngineConfig;
use crate::core::normalizer::Normalizer;
use std::collections::HashSet;

/// Trait for comparing two text fields.
///
/// All implementations must be `Send + Sync` so scorers can be shared across
/// concurrent comparison workers.
pub trait FieldMatcher: Send + Sync + std::fmt::Debug {
    /// Normalize a field for comparison.
    fn canonicalize(&self, text: &str) -> String;

    /// Return a similarity score in [0.0, 1.0].
    ///
    /// Both fields empty after normalization scores 1.0; exactly one empty
    /// scores 0.0.
    fn similarity_score(&self, a: &str, b: &str) -> f64;

    /// Human-readable name for this matcher type.
    fn matcher_type(&self) -> &str;
}

/// Jaccard index over two token sets.
pub fn jaccard<S: AsRef<str>>(a: &[S], b: &[S]) -> f64 {
    let set_a: HashSet<&str> = a.iter().map(AsRef::as_ref).collect();
    let set_b: HashSet<&str> = b.iter().map(AsRef::as_ref).collect();

    if set_a.is_empty() && set_b.is_empty() {
        return 1.0;
    }

    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    intersection as f64 / union as f64
}

/// Length of the longest common subsequence of two token sequences.
pub fn lcs_len<S: AsRef<str>>(a: &[S], b: &[S]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    // Two rolling rows are enough for the length.
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for x in a {
        for (j, y) in b.iter().enumerate() {
            curr[j + 1] = if x.as_ref() == y.as_ref() {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// LCS ratio `2 * LCS / (|a| + |b|)`.
pub fn lcs_ratio<S: AsRef<str>>(a: &[S], b: &[S]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    (2 * lcs_len(a, b)) as f64 / total as f64
}

/// Blended token-set / sequence similarity (default matcher).
#[derive(Debug, Clone)]
pub struct BlendedMatcher {
    normalizer: Normalizer,
    token_set_weight: f64,
}

impl BlendedMatcher {
    /// Create a blended matcher. `token_set_weight` is clamped to [0, 1].
    pub fn new(normalizer: Normalizer, token_set_weight: f64) -> Self {
        Self {
            normalizer,
            token_set_weight: token_set_weight.clamp(0.0, 1.0),
        }
    }

    /// Build the matcher described by an engine config.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            Normalizer::new(config.remove_stop_words),
            config.token_set_weight,
        )
    }

    /// The normalizer in use.
    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Score two already-normalized token sequences.
    pub fn score_tokens<S: AsRef<str>>(&self, a: &[S], b: &[S]) -> f64 {
        match (a.is_empty(), b.is_empty()) {
            (true, true) => return 1.0,
            (true, false) | (false, true) => return 0.0,
            _ => {}
        }

        let token_set = jaccard(a, b);
        let sequence = lcs_ratio(a, b);
        if token_set == 1.0 && sequence == 1.0 {
            return 1.0;
        }

        let blended =
            self.token_set_weight * token_set + (1.0 - self.token_set_weight) * sequence;
        blended.clamp(0.0, 1.0)
    }
}

impl Default for BlendedMatcher {
    fn default() -> Self {
        Self::new(Normalizer::default(), 0.5)
    }
}

impl FieldMatcher for BlendedMatcher {
    fn canonicalize(&self, text: &str) -> String {
        self.normalizer.normalize(text)
    }

    fn similarity_score(&self, a: &str, b: &str) -> f64 {
        let tokens_a = self.normalizer.tokens(a);
        let tokens_b = self.normalizer.tokens(b);
        self.score_tokens(&tokens_a, &tokens_b)
    }

    fn matcher_type(&self) -> &str {
        "blended"
    }
}

/// Exact matcher over normalized text.
///
/// Two fields are identical if and only if their canonical forms are equal.
#[derive(Debug, Clone, Default)]
pub struct ExactMatcher {
    normalizer: Normalizer,
}

impl ExactMatcher {
    /// Create an exact matcher with the default normalizer.
    pub fn new() -> Self {
        Self::default()
    }
}

impl FieldMatcher for ExactMatcher {
    fn canonicalize(&self, text: &str) -> String {
        self.normalizer.normalize(text)
    }

    fn similarity_score(&self, a: &str, b: &str) -> f64 {
        if self.canonicalize(a) == self.canonicalize(b) {
            1.0
        } else {
            0.0
        }
    }

    fn matcher_type(&self) -> &str {
        "exact"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    // ==========================================
    // Primitive Tests
    // ==========================================

    #[test]
    fn test_jaccard_basic() {
        assert_eq!(jaccard(&["a", "b"], &["b", "c"]), 1.0 / 3.0);
        assert_eq!(jaccard(&["a"], &["a"]), 1.0);
        assert_eq!(jaccard::<&str>(&[], &[]), 1.0);
        assert_eq!(jaccard(&["a"], &[]), 0.0);
    }

    #[test]
    fn test_jaccard_ignores_duplicates() {
        assert_eq!(jaccard(&["a", "a", "b"], &["a", "b"]), 1.0);
    }

    #[test]
    fn test_lcs_len() {
        assert_eq!(lcs_len(&["a", "b", "c", "d"], &["a", "c", "d"]), 3);
        assert_eq!(lcs_len(&["a", "b"], &["b", "a"]), 1);
        assert_eq!(lcs_len::<&str>(&[], &["a"]), 0);
    }

    #[test]
    fn test_lcs_ratio() {
        assert_eq!(lcs_ratio(&["a", "b"], &["a", "b"]), 1.0);
        assert_eq!(lcs_ratio(&["a", "b"], &["c", "d"]), 0.0);
        assert_eq!(lcs_ratio(&["a", "b", "c"], &["a", "c"]), 0.8);
    }

    // ==========================================
    // BlendedMatcher Tests
    // ==========================================

    #[test]
    fn test_blended_identity() {
        let m = BlendedMatcher::default();
        assert_eq!(
            m.similarity_score("enter username/password", "enter username/password"),
            1.0
        );
    }

    #[test]
    fn test_blended_both_empty_is_one() {
        let m = BlendedMatcher::default();
        assert_eq!(m.similarity_score("", ""), 1.0);
        assert_eq!(m.similarity_score("  ", "!!"), 1.0);
    }

    #[test]
    fn test_blended_one_empty_is_zero() {
        let m = BlendedMatcher::default();
        assert_eq!(m.similarity_score("", "click login"), 0.0);
        assert_eq!(m.similarity_score("click login", ""), 0.0);
    }

    #[test]
    fn test_blended_case_and_punctuation_insensitive() {
        let m = BlendedMatcher::default();
        assert_eq!(m.similarity_score("User logged in.", "user LOGGED in"), 1.0);
    }

    #[test]
    fn test_blended_word_order_matters_partially() {
        let m = BlendedMatcher::new(Normalizer::new(false), 0.5);
        let score = m.similarity_score("open settings page", "page settings open");
        // Same token set, LCS of 1 over 3+3 tokens
        assert!((score - (0.5 + 0.5 * (2.0 / 6.0))).abs() < 1e-12);
    }

    #[test]
    fn test_blended_unrelated_is_zero() {
        let m = BlendedMatcher::default();
        assert_eq!(m.similarity_score("export audit logs", "checkout cart"), 0.0);
    }

    #[test]
    fn test_blended_in_unit_range() {
        let m = BlendedMatcher::default();
        let pairs = [
            ("click remember me", "checkbox checked"),
            ("login valid credentials", "login invalid credentials"),
            ("a b c d e", "e d c b a"),
        ];
        for (a, b) in pairs {
            let s = m.similarity_score(a, b);
            assert!((0.0..=1.0).contains(&s), "{} out of range for {:?}", s, (a, b));
        }
    }

    #[test]
    fn test_blended_symmetry() {
        let m = BlendedMatcher::default();
        let pairs = [
            ("verify login", "verify login with remember me"),
            ("reset password via email", "email password reset"),
        ];
        for (a, b) in pairs {
            assert_eq!(m.similarity_score(a, b), m.similarity_score(b, a));
        }
    }

    #[test]
    fn test_token_set_weight_clamped() {
        let m = BlendedMatcher::new(Normalizer::default(), 3.0);
        assert_eq!(m.token_set_weight, 1.0);
    }

    #[test]
    fn test_from_config() {
        let mut config = EngineConfig::default();
        config.remove_stop_words = false;
        config.token_set_weight = 1.0;
        let m = BlendedMatcher::from_config(&config);
        assert!(!m.normalizer().removes_stop_words());
        // Pure Jaccard: order ignored
        assert_eq!(m.similarity_score("a b", "b a"), 1.0);
    }

    // ==========================================
    // ExactMatcher Tests
    // ==========================================

    #[test]
    fn test_exact_matcher() {
        let m = ExactMatcher::new();
        assert_eq!(m.similarity_score("Click  Login!", "click login"), 1.0);
        assert_eq!(m.similarity_score("click login", "click logout"), 0.0);
        assert_eq!(m.matcher_type(), "exact");
    }

    // ==========================================
    // Trait Object Safety Tests
    // ==========================================

    #[test]
    fn test_matcher_as_trait_object() {
        let m: Arc<dyn FieldMatcher> = Arc::new(BlendedMatcher::default());
        assert_eq!(m.matcher_type(), "blended");
        assert_eq!(m.similarity_score("test", "test"), 1.0);
    }

    #[test]
    fn test_matcher_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BlendedMatcher>();
        assert_send_sync::<Arc<dyn FieldMatcher>>();
    }
}
