//! Test Case Similarity Scoring
//!
//! Combines title, description and step alignment into one weighted score:
//!
//! ```text
//! total = w1 * sim(title) + w2 * sim(description) + w3 * step_aggregate
//! ```
//!
//! `step_aggregate` is the mean matched-pair score minus a fixed penalty per
//! unmatched step, clamped to [0, 1]. Two empty step lists aggregate to 1.0.
//!
//! Requirements carry no steps, so `score_requirement` drops the step term and
//! rescales the remaining weights to `w1 / (w1 + w2)` and `w2 / (w1 + w2)`.
//! When neither side has a description the title similarity is the score.

use crate::core::alignment::{align_steps, Alignment};
use crate::core::config::{EngineConfig, ScoringWeights, WEIGHT_SUM_TOLERANCE};
use crate::core::error::{ConfigError, EngineError};
use crate::core::matcher::{BlendedMatcher, FieldMatcher};
use crate::core::model::{Requirement, TestCase};
use std::sync::Arc;

/// Breakdown of a test case similarity score.
#[derive(Debug, Clone, PartialEq)]
pub struct TestCaseScore {
    /// Weighted total in [0, 1]
    pub total: f64,
    /// Title similarity
    pub title: f64,
    /// Description similarity
    pub description: f64,
    /// Step aggregate after the unmatched-step penalty
    pub steps: f64,
    /// The step alignment the aggregate was computed from
    pub alignment: Alignment,
}

/// Scores test cases (and requirements) against repository entries.
#[derive(Debug, Clone)]
pub struct TestCaseScorer {
    matcher: Arc<dyn FieldMatcher>,
    weights: ScoringWeights,
    unmatched_step_penalty: f64,
}

impl TestCaseScorer {
    /// Build a scorer from an engine config, using the blended field matcher.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            matcher: Arc::new(BlendedMatcher::from_config(config)),
            weights: config.weights,
            unmatched_step_penalty: config.unmatched_step_penalty,
        }
    }

    /// Swap the field matcher.
    pub fn with_matcher(mut self, matcher: Arc<dyn FieldMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    /// The field matcher in use.
    pub fn matcher(&self) -> &dyn FieldMatcher {
        self.matcher.as_ref()
    }

    /// The weights in use.
    pub fn weights(&self) -> ScoringWeights {
        self.weights
    }

    fn check_weights(&self) -> Result<(), EngineError> {
        let sum = self.weights.sum();
        if !((sum - 1.0).abs() <= WEIGHT_SUM_TOLERANCE) {
            return Err(EngineError::config(
                "weights",
                format!("title + description + steps must sum to 1.0, got {}", sum),
            ));
        }
        Ok(())
    }

    /// Score candidate `a` against repository entry `b`.
    pub fn score(&self, a: &TestCase, b: &TestCase) -> Result<TestCaseScore, EngineError> {
        self.check_weights()?;

        let title = self.matcher.similarity_score(&a.title, &b.title);
        let description = self.matcher.similarity_score(&a.description, &b.description);
        let alignment = align_steps(&a.steps, &b.steps, self.matcher.as_ref());
        let steps = self.step_aggregate(&alignment);

        let total = if title == 1.0 && description == 1.0 && steps == 1.0 {
            1.0
        } else {
            (self.weights.title * title
                + self.weights.description * description
                + self.weights.steps * steps)
                .clamp(0.0, 1.0)
        };

        Ok(TestCaseScore {
            total,
            title,
            description,
            steps,
            alignment,
        })
    }

    /// Aggregate an alignment into a single step score.
    pub fn step_aggregate(&self, alignment: &Alignment) -> f64 {
        if alignment.pairs.is_empty() {
            return 1.0;
        }
        let mean = alignment.mean_matched_score().unwrap_or(0.0);
        let penalty = self.unmatched_step_penalty * alignment.unmatched_count() as f64;
        (mean - penalty).clamp(0.0, 1.0)
    }

    /// Score a requirement against a repository test case (title and description only).
    pub fn score_requirement(
        &self,
        requirement: &Requirement,
        test_case: &TestCase,
    ) -> Result<f64, EngineError> {
        let field_weight = self.weights.title + self.weights.description;
        if !(field_weight > 0.0) {
            return Err(EngineError::Configuration(vec![ConfigError::new(
                "weights",
                "title and description weights cannot both be zero when scoring requirements",
            )]));
        }

        let title = self.matcher.similarity_score(&requirement.title, &test_case.title);
        if self.matcher.canonicalize(&requirement.description).is_empty()
            && self.matcher.canonicalize(&test_case.description).is_empty()
        {
            return Ok(title);
        }
        let description = self
            .matcher
            .similarity_score(&requirement.description, &test_case.description);

        if title == 1.0 && description == 1.0 {
            return Ok(1.0);
        }
        let score = (self.weights.title / field_weight) * title
            + (self.weights.description / field_weight) * description;
        Ok(score.clamp(0.0, 1.0))
    }
}

impl Default for TestCaseScorer {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::matcher::ExactMatcher;

    fn login_case(id: &str) -> TestCase {
        TestCase::new(id, "Verify login with valid credentials")
            .with_step("enter username/password", "user logged in")
    }

    // ==========================================
    // Test Case Scoring Tests
    // ==========================================

    #[test]
    fn test_identical_cases_score_one() {
        let scorer = TestCaseScorer::default();
        let s = scorer.score(&login_case("A"), &login_case("B")).unwrap();
        assert_eq!(s.total, 1.0);
        assert_eq!(s.title, 1.0);
        assert_eq!(s.description, 1.0);
        assert_eq!(s.steps, 1.0);
    }

    #[test]
    fn test_appended_step_penalized() {
        let scorer = TestCaseScorer::default();
        let candidate = login_case("C").with_step("click Remember Me", "checkbox checked");
        let s = scorer.score(&candidate, &login_case("R")).unwrap();
        assert!((s.steps - 0.85).abs() < 1e-12);
        // 0.3 + 0.2 + 0.5 * 0.85
        assert!((s.total - 0.925).abs() < 1e-12);
    }

    #[test]
    fn test_both_step_lists_empty_aggregate_one() {
        let scorer = TestCaseScorer::default();
        let a = TestCase::new("A", "same title");
        let s = scorer.score(&a, &a).unwrap();
        assert_eq!(s.steps, 1.0);
        assert_eq!(s.total, 1.0);
    }

    #[test]
    fn test_penalty_clamps_at_zero() {
        let scorer = TestCaseScorer::default();
        let a = TestCase::new("A", "x")
            .with_step("alpha", "")
            .with_step("beta", "")
            .with_step("gamma", "")
            .with_step("delta", "")
            .with_step("epsilon", "")
            .with_step("zeta", "")
            .with_step("eta", "");
        let b = TestCase::new("B", "x");
        let s = scorer.score(&a, &b).unwrap();
        assert_eq!(s.steps, 0.0);
    }

    #[test]
    fn test_unrelated_cases_score_low() {
        let scorer = TestCaseScorer::default();
        let a = TestCase::new("A", "Export audit logs to PDF")
            .with_step("open audit log page", "log entries listed")
            .with_step("click export pdf", "pdf downloaded");
        let s = scorer.score(&a, &login_case("R")).unwrap();
        assert!(s.total < 0.3, "score was {}", s.total);
    }

    #[test]
    fn test_score_in_unit_range() {
        let scorer = TestCaseScorer::default();
        let a = login_case("A").with_description("happy path");
        let b = TestCase::new("B", "Verify login with invalid credentials")
            .with_description("error path")
            .with_step("enter wrong password", "error shown");
        let s = scorer.score(&a, &b).unwrap();
        assert!((0.0..=1.0).contains(&s.total));
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let config = EngineConfig::default().with_weights(ScoringWeights::new(0.5, 0.5, 0.5));
        let scorer = TestCaseScorer::new(&config);
        let err = scorer.score(&login_case("A"), &login_case("B")).unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn test_with_matcher_swaps_similarity() {
        let scorer = TestCaseScorer::default().with_matcher(Arc::new(ExactMatcher::new()));
        assert_eq!(scorer.matcher().matcher_type(), "exact");
        let b = TestCase::new("B", "Verify login with valid credential")
            .with_step("enter username/password", "user logged in");
        let s = scorer.score(&login_case("A"), &b).unwrap();
        assert_eq!(s.title, 0.0);
    }

    // ==========================================
    // Requirement Scoring Tests
    // ==========================================

    #[test]
    fn test_requirement_identical_fields() {
        let scorer = TestCaseScorer::default();
        let req = Requirement::new("REQ-1", "Password reset", "Reset via email link");
        let tc = TestCase::new("TC-1", "Password reset").with_description("Reset via email link");
        assert_eq!(scorer.score_requirement(&req, &tc).unwrap(), 1.0);
    }

    #[test]
    fn test_requirement_weights_rescaled() {
        let scorer = TestCaseScorer::default();
        let req = Requirement::new("REQ-1", "Password reset", "");
        let tc = TestCase::new("TC-1", "Password reset").with_description("Reset via email link");
        // title 1.0 at 0.6, description 0.0 at 0.4
        let score = scorer.score_requirement(&req, &tc).unwrap();
        assert!((score - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_requirement_without_descriptions_uses_title_only() {
        let scorer = TestCaseScorer::default();
        let req = Requirement::new("REQ-1", "Support password reset via email", "");
        let tc = TestCase::new("TC-1", "Reset password via SMS");
        let score = scorer.score_requirement(&req, &tc).unwrap();
        let title = scorer
            .matcher()
            .similarity_score("Support password reset via email", "Reset password via SMS");
        assert_eq!(score, title);
        assert!(score < EngineConfig::default().coverage_threshold);
    }

    #[test]
    fn test_requirement_descriptions_do_not_lower_title_only_score() {
        let scorer = TestCaseScorer::default();
        let bare = scorer
            .score_requirement(
                &Requirement::new("REQ-1", "Password reset", ""),
                &TestCase::new("TC-1", "Password reset"),
            )
            .unwrap();
        assert_eq!(bare, 1.0);

        let described = scorer
            .score_requirement(
                &Requirement::new("REQ-1", "Password reset", "Send reset link by email"),
                &TestCase::new("TC-1", "Password reset").with_description("Send reset code by SMS"),
            )
            .unwrap();
        assert!(described < bare);
    }

    #[test]
    fn test_requirement_zero_field_weights() {
        let config = EngineConfig::default().with_weights(ScoringWeights::new(0.0, 0.0, 1.0));
        let scorer = TestCaseScorer::new(&config);
        let req = Requirement::new("REQ-1", "x", "y");
        assert!(scorer
            .score_requirement(&req, &TestCase::new("TC", "x"))
            .is_err());
    }
}
