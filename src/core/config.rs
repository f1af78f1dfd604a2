//! Engine Configuration
//!
//! Every threshold and weight the engine uses lives here. A config is passed
//! per call and validated before any comparison runs; invalid values are
//! reported, never corrected.

use crate::core::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tolerance used when checking that scoring weights sum to 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Weights of the three test case similarity components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Weight of title similarity (w1)
    pub title: f64,
    /// Weight of description similarity (w2)
    pub description: f64,
    /// Weight of the step alignment aggregate (w3)
    pub steps: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            title: 0.3,
            description: 0.2,
            steps: 0.5,
        }
    }
}

impl ScoringWeights {
    /// Create weights. Not validated until the config is used.
    pub fn new(title: f64, description: f64, steps: f64) -> Self {
        Self {
            title,
            description,
            steps,
        }
    }

    /// Sum of all three weights.
    pub fn sum(&self) -> f64 {
        self.title + self.description + self.steps
    }
}

/// Token-overlap shortlist applied before full scoring.
///
/// This is an approximation: a repository entry with little title/description
/// overlap but near-identical steps can be dropped from the shortlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefilterConfig {
    /// Whether the shortlist is applied
    pub enabled: bool,
    /// Maximum repository entries fully scored per candidate
    pub shortlist_size: usize,
}

impl Default for PrefilterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            shortlist_size: 50,
        }
    }
}

/// Configuration for `compare` and `analyze`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Lower bound (inclusive) of partial_match
    pub match_threshold: f64,
    /// Lower bound (inclusive) of exact_match
    pub exact_threshold: f64,
    /// Minimum score for a test case to count as covering a requirement
    pub coverage_threshold: f64,
    /// Lower bound (inclusive) of fully_covered
    pub fully_covered_threshold: f64,
    /// Matched step pairs below this score are reported as modified
    pub modification_threshold: f64,
    /// Test case similarity weights
    pub weights: ScoringWeights,
    /// Subtracted from the step aggregate per unmatched step
    pub unmatched_step_penalty: f64,
    /// Share of token-set overlap in field similarity (rest is sequence similarity)
    pub token_set_weight: f64,
    /// Drop common English stop words during normalization
    pub remove_stop_words: bool,
    /// Optional token-overlap shortlist
    pub prefilter: PrefilterConfig,
    /// Repository matches below this score are not reported
    pub reporting_floor: f64,
    /// Cap on reported repository matches per candidate (None = no cap)
    pub top_k: Option<usize>,
    /// Compute differences for every reported match, not only the best
    pub diff_all_matches: bool,
    /// Required types with fewer cases than this raise insufficient_scenarios
    pub min_scenarios_per_type: usize,
    /// Weight of a partially covered requirement in the overall percentage
    pub partial_coverage_weight: f64,
    /// Maximum candidates scored concurrently by `compare_concurrent`
    pub max_concurrency: usize,
    /// Overall deadline for a comparison run, in milliseconds
    pub deadline_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            match_threshold: 0.8,
            exact_threshold: 0.95,
            coverage_threshold: 0.6,
            fully_covered_threshold: 0.85,
            modification_threshold: 0.9,
            weights: ScoringWeights::default(),
            unmatched_step_penalty: 0.15,
            token_set_weight: 0.5,
            remove_stop_words: true,
            prefilter: PrefilterConfig::default(),
            reporting_floor: 0.3,
            top_k: None,
            diff_all_matches: false,
            min_scenarios_per_type: 2,
            partial_coverage_weight: 0.5,
            max_concurrency: 4,
            deadline_ms: None,
        }
    }
}

impl EngineConfig {
    /// Set the partial_match lower bound
    pub fn with_match_threshold(mut self, threshold: f64) -> Self {
        self.match_threshold = threshold;
        self
    }

    /// Set the exact_match lower bound
    pub fn with_exact_threshold(mut self, threshold: f64) -> Self {
        self.exact_threshold = threshold;
        self
    }

    /// Set the coverage threshold
    pub fn with_coverage_threshold(mut self, threshold: f64) -> Self {
        self.coverage_threshold = threshold;
        self
    }

    /// Set the fully-covered threshold
    pub fn with_fully_covered_threshold(mut self, threshold: f64) -> Self {
        self.fully_covered_threshold = threshold;
        self
    }

    /// Set the step modification threshold
    pub fn with_modification_threshold(mut self, threshold: f64) -> Self {
        self.modification_threshold = threshold;
        self
    }

    /// Set the scoring weights
    pub fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Enable the token-overlap prefilter with the given shortlist size
    pub fn with_prefilter(mut self, shortlist_size: usize) -> Self {
        self.prefilter = PrefilterConfig {
            enabled: true,
            shortlist_size,
        };
        self
    }

    /// Cap the number of reported matches
    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = Some(k);
        self
    }

    /// Set the minimum scenarios per required type
    pub fn with_min_scenarios_per_type(mut self, min: usize) -> Self {
        self.min_scenarios_per_type = min;
        self
    }

    /// Set the partial coverage weight
    pub fn with_partial_coverage_weight(mut self, weight: f64) -> Self {
        self.partial_coverage_weight = weight;
        self
    }

    /// Set the concurrency bound
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    /// Set the overall deadline
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline_ms = Some(deadline.as_millis() as u64);
        self
    }

    /// The overall deadline, if any.
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }

    /// Validate every field and return all problems found.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();

        let unit_fields = [
            ("match_threshold", self.match_threshold),
            ("exact_threshold", self.exact_threshold),
            ("coverage_threshold", self.coverage_threshold),
            ("fully_covered_threshold", self.fully_covered_threshold),
            ("modification_threshold", self.modification_threshold),
            ("weights.title", self.weights.title),
            ("weights.description", self.weights.description),
            ("weights.steps", self.weights.steps),
            ("unmatched_step_penalty", self.unmatched_step_penalty),
            ("token_set_weight", self.token_set_weight),
            ("reporting_floor", self.reporting_floor),
            ("partial_coverage_weight", self.partial_coverage_weight),
        ];
        for (field, value) in unit_fields {
            if !(0.0..=1.0).contains(&value) {
                errors.push(ConfigError::new(
                    field,
                    format!("must be between 0.0 and 1.0, got {}", value),
                ));
            }
        }

        if self.exact_threshold <= self.match_threshold {
            errors.push(ConfigError::new(
                "exact_threshold",
                format!(
                    "must be greater than match_threshold ({} <= {})",
                    self.exact_threshold, self.match_threshold
                ),
            ));
        }

        if self.fully_covered_threshold <= self.coverage_threshold {
            errors.push(ConfigError::new(
                "fully_covered_threshold",
                format!(
                    "must be greater than coverage_threshold ({} <= {})",
                    self.fully_covered_threshold, self.coverage_threshold
                ),
            ));
        }

        let sum = self.weights.sum();
        if !((sum - 1.0).abs() <= WEIGHT_SUM_TOLERANCE) {
            errors.push(ConfigError::new(
                "weights",
                format!("title + description + steps must sum to 1.0, got {}", sum),
            ));
        }

        if self.prefilter.enabled && self.prefilter.shortlist_size == 0 {
            errors.push(ConfigError::new(
                "prefilter.shortlist_size",
                "must be >= 1 when the prefilter is enabled",
            ));
        }

        if self.top_k == Some(0) {
            errors.push(ConfigError::new("top_k", "must be >= 1 when set"));
        }

        if self.max_concurrency == 0 {
            errors.push(ConfigError::new("max_concurrency", "must be >= 1"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate the weights used for requirement scoring (steps omitted).
    pub fn validate_requirement_weights(&self) -> Result<(), ConfigError> {
        if self.weights.title + self.weights.description <= 0.0 {
            return Err(ConfigError::new(
                "weights",
                "title and description weights cannot both be zero when scoring requirements",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_default_values() {
        let c = EngineConfig::default();
        assert_eq!(c.match_threshold, 0.8);
        assert_eq!(c.exact_threshold, 0.95);
        assert_eq!(c.coverage_threshold, 0.6);
        assert_eq!(c.fully_covered_threshold, 0.85);
        assert_eq!(c.modification_threshold, 0.9);
        assert_eq!(c.weights, ScoringWeights::new(0.3, 0.2, 0.5));
        assert_eq!(c.min_scenarios_per_type, 2);
        assert_eq!(c.partial_coverage_weight, 0.5);
    }

    #[test]
    fn test_threshold_out_of_range() {
        let c = EngineConfig::default().with_match_threshold(1.5);
        let errors = c.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.field == "match_threshold"));
    }

    #[test]
    fn test_nan_threshold_rejected() {
        let c = EngineConfig::default().with_coverage_threshold(f64::NAN);
        let errors = c.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.field == "coverage_threshold"));
    }

    #[test]
    fn test_exact_must_exceed_match() {
        let c = EngineConfig::default()
            .with_match_threshold(0.9)
            .with_exact_threshold(0.9);
        let errors = c.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.field == "exact_threshold"));
    }

    #[test]
    fn test_fully_covered_must_exceed_coverage() {
        let c = EngineConfig::default()
            .with_coverage_threshold(0.7)
            .with_fully_covered_threshold(0.6);
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let c = EngineConfig::default().with_weights(ScoringWeights::new(0.3, 0.3, 0.3));
        let errors = c.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "weights");
    }

    #[test]
    fn test_weights_within_tolerance_accepted() {
        let c = EngineConfig::default().with_weights(ScoringWeights::new(0.1, 0.2, 0.7));
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut c = EngineConfig::default();
        c.max_concurrency = 0;
        c.top_k = Some(0);
        c.prefilter = PrefilterConfig {
            enabled: true,
            shortlist_size: 0,
        };
        let errors = c.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_requirement_weights_zero() {
        let c = EngineConfig::default().with_weights(ScoringWeights::new(0.0, 0.0, 1.0));
        assert!(c.validate().is_ok());
        assert!(c.validate_requirement_weights().is_err());
    }

    #[test]
    fn test_deserialize_partial_json_uses_defaults() {
        let c: EngineConfig =
            serde_json::from_str(r#"{"match_threshold": 0.7, "weights": {"title": 0.5, "description": 0.0}}"#)
                .unwrap();
        assert_eq!(c.match_threshold, 0.7);
        assert_eq!(c.exact_threshold, 0.95);
        assert_eq!(c.weights.steps, 0.5);
    }

    #[test]
    fn test_deadline_roundtrip() {
        let c = EngineConfig::default().with_deadline(Duration::from_millis(1500));
        assert_eq!(c.deadline(), Some(Duration::from_millis(1500)));
        assert_eq!(EngineConfig::default().deadline(), None);
    }
}
