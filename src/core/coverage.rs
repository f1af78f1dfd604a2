//! Requirement Coverage
//!
//! Links each requirement to the repository test cases that cover it, using
//! the test case scorer restricted to title and description.
//!
//! | Best score                                         | Status              |
//! |----------------------------------------------------|---------------------|
//! | `>= fully_covered_threshold`                       | `fully_covered`     |
//! | `[coverage_threshold, fully_covered_threshold)`    | `partially_covered` |
//! | `< coverage_threshold`, or empty repository        | `not_covered`       |
//!
//! The overall coverage is the fraction
//! `(fully + partial_coverage_weight * partial) / total` in [0, 1], and 0.0
//! for an empty requirement set.

use crate::core::classifier::rank_order;
use crate::core::config::EngineConfig;
use crate::core::error::{EngineError, InputError, InputErrorKind, RecordRole};
use crate::core::model::{
    CoverageReport, CoverageStatus, CoveringTestCase, Requirement, TestCase,
};
use crate::core::orchestrator::partition_repository;
use crate::core::scorer::TestCaseScorer;
use crate::core::snapshot::RepositorySnapshot;
use crate::events::{EngineEvent, EventBus};
use serde::{Deserialize, Serialize};

/// Coverage of a requirement set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageAnalysis {
    /// One report per well-formed requirement, in input order
    pub reports: Vec<CoverageReport>,
    /// Weighted fraction of covered requirements, in [0, 1]
    pub overall_coverage_percentage: f64,
    /// Requirements skipped as malformed
    pub errors: Vec<InputError>,
}

impl CoverageAnalysis {
    /// Number of reports with `status`.
    pub fn count(&self, status: CoverageStatus) -> usize {
        self.reports.iter().filter(|r| r.status == status).count()
    }
}

/// `(fully + weight * partial) / total`, or 0.0 when `total` is zero.
pub fn overall_percentage(fully: usize, partial: usize, total: usize, partial_weight: f64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let covered = fully as f64 + partial_weight * partial as f64;
    (covered / total as f64).clamp(0.0, 1.0)
}

/// Evaluates requirement coverage against a repository snapshot.
#[derive(Debug, Clone)]
pub struct CoverageAnalyzer {
    config: EngineConfig,
    event_bus: Option<EventBus>,
}

impl CoverageAnalyzer {
    /// Create an analyzer for `config`. Validation happens per call.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            event_bus: None,
        }
    }

    /// Emit a CoverageEvaluated event per requirement
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Status band for a best score.
    pub fn status_for(&self, best_score: f64) -> CoverageStatus {
        if best_score >= self.config.fully_covered_threshold {
            CoverageStatus::FullyCovered
        } else if best_score >= self.config.coverage_threshold {
            CoverageStatus::PartiallyCovered
        } else {
            CoverageStatus::NotCovered
        }
    }

    /// Evaluate one requirement against well-formed test cases.
    pub fn evaluate_requirement(
        &self,
        scorer: &TestCaseScorer,
        requirement: &Requirement,
        test_cases: &[&TestCase],
    ) -> Result<CoverageReport, EngineError> {
        let mut best = 0.0f64;
        let mut covering = Vec::new();
        for tc in test_cases {
            let score = scorer.score_requirement(requirement, tc)?;
            best = best.max(score);
            if score >= self.config.coverage_threshold {
                covering.push(CoveringTestCase {
                    test_case_id: tc.id.clone(),
                    score,
                });
            }
        }
        covering.sort_by(|a, b| {
            rank_order(
                (a.score, a.test_case_id.as_str()),
                (b.score, b.test_case_id.as_str()),
            )
        });

        Ok(CoverageReport {
            requirement_id: requirement.id.clone(),
            status: self.status_for(best),
            score: best,
            covering_test_cases: covering,
        })
    }

    /// Evaluate every requirement.
    pub fn analyze(
        &self,
        requirements: &[Requirement],
        repository: &RepositorySnapshot,
    ) -> Result<CoverageAnalysis, EngineError> {
        self.config.validate()?;
        self.config
            .validate_requirement_weights()
            .map_err(|e| EngineError::Configuration(vec![e]))?;

        let scorer = TestCaseScorer::new(&self.config);
        let records = repository.records();
        let (valid, _) = partition_repository(records);
        let test_cases: Vec<&TestCase> = valid.iter().map(|&i| &records[i]).collect();

        let mut reports = Vec::with_capacity(requirements.len());
        let mut errors = Vec::new();
        for (position, requirement) in requirements.iter().enumerate() {
            if requirement.id.trim().is_empty() {
                let error = InputError::new(
                    &requirement.id,
                    position,
                    RecordRole::Requirement,
                    InputErrorKind::MissingId,
                );
                if let Some(bus) = &self.event_bus {
                    bus.emit_with(|| {
                        EngineEvent::record_skipped(&error.record_id, error.role, error.kind)
                    });
                }
                errors.push(error);
                continue;
            }

            let report = self.evaluate_requirement(&scorer, requirement, &test_cases)?;
            if let Some(bus) = &self.event_bus {
                bus.emit_with(|| {
                    EngineEvent::coverage_evaluated(
                        &report.requirement_id,
                        report.status,
                        report.score,
                        report.covering_test_cases.len(),
                    )
                });
            }
            reports.push(report);
        }

        let fully = reports
            .iter()
            .filter(|r| r.status == CoverageStatus::FullyCovered)
            .count();
        let partial = reports
            .iter()
            .filter(|r| r.status == CoverageStatus::PartiallyCovered)
            .count();
        let overall_coverage_percentage = overall_percentage(
            fully,
            partial,
            reports.len(),
            self.config.partial_coverage_weight,
        );

        Ok(CoverageAnalysis {
            reports,
            overall_coverage_percentage,
            errors,
        })
    }
}

/// Evaluate requirement coverage against `repository`.
pub fn analyze_coverage(
    requirements: &[Requirement],
    repository: &RepositorySnapshot,
    config: &EngineConfig,
) -> Result<CoverageAnalysis, EngineError> {
    CoverageAnalyzer::new(config.clone()).analyze(requirements, repository)
}
