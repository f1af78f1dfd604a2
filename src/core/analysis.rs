//! Coverage and gap analysis in one call
//!
//! Combines the coverage analyzer with the gap analyzer over the same
//! repository snapshot. Requirements that are not covered, or only partly
//! covered, are turned into gaps alongside the profile-driven ones.

use crate::core::config::EngineConfig;
use crate::core::coverage::CoverageAnalyzer;
use crate::core::error::{EngineError, InputError};
use crate::core::gaps::{analyze_gaps, sort_gaps, AreaShare, GapProfile, TypeShare};
use crate::core::model::{
    CoverageReport, CoverageStatus, GapReport, GapType, Requirement, Severity, TestCase,
};
use crate::core::orchestrator::partition_repository;
use crate::core::snapshot::RepositorySnapshot;
use crate::events::{EngineEvent, EventBus};
use serde::{Deserialize, Serialize};

/// Requirement coverage counts.
///
/// `total_requirements` counts every input record, including malformed ones
/// reported in `errored`. The percentage is taken over well-formed records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageSummary {
    pub total_requirements: usize,
    pub fully_covered: usize,
    pub partially_covered: usize,
    pub not_covered: usize,
    pub errored: usize,
    pub overall_coverage_percentage: f64,
}

/// Result of `analyze`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub coverage_summary: CoverageSummary,
    pub requirement_coverage: Vec<CoverageReport>,
    /// Profile gaps and requirement gaps, ranked together
    pub gap_analysis: Vec<GapReport>,
    pub type_distribution: Vec<TypeShare>,
    pub area_distribution: Vec<AreaShare>,
    /// Malformed requirements and repository records that were skipped
    pub errors: Vec<InputError>,
}

/// Gap for a requirement that is not fully covered, if any.
pub fn requirement_gap(report: &CoverageReport, requirement: Option<&Requirement>) -> Option<GapReport> {
    let title = requirement
        .map(|r| r.title.trim())
        .filter(|t| !t.is_empty())
        .unwrap_or(report.requirement_id.as_str());

    match report.status {
        CoverageStatus::FullyCovered => None,
        CoverageStatus::NotCovered => Some(GapReport {
            gap_type: GapType::MissingCoverageArea,
            severity: Severity::High,
            subject: report.requirement_id.clone(),
            description: format!(
                "Requirement {} has no covering test case (best score {:.2})",
                report.requirement_id, report.score
            ),
            suggested_additions: vec![format!("Add test cases for: {}", title)],
        }),
        CoverageStatus::PartiallyCovered => Some(GapReport {
            gap_type: GapType::InsufficientScenarios,
            severity: Severity::Low,
            subject: report.requirement_id.clone(),
            description: format!(
                "Requirement {} is only partially covered (best score {:.2})",
                report.requirement_id, report.score
            ),
            suggested_additions: vec![format!("Add scenarios that fully exercise: {}", title)],
        }),
    }
}

/// Runs coverage and gap analysis with optional event emission.
#[derive(Debug, Clone)]
pub struct Analyzer {
    config: EngineConfig,
    event_bus: Option<EventBus>,
}

impl Analyzer {
    /// Create an analyzer for `config`
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            event_bus: None,
        }
    }

    /// Attach an event bus for CoverageEvaluated and GapDetected events
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Get the config
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Analyze requirement coverage and test distribution gaps.
    pub fn analyze(
        &self,
        requirements: &[Requirement],
        repository: &RepositorySnapshot,
        profile: &GapProfile,
    ) -> Result<AnalysisReport, EngineError> {
        let mut coverage = CoverageAnalyzer::new(self.config.clone());
        if let Some(bus) = &self.event_bus {
            coverage = coverage.with_event_bus(bus.clone());
        }
        let coverage = coverage.analyze(requirements, repository)?;

        let records = repository.records();
        let (valid, repository_errors) = partition_repository(records);
        let test_cases: Vec<TestCase> = valid.iter().map(|&i| records[i].clone()).collect();
        let gap_analysis = analyze_gaps(&test_cases, profile, self.config.min_scenarios_per_type);

        let mut gaps = gap_analysis.gaps;
        gaps.extend(coverage.reports.iter().filter_map(|report| {
            let requirement = requirements.iter().find(|r| r.id == report.requirement_id);
            requirement_gap(report, requirement)
        }));
        sort_gaps(&mut gaps);

        if let Some(bus) = &self.event_bus {
            for gap in &gaps {
                bus.emit_with(|| EngineEvent::gap_detected(gap.gap_type, gap.severity, &gap.subject));
            }
        }

        let coverage_summary = CoverageSummary {
            total_requirements: requirements.len(),
            fully_covered: coverage.count(CoverageStatus::FullyCovered),
            partially_covered: coverage.count(CoverageStatus::PartiallyCovered),
            not_covered: coverage.count(CoverageStatus::NotCovered),
            errored: coverage.errors.len(),
            overall_coverage_percentage: coverage.overall_coverage_percentage,
        };

        let mut errors = coverage.errors;
        errors.extend(repository_errors);

        Ok(AnalysisReport {
            coverage_summary,
            requirement_coverage: coverage.reports,
            gap_analysis: gaps,
            type_distribution: gap_analysis.type_distribution,
            area_distribution: gap_analysis.area_distribution,
            errors,
        })
    }
}

/// Analyze `requirements` and `profile` against `repository`.
pub fn analyze(
    requirements: &[Requirement],
    repository: &RepositorySnapshot,
    profile: &GapProfile,
    config: &EngineConfig,
) -> Result<AnalysisReport, EngineError> {
    Analyzer::new(config.clone()).analyze(requirements, repository, profile)
}
