//! Gap Analysis
//!
//! Aggregates the test-type and coverage-area distributions of a set of test
//! cases and flags categories a feature declares as required but that are
//! missing or thin.

use crate::core::model::{GapReport, GapType, Severity, TestCase, TestType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Types and areas a feature declares as required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GapProfile {
    /// Test types that must be represented
    pub required_types: BTreeSet<TestType>,
    /// Coverage areas that must have at least one test case
    pub required_coverage_areas: BTreeSet<String>,
}

impl GapProfile {
    /// Empty profile: only distributions are computed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require every test type except `other`.
    pub fn all_types() -> Self {
        Self {
            required_types: TestType::ALL
                .iter()
                .copied()
                .filter(|t| *t != TestType::Other)
                .collect(),
            required_coverage_areas: BTreeSet::new(),
        }
    }

    /// Add a required test type
    pub fn with_type(mut self, test_type: TestType) -> Self {
        self.required_types.insert(test_type);
        self
    }

    /// Add a required coverage area
    pub fn with_area(mut self, area: impl Into<String>) -> Self {
        self.required_coverage_areas.insert(normalize_area(&area.into()));
        self
    }
}

/// Count and share of one test type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeShare {
    #[serde(rename = "type")]
    pub test_type: TestType,
    pub count: usize,
    /// 0 to 100
    pub percentage: f64,
}

/// Count and share of one coverage area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaShare {
    pub area: String,
    pub count: usize,
    /// 0 to 100
    pub percentage: f64,
}

/// Distributions plus ranked gaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapAnalysis {
    /// One entry per `TestType`, in declaration order
    pub type_distribution: Vec<TypeShare>,
    /// One entry per observed or required area, sorted by name
    pub area_distribution: Vec<AreaShare>,
    pub gaps: Vec<GapReport>,
}

impl GapAnalysis {
    /// Count for one test type.
    pub fn type_count(&self, test_type: TestType) -> usize {
        self.type_distribution
            .iter()
            .find(|s| s.test_type == test_type)
            .map_or(0, |s| s.count)
    }
}

/// Areas compare case-insensitively with surrounding whitespace ignored.
pub fn normalize_area(area: &str) -> String {
    area.trim().to_lowercase()
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * count as f64 / total as f64
    }
}

/// Rank gaps by severity, then gap type name, then subject.
pub fn sort_gaps(gaps: &mut [GapReport]) {
    gaps.sort_by(|a, b| {
        a.severity
            .cmp(&b.severity)
            .then_with(|| a.gap_type.as_str().cmp(b.gap_type.as_str()))
            .then_with(|| a.subject.cmp(&b.subject))
    });
}

/// Compute distributions and gaps for `test_cases` against `profile`.
pub fn analyze_gaps(
    test_cases: &[TestCase],
    profile: &GapProfile,
    min_scenarios_per_type: usize,
) -> GapAnalysis {
    let total = test_cases.len();

    let mut type_counts: BTreeMap<TestType, usize> = BTreeMap::new();
    let mut area_counts: BTreeMap<String, usize> = BTreeMap::new();
    for tc in test_cases {
        *type_counts.entry(tc.test_type).or_default() += 1;
        let areas: BTreeSet<String> = tc
            .coverage_areas
            .iter()
            .map(|a| normalize_area(a))
            .filter(|a| !a.is_empty())
            .collect();
        for area in areas {
            *area_counts.entry(area).or_default() += 1;
        }
    }
    for area in &profile.required_coverage_areas {
        area_counts.entry(normalize_area(area)).or_default();
    }

    let type_distribution = TestType::ALL
        .iter()
        .map(|&test_type| {
            let count = type_counts.get(&test_type).copied().unwrap_or(0);
            TypeShare {
                test_type,
                count,
                percentage: percentage(count, total),
            }
        })
        .collect();

    let area_distribution = area_counts
        .iter()
        .map(|(area, &count)| AreaShare {
            area: area.clone(),
            count,
            percentage: percentage(count, total),
        })
        .collect();

    let mut gaps = Vec::new();
    for &test_type in &profile.required_types {
        let count = type_counts.get(&test_type).copied().unwrap_or(0);
        if count == 0 {
            gaps.push(GapReport {
                gap_type: GapType::MissingTestType,
                severity: Severity::High,
                subject: test_type.to_string(),
                description: format!("No {} test cases found", test_type),
                suggested_additions: vec![format!(
                    "Add at least {} {} test case(s)",
                    min_scenarios_per_type.max(1),
                    test_type
                )],
            });
        } else if count < min_scenarios_per_type {
            gaps.push(GapReport {
                gap_type: GapType::InsufficientScenarios,
                severity: Severity::Medium,
                subject: test_type.to_string(),
                description: format!(
                    "Only {} {} test case(s), expected at least {}",
                    count, test_type, min_scenarios_per_type
                ),
                suggested_additions: vec![format!(
                    "Add {} more {} test case(s)",
                    min_scenarios_per_type - count,
                    test_type
                )],
            });
        }
    }

    for area in &profile.required_coverage_areas {
        let area = normalize_area(area);
        if area_counts.get(&area).copied().unwrap_or(0) == 0 {
            gaps.push(GapReport {
                gap_type: GapType::MissingCoverageArea,
                severity: Severity::High,
                description: format!("No test cases cover area '{}'", area),
                suggested_additions: vec![format!("Add a test case covering '{}'", area)],
                subject: area,
            });
        }
    }

    sort_gaps(&mut gaps);

    GapAnalysis {
        type_distribution,
        area_distribution,
        gaps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(id: &str, test_type: TestType, areas: &[&str]) -> TestCase {
        let mut tc = TestCase::new(id, id).with_type(test_type).with_step("a", "b");
        for area in areas {
            tc = tc.with_coverage_area(*area);
        }
        tc
    }

    fn sample() -> Vec<TestCase> {
        vec![
            typed("1", TestType::Positive, &["Login"]),
            typed("2", TestType::Positive, &["login", "session"]),
            typed("3", TestType::Negative, &["login"]),
            typed("4", TestType::Positive, &[]),
        ]
    }

    // ==========================================
    // Distribution Tests
    // ==========================================

    #[test]
    fn test_type_distribution_lists_all_types() {
        let analysis = analyze_gaps(&sample(), &GapProfile::new(), 2);
        assert_eq!(analysis.type_distribution.len(), TestType::ALL.len());
        assert_eq!(analysis.type_count(TestType::Positive), 3);
        assert_eq!(analysis.type_count(TestType::Negative), 1);
        assert_eq!(analysis.type_count(TestType::Security), 0);
        assert_eq!(analysis.type_distribution[0].percentage, 75.0);
        assert!(analysis.gaps.is_empty());
    }

    #[test]
    fn test_area_distribution_case_insensitive() {
        let analysis = analyze_gaps(&sample(), &GapProfile::new(), 2);
        let login = analysis
            .area_distribution
            .iter()
            .find(|a| a.area == "login")
            .unwrap();
        assert_eq!(login.count, 3);
        assert_eq!(analysis.area_distribution.len(), 2);
    }

    #[test]
    fn test_empty_input_has_zero_percentages() {
        let analysis = analyze_gaps(&[], &GapProfile::new(), 2);
        assert!(analysis.type_distribution.iter().all(|s| s.percentage == 0.0));
        assert!(analysis.area_distribution.is_empty());
    }

    // ==========================================
    // Gap Detection Tests
    // ==========================================

    #[test]
    fn test_missing_and_insufficient_types() {
        let profile = GapProfile::new()
            .with_type(TestType::Negative)
            .with_type(TestType::Security)
            .with_type(TestType::Positive);
        let analysis = analyze_gaps(&sample(), &profile, 2);

        assert_eq!(analysis.gaps.len(), 2);
        assert_eq!(analysis.gaps[0].gap_type, GapType::MissingTestType);
        assert_eq!(analysis.gaps[0].severity, Severity::High);
        assert_eq!(analysis.gaps[0].subject, "security");
        assert_eq!(analysis.gaps[1].gap_type, GapType::InsufficientScenarios);
        assert_eq!(analysis.gaps[1].severity, Severity::Medium);
        assert_eq!(analysis.gaps[1].subject, "negative");
    }

    #[test]
    fn test_missing_coverage_area() {
        let profile = GapProfile::new().with_area("Payments").with_area("login");
        let analysis = analyze_gaps(&sample(), &profile, 2);
        assert_eq!(analysis.gaps.len(), 1);
        assert_eq!(analysis.gaps[0].gap_type, GapType::MissingCoverageArea);
        assert_eq!(analysis.gaps[0].subject, "payments");
        assert!(analysis
            .area_distribution
            .iter()
            .any(|a| a.area == "payments" && a.count == 0));
    }

    #[test]
    fn test_gap_ranking_is_deterministic() {
        let profile = GapProfile::all_types().with_area("zeta").with_area("alpha");
        let analysis = analyze_gaps(&sample(), &profile, 2);
        let order: Vec<(Severity, &str, &str)> = analysis
            .gaps
            .iter()
            .map(|g| (g.severity, g.gap_type.as_str(), g.subject.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                (Severity::High, "missing_coverage_area", "alpha"),
                (Severity::High, "missing_coverage_area", "zeta"),
                (Severity::High, "missing_test_type", "boundary"),
                (Severity::High, "missing_test_type", "performance"),
                (Severity::High, "missing_test_type", "security"),
                (Severity::Medium, "insufficient_scenarios", "negative"),
            ]
        );
    }

    #[test]
    fn test_minimum_of_one_never_insufficient() {
        let profile = GapProfile::new().with_type(TestType::Negative);
        let analysis = analyze_gaps(&sample(), &profile, 1);
        assert!(analysis.gaps.is_empty());
    }
}
