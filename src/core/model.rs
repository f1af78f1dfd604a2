//! Canonical Records for Test Case Comparison
//!
//! Defines the one shape every producer must conform to before calling the
//! engine: test cases with ordered steps, requirements, and the result types
//! returned by `compare` and `analyze`.
//!
//! # Boundary Rules
//!
//! Producer-specific adaptation (renamed fields, alternate layouts) belongs to
//! the connector layer. The only leniency here is that `id`, `steps`, step
//! numbers and a few descriptive fields default when absent, so a single malformed record is
//! reported as an `InputError` instead of failing deserialization of the
//! whole batch.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A single ordered step of a test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Step number as authored (preserved in diff locations). Numbering
    /// starts at 1; 0 marks a step whose number was absent.
    #[serde(default)]
    pub step_number: u32,
    /// What the tester does
    #[serde(default)]
    pub action: String,
    /// What the system should do in response
    #[serde(default)]
    pub expected_result: String,
    /// Optional input data for the step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_data: Option<String>,
}

impl Step {
    /// Create a step without test data.
    pub fn new(
        step_number: u32,
        action: impl Into<String>,
        expected_result: impl Into<String>,
    ) -> Self {
        Self {
            step_number,
            action: action.into(),
            expected_result: expected_result.into(),
            test_data: None,
        }
    }

    /// Attach test data to the step.
    pub fn with_test_data(mut self, data: impl Into<String>) -> Self {
        self.test_data = Some(data.into());
        self
    }

    /// The text compared during step alignment (action + expected result).
    pub fn comparison_text(&self) -> String {
        match (self.action.is_empty(), self.expected_result.is_empty()) {
            (true, true) => String::new(),
            (false, true) => self.action.clone(),
            (true, false) => self.expected_result.clone(),
            (false, false) => format!("{} {}", self.action, self.expected_result),
        }
    }

    /// Human-readable rendering used in difference descriptions.
    pub fn display_text(&self) -> String {
        if self.expected_result.is_empty() {
            self.action.clone()
        } else {
            format!("{} -> {}", self.action, self.expected_result)
        }
    }
}

/// Category of a test case.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TestType {
    /// Happy-path behaviour
    Positive,
    /// Invalid input or error handling
    Negative,
    /// Edge and limit values
    Boundary,
    /// Load, latency, throughput
    Performance,
    /// Authentication, authorization, injection
    Security,
    /// Anything not covered above
    #[default]
    #[serde(other)]
    Other,
}

impl TestType {
    /// All test types in canonical order.
    pub const ALL: [TestType; 6] = [
        TestType::Positive,
        TestType::Negative,
        TestType::Boundary,
        TestType::Performance,
        TestType::Security,
        TestType::Other,
    ];

    /// Stable snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            TestType::Positive => "positive",
            TestType::Negative => "negative",
            TestType::Boundary => "boundary",
            TestType::Performance => "performance",
            TestType::Security => "security",
            TestType::Other => "other",
        }
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown test type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTestTypeError {
    /// The rejected input
    pub provided: String,
}

impl fmt::Display for ParseTestTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown test type '{}'. Valid options: positive, negative, boundary, performance, security, other",
            self.provided
        )
    }
}

impl std::error::Error for ParseTestTypeError {}

impl FromStr for TestType {
    type Err = ParseTestTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Ok(TestType::Positive),
            "negative" => Ok(TestType::Negative),
            "boundary" => Ok(TestType::Boundary),
            "performance" => Ok(TestType::Performance),
            "security" => Ok(TestType::Security),
            "other" => Ok(TestType::Other),
            _ => Err(ParseTestTypeError {
                provided: s.to_string(),
            }),
        }
    }
}

/// A test case as seen by the engine. Never mutated once passed in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    /// Unique identifier (required; empty means malformed)
    #[serde(default)]
    pub id: String,
    /// Short title
    #[serde(default)]
    pub title: String,
    /// Free-text description
    #[serde(default)]
    pub description: String,
    /// Ordered steps (required; empty means malformed)
    #[serde(default)]
    pub steps: Vec<Step>,
    /// Test category
    #[serde(rename = "type", default)]
    pub test_type: TestType,
    /// Functional areas this case exercises
    #[serde(default)]
    pub coverage_areas: BTreeSet<String>,
    /// Owning team or person
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Where the record came from (connector name, file, generator)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl TestCase {
    /// Create a test case with no steps, typed `other`.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            steps: Vec::new(),
            test_type: TestType::Other,
            coverage_areas: BTreeSet::new(),
            owner: None,
            source: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Append a step numbered after the current last step.
    pub fn with_step(mut self, action: impl Into<String>, expected: impl Into<String>) -> Self {
        let next = self.steps.last().map(|s| s.step_number + 1).unwrap_or(1);
        self.steps.push(Step::new(next, action, expected));
        self
    }

    /// Replace all steps.
    pub fn with_steps(mut self, steps: Vec<Step>) -> Self {
        self.steps = steps;
        self
    }

    /// Set the test type.
    pub fn with_type(mut self, test_type: TestType) -> Self {
        self.test_type = test_type;
        self
    }

    /// Add a coverage area.
    pub fn with_coverage_area(mut self, area: impl Into<String>) -> Self {
        self.coverage_areas.insert(area.into());
        self
    }

    /// Set the owner.
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Set the source.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// A requirement that repository test cases should cover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    /// Unique identifier
    #[serde(default)]
    pub id: String,
    /// Short title
    #[serde(default)]
    pub title: String,
    /// Free-text description
    #[serde(default)]
    pub description: String,
}

impl Requirement {
    /// Create a requirement.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Classification of a candidate against the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Best score at or above the exact threshold with no differences
    ExactMatch,
    /// Best score in [match_threshold, exact_threshold), or exact-level score with differences
    PartialMatch,
    /// Best score below match_threshold, or empty repository
    NewCase,
}

impl MatchStatus {
    /// Stable snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::ExactMatch => "exact_match",
            MatchStatus::PartialMatch => "partial_match",
            MatchStatus::NewCase => "new_case",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of step-level difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifferenceKind {
    /// Step exists only in the repository entry
    MissingStep,
    /// Step exists only in the candidate
    AdditionalStep,
    /// Matched steps whose texts differ beyond the modification threshold
    ModifiedStep,
}

impl DifferenceKind {
    /// Stable snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            DifferenceKind::MissingStep => "missing_step",
            DifferenceKind::AdditionalStep => "additional_step",
            DifferenceKind::ModifiedStep => "modified_step",
        }
    }
}

/// Where a difference sits, in original step numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepLocation {
    /// Step number in the candidate, if the step exists there
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_step: Option<u32>,
    /// Step number in the repository entry, if the step exists there
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_step: Option<u32>,
}

/// A step-level difference between a candidate and a repository entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Difference {
    /// What kind of difference this is
    pub kind: DifferenceKind,
    /// Location in original step numbering
    pub location: StepLocation,
    /// Human-readable summary
    pub description: String,
    /// Repository-side text, where applicable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    /// Candidate-side text, where applicable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

/// One repository entry scored against a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryMatch {
    /// Repository test case id
    pub repository_id: String,
    /// Test case similarity score in [0, 1]
    pub score: f64,
    /// Step-level differences (always computed for the best match)
    pub differences: Vec<Difference>,
}

/// Outcome of comparing one well-formed candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// Candidate id
    pub test_case_id: String,
    /// Classification of the best match
    pub match_status: MatchStatus,
    /// Best score (0.0 when the repository is empty)
    pub match_score: f64,
    /// Retained matches, descending by score then ascending by id
    pub repository_matches: Vec<RepositoryMatch>,
}

impl ComparisonResult {
    /// The best retained match, if any.
    pub fn best_match(&self) -> Option<&RepositoryMatch> {
        self.repository_matches.first()
    }
}

/// Coverage status of a requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageStatus {
    /// Best score at or above the fully-covered threshold
    FullyCovered,
    /// Best score in [coverage_threshold, fully_covered_threshold)
    PartiallyCovered,
    /// No test case reaches the coverage threshold
    NotCovered,
}

impl CoverageStatus {
    /// Stable snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            CoverageStatus::FullyCovered => "fully_covered",
            CoverageStatus::PartiallyCovered => "partially_covered",
            CoverageStatus::NotCovered => "not_covered",
        }
    }
}

impl fmt::Display for CoverageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A test case that covers a requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoveringTestCase {
    /// Repository test case id
    pub test_case_id: String,
    /// Requirement-to-test-case score
    pub score: f64,
}

/// Coverage of a single requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    /// Requirement id
    pub requirement_id: String,
    /// Coverage band of the best score
    pub status: CoverageStatus,
    /// Best score across the repository (0.0 when empty)
    pub score: f64,
    /// All test cases at or above the coverage threshold, descending
    pub covering_test_cases: Vec<CoveringTestCase>,
}

/// Kind of detected gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapType {
    /// A required test type has no test cases
    MissingTestType,
    /// A declared coverage area (or requirement) has no backing test cases
    MissingCoverageArea,
    /// Too few test cases for a required type, or only partial coverage
    InsufficientScenarios,
}

impl GapType {
    /// Stable snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            GapType::MissingTestType => "missing_test_type",
            GapType::MissingCoverageArea => "missing_coverage_area",
            GapType::InsufficientScenarios => "insufficient_scenarios",
        }
    }
}

impl fmt::Display for GapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gap severity. Ordering is most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Must be addressed
    High,
    /// Should be addressed
    Medium,
    /// Worth a look
    Low,
}

impl Severity {
    /// Stable snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected shortfall in test-type or coverage-area representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapReport {
    /// Kind of gap
    pub gap_type: GapType,
    /// How urgent it is
    pub severity: Severity,
    /// The test type, coverage area or requirement id the gap is about
    pub subject: String,
    /// Human-readable explanation
    pub description: String,
    /// Concrete additions that would close the gap
    pub suggested_additions: Vec<String>,
}
