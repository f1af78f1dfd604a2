//! Comparison Orchestration
//!
//! Runs classification and diffing over a batch of candidates against one
//! repository snapshot.
//!
//! # Flow
//!
//! 1. Validate the config. Any problem aborts the call before work starts.
//! 2. Validate repository records. Malformed ones are skipped and reported.
//! 3. Classify each candidate independently. A malformed candidate yields an
//!    `Errored` outcome and the batch continues.
//! 4. With a deadline, candidates not started in time become `NotProcessed`
//!    and the report carries a `TimeoutError`.
//!
//! Outcomes always mirror input order. Each outcome is either complete or
//! absent; no partially built result is returned.

use crate::core::classifier::MatchClassifier;
use crate::core::config::EngineConfig;
use crate::core::error::{EngineError, InputError, InputErrorKind, RecordRole, TimeoutError};
use crate::core::matcher::FieldMatcher;
use crate::core::model::{ComparisonResult, MatchStatus, TestCase};
use crate::core::scorer::TestCaseScorer;
use crate::core::snapshot::RepositorySnapshot;
use crate::events::{EngineEvent, EventBus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// What happened to one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CandidateOutcome {
    /// The candidate was classified
    Compared(ComparisonResult),
    /// The candidate was malformed and skipped
    Errored {
        /// Candidate id (or `#<position>`)
        test_case_id: String,
        /// Position in the input batch
        position: usize,
        /// Why it was skipped
        error: InputError,
    },
    /// The deadline fired before the candidate finished
    NotProcessed {
        /// Candidate id (or `#<position>`)
        test_case_id: String,
        /// Position in the input batch
        position: usize,
    },
}

impl CandidateOutcome {
    /// Id of the candidate this outcome belongs to.
    pub fn test_case_id(&self) -> &str {
        match self {
            CandidateOutcome::Compared(result) => &result.test_case_id,
            CandidateOutcome::Errored { test_case_id, .. }
            | CandidateOutcome::NotProcessed { test_case_id, .. } => test_case_id,
        }
    }

    /// The comparison result, if the candidate was classified.
    pub fn result(&self) -> Option<&ComparisonResult> {
        match self {
            CandidateOutcome::Compared(result) => Some(result),
            _ => None,
        }
    }

    /// Status of a classified candidate.
    pub fn status(&self) -> Option<MatchStatus> {
        self.result().map(|r| r.match_status)
    }

    pub(crate) fn not_processed(candidate: &TestCase, position: usize) -> Self {
        CandidateOutcome::NotProcessed {
            test_case_id: display_id(&candidate.id, position),
            position,
        }
    }
}

/// Aggregate counts for a comparison run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    /// Candidates classified successfully
    pub total_cases_compared: usize,
    /// Candidates classified exact_match
    pub exact_matches: usize,
    /// Candidates classified partial_match
    pub partial_matches: usize,
    /// Candidates classified new_case
    pub new_cases: usize,
    /// Malformed candidates
    pub errored: usize,
    /// Candidates cut off by the deadline
    pub not_processed: usize,
    /// Records in the repository snapshot, including malformed ones
    pub repository_size: usize,
    /// Malformed repository records that were skipped
    pub repository_errors: Vec<InputError>,
    /// Malformed candidates, with the reason for each
    pub errors: Vec<InputError>,
}

impl ComparisonSummary {
    /// Count outcomes.
    pub fn from_outcomes(
        outcomes: &[CandidateOutcome],
        repository_size: usize,
        repository_errors: Vec<InputError>,
    ) -> Self {
        let mut summary = ComparisonSummary {
            repository_size,
            repository_errors,
            ..Default::default()
        };

        for outcome in outcomes {
            match outcome {
                CandidateOutcome::Compared(result) => {
                    summary.total_cases_compared += 1;
                    match result.match_status {
                        MatchStatus::ExactMatch => summary.exact_matches += 1,
                        MatchStatus::PartialMatch => summary.partial_matches += 1,
                        MatchStatus::NewCase => summary.new_cases += 1,
                    }
                }
                CandidateOutcome::Errored { error, .. } => {
                    summary.errored += 1;
                    summary.errors.push(error.clone());
                }
                CandidateOutcome::NotProcessed { .. } => summary.not_processed += 1,
            }
        }

        summary
    }
}

/// Output of `compare`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    /// Aggregate counts
    pub summary: ComparisonSummary,
    /// One outcome per candidate, in input order
    pub results: Vec<CandidateOutcome>,
    /// Set when the deadline fired
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<TimeoutError>,
}

impl ComparisonReport {
    /// Classified results only, in input order.
    pub fn comparison_results(&self) -> impl Iterator<Item = &ComparisonResult> {
        self.results.iter().filter_map(CandidateOutcome::result)
    }

    /// Outcome for a candidate id.
    pub fn outcome(&self, test_case_id: &str) -> Option<&CandidateOutcome> {
        self.results.iter().find(|o| o.test_case_id() == test_case_id)
    }
}

pub(crate) fn display_id(id: &str, position: usize) -> String {
    if id.trim().is_empty() {
        format!("#{}", position)
    } else {
        id.to_string()
    }
}

/// Check that a test case has the fields the engine requires.
pub fn validate_test_case(
    test_case: &TestCase,
    position: usize,
    role: RecordRole,
) -> Result<(), InputError> {
    if test_case.id.trim().is_empty() {
        return Err(InputError::new(
            &test_case.id,
            position,
            role,
            InputErrorKind::MissingId,
        ));
    }
    if test_case.steps.is_empty() {
        return Err(InputError::new(
            &test_case.id,
            position,
            role,
            InputErrorKind::MissingSteps,
        ));
    }
    if test_case.steps.iter().any(|s| s.step_number == 0) {
        return Err(InputError::new(
            &test_case.id,
            position,
            role,
            InputErrorKind::MissingStepNumber,
        ));
    }
    Ok(())
}

/// Split repository records into well-formed entries and errors.
pub fn partition_repository(records: &[TestCase]) -> (Vec<usize>, Vec<InputError>) {
    let mut valid = Vec::with_capacity(records.len());
    let mut errors = Vec::new();
    for (position, record) in records.iter().enumerate() {
        match validate_test_case(record, position, RecordRole::Repository) {
            Ok(()) => valid.push(position),
            Err(e) => errors.push(e),
        }
    }
    (valid, errors)
}

/// Batch comparison entry point with optional observability.
#[derive(Debug, Clone)]
pub struct Comparator {
    config: EngineConfig,
    matcher: Option<Arc<dyn FieldMatcher>>,
    event_bus: Option<EventBus>,
}

impl Comparator {
    /// Create a comparator for `config`. Validation happens per call.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            matcher: None,
            event_bus: None,
        }
    }

    /// Emit events to `bus` during runs
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Use a custom field matcher instead of the blended default
    pub fn with_matcher(mut self, matcher: Arc<dyn FieldMatcher>) -> Self {
        self.matcher = Some(matcher);
        self
    }

    /// The config in use.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn event_bus(&self) -> Option<&EventBus> {
        self.event_bus.as_ref()
    }

    pub(crate) fn emit(&self, make: impl FnOnce() -> EngineEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit_with(make);
        }
    }

    /// Validate the config and build the classifier for a run.
    pub(crate) fn classifier(&self) -> Result<MatchClassifier, EngineError> {
        self.config.validate()?;
        let mut scorer = TestCaseScorer::new(&self.config);
        if let Some(matcher) = &self.matcher {
            scorer = scorer.with_matcher(Arc::clone(matcher));
        }
        Ok(MatchClassifier::new(&self.config).with_scorer(scorer))
    }

    pub(crate) fn report_repository_errors(&self, errors: &[InputError]) {
        for e in errors {
            self.emit(|| EngineEvent::record_skipped(&e.record_id, e.role, e.kind));
        }
    }

    /// Compare candidates sequentially against `repository`.
    pub fn compare(
        &self,
        candidates: &[TestCase],
        repository: &RepositorySnapshot,
    ) -> Result<ComparisonReport, EngineError> {
        let classifier = self.classifier()?;
        let start = Instant::now();
        let deadline = self.config.deadline();

        self.emit(|| EngineEvent::comparison_started(candidates.len(), repository.len()));

        let records = repository.records();
        let (valid, repository_errors) = partition_repository(records);
        self.report_repository_errors(&repository_errors);
        let entries: Vec<&TestCase> = valid.iter().map(|&i| &records[i]).collect();

        let mut outcomes = Vec::with_capacity(candidates.len());
        let mut timed_out = false;
        for (position, candidate) in candidates.iter().enumerate() {
            if !timed_out {
                if let Some(limit) = deadline {
                    timed_out = start.elapsed() >= limit;
                }
            }
            if timed_out {
                outcomes.push(CandidateOutcome::not_processed(candidate, position));
                continue;
            }
            outcomes.push(process_candidate(
                &classifier,
                candidate,
                position,
                &entries,
                self.event_bus(),
            )?);
        }

        Ok(self.finish(outcomes, repository.len(), repository_errors, start))
    }

    /// Summarize outcomes, attach the timeout (if any) and emit completion events.
    pub(crate) fn finish(
        &self,
        outcomes: Vec<CandidateOutcome>,
        repository_size: usize,
        repository_errors: Vec<InputError>,
        start: Instant,
    ) -> ComparisonReport {
        let elapsed = start.elapsed();
        let summary = ComparisonSummary::from_outcomes(&outcomes, repository_size, repository_errors);

        let timeout = if summary.not_processed > 0 {
            let not_processed: Vec<String> = outcomes
                .iter()
                .filter(|o| matches!(o, CandidateOutcome::NotProcessed { .. }))
                .map(|o| o.test_case_id().to_string())
                .collect();
            let completed = outcomes.len() - not_processed.len();
            self.emit(|| {
                EngineEvent::deadline_exceeded(completed, not_processed.len(), millis(elapsed))
            });
            Some(TimeoutError::new(elapsed, completed, not_processed))
        } else {
            None
        };

        self.emit(|| {
            EngineEvent::comparison_completed(
                summary.total_cases_compared,
                summary.exact_matches,
                summary.partial_matches,
                summary.new_cases,
                summary.errored,
                summary.not_processed,
                millis(elapsed),
            )
        });

        ComparisonReport {
            summary,
            results: outcomes,
            timeout,
        }
    }
}

fn millis(d: Duration) -> u64 {
    d.as_millis() as u64
}

/// Validate and classify one candidate.
pub(crate) fn process_candidate(
    classifier: &MatchClassifier,
    candidate: &TestCase,
    position: usize,
    repository: &[&TestCase],
    bus: Option<&EventBus>,
) -> Result<CandidateOutcome, EngineError> {
    if let Err(error) = validate_test_case(candidate, position, RecordRole::Candidate) {
        if let Some(bus) = bus {
            bus.emit_with(|| EngineEvent::record_skipped(&error.record_id, error.role, error.kind));
        }
        return Ok(CandidateOutcome::Errored {
            test_case_id: error.record_id.clone(),
            position,
            error,
        });
    }

    let started = Instant::now();
    let result = classifier.classify(candidate, repository)?.into_result(&candidate.id);

    if let Some(bus) = bus {
        bus.emit_with(|| {
            EngineEvent::candidate_classified(
                &result.test_case_id,
                result.match_status,
                result.match_score,
                result.best_match().map(|m| m.repository_id.as_str()),
                millis(started.elapsed()),
            )
        });
    }

    Ok(CandidateOutcome::Compared(result))
}

/// Compare `candidates` against `repository` sequentially.
///
/// Stateless: nothing is retained between calls.
pub fn compare(
    candidates: &[TestCase],
    repository: &RepositorySnapshot,
    config: &EngineConfig,
) -> Result<ComparisonReport, EngineError> {
    Comparator::new(config.clone()).compare(candidates, repository)
}
