//! Event-Driven Observability for the Comparison Engine
//!
//! Provides structured events for monitoring comparison and analysis runs:
//! - Run start and completion with summary counts
//! - Per-candidate classification
//! - Skipped (malformed) records
//! - Deadline expiry
//! - Per-requirement coverage and detected gaps
//!
//! # Architecture
//!
//! Events are emitted via an `EventBus` which uses a broadcast channel.
//! Multiple observers can subscribe to receive all events:
//!
//! ```text
//! compare / analyze → EventBus → [LoggingObserver, MetricsObserver, ...]
//! ```
//!
//! Emission never affects results: with no bus attached, or no subscribers,
//! events are dropped.

pub mod bus;
pub mod observers;

use crate::core::error::{InputErrorKind, RecordRole};
use crate::core::model::{CoverageStatus, GapType, MatchStatus, Severity};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// All events emitted by the engine
///
/// Events are tagged with their type for JSON serialization and include
/// timestamps for latency tracking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum EngineEvent {
    /// A comparison run started
    ComparisonStarted {
        /// Number of candidates in the batch
        candidates: usize,
        /// Number of records in the repository snapshot
        repository_size: usize,
        /// When the run started
        #[serde(with = "system_time_serde")]
        timestamp: SystemTime,
    },

    /// A candidate was classified against the repository
    CandidateClassified {
        /// Candidate id
        test_case_id: String,
        /// Resulting status
        status: MatchStatus,
        /// Best score
        score: f64,
        /// Id of the best repository match, if any was retained
        #[serde(skip_serializing_if = "Option::is_none")]
        best_match: Option<String>,
        /// Time spent on this candidate
        latency_ms: u64,
        /// When classification finished
        #[serde(with = "system_time_serde")]
        timestamp: SystemTime,
    },

    /// A malformed record was skipped
    RecordSkipped {
        /// Record id (or `#<position>`)
        record_id: String,
        /// Which batch it came from
        role: RecordRole,
        /// What was missing
        kind: InputErrorKind,
        /// When it was skipped
        #[serde(with = "system_time_serde")]
        timestamp: SystemTime,
    },

    /// The run deadline fired before every candidate was processed
    DeadlineExceeded {
        /// Candidates with an outcome
        completed: usize,
        /// Candidates marked not processed
        not_processed: usize,
        /// Elapsed time when the deadline fired
        elapsed_ms: u64,
        /// When the deadline fired
        #[serde(with = "system_time_serde")]
        timestamp: SystemTime,
    },

    /// A comparison run finished
    ComparisonCompleted {
        /// Candidates compared successfully
        total_cases_compared: usize,
        /// Candidates classified exact_match
        exact_matches: usize,
        /// Candidates classified partial_match
        partial_matches: usize,
        /// Candidates classified new_case
        new_cases: usize,
        /// Malformed candidates
        errored: usize,
        /// Candidates cut off by the deadline
        not_processed: usize,
        /// Wall time of the run
        elapsed_ms: u64,
        /// When the run finished
        #[serde(with = "system_time_serde")]
        timestamp: SystemTime,
    },

    /// A requirement's coverage was evaluated
    CoverageEvaluated {
        /// Requirement id
        requirement_id: String,
        /// Coverage band
        status: CoverageStatus,
        /// Best score
        score: f64,
        /// Number of covering test cases
        covering: usize,
        /// When it was evaluated
        #[serde(with = "system_time_serde")]
        timestamp: SystemTime,
    },

    /// A gap was detected during analysis
    GapDetected {
        /// Kind of gap
        gap_type: GapType,
        /// Severity
        severity: Severity,
        /// Type, area or requirement the gap is about
        subject: String,
        /// When it was detected
        #[serde(with = "system_time_serde")]
        timestamp: SystemTime,
    },
}

impl EngineEvent {
    /// Create a ComparisonStarted event
    pub fn comparison_started(candidates: usize, repository_size: usize) -> Self {
        Self::ComparisonStarted {
            candidates,
            repository_size,
            timestamp: SystemTime::now(),
        }
    }

    /// Create a CandidateClassified event
    pub fn candidate_classified(
        test_case_id: &str,
        status: MatchStatus,
        score: f64,
        best_match: Option<&str>,
        latency_ms: u64,
    ) -> Self {
        Self::CandidateClassified {
            test_case_id: test_case_id.to_string(),
            status,
            score,
            best_match: best_match.map(str::to_string),
            latency_ms,
            timestamp: SystemTime::now(),
        }
    }

    /// Create a RecordSkipped event
    pub fn record_skipped(record_id: &str, role: RecordRole, kind: InputErrorKind) -> Self {
        Self::RecordSkipped {
            record_id: record_id.to_string(),
            role,
            kind,
            timestamp: SystemTime::now(),
        }
    }

    /// Create a DeadlineExceeded event
    pub fn deadline_exceeded(completed: usize, not_processed: usize, elapsed_ms: u64) -> Self {
        Self::DeadlineExceeded {
            completed,
            not_processed,
            elapsed_ms,
            timestamp: SystemTime::now(),
        }
    }

    /// Create a ComparisonCompleted event
    #[allow(clippy::too_many_arguments)]
    pub fn comparison_completed(
        total_cases_compared: usize,
        exact_matches: usize,
        partial_matches: usize,
        new_cases: usize,
        errored: usize,
        not_processed: usize,
        elapsed_ms: u64,
    ) -> Self {
        Self::ComparisonCompleted {
            total_cases_compared,
            exact_matches,
            partial_matches,
            new_cases,
            errored,
            not_processed,
            elapsed_ms,
            timestamp: SystemTime::now(),
        }
    }

    /// Create a CoverageEvaluated event
    pub fn coverage_evaluated(
        requirement_id: &str,
        status: CoverageStatus,
        score: f64,
        covering: usize,
    ) -> Self {
        Self::CoverageEvaluated {
            requirement_id: requirement_id.to_string(),
            status,
            score,
            covering,
            timestamp: SystemTime::now(),
        }
    }

    /// Create a GapDetected event
    pub fn gap_detected(gap_type: GapType, severity: Severity, subject: &str) -> Self {
        Self::GapDetected {
            gap_type,
            severity,
            subject: subject.to_string(),
            timestamp: SystemTime::now(),
        }
    }

    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ComparisonStarted { .. } => "ComparisonStarted",
            Self::CandidateClassified { .. } => "CandidateClassified",
            Self::RecordSkipped { .. } => "RecordSkipped",
            Self::DeadlineExceeded { .. } => "DeadlineExceeded",
            Self::ComparisonCompleted { .. } => "ComparisonCompleted",
            Self::CoverageEvaluated { .. } => "CoverageEvaluated",
            Self::GapDetected { .. } => "GapDetected",
        }
    }

    /// Get the timestamp of the event
    pub fn timestamp(&self) -> SystemTime {
        match self {
            Self::ComparisonStarted { timestamp, .. }
            | Self::CandidateClassified { timestamp, .. }
            | Self::RecordSkipped { timestamp, .. }
            | Self::DeadlineExceeded { timestamp, .. }
            | Self::ComparisonCompleted { timestamp, .. }
            | Self::CoverageEvaluated { timestamp, .. }
            | Self::GapDetected { timestamp, .. } => *timestamp,
        }
    }
}

/// Serde module for SystemTime serialization (milliseconds since the epoch)
mod system_time_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let duration = time.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + Duration::from_millis(millis))
    }
}

// Re-exports
pub use bus::EventBus;
