//! Error Types for the Comparison Engine
//!
//! - `ConfigError`: invalid thresholds or weights, raised before any work runs
//! - `InputError`: a malformed record, reported per record while the batch continues
//! - `TimeoutError`: the orchestrator deadline fired, carried on the report
//!
//! Scoring is deterministic, so nothing here is retryable with identical
//! inputs; callers adjust configuration or records and re-invoke.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A single invalid configuration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigError {
    /// Name of the offending configuration field
    pub field: String,
    /// What is wrong with it
    pub message: String,
}

impl ConfigError {
    /// Create a config error for a field.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Why a record was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputErrorKind {
    /// The record has no id
    MissingId,
    /// The test case has no steps
    MissingSteps,
    /// A step has no step number
    MissingStepNumber,
}

/// Which batch a rejected record belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordRole {
    /// A candidate test case
    Candidate,
    /// A repository test case
    Repository,
    /// A requirement
    Requirement,
}

impl fmt::Display for RecordRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordRole::Candidate => write!(f, "candidate"),
            RecordRole::Repository => write!(f, "repository record"),
            RecordRole::Requirement => write!(f, "requirement"),
        }
    }
}

/// A malformed input record. The record is skipped; the batch continues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputError {
    /// Identifier of the record (or `#<position>` when the id itself is missing)
    pub record_id: String,
    /// Zero-based position in the input batch
    pub position: usize,
    /// Which batch the record came from
    pub role: RecordRole,
    /// What is missing
    pub kind: InputErrorKind,
}

impl InputError {
    /// Create an input error, substituting a positional id when `id` is empty.
    pub fn new(id: &str, position: usize, role: RecordRole, kind: InputErrorKind) -> Self {
        let record_id = if id.trim().is_empty() {
            format!("#{}", position)
        } else {
            id.to_string()
        };
        Self {
            record_id,
            position,
            role,
            kind,
        }
    }
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            InputErrorKind::MissingId => write!(
                f,
                "{} {} at position {} is missing an id",
                self.role, self.record_id, self.position
            ),
            InputErrorKind::MissingSteps => write!(
                f,
                "{} {} at position {} has no steps",
                self.role, self.record_id, self.position
            ),
            InputErrorKind::MissingStepNumber => write!(
                f,
                "{} {} at position {} has a step without a step number",
                self.role, self.record_id, self.position
            ),
        }
    }
}

impl std::error::Error for InputError {}

/// The orchestrator deadline expired before every candidate was processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutError {
    /// Time spent before giving up, in milliseconds
    pub elapsed_ms: u64,
    /// Candidates with a completed (or errored) outcome
    pub completed: usize,
    /// Ids of candidates marked not processed
    pub not_processed: Vec<String>,
}

impl TimeoutError {
    /// Create a timeout error.
    pub fn new(elapsed: Duration, completed: usize, not_processed: Vec<String>) -> Self {
        Self {
            elapsed_ms: elapsed.as_millis() as u64,
            completed,
            not_processed,
        }
    }
}

impl fmt::Display for TimeoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "deadline exceeded after {}ms: {} candidates completed, {} not processed",
            self.elapsed_ms,
            self.completed,
            self.not_processed.len()
        )
    }
}

impl std::error::Error for TimeoutError {}

/// Errors that abort an engine call.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Configuration is invalid; nothing was compared
    Configuration(Vec<ConfigError>),
    /// A concurrent worker failed to join (panic or runtime shutdown)
    Worker {
        /// Candidate the worker was processing
        record_id: String,
        /// Join failure message
        message: String,
    },
}

impl EngineError {
    /// Shorthand for a single-field configuration error.
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Configuration(vec![ConfigError::new(field, message)])
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Configuration(errors) => {
                write!(f, "Invalid configuration: ")?;
                for (i, e) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", e)?;
                }
                Ok(())
            }
            EngineError::Worker { record_id, message } => {
                write!(f, "Worker for {} failed: {}", record_id, message)
            }
        }
    }
}

impl std::error::Error for EngineError {}

impl From<Vec<ConfigError>> for EngineError {
    fn from(errors: Vec<ConfigError>) -> Self {
        EngineError::Configuration(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_error_positional_id() {
        let e = InputError::new("", 3, RecordRole::Candidate, InputErrorKind::MissingId);
        assert_eq!(e.record_id, "#3");
        assert!(e.to_string().contains("missing an id"));
    }

    #[test]
    fn test_input_error_keeps_id() {
        let e = InputError::new("TC-9", 0, RecordRole::Repository, InputErrorKind::MissingSteps);
        assert_eq!(e.record_id, "TC-9");
        assert_eq!(
            e.to_string(),
            "repository record TC-9 at position 0 has no steps"
        );
    }

    #[test]
    fn test_engine_error_display_joins_fields() {
        let e = EngineError::Configuration(vec![
            ConfigError::new("match_threshold", "must be in [0, 1]"),
            ConfigError::new("weights", "must sum to 1.0"),
        ]);
        let msg = e.to_string();
        assert!(msg.contains("match_threshold: must be in [0, 1]"));
        assert!(msg.contains("; weights: must sum to 1.0"));
    }

    #[test]
    fn test_timeout_error_display() {
        let e = TimeoutError::new(Duration::from_millis(250), 4, vec!["a".into(), "b".into()]);
        assert_eq!(
            e.to_string(),
            "deadline exceeded after 250ms: 4 candidates completed, 2 not processed"
        );
    }

    #[test]
    fn test_input_error_serializes_snake_case() {
        let e = InputError::new("x", 1, RecordRole::Requirement, InputErrorKind::MissingId);
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains(r#""kind":"missing_id""#));
        assert!(json.contains(r#""role":"requirement""#));
    }
}
