//! Logging Observer for comparison runs
//!
//! Provides structured logging for engine events using the `tracing` crate.
//! Events are logged at appropriate levels:
//! - INFO: ComparisonStarted, ComparisonCompleted, CoverageEvaluated
//! - WARN: RecordSkipped, DeadlineExceeded, high-severity GapDetected
//! - DEBUG: CandidateClassified, lower-severity GapDetected

use crate::core::model::Severity;
use crate::events::{EngineEvent, EventBus};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Observer that logs engine events using tracing
pub struct LoggingObserver {
    receiver: broadcast::Receiver<EngineEvent>,
}

impl LoggingObserver {
    /// Create a new logging observer subscribed to the event bus
    pub fn new(bus: &EventBus) -> Self {
        Self {
            receiver: bus.subscribe(),
        }
    }

    /// Run the observer, logging events until the channel closes
    ///
    /// This should be spawned as a tokio task:
    /// ```rust,ignore
    /// tokio::spawn(observer.run());
    /// ```
    pub async fn run(mut self) {
        loop {
            match self.receiver.recv().await {
                Ok(event) => Self::log_event(&event),
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("EventBus closed, logging observer stopping");
                    break;
                }
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(
                        skipped = count,
                        "Logging observer lagged, skipped {} events", count
                    );
                }
            }
        }
    }

    /// Log a single event at the appropriate level
    pub fn log_event(event: &EngineEvent) {
        match event {
            EngineEvent::ComparisonStarted {
                candidates,
                repository_size,
                ..
            } => {
                info!(
                    candidates = candidates,
                    repository_size = repository_size,
                    "Comparison started"
                );
            }

            EngineEvent::CandidateClassified {
                test_case_id,
                status,
                score,
                best_match,
                latency_ms,
                ..
            } => {
                debug!(
                    candidate = %test_case_id,
                    status = %status,
                    score = %score,
                    best_match = ?best_match,
                    latency_ms = latency_ms,
                    "Candidate classified"
                );
            }

            EngineEvent::RecordSkipped {
                record_id,
                role,
                kind,
                ..
            } => {
                warn!(
                    record = %record_id,
                    role = %role,
                    kind = ?kind,
                    "Malformed record skipped"
                );
            }

            EngineEvent::DeadlineExceeded {
                completed,
                not_processed,
                elapsed_ms,
                ..
            } => {
                warn!(
                    completed = completed,
                    not_processed = not_processed,
                    elapsed_ms = elapsed_ms,
                    "Comparison deadline exceeded"
                );
            }

            EngineEvent::ComparisonCompleted {
                total_cases_compared,
                exact_matches,
                partial_matches,
                new_cases,
                errored,
                not_processed,
                elapsed_ms,
                ..
            } => {
                info!(
                    compared = total_cases_compared,
                    exact = exact_matches,
                    partial = partial_matches,
                    new = new_cases,
                    errored = errored,
                    not_processed = not_processed,
                    elapsed_ms = elapsed_ms,
                    "Comparison completed"
                );
            }

            EngineEvent::CoverageEvaluated {
                requirement_id,
                status,
                score,
                covering,
                ..
            } => {
                info!(
                    requirement = %requirement_id,
                    status = %status,
                    score = %score,
                    covering = covering,
                    "Coverage evaluated"
                );
            }

            EngineEvent::GapDetected {
                gap_type,
                severity,
                subject,
                ..
            } => {
                if *severity == Severity::High {
                    warn!(gap_type = %gap_type, subject = %subject, "Gap detected");
                } else {
                    debug!(
                        gap_type = %gap_type,
                        severity = %severity,
                        subject = %subject,
                        "Gap detected"
                    );
                }
            }
        }
    }
}
