//! Concurrent Comparison
//!
//! Fan-out/fan-in version of `compare` on the tokio runtime. Each candidate is
//! classified on the blocking pool; a semaphore bounds how many run at once
//! (`config.max_concurrency`). Outcomes are gathered in input order, so the
//! report is identical to a sequential run when no deadline fires.
//!
//! # Deadline
//!
//! With `config.deadline_ms` set, each worker handle is awaited with
//! `tokio::time::timeout_at`. A worker that finished by then keeps its
//! result; one that had not is reported `NotProcessed`. The shared
//! `CancellationToken` stops workers that have not started yet.

use crate::core::config::EngineConfig;
use crate::core::error::EngineError;
use crate::core::model::TestCase;
use crate::core::orchestrator::{
    partition_repository, process_candidate, CandidateOutcome, Comparator, ComparisonReport,
};
use crate::core::snapshot::RepositorySnapshot;
use crate::events::EngineEvent;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Cancellation token shared by the workers of one run
///
/// Workers check it before starting; once set, unstarted candidates are
/// reported as not processed.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new cancellation token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

type Worker = JoinHandle<Result<CandidateOutcome, EngineError>>;

impl Comparator {
    /// Compare candidates concurrently against `repository`.
    pub async fn compare_concurrent(
        &self,
        candidates: &[TestCase],
        repository: &RepositorySnapshot,
    ) -> Result<ComparisonReport, EngineError> {
        self.compare_with_token(candidates, repository, CancellationToken::new())
            .await
    }

    /// Compare concurrently, stopping unstarted work when `token` is cancelled.
    pub async fn compare_with_token(
        &self,
        candidates: &[TestCase],
        repository: &RepositorySnapshot,
        token: CancellationToken,
    ) -> Result<ComparisonReport, EngineError> {
        let classifier = Arc::new(self.classifier()?);
        let start = Instant::now();
        let deadline_at = self
            .config()
            .deadline()
            .map(|d| tokio::time::Instant::now() + d);

        self.emit(|| EngineEvent::comparison_started(candidates.len(), repository.len()));

        let (valid, repository_errors) = partition_repository(repository.records());
        self.report_repository_errors(&repository_errors);
        let valid = Arc::new(valid);

        let semaphore = Arc::new(Semaphore::new(self.config().max_concurrency));
        let mut workers: Vec<Option<Worker>> = Vec::with_capacity(candidates.len());

        // Fan out
        for (position, candidate) in candidates.iter().enumerate() {
            if deadline_at.is_some_and(|at| tokio::time::Instant::now() >= at) {
                token.cancel();
            }
            if token.is_cancelled() {
                workers.push(None);
                continue;
            }

            let acquire = Arc::clone(&semaphore).acquire_owned();
            let permit = match deadline_at {
                Some(at) => match tokio::time::timeout_at(at, acquire).await {
                    Ok(Ok(permit)) => permit,
                    _ => {
                        token.cancel();
                        workers.push(None);
                        continue;
                    }
                },
                None => match acquire.await {
                    Ok(permit) => permit,
                    Err(_) => {
                        workers.push(None);
                        continue;
                    }
                },
            };

            let classifier = Arc::clone(&classifier);
            let valid = Arc::clone(&valid);
            let snapshot = repository.clone();
            let candidate = candidate.clone();
            let worker_token = token.clone();
            let bus = self.event_bus().cloned();

            workers.push(Some(tokio::task::spawn_blocking(move || {
                let _permit = permit;
                if worker_token.is_cancelled() {
                    return Ok(CandidateOutcome::not_processed(&candidate, position));
                }
                let records = snapshot.records();
                let entries: Vec<&TestCase> = valid.iter().map(|&i| &records[i]).collect();
                process_candidate(&classifier, &candidate, position, &entries, bus.as_ref())
            })));
        }

        // Fan in, preserving input order
        let mut outcomes = Vec::with_capacity(candidates.len());
        for ((position, candidate), worker) in candidates.iter().enumerate().zip(workers) {
            let Some(handle) = worker else {
                outcomes.push(CandidateOutcome::not_processed(candidate, position));
                continue;
            };

            let joined = match deadline_at {
                Some(at) => match tokio::time::timeout_at(at, handle).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        token.cancel();
                        outcomes.push(CandidateOutcome::not_processed(candidate, position));
                        continue;
                    }
                },
                None => handle.await,
            };

            let outcome = joined.map_err(|e| EngineError::Worker {
                record_id: candidate.id.clone(),
                message: e.to_string(),
            })??;
            outcomes.push(outcome);
        }

        Ok(self.finish(outcomes, repository.len(), repository_errors, start))
    }
}

/// Compare `candidates` against `repository` concurrently.
///
/// Results are identical to `compare` for the same inputs when no deadline
/// fires.
pub async fn compare_concurrent(
    candidates: &[TestCase],
    repository: &RepositorySnapshot,
    config: &EngineConfig,
) -> Result<ComparisonReport, EngineError> {
    Comparator::new(config.clone())
        .compare_concurrent(candidates, repository)
        .await
}
