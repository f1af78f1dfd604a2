//! Metrics Observer for comparison runs
//!
//! Tracks Prometheus-compatible metrics for monitoring:
//! - Counters: candidates by status, skipped records, coverage bands, gaps
//! - Histogram: per-candidate classification latency

use crate::events::{EngineEvent, EventBus};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Histogram bucket boundaries for per-candidate latency (milliseconds)
pub const LATENCY_BUCKETS: [u64; 7] = [1, 5, 10, 50, 100, 500, 1000];

/// Metrics collected from engine events
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    /// Candidates classified, by match status
    pub candidates_total: BTreeMap<String, u64>,
    /// Records skipped as malformed, by role
    pub records_skipped_total: BTreeMap<String, u64>,
    /// Requirements evaluated, by coverage status
    pub coverage_total: BTreeMap<String, u64>,
    /// Gaps detected, by gap type
    pub gaps_total: BTreeMap<String, u64>,
    /// Classification latency histogram (bucket -> count)
    pub latency_histogram: HashMap<u64, u64>,
    /// Total latency sum for average calculation
    pub latency_sum_ms: u64,
    /// Latency sample count
    pub latency_count: u64,
    /// Comparison runs completed
    pub runs_completed: u64,
    /// Runs cut short by their deadline
    pub deadlines_exceeded: u64,
    /// Candidates left unprocessed by deadlines
    pub not_processed_total: u64,
}

fn bump(map: &mut BTreeMap<String, u64>, key: &str) {
    *map.entry(key.to_string()).or_insert(0) += 1;
}

impl Metrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a classified candidate
    pub fn record_candidate(&mut self, status: &str, latency_ms: u64) {
        bump(&mut self.candidates_total, status);
        self.record_latency(latency_ms);
    }

    /// Record a skipped record
    pub fn record_skipped(&mut self, role: &str) {
        bump(&mut self.records_skipped_total, role);
    }

    /// Record an evaluated requirement
    pub fn record_coverage(&mut self, status: &str) {
        bump(&mut self.coverage_total, status);
    }

    /// Record a detected gap
    pub fn record_gap(&mut self, gap_type: &str) {
        bump(&mut self.gaps_total, gap_type);
    }

    /// Record a deadline expiry
    pub fn record_deadline(&mut self, not_processed: usize) {
        self.deadlines_exceeded += 1;
        self.not_processed_total += not_processed as u64;
    }

    /// Record classification latency
    pub fn record_latency(&mut self, latency_ms: u64) {
        let last = LATENCY_BUCKETS[LATENCY_BUCKETS.len() - 1];
        let bucket = LATENCY_BUCKETS
            .iter()
            .copied()
            .find(|&b| latency_ms <= b)
            .unwrap_or(last);
        *self.latency_histogram.entry(bucket).or_insert(0) += 1;

        self.latency_sum_ms += latency_ms;
        self.latency_count += 1;
    }

    /// Get average latency in milliseconds
    pub fn avg_latency_ms(&self) -> f64 {
        if self.latency_count == 0 {
            0.0
        } else {
            self.latency_sum_ms as f64 / self.latency_count as f64
        }
    }

    /// Format metrics as Prometheus text format
    pub fn to_prometheus(&self) -> String {
        let mut output = String::new();

        let labelled = [
            (
                "casematch_candidates_total",
                "Candidates classified",
                "status",
                &self.candidates_total,
            ),
            (
                "casematch_records_skipped_total",
                "Malformed records skipped",
                "role",
                &self.records_skipped_total,
            ),
            (
                "casematch_requirements_total",
                "Requirements evaluated",
                "status",
                &self.coverage_total,
            ),
            (
                "casematch_gaps_total",
                "Gaps detected",
                "gap_type",
                &self.gaps_total,
            ),
        ];
        for (name, help, label, values) in labelled {
            output.push_str(&format!("# HELP {} {}\n", name, help));
            output.push_str(&format!("# TYPE {} counter\n", name));
            for (key, count) in values {
                output.push_str(&format!("{}{{{}=\"{}\"}} {}\n", name, label, key, count));
            }
        }

        output.push_str(
            "# HELP casematch_classification_latency_ms Per-candidate latency in milliseconds\n",
        );
        output.push_str("# TYPE casematch_classification_latency_ms histogram\n");
        let mut cumulative = 0u64;
        for &bucket in &LATENCY_BUCKETS {
            cumulative += self.latency_histogram.get(&bucket).copied().unwrap_or(0);
            output.push_str(&format!(
                "casematch_classification_latency_ms_bucket{{le=\"{}\"}} {}\n",
                bucket, cumulative
            ));
        }
        output.push_str(&format!(
            "casematch_classification_latency_ms_bucket{{le=\"+Inf\"}} {}\n",
            self.latency_count
        ));
        output.push_str(&format!(
            "casematch_classification_latency_ms_sum {}\n",
            self.latency_sum_ms
        ));
        output.push_str(&format!(
            "casematch_classification_latency_ms_count {}\n",
            self.latency_count
        ));

        output.push_str("# HELP casematch_runs_completed_total Comparison runs completed\n");
        output.push_str("# TYPE casematch_runs_completed_total counter\n");
        output.push_str(&format!(
            "casematch_runs_completed_total {}\n",
            self.runs_completed
        ));

        output.push_str("# HELP casematch_deadlines_exceeded_total Runs cut short by a deadline\n");
        output.push_str("# TYPE casematch_deadlines_exceeded_total counter\n");
        output.push_str(&format!(
            "casematch_deadlines_exceeded_total {}\n",
            self.deadlines_exceeded
        ));

        output
    }

    /// Generate a human-readable report
    pub fn report(&self) -> String {
        let mut output = String::new();

        output.push_str("=== casematch Metrics Report ===\n\n");

        let sections = [
            ("Candidates", &self.candidates_total),
            ("Skipped Records", &self.records_skipped_total),
            ("Coverage", &self.coverage_total),
            ("Gaps", &self.gaps_total),
        ];
        for (title, values) in sections {
            output.push_str(&format!("{}:\n", title));
            for (key, count) in values {
                output.push_str(&format!("  {}: {}\n", key, count));
            }
        }

        output.push_str(&format!(
            "\nLatency: avg={:.1}ms, count={}\n",
            self.avg_latency_ms(),
            self.latency_count
        ));
        output.push_str(&format!(
            "Runs: completed={}, deadlines={}, not_processed={}\n",
            self.runs_completed, self.deadlines_exceeded, self.not_processed_total
        ));

        output
    }
}

/// Observer that collects metrics from engine events
pub struct MetricsObserver {
    receiver: broadcast::Receiver<EngineEvent>,
    metrics: Arc<Mutex<Metrics>>,
}

impl MetricsObserver {
    /// Create a new metrics observer subscribed to the event bus
    pub fn new(bus: &EventBus) -> Self {
        Self {
            receiver: bus.subscribe(),
            metrics: Arc::new(Mutex::new(Metrics::new())),
        }
    }

    /// Get a handle to the metrics for reading
    pub fn metrics(&self) -> Arc<Mutex<Metrics>> {
        Arc::clone(&self.metrics)
    }

    /// Run the observer, collecting metrics until the channel closes
    pub async fn run(mut self) {
        loop {
            match self.receiver.recv().await {
                Ok(event) => self.process_event(&event),
                Err(broadcast::error::RecvError::Closed) => break,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
            }
        }
    }

    /// Drain events already queued without waiting for more
    pub fn drain(&mut self) {
        while let Ok(event) = self.receiver.try_recv() {
            self.process_event(&event);
        }
    }

    /// Process a single event and update metrics
    fn process_event(&self, event: &EngineEvent) {
        let mut metrics = self.metrics.lock().unwrap_or_else(|e| e.into_inner());

        match event {
            EngineEvent::ComparisonStarted { .. } => {}

            EngineEvent::CandidateClassified {
                status, latency_ms, ..
            } => {
                metrics.record_candidate(status.as_str(), *latency_ms);
                #[cfg(feature = "prometheus")]
                prometheus_metrics::record_candidate(status.as_str(), *latency_ms);
            }

            EngineEvent::RecordSkipped { role, .. } => {
                let role = role.to_string();
                metrics.record_skipped(&role);
                #[cfg(feature = "prometheus")]
                prometheus_metrics::record_skipped(&role);
            }

            EngineEvent::DeadlineExceeded { not_processed, .. } => {
                metrics.record_deadline(*not_processed);
            }

            EngineEvent::ComparisonCompleted { .. } => {
                metrics.runs_completed += 1;
            }

            EngineEvent::CoverageEvaluated { status, .. } => {
                metrics.record_coverage(status.as_str());
            }

            EngineEvent::GapDetected { gap_type, .. } => {
                metrics.record_gap(gap_type.as_str());
                #[cfg(feature = "prometheus")]
                prometheus_metrics::record_gap(gap_type.as_str());
            }
        }
    }
}

// ============================================================================
// Prometheus Metrics (behind feature flag)
// ============================================================================

#[cfg(feature = "prometheus")]
pub mod prometheus_metrics {
    //! Process-global Prometheus metrics, registered in the default registry.
    //!
    //! Enable with the `prometheus` feature flag.

    use once_cell::sync::Lazy;
    use prometheus::{register_counter_vec, register_histogram_vec, CounterVec, HistogramVec};

    /// Candidates classified
    pub static CANDIDATES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
        register_counter_vec!(
            "casematch_candidates_total",
            "Total number of candidates classified",
            &["status"]
        )
        .expect("Failed to register candidates_total metric")
    });

    /// Classification latency histogram
    pub static CLASSIFICATION_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
        register_histogram_vec!(
            "casematch_classification_latency_seconds",
            "Per-candidate classification latency in seconds",
            &["status"],
            vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]
        )
        .expect("Failed to register classification_latency metric")
    });

    /// Malformed records skipped
    pub static RECORDS_SKIPPED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
        register_counter_vec!(
            "casematch_records_skipped_total",
            "Total number of malformed records skipped",
            &["role"]
        )
        .expect("Failed to register records_skipped_total metric")
    });

    /// Gaps detected
    pub static GAPS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
        register_counter_vec!(
            "casematch_gaps_total",
            "Total number of gaps detected",
            &["gap_type"]
        )
        .expect("Failed to register gaps_total metric")
    });

    /// Record a classified candidate
    pub fn record_candidate(status: &str, latency_ms: u64) {
        CANDIDATES_TOTAL.with_label_values(&[status]).inc();
        CLASSIFICATION_LATENCY
            .with_label_values(&[status])
            .observe(latency_ms as f64 / 1000.0);
    }

    /// Record a skipped record
    pub fn record_skipped(role: &str) {
        RECORDS_SKIPPED_TOTAL.with_label_values(&[role]).inc();
    }

    /// Record a detected gap
    pub fn record_gap(gap_type: &str) {
        GAPS_TOTAL.with_label_values(&[gap_type]).inc();
    }
}
