//! Batch Comparison Benchmark for casematch
//!
//! Measures candidate throughput of sequential and concurrent comparison,
//! with and without the token-overlap prefilter.
//!
//! # Usage
//!
//! ```bash
//! cargo bench --bench batch_comparison
//! ```

use casematch::core::{
    compare, compare_concurrent, EngineConfig, MatchStatus, RepositorySnapshot, TestCase,
};
use std::time::Instant;

const FEATURES: &[&str] = &[
    "login", "checkout", "search", "profile", "export", "upload", "billing", "settings",
];
const VERBS: &[&str] = &["open", "enter", "click", "select", "verify", "submit"];

fn synthetic_case(id: String, seed: usize) -> TestCase {
    let feature = FEATURES[seed % FEATURES.len()];
    let variant = seed / FEATURES.len();
    let mut tc = TestCase::new(id, format!("Verify {} flow variant {}", feature, variant))
        .with_description(format!("Covers the {} feature", feature));
    for s in 0..(3 + seed % 5) {
        let verb = VERBS[(seed + s) % VERBS.len()];
        tc = tc.with_step(
            format!("{} {} field {}", verb, feature, s),
            format!("{} updated", feature),
        );
    }
    tc
}

#[derive(Debug)]
struct BenchmarkResult {
    label: &'static str,
    candidates: usize,
    repository: usize,
    elapsed_ms: f64,
    exact: usize,
}

impl BenchmarkResult {
    fn throughput(&self) -> f64 {
        if self.elapsed_ms <= 0.0 {
            return 0.0;
        }
        self.candidates as f64 / (self.elapsed_ms / 1000.0)
    }
}

fn count_exact(report: &casematch::ComparisonReport) -> usize {
    report
        .comparison_results()
        .filter(|r| r.match_status == MatchStatus::ExactMatch)
        .count()
}

fn main() {
    let repository_size = 400;
    let candidate_count = 100;

    let repository = RepositorySnapshot::from_records(
        (0..repository_size)
            .map(|i| synthetic_case(format!("REPO-{}", i), i))
            .collect(),
    );
    let candidates: Vec<TestCase> = (0..candidate_count)
        .map(|i| synthetic_case(format!("CAND-{}", i), i * 7))
        .collect();

    println!("=== casematch Batch Comparison Benchmark ===\n");
    println!(
        "Parameters: candidates={}, repository={}",
        candidate_count, repository_size
    );
    println!();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            return;
        }
    };

    let configs: Vec<(&'static str, EngineConfig, bool)> = vec![
        ("sequential", EngineConfig::default(), false),
        ("sequential+prefilter", EngineConfig::default().with_prefilter(25), false),
        ("concurrent x4", EngineConfig::default().with_max_concurrency(4), true),
        (
            "concurrent x4+prefilter",
            EngineConfig::default().with_max_concurrency(4).with_prefilter(25),
            true,
        ),
    ];

    let mut results = Vec::new();
    for (label, config, concurrent) in configs {
        let start = Instant::now();
        let report = if concurrent {
            runtime.block_on(compare_concurrent(&candidates, &repository, &config))
        } else {
            compare(&candidates, &repository, &config)
        };
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        let report = match report {
            Ok(report) => report,
            Err(e) => {
                eprintln!("{} failed: {}", label, e);
                continue;
            }
        };

        let result = BenchmarkResult {
            label,
            candidates: candidate_count,
            repository: repository_size,
            elapsed_ms,
            exact: count_exact(&report),
        };
        println!(
            "{:<24} | time={:>9.1}ms | {:>8.1} candidates/s | exact={}",
            result.label,
            result.elapsed_ms,
            result.throughput(),
            result.exact,
        );
        results.push(result);
    }

    let json_results: Vec<serde_json::Value> = results
        .iter()
        .map(|r| {
            serde_json::json!({
                "label": r.label,
                "candidates": r.candidates,
                "repository": r.repository,
                "elapsed_ms": r.elapsed_ms,
                "throughput": r.throughput(),
                "exact_matches": r.exact,
            })
        })
        .collect();

    println!("\n=== JSON Output ===\n");
    match serde_json::to_string_pretty(&serde_json::json!({ "results": json_results })) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize results: {}", e),
    }
}
