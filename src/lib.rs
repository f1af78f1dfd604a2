//! casematch - Test Case Comparison and Coverage Engine
//!
//! Compares candidate test cases against a repository snapshot and reports,
//! for each candidate:
//!
//! - **Classification**: `exact_match`, `partial_match` or `new_case`
//! - **Step-level diffs**: missing, additional and modified steps against the best match
//!
//! It also links requirements to the repository test cases that cover them and
//! flags test types or coverage areas that are missing or underrepresented.
//!
//! All scoring is deterministic. Sequential and concurrent runs return the
//! same results in the same order.
//!
//! # Quick Start
//!
//! ```rust
//! use casematch::core::{compare, EngineConfig, MatchStatus, RepositorySnapshot, TestCase};
//!
//! let login = TestCase::new("TC-1", "Verify login with valid credentials")
//!     .with_step("enter username/password", "user logged in");
//! let repository = RepositorySnapshot::from_records(vec![login.clone()]);
//!
//! let report = compare(&[login], &repository, &EngineConfig::default()).unwrap();
//! let result = report.results[0].result().unwrap();
//! assert_eq!(result.match_status, MatchStatus::ExactMatch);
//! ```

pub mod core;
pub mod events;

// Re-export commonly used items at crate root
pub use core::{
    analyze, compare, compare_concurrent, AnalysisReport, ComparisonReport, EngineConfig,
    EngineError, GapProfile, RepositorySnapshot, Requirement, TestCase,
};
pub use events::observers::{LoggingObserver, MetricsObserver};
pub use events::{EngineEvent, EventBus};
