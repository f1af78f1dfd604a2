//! Core comparison and coverage algorithms
//!
//! - `normalizer`: Tokenization with optional stop-word filtering
//! - `matcher`: Field similarity (token-set overlap blended with LCS ratio)
//! - `alignment`: Edit-distance step alignment with deterministic tie-breaks
//! - `scorer`: Weighted test case similarity
//! - `classifier`: exact/partial/new classification and the prefilter
//! - `diff`: Step-level differences for an alignment
//! - `orchestrator` / `async_orchestrator`: Batch comparison, sequential or concurrent
//! - `coverage`, `gaps`, `analysis`: Requirement coverage and gap analysis
//! - `snapshot`: Immutable record snapshots and the connector boundary

pub mod alignment;
pub mod analysis;
pub mod async_orchestrator;
pub mod classifier;
pub mod config;
pub mod coverage;
pub mod diff;
pub mod error;
pub mod gaps;
pub mod matcher;
pub mod model;
pub mod normalizer;
pub mod orchestrator;
pub mod scorer;
pub mod snapshot;

pub use alignment::{align_steps, AlignedPair, Alignment};
pub use analysis::{analyze, AnalysisReport, Analyzer, CoverageSummary};
pub use async_orchestrator::{compare_concurrent, CancellationToken};
pub use classifier::{Classification, MatchClassifier};
pub use config::{EngineConfig, PrefilterConfig, ScoringWeights};
pub use coverage::{analyze_coverage, CoverageAnalysis, CoverageAnalyzer};
pub use diff::generate_differences;
pub use error::{ConfigError, EngineError, InputError, InputErrorKind, RecordRole, TimeoutError};
pub use gaps::{analyze_gaps, GapAnalysis, GapProfile};
pub use matcher::{BlendedMatcher, ExactMatcher, FieldMatcher};
pub use model::{
    ComparisonResult, CoverageReport, CoverageStatus, CoveringTestCase, Difference,
    DifferenceKind, GapReport, GapType, MatchStatus, RepositoryMatch, Requirement, Severity,
    Step, StepLocation, TestCase, TestType,
};
pub use normalizer::Normalizer;
pub use orchestrator::{
    compare, CandidateOutcome, Comparator, ComparisonReport, ComparisonSummary,
};
pub use scorer::{TestCaseScore, TestCaseScorer};
pub use snapshot::{
    InMemorySource, JsonFileSource, RecordSource, RepositorySnapshot, RequirementSnapshot,
    Snapshot, SourceError,
};
