//! Property-based tests for casematch
//!
//! These tests validate scoring, classification and coverage guarantees
//! using proptest.

use casematch::core::alignment::align_steps;
use casematch::core::diff::generate_differences;
use casematch::core::{
    analyze_coverage, compare, BlendedMatcher, DifferenceKind, EngineConfig, FieldMatcher,
    MatchClassifier, MatchStatus, RepositorySnapshot, Requirement, Step, TestCase, TestCaseScorer,
};
use proptest::prelude::*;

const VOCABULARY: &[&str] = &[
    "login", "user", "password", "click", "submit", "button", "page", "error", "message",
    "cart", "checkout", "order", "email", "reset", "valid", "invalid", "session", "logout",
];

fn text(max_words: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(VOCABULARY), 0..max_words)
        .prop_map(|words| words.join(" "))
}

fn non_empty_text(max_words: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(VOCABULARY), 1..max_words)
        .prop_map(|words| words.join(" "))
}

fn steps(max: usize) -> impl Strategy<Value = Vec<Step>> {
    prop::collection::vec((non_empty_text(5), non_empty_text(5)), 1..max).prop_map(|pairs| {
        pairs
            .into_iter()
            .enumerate()
            .map(|(i, (action, expected))| Step::new(i as u32 + 1, action, expected))
            .collect()
    })
}

fn test_case(id: &'static str) -> impl Strategy<Value = TestCase> {
    (non_empty_text(6), text(8), steps(6)).prop_map(move |(title, description, steps)| {
        TestCase::new(id, title)
            .with_description(description)
            .with_steps(steps)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: a test case scores exactly 1.0 against itself and is an
    /// exact match with no differences
    #[test]
    fn prop_self_comparison_is_exact(a in test_case("TC-A")) {
        let scorer = TestCaseScorer::default();
        let score = scorer.score(&a, &a).unwrap();
        prop_assert_eq!(score.total, 1.0);

        let repository = RepositorySnapshot::from_records(vec![a.clone()]);
        let report = compare(&[a], &repository, &EngineConfig::default()).unwrap();
        let result = report.results[0].result().unwrap();
        prop_assert_eq!(result.match_status, MatchStatus::ExactMatch);
        prop_assert!(result.repository_matches[0].differences.is_empty());
    }

    /// Property: every score lies in [0, 1]
    #[test]
    fn prop_scores_in_unit_interval(a in test_case("TC-A"), b in test_case("TC-B")) {
        let score = TestCaseScorer::default().score(&a, &b).unwrap();
        for value in [score.total, score.title, score.description, score.steps] {
            prop_assert!((0.0..=1.0).contains(&value), "score out of range: {}", value);
        }
        for pair in &score.alignment.pairs {
            prop_assert!((0.0..=1.0).contains(&pair.score));
        }
    }

    /// Property: field similarity is symmetric
    #[test]
    fn prop_field_similarity_symmetric(a in text(10), b in text(10)) {
        let matcher = BlendedMatcher::default();
        prop_assert_eq!(matcher.similarity_score(&a, &b), matcher.similarity_score(&b, &a));
    }

    /// Property: repeated comparisons return identical reports
    #[test]
    fn prop_compare_is_deterministic(
        a in test_case("C-1"),
        b in test_case("C-2"),
        r1 in test_case("R-1"),
        r2 in test_case("R-2"),
    ) {
        let repository = RepositorySnapshot::from_records(vec![r1, r2]);
        let config = EngineConfig::default();
        let first = compare(&[a.clone(), b.clone()], &repository, &config).unwrap();
        let second = compare(&[a, b], &repository, &config).unwrap();
        prop_assert_eq!(first.results, second.results);
        prop_assert_eq!(first.summary, second.summary);
    }

    /// Property: classification bands partition [0, 1] with inclusive lower bounds
    #[test]
    fn prop_bands_partition_scores(score in 0.0_f64..=1.0) {
        let config = EngineConfig::default();
        let classifier = MatchClassifier::new(&config);
        let status = classifier.status_for(score, false);
        let expected = if score >= config.exact_threshold {
            MatchStatus::ExactMatch
        } else if score >= config.match_threshold {
            MatchStatus::PartialMatch
        } else {
            MatchStatus::NewCase
        };
        prop_assert_eq!(status, expected);
    }

    /// Property: modified_step is emitted exactly for matched pairs below the threshold
    #[test]
    fn prop_no_modified_step_at_or_above_threshold(
        candidate in steps(6),
        repository in steps(6),
        threshold in 0.0_f64..=1.0,
    ) {
        let matcher = BlendedMatcher::default();
        let alignment = align_steps(&candidate, &repository, &matcher);
        let differences = generate_differences(&candidate, &repository, &alignment, threshold);

        let modified = differences
            .iter()
            .filter(|d| d.kind == DifferenceKind::ModifiedStep)
            .count();
        let below = alignment
            .matched()
            .filter(|p| p.score < threshold)
            .count();
        prop_assert_eq!(modified, below);
    }

    /// Property: adding a repository test case never lowers overall coverage
    #[test]
    fn prop_coverage_monotonic(
        titles in prop::collection::vec(non_empty_text(5), 1..5),
        base in test_case("TC-1"),
        extra in test_case("TC-2"),
    ) {
        let requirements: Vec<Requirement> = titles
            .into_iter()
            .enumerate()
            .map(|(i, title)| Requirement::new(format!("REQ-{}", i), title, ""))
            .collect();
        let config = EngineConfig::default();

        let before = analyze_coverage(
            &requirements,
            &RepositorySnapshot::from_records(vec![base.clone()]),
            &config,
        )
        .unwrap();
        let after = analyze_coverage(
            &requirements,
            &RepositorySnapshot::from_records(vec![base, extra]),
            &config,
        )
        .unwrap();

        prop_assert!(after.overall_coverage_percentage >= before.overall_coverage_percentage);
    }
}
