//! Match Classification
//!
//! Scores a candidate against every (shortlisted) repository entry, ranks the
//! scores and buckets the best one:
//!
//! | Best score                                   | Status          |
//! |----------------------------------------------|-----------------|
//! | `>= exact_threshold`, no differences         | `exact_match`   |
//! | `>= exact_threshold`, with differences       | `partial_match` |
//! | `[match_threshold, exact_threshold)`         | `partial_match` |
//! | `< match_threshold`, or empty repository     | `new_case`      |
//!
//! Lower bounds are inclusive.
//!
//! # Prefilter
//!
//! With `prefilter.enabled`, repository entries are first ranked by Jaccard
//! overlap of title + description tokens and only the top `shortlist_size`
//! are fully scored. This is an approximation, not an exact nearest-neighbour
//! search: an entry with little title overlap but near-identical steps can be
//! dropped and the true best match missed.

use crate::core::config::EngineConfig;
use crate::core::diff::generate_differences;
use crate::core::error::EngineError;
use crate::core::matcher::jaccard;
use crate::core::model::{ComparisonResult, MatchStatus, RepositoryMatch, TestCase};
use crate::core::normalizer::Normalizer;
use crate::core::scorer::{TestCaseScore, TestCaseScorer};
use std::cmp::Ordering;

/// Outcome of classifying one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Status of the best match
    pub status: MatchStatus,
    /// Best score (0.0 when nothing was scored)
    pub best_score: f64,
    /// Retained matches, descending by score then ascending by id
    pub matches: Vec<RepositoryMatch>,
    /// Number of repository entries fully scored
    pub entries_scored: usize,
}

impl Classification {
    /// Convert into the public result record for `test_case_id`.
    pub fn into_result(self, test_case_id: impl Into<String>) -> ComparisonResult {
        ComparisonResult {
            test_case_id: test_case_id.into(),
            match_status: self.status,
            match_score: self.best_score,
            repository_matches: self.matches,
        }
    }
}

/// Descending by score, then ascending by id.
pub fn rank_order(a: (f64, &str), b: (f64, &str)) -> Ordering {
    b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1))
}

/// Shortlist repository entries by title + description token overlap.
pub fn shortlist<'a>(
    candidate: &TestCase,
    repository: &[&'a TestCase],
    size: usize,
    normalizer: &Normalizer,
) -> Vec<&'a TestCase> {
    let summary = |tc: &TestCase| normalizer.tokens(&format!("{} {}", tc.title, tc.description));
    let probe = summary(candidate);

    let mut ranked: Vec<(f64, &'a TestCase)> = repository
        .iter()
        .map(|tc| (jaccard(&probe, &summary(*tc)), *tc))
        .collect();
    ranked.sort_by(|a, b| rank_order((a.0, a.1.id.as_str()), (b.0, b.1.id.as_str())));
    ranked.truncate(size);
    ranked.into_iter().map(|(_, tc)| tc).collect()
}

/// Ranks and classifies candidates against a repository.
#[derive(Debug, Clone)]
pub struct MatchClassifier {
    scorer: TestCaseScorer,
    normalizer: Normalizer,
    config: EngineConfig,
}

impl MatchClassifier {
    /// Build a classifier from a config. The config is not validated here.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            scorer: TestCaseScorer::new(config),
            normalizer: Normalizer::new(config.remove_stop_words),
            config: config.clone(),
        }
    }

    /// Replace the test case scorer.
    pub fn with_scorer(mut self, scorer: TestCaseScorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// The scorer in use.
    pub fn scorer(&self) -> &TestCaseScorer {
        &self.scorer
    }

    /// Status for a best score.
    pub fn status_for(&self, best_score: f64, has_differences: bool) -> MatchStatus {
        if best_score >= self.config.exact_threshold && !has_differences {
            MatchStatus::ExactMatch
        } else if best_score >= self.config.match_threshold {
            MatchStatus::PartialMatch
        } else {
            MatchStatus::NewCase
        }
    }

    /// Classify `candidate` against well-formed repository entries.
    pub fn classify(
        &self,
        candidate: &TestCase,
        repository: &[&TestCase],
    ) -> Result<Classification, EngineError> {
        let pool: Vec<&TestCase> = if self.config.prefilter.enabled {
            shortlist(
                candidate,
                repository,
                self.config.prefilter.shortlist_size,
                &self.normalizer,
            )
        } else {
            repository.to_vec()
        };

        let mut scored: Vec<(&TestCase, TestCaseScore)> = Vec::with_capacity(pool.len());
        for &entry in &pool {
            scored.push((entry, self.scorer.score(candidate, entry)?));
        }
        scored.sort_by(|a, b| {
            rank_order((a.1.total, a.0.id.as_str()), (b.1.total, b.0.id.as_str()))
        });

        let entries_scored = scored.len();
        let Some((best_entry, best)) = scored.first() else {
            return Ok(Classification {
                status: MatchStatus::NewCase,
                best_score: 0.0,
                matches: Vec::new(),
                entries_scored,
            });
        };

        let best_differences = generate_differences(
            &candidate.steps,
            &best_entry.steps,
            &best.alignment,
            self.config.modification_threshold,
        );
        let status = self.status_for(best.total, !best_differences.is_empty());
        let best_score = best.total;

        let limit = self.config.top_k.unwrap_or(usize::MAX);
        let mut best_differences = Some(best_differences);
        let matches = scored
            .iter()
            .enumerate()
            .filter(|(_, (_, s))| s.total >= self.config.reporting_floor)
            .take(limit)
            .map(|(rank, (entry, s))| {
                let differences = if rank == 0 {
                    best_differences.take().unwrap_or_default()
                } else if self.config.diff_all_matches {
                    generate_differences(
                        &candidate.steps,
                        &entry.steps,
                        &s.alignment,
                        self.config.modification_threshold,
                    )
                } else {
                    Vec::new()
                };
                RepositoryMatch {
                    repository_id: entry.id.clone(),
                    score: s.total,
                    differences,
                }
            })
            .collect();

        Ok(Classification {
            status,
            best_score,
            matches,
            entries_scored,
        })
    }
}
