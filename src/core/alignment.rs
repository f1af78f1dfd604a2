//! Step Sequence Alignment
//!
//! Aligns two ordered step lists with an edit-distance dynamic program.
//!
//! # Costs
//!
//! - Substitution (pairing candidate step i with repository step j):
//!   `1 - similarity(text_i, text_j)`
//! - Insertion / deletion (leaving a step unmatched): `1`
//!
//! # Tie-Breaking
//!
//! When several alignments reach the minimum cost (compared within
//! `COST_EPSILON`), the one with more matched pairs wins, then the one with
//! the smallest total `|i - j|` displacement. Remaining exact ties prefer a
//! match, then a candidate-only step, then a repository-only step. The result
//! is fully deterministic.
//!
//! Cost is O(n * m) time and space in the two step counts.

use crate::core::matcher::FieldMatcher;
use crate::core::model::Step;
use serde::{Deserialize, Serialize};

/// Cost of leaving a step unmatched.
pub const GAP_COST: f64 = 1.0;

/// Costs closer than this are treated as equal.
pub const COST_EPSILON: f64 = 1e-9;

/// One entry of an alignment.
///
/// Indices refer to positions in the step slices passed to `align_steps`,
/// not to `step_number`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignedPair {
    /// Index into the candidate steps, if this entry uses one
    pub candidate: Option<usize>,
    /// Index into the repository steps, if this entry uses one
    pub repository: Option<usize>,
    /// Similarity of the paired steps (0.0 for unmatched entries)
    pub score: f64,
}

impl AlignedPair {
    /// True when both sides are present.
    pub fn is_matched(&self) -> bool {
        self.candidate.is_some() && self.repository.is_some()
    }
}

/// Result of aligning two step lists.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Alignment {
    /// Entries in sequence order
    pub pairs: Vec<AlignedPair>,
    /// Total edit cost of the alignment
    pub total_cost: f64,
}

impl Alignment {
    /// Matched entries only.
    pub fn matched(&self) -> impl Iterator<Item = &AlignedPair> {
        self.pairs.iter().filter(|p| p.is_matched())
    }

    /// Entries with only one side present.
    pub fn unmatched(&self) -> impl Iterator<Item = &AlignedPair> {
        self.pairs.iter().filter(|p| !p.is_matched())
    }

    /// Number of matched entries.
    pub fn matched_count(&self) -> usize {
        self.matched().count()
    }

    /// Number of entries with only one side present.
    pub fn unmatched_count(&self) -> usize {
        self.unmatched().count()
    }

    /// Mean score over matched entries, or None if nothing matched.
    pub fn mean_matched_score(&self) -> Option<f64> {
        let (sum, count) = self
            .matched()
            .fold((0.0, 0usize), |(sum, count), p| (sum + p.score, count + 1));
        if count == 0 {
            None
        } else {
            Some(sum / count as f64)
        }
    }

    /// Sum of `|i - j|` over matched entries.
    pub fn displacement(&self) -> usize {
        self.matched()
            .filter_map(|p| Some(p.candidate?.abs_diff(p.repository?)))
            .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Move {
    Start,
    Match,
    CandidateOnly,
    RepositoryOnly,
}

#[derive(Debug, Clone, Copy)]
struct Cell {
    cost: f64,
    matches: usize,
    displacement: usize,
    mv: Move,
}

impl Cell {
    fn better_than(&self, other: &Cell) -> bool {
        if (self.cost - other.cost).abs() > COST_EPSILON {
            return self.cost < other.cost;
        }
        if self.matches != other.matches {
            return self.matches > other.matches;
        }
        self.displacement < other.displacement
    }
}

/// Align candidate steps against repository steps.
pub fn align_steps(candidate: &[Step], repository: &[Step], matcher: &dyn FieldMatcher) -> Alignment {
    let texts_a: Vec<String> = candidate.iter().map(Step::comparison_text).collect();
    let texts_b: Vec<String> = repository.iter().map(Step::comparison_text).collect();
    let similarity = similarity_matrix(matcher, &texts_a, &texts_b);
    align_with_similarity(&similarity, candidate.len(), repository.len())
}

/// Pairwise similarity of two text lists, `result[i][j] = sim(a[i], b[j])`.
pub fn similarity_matrix(matcher: &dyn FieldMatcher, a: &[String], b: &[String]) -> Vec<Vec<f64>> {
    a.iter()
        .map(|x| {
            b.iter()
                .map(|y| matcher.similarity_score(x, y).clamp(0.0, 1.0))
                .collect()
        })
        .collect()
}

/// Align two sequences of lengths `n` and `m` given their similarity matrix.
pub fn align_with_similarity(similarity: &[Vec<f64>], n: usize, m: usize) -> Alignment {
    let start = Cell {
        cost: 0.0,
        matches: 0,
        displacement: 0,
        mv: Move::Start,
    };
    let mut table = vec![vec![start; m + 1]; n + 1];

    for i in 1..=n {
        table[i][0] = Cell {
            cost: table[i - 1][0].cost + GAP_COST,
            mv: Move::CandidateOnly,
            ..table[i - 1][0]
        };
    }
    for j in 1..=m {
        table[0][j] = Cell {
            cost: table[0][j - 1].cost + GAP_COST,
            mv: Move::RepositoryOnly,
            ..table[0][j - 1]
        };
    }

    for i in 1..=n {
        for j in 1..=m {
            let diag = table[i - 1][j - 1];
            let mut best = Cell {
                cost: diag.cost + (1.0 - similarity[i - 1][j - 1]),
                matches: diag.matches + 1,
                displacement: diag.displacement + i.abs_diff(j),
                mv: Move::Match,
            };

            let up = table[i - 1][j];
            let candidate_only = Cell {
                cost: up.cost + GAP_COST,
                mv: Move::CandidateOnly,
                ..up
            };
            if candidate_only.better_than(&best) {
                best = candidate_only;
            }

            let left = table[i][j - 1];
            let repository_only = Cell {
                cost: left.cost + GAP_COST,
                mv: Move::RepositoryOnly,
                ..left
            };
            if repository_only.better_than(&best) {
                best = repository_only;
            }

            table[i][j] = best;
        }
    }

    let total_cost = table[n][m].cost;
    let mut pairs = Vec::with_capacity(n + m);
    let (mut i, mut j) = (n, m);
    while i > 0 || j > 0 {
        match table[i][j].mv {
            Move::Match => {
                pairs.push(AlignedPair {
                    candidate: Some(i - 1),
                    repository: Some(j - 1),
                    score: similarity[i - 1][j - 1],
                });
                i -= 1;
                j -= 1;
            }
            Move::CandidateOnly => {
                pairs.push(AlignedPair {
                    candidate: Some(i - 1),
                    repository: None,
                    score: 0.0,
                });
                i -= 1;
            }
            Move::RepositoryOnly => {
                pairs.push(AlignedPair {
                    candidate: None,
                    repository: Some(j - 1),
                    score: 0.0,
                });
                j -= 1;
            }
            Move::Start => break,
        }
    }
    pairs.reverse();

    Alignment { pairs, total_cost }
}
