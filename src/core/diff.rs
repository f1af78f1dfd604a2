//! Step-Level Difference Generation
//!
//! Converts a step alignment into typed `Difference` records. Locations use
//! the `step_number` values authored on the original steps.

use crate::core::alignment::Alignment;
use crate::core::model::{Difference, DifferenceKind, Step, StepLocation};

/// Build the differences between a candidate and a repository entry.
///
/// - candidate-only step: `additional_step`
/// - repository-only step: `missing_step`
/// - matched pair scoring below `modification_threshold`: `modified_step`
///
/// Matched pairs at or above the threshold produce nothing.
pub fn generate_differences(
    candidate: &[Step],
    repository: &[Step],
    alignment: &Alignment,
    modification_threshold: f64,
) -> Vec<Difference> {
    let mut differences = Vec::new();

    for pair in &alignment.pairs {
        let cand = pair.candidate.and_then(|i| candidate.get(i));
        let repo = pair.repository.and_then(|j| repository.get(j));

        match (cand, repo) {
            (Some(c), None) => differences.push(Difference {
                kind: DifferenceKind::AdditionalStep,
                location: StepLocation {
                    candidate_step: Some(c.step_number),
                    repository_step: None,
                },
                description: format!(
                    "Candidate step {} has no counterpart in the repository entry: {}",
                    c.step_number,
                    c.display_text()
                ),
                before: None,
                after: Some(c.display_text()),
            }),
            (None, Some(r)) => differences.push(Difference {
                kind: DifferenceKind::MissingStep,
                location: StepLocation {
                    candidate_step: None,
                    repository_step: Some(r.step_number),
                },
                description: format!(
                    "Repository step {} is missing from the candidate: {}",
                    r.step_number,
                    r.display_text()
                ),
                before: Some(r.display_text()),
                after: None,
            }),
            (Some(c), Some(r)) if pair.score < modification_threshold => {
                differences.push(Difference {
                    kind: DifferenceKind::ModifiedStep,
                    location: StepLocation {
                        candidate_step: Some(c.step_number),
                        repository_step: Some(r.step_number),
                    },
                    description: format!(
                        "Candidate step {} differs from repository step {} (similarity {:.2})",
                        c.step_number, r.step_number, pair.score
                    ),
                    before: Some(r.display_text()),
                    after: Some(c.display_text()),
                })
            }
            _ => {}
        }
    }

    differences
}
