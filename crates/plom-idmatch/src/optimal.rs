//! Optimal predictor: one-to-one assignment of papers to student IDs.

use std::collections::HashSet;

use crate::assignment::{AssignmentSolver, Hungarian};
use crate::cost::{build_cost_matrix_with_floor, mean_digit_probability, DEFAULT_PROBABILITY_FLOOR};
use crate::digits::{ProbabilityTable, StudentId};
use crate::error::MatchError;
use crate::prediction::Prediction;

/// Minimum total log-likelihood cost matching of `papers` to `student_ids`.
///
/// Produces `min(#distinct papers, student_ids.len())` predictions; no paper and
/// no ID appears twice. Each certainty is the mean digit probability of the
/// chosen ID on that paper. Repeated paper numbers count once (first
/// occurrence).
///
/// Fails with [`MatchError::DegenerateProblem`] (before any matrix work) if
/// either list is empty, with [`MatchError::MissingProbabilities`] if a paper
/// has no data, and with [`MatchError::WrongLength`] on an ID length mismatch.
pub fn predict_optimal(
    papers: &[u32],
    student_ids: &[StudentId],
    probabilities: &ProbabilityTable,
) -> Result<Vec<Prediction>, MatchError> {
    predict_optimal_with(
        &Hungarian,
        DEFAULT_PROBABILITY_FLOOR,
        papers,
        student_ids,
        probabilities,
    )
}

/// [`predict_optimal`] with an explicit solver strategy and probability floor.
pub fn predict_optimal_with(
    solver: &dyn AssignmentSolver,
    probability_floor: f64,
    papers: &[u32],
    student_ids: &[StudentId],
    probabilities: &ProbabilityTable,
) -> Result<Vec<Prediction>, MatchError> {
    // A paper listed twice would otherwise take two IDs.
    let mut seen = HashSet::new();
    let papers: Vec<u32> = papers.iter().copied().filter(|&p| seen.insert(p)).collect();
    if papers.is_empty() || student_ids.is_empty() {
        return Err(MatchError::DegenerateProblem {
            n_papers: papers.len(),
            n_ids: student_ids.len(),
        });
    }

    let cost = build_cost_matrix_with_floor(&papers, student_ids, probabilities, probability_floor)?;
    let pairs = solver.solve(&cost)?;
    tracing::debug!(
        solver = solver.name(),
        n_pairs = pairs.len(),
        "optimal: assignment solved"
    );

    pairs
        .into_iter()
        .map(|(row, col)| {
            let paper_number = papers[row];
            let id = &student_ids[col];
            let probs = probabilities
                .get(paper_number)
                .ok_or(MatchError::MissingProbabilities { paper_number })?;
            let certainty = mean_digit_probability(id, probs)?;
            Ok(Prediction::new(paper_number, id.clone(), certainty))
        })
        .collect()
}
