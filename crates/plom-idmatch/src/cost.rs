//! Scoring a student ID against one paper, and the cost matrix fed to the
//! optimal solver.
//!
//! Two scores are used:
//!
//! - **log-likelihood cost**: `-sum_k ln p_k` over the digit positions, where
//!   `p_k` is the probability the paper assigns to the ID's `k`-th digit.
//!   Smaller is a better match. This is what the assignment solver minimizes.
//! - **mean digit probability**: `mean_k p_k`, in `[0, 1]`. This is the
//!   human-readable certainty attached to every prediction and the score the
//!   greedy matcher maximizes.
//!
//! Each `p_k` is clamped to a small floor before taking the log, so a model
//! that predicts exactly zero for the right digit still yields a finite cost.

use nalgebra::DMatrix;

use crate::digits::{DigitProbs, ProbabilityTable, StudentId};
use crate::error::MatchError;

/// Smallest probability used inside the logarithm.
pub const DEFAULT_PROBABILITY_FLOOR: f64 = 1e-30;

/// Negative log-likelihood that `student_id` is the ID written on a paper
/// with digit probabilities `digit_probs`.
///
/// Uses [`DEFAULT_PROBABILITY_FLOOR`]. Fails with [`MatchError::WrongLength`]
/// when the ID does not have one digit per distribution.
pub fn log_likelihood_cost(
    student_id: &StudentId,
    digit_probs: &DigitProbs,
) -> Result<f64, MatchError> {
    log_likelihood_cost_with_floor(student_id, digit_probs, DEFAULT_PROBABILITY_FLOOR)
}

/// [`log_likelihood_cost`] with an explicit probability floor.
///
/// Each implied probability is clamped into `[floor, 1]`, so the result is
/// finite and non-negative for any positive floor.
pub fn log_likelihood_cost_with_floor(
    student_id: &StudentId,
    digit_probs: &DigitProbs,
    floor: f64,
) -> Result<f64, MatchError> {
    let mut cost = 0.0;
    for p in digit_probs.implied_by(student_id)? {
        cost -= p.clamp(floor, 1.0).ln();
    }
    Ok(cost)
}

/// Mean of the probabilities `digit_probs` assigns to the digits of
/// `student_id`, each clamped into `[0, 1]`.
pub fn mean_digit_probability(
    student_id: &StudentId,
    digit_probs: &DigitProbs,
) -> Result<f64, MatchError> {
    let n = digit_probs.len();
    let sum: f64 = digit_probs
        .implied_by(student_id)?
        .map(|p| p.clamp(0.0, 1.0))
        .sum();
    if n == 0 {
        return Ok(0.0);
    }
    Ok(sum / n as f64)
}

/// Cost matrix with one row per paper and one column per candidate ID.
///
/// Entry `(i, j)` is `log_likelihood_cost(student_ids[j], probabilities[papers[i]])`.
/// A paper without probability data fails with
/// [`MatchError::MissingProbabilities`]; callers are expected to filter
/// `papers` first. Any length error aborts the whole build.
pub fn build_cost_matrix(
    papers: &[u32],
    student_ids: &[StudentId],
    probabilities: &ProbabilityTable,
) -> Result<DMatrix<f64>, MatchError> {
    build_cost_matrix_with_floor(papers, student_ids, probabilities, DEFAULT_PROBABILITY_FLOOR)
}

/// [`build_cost_matrix`] with an explicit probability floor.
pub fn build_cost_matrix_with_floor(
    papers: &[u32],
    student_ids: &[StudentId],
    probabilities: &ProbabilityTable,
    floor: f64,
) -> Result<DMatrix<f64>, MatchError> {
    let mut cost = DMatrix::<f64>::zeros(papers.len(), student_ids.len());
    for (i, &paper_number) in papers.iter().enumerate() {
        let probs = probabilities
            .get(paper_number)
            .ok_or(MatchError::MissingProbabilities { paper_number })?;
        for (j, id) in student_ids.iter().enumerate() {
            cost[(i, j)] = log_likelihood_cost_with_floor(id, probs, floor)?;
        }
    }
    tracing::debug!(
        n_papers = papers.len(),
        n_ids = student_ids.len(),
        "cost matrix built"
    );
    Ok(cost)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    fn one_hot(digit: usize) -> [f64; 10] {
        let mut d = [0.0; 10];
        d[digit] = 1.0;
        d
    }

    fn sid(s: &str) -> StudentId {
        StudentId::new(s).expect("valid test id")
    }

    #[test]
    fn exact_read_costs_nothing() {
        let probs = DigitProbs::new(vec![one_hot(4), one_hot(2)]).unwrap();
        let cost = log_likelihood_cost(&sid("42"), &probs).unwrap();
        assert_abs_diff_eq!(cost, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn cost_is_sum_of_negative_logs() {
        let mut a = [0.0; 10];
        a[1] = 0.5;
        a[7] = 0.5;
        let mut b = [0.0; 10];
        b[3] = 0.25;
        b[0] = 0.75;
        let probs = DigitProbs::new(vec![a, b]).unwrap();
        let cost = log_likelihood_cost(&sid("13"), &probs).unwrap();
        assert_abs_diff_eq!(cost, -(0.5f64.ln()) - 0.25f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn wrong_length_is_rejected() {
        let probs = DigitProbs::new(vec![one_hot(1), one_hot(2)]).unwrap();
        let err = log_likelihood_cost(&sid("123"), &probs).unwrap_err();
        assert_eq!(
            err,
            MatchError::WrongLength {
                expected: 2,
                got: 3
            }
        );
        assert!(mean_digit_probability(&sid("1"), &probs).is_err());
    }

    #[test]
    fn zero_probability_is_clamped_to_floor() {
        let probs = DigitProbs::new(vec![one_hot(0); 8]).unwrap();
        let cost = log_likelihood_cost(&sid("11111111"), &probs).unwrap();
        assert!(cost.is_finite());
        assert_abs_diff_eq!(
            cost,
            -8.0 * DEFAULT_PROBABILITY_FLOOR.ln(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn larger_floor_caps_the_penalty() {
        let probs = DigitProbs::new(vec![one_hot(0)]).unwrap();
        let cost = log_likelihood_cost_with_floor(&sid("5"), &probs, 1e-3).unwrap();
        assert_abs_diff_eq!(cost, -(1e-3f64.ln()), epsilon = 1e-12);
    }

    #[test]
    fn slightly_above_one_never_goes_negative() {
        let mut d = [0.0; 10];
        d[9] = 1.0 + 5e-7;
        let probs = DigitProbs::new(vec![d]).unwrap();
        let cost = log_likelihood_cost(&sid("9"), &probs).unwrap();
        assert!(cost >= 0.0);
    }

    #[test]
    fn certainty_stays_within_unit_interval_above_one() {
        let mut d = [0.0; 10];
        d[1] = 1.0 + 9e-7;
        let probs = DigitProbs::new(vec![d]).unwrap();
        let certainty = mean_digit_probability(&sid("1"), &probs).unwrap();
        assert!(certainty <= 1.0);
        assert_abs_diff_eq!(certainty, 1.0, epsilon = 1e-15);
    }

    #[test]
    fn mean_probability_averages_implied_digits() {
        let mut a = [0.0; 10];
        a[2] = 0.9;
        let mut b = [0.0; 10];
        b[5] = 0.3;
        let probs = DigitProbs::new(vec![a, b]).unwrap();
        let mean = mean_digit_probability(&sid("25"), &probs).unwrap();
        assert_abs_diff_eq!(mean, 0.6, epsilon = 1e-12);
    }

    #[test]
    fn cost_matrix_rows_are_papers_columns_are_ids() {
        let table = ProbabilityTable::from_rows(vec![
            (10, vec![one_hot(1).to_vec(), one_hot(2).to_vec()]),
            (11, vec![one_hot(3).to_vec(), one_hot(4).to_vec()]),
        ])
        .unwrap();
        let ids = vec![sid("34"), sid("12"), sid("99")];
        let m = build_cost_matrix(&[10, 11], &ids, &table).unwrap();
        assert_eq!(m.shape(), (2, 3));
        assert_abs_diff_eq!(m[(0, 1)], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(m[(1, 0)], 0.0, epsilon = 1e-12);
        assert!(m[(0, 0)] > 100.0);
        assert!(m[(1, 2)] > 100.0);
    }

    #[test]
    fn cost_matrix_missing_paper_is_a_lookup_error() {
        let table =
            ProbabilityTable::from_rows(vec![(1, vec![one_hot(1).to_vec()])]).unwrap();
        let err = build_cost_matrix(&[1, 2], &[sid("1")], &table).unwrap_err();
        assert_eq!(err, MatchError::MissingProbabilities { paper_number: 2 });
    }

    #[test]
    fn cost_matrix_aborts_on_length_mismatch() {
        let table =
            ProbabilityTable::from_rows(vec![(1, vec![one_hot(1).to_vec()])]).unwrap();
        let err = build_cost_matrix(&[1], &[sid("1"), sid("12")], &table).unwrap_err();
        assert!(matches!(err, MatchError::WrongLength { .. }));
    }

    fn distribution_strategy() -> impl Strategy<Value = [f64; 10]> {
        prop::array::uniform10(0.0f64..=1.0)
    }

    proptest! {
        #[test]
        fn prop_cost_is_finite_and_non_negative(
            dists in prop::collection::vec(distribution_strategy(), 1..10),
            seed_digits in prop::collection::vec(0usize..10, 10),
        ) {
            let id: String = seed_digits
                .iter()
                .take(dists.len())
                .map(|d| char::from(b'0' + *d as u8))
                .collect();
            let id = StudentId::new(id).unwrap();
            let probs = DigitProbs::new(dists).unwrap();
            let cost = log_likelihood_cost(&id, &probs).unwrap();
            prop_assert!(cost.is_finite());
            prop_assert!(cost >= 0.0);
        }

        #[test]
        fn prop_cost_non_increasing_in_true_digit_probability(
            base in distribution_strategy(),
            digit in 0usize..10,
            p_lo in 0.0f64..=1.0,
            p_hi in 0.0f64..=1.0,
        ) {
            let (p_lo, p_hi) = if p_lo <= p_hi { (p_lo, p_hi) } else { (p_hi, p_lo) };
            let id = StudentId::new(char::from(b'0' + digit as u8).to_string()).unwrap();

            let mut lo = base;
            lo[digit] = p_lo;
            let mut hi = base;
            hi[digit] = p_hi;

            let cost_lo = log_likelihood_cost(&id, &DigitProbs::new(vec![lo]).unwrap()).unwrap();
            let cost_hi = log_likelihood_cost(&id, &DigitProbs::new(vec![hi]).unwrap()).unwrap();
            prop_assert!(cost_hi <= cost_lo);
        }
    }
}
