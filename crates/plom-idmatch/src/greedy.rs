//! Greedy per-paper matcher.
//!
//! Every paper independently takes the candidate ID with the highest mean
//! digit probability. Nothing stops two papers from taking the same ID: this
//! is a fast cross-check against the optimal assignment, not a substitute.

use crate::cost::mean_digit_probability;
use crate::digits::{ProbabilityTable, StudentId};
use crate::error::MatchError;
use crate::prediction::Prediction;

/// Best candidate ID per paper by mean digit probability.
///
/// Papers are visited in ascending paper number. On equal scores the
/// earlier ID in `student_ids` wins. An empty table or an empty ID list
/// yields no predictions; the only error is a length mismatch.
pub fn predict_greedy(
    student_ids: &[StudentId],
    probabilities: &ProbabilityTable,
) -> Result<Vec<Prediction>, MatchError> {
    let mut predictions = Vec::with_capacity(probabilities.len());
    if student_ids.is_empty() {
        return Ok(predictions);
    }

    for (paper_number, probs) in probabilities.iter() {
        let mut best: Option<(&StudentId, f64)> = None;
        for id in student_ids {
            let score = mean_digit_probability(id, probs)?;
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((id, score));
            }
        }
        if let Some((id, score)) = best {
            predictions.push(Prediction::new(paper_number, id.clone(), score));
        }
    }

    tracing::debug!(
        n_predictions = predictions.len(),
        n_ids = student_ids.len(),
        "greedy: done"
    );
    Ok(predictions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sid(s: &str) -> StudentId {
        StudentId::new(s).expect("valid test id")
    }

    fn peaked(id: &str, p: f64) -> Vec<Vec<f64>> {
        id.bytes()
            .map(|b| {
                let mut row = vec![(1.0 - p) / 9.0; 10];
                row[usize::from(b - b'0')] = p;
                row
            })
            .collect()
    }

    #[test]
    fn picks_highest_mean_probability() {
        let table = ProbabilityTable::from_rows(vec![(5, peaked("314", 0.8))]).unwrap();
        let ids = vec![sid("111"), sid("314"), sid("315")];
        let preds = predict_greedy(&ids, &table).unwrap();
        assert_eq!(preds.len(), 1);
        assert_eq!(preds[0].paper_number, 5);
        assert_eq!(preds[0].student_id, sid("314"));
        assert_abs_diff_eq!(preds[0].certainty, 0.8, epsilon = 1e-12);
    }

    #[test]
    fn same_id_can_win_several_papers() {
        let table = ProbabilityTable::from_rows(vec![
            (1, peaked("42", 0.9)),
            (2, peaked("42", 0.7)),
        ])
        .unwrap();
        let preds = predict_greedy(&[sid("42"), sid("17")], &table).unwrap();
        assert_eq!(preds.len(), 2);
        assert!(preds.iter().all(|p| p.student_id == sid("42")));
    }

    #[test]
    fn ties_go_to_the_first_candidate() {
        let table = ProbabilityTable::from_rows(vec![(1, vec![vec![0.1; 10]])]).unwrap();
        let preds = predict_greedy(&[sid("7"), sid("3")], &table).unwrap();
        assert_eq!(preds[0].student_id, sid("7"));
    }

    #[test]
    fn softmax_overshoot_does_not_exceed_full_certainty() {
        let mut row = vec![0.0; 10];
        row[1] = 1.0 + 9e-7;
        let table = ProbabilityTable::from_rows(vec![(4, vec![row])]).unwrap();
        let preds = predict_greedy(&[sid("1")], &table).unwrap();
        assert!(preds[0].certainty <= 1.0);
    }

    #[test]
    fn empty_inputs_give_no_predictions() {
        let table = ProbabilityTable::from_rows(vec![(1, peaked("42", 0.9))]).unwrap();
        assert!(predict_greedy(&[], &table).unwrap().is_empty());
        assert!(predict_greedy(&[sid("42")], &ProbabilityTable::new())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn length_mismatch_is_an_error() {
        let table = ProbabilityTable::from_rows(vec![(1, peaked("42", 0.9))]).unwrap();
        let err = predict_greedy(&[sid("421")], &table).unwrap_err();
        assert!(matches!(err, MatchError::WrongLength { .. }));
    }
}
