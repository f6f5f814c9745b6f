use std::collections::HashMap;

use numpy::{PyReadonlyArrayDyn, PyUntypedArrayMethods};
use plom_idmatch::{
    DMatrix, DigitProbs, IdMatcher, MatchConfig, MatchError, MatchInputs, Prediction,
    PredictionSink, Predictor, ProbabilityTable, SinkError, StudentId,
};
use pyo3::exceptions::{PyIndexError, PyKeyError, PyValueError};
use pyo3::prelude::*;

/// Probabilities as Python hands them over: `{paper_number: [[p0..p9], ..]}`.
type PyProbabilities = HashMap<u32, Vec<Vec<f64>>>;

/// Python-side prediction triple.
type PyPrediction = (u32, String, f64);

fn py_value_error<E: std::fmt::Display>(err: E) -> PyErr {
    PyValueError::new_err(err.to_string())
}

fn match_error(err: MatchError) -> PyErr {
    match err {
        MatchError::MissingProbabilities { .. } => PyKeyError::new_err(err.to_string()),
        MatchError::DegenerateProblem { .. } => PyIndexError::new_err(err.to_string()),
        _ => py_value_error(err),
    }
}

fn parse_ids(ids: Vec<String>) -> PyResult<Vec<StudentId>> {
    ids.into_iter()
        .map(|s| StudentId::new(s).map_err(match_error))
        .collect()
}

fn parse_table(probabilities: PyProbabilities) -> PyResult<ProbabilityTable> {
    // Insert in paper order so a length error names the same paper every time.
    let mut entries: Vec<_> = probabilities.into_iter().collect();
    entries.sort_unstable_by_key(|(p, _)| *p);
    ProbabilityTable::from_rows(entries).map_err(match_error)
}

fn to_py(predictions: Vec<Prediction>) -> Vec<PyPrediction> {
    predictions
        .into_iter()
        .map(|p| (p.paper_number, p.student_id.into(), p.certainty))
        .collect()
}

/// Forwards predictions to a Python callable
/// `record(paper_number, student_id, certainty, predictor)`.
struct CallbackSink<'a, 'py> {
    record: &'a Bound<'py, PyAny>,
    first_error: Option<PyErr>,
}

impl PredictionSink for CallbackSink<'_, '_> {
    fn record_prediction(
        &mut self,
        paper_number: u32,
        student_id: &StudentId,
        certainty: f64,
        predictor: Predictor,
    ) -> Result<(), SinkError> {
        match self.record.call1((
            paper_number,
            student_id.as_str(),
            certainty,
            predictor.as_str(),
        )) {
            Ok(_) => Ok(()),
            Err(err) => {
                let msg = err.to_string();
                self.first_error.get_or_insert(err);
                Err(msg.into())
            }
        }
    }
}

#[pyfunction]
fn package_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[pyfunction]
fn default_config_json() -> PyResult<String> {
    serde_json::to_string(&MatchConfig::default()).map_err(py_value_error)
}

#[pyfunction]
fn log_likelihood_cost(student_id: &str, digit_probs: Vec<Vec<f64>>) -> PyResult<f64> {
    let id = StudentId::new(student_id).map_err(match_error)?;
    let probs = DigitProbs::from_rows(digit_probs).map_err(match_error)?;
    plom_idmatch::log_likelihood_cost(&id, &probs).map_err(match_error)
}

#[pyfunction]
fn build_cost_matrix(
    papers: Vec<u32>,
    student_ids: Vec<String>,
    probabilities: PyProbabilities,
) -> PyResult<Vec<Vec<f64>>> {
    let ids = parse_ids(student_ids)?;
    let table = parse_table(probabilities)?;
    let cost = plom_idmatch::build_cost_matrix(&papers, &ids, &table).map_err(match_error)?;
    Ok(cost
        .row_iter()
        .map(|row| row.iter().copied().collect())
        .collect())
}

#[pyfunction]
fn solve_optimal_assignment(cost_matrix: PyReadonlyArrayDyn<'_, f64>) -> PyResult<Vec<(usize, usize)>> {
    let shape = cost_matrix.shape();
    let view = cost_matrix.as_array();
    let cost = match shape {
        [rows, cols] => DMatrix::from_fn(*rows, *cols, |r, c| view[[r, c]]),
        _ => {
            return Err(PyValueError::new_err(format!(
                "expected a 2-D cost matrix, got {} dimensions",
                shape.len()
            )))
        }
    };
    plom_idmatch::solve_optimal_assignment(&cost).map_err(match_error)
}

#[pyfunction]
fn predict_greedy(
    student_ids: Vec<String>,
    probabilities: PyProbabilities,
) -> PyResult<Vec<PyPrediction>> {
    let ids = parse_ids(student_ids)?;
    let table = parse_table(probabilities)?;
    plom_idmatch::predict_greedy(&ids, &table)
        .map(to_py)
        .map_err(match_error)
}

#[pyfunction]
fn predict_optimal(
    papers: Vec<u32>,
    student_ids: Vec<String>,
    probabilities: PyProbabilities,
) -> PyResult<Vec<PyPrediction>> {
    let ids = parse_ids(student_ids)?;
    let table = parse_table(probabilities)?;
    plom_idmatch::predict_optimal(&papers, &ids, &table)
        .map(to_py)
        .map_err(match_error)
}

/// Run both predictors and hand every prediction to `record`.
///
/// Returns the run report as JSON. An exception raised by `record` is
/// re-raised once both predictors have finished.
#[pyfunction]
#[pyo3(signature = (roster, already_matched, papers, probabilities, record, config_json=None))]
fn run_id_matching(
    roster: Vec<String>,
    already_matched: Vec<String>,
    papers: Vec<u32>,
    probabilities: PyProbabilities,
    record: &Bound<'_, PyAny>,
    config_json: Option<&str>,
) -> PyResult<String> {
    let config = match config_json {
        Some(json) => MatchConfig::from_json_str(json).map_err(py_value_error)?,
        None => MatchConfig::default(),
    };
    let inputs = MatchInputs {
        roster: parse_ids(roster)?,
        already_matched: parse_ids(already_matched)?,
        unidentified_papers: papers,
        probabilities: parse_table(probabilities)?,
    };

    let mut sink = CallbackSink {
        record,
        first_error: None,
    };
    let report = IdMatcher::new(config).run(&inputs, &mut sink);
    if let Some(err) = sink.first_error {
        return Err(err);
    }
    serde_json::to_string(&report).map_err(py_value_error)
}

#[pymodule]
fn _plom_idmatch(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(package_version, m)?)?;
    m.add_function(wrap_pyfunction!(default_config_json, m)?)?;
    m.add_function(wrap_pyfunction!(log_likelihood_cost, m)?)?;
    m.add_function(wrap_pyfunction!(build_cost_matrix, m)?)?;
    m.add_function(wrap_pyfunction!(solve_optimal_assignment, m)?)?;
    m.add_function(wrap_pyfunction!(predict_greedy, m)?)?;
    m.add_function(wrap_pyfunction!(predict_optimal, m)?)?;
    m.add_function(wrap_pyfunction!(run_id_matching, m)?)?;
    Ok(())
}
