//! plom-idmatch: match scanned exam papers to student IDs.
//!
//! An ID reader produces, for every handwritten digit box on an ID page, a
//! probability distribution over the digits 0-9. This crate turns those
//! distributions plus the class roster into predictions of which student
//! wrote which paper. The stages are:
//!
//! 1. **Digits** – typed student IDs and per-paper digit probabilities.
//! 2. **Roster** – classlist loading, removal of IDs already matched.
//! 3. **Cost** – negative log-likelihood cost of every (paper, ID) pair.
//! 4. **Assignment** – minimum-cost bipartite matching (Hungarian method).
//! 5. **Predictors** – greedy (`MLGreedy`) and optimal (`MLLAP`).
//! 6. **Matcher** – filtering policy, per-predictor outcomes, prediction sink.
//!
//! # Public API
//! - [`IdMatcher`] with [`MatchConfig`] as the primary entry point
//! - [`predict_greedy`] / [`predict_optimal`] for direct use
//! - [`PredictionSink`] for persisting predictions; [`PredictionStore`] is an
//!   in-memory implementation
//! - [`build_cost_matrix`] and [`solve_optimal_assignment`] as building blocks

mod assignment;
mod config;
mod cost;
mod digits;
mod error;
mod greedy;
mod matcher;
mod optimal;
mod prediction;
mod roster;

pub use assignment::{assignment_cost, solve_optimal_assignment, AssignmentSolver, Hungarian};
pub use config::MatchConfig;
pub use cost::{
    build_cost_matrix, build_cost_matrix_with_floor, log_likelihood_cost,
    log_likelihood_cost_with_floor, mean_digit_probability, DEFAULT_PROBABILITY_FLOOR,
};
pub use digits::{DigitDistribution, DigitProbs, ProbabilityTable, StudentId, PROBABILITY_TOLERANCE};
pub use error::MatchError;
pub use greedy::predict_greedy;
pub use matcher::{IdMatcher, MatchInputs, MatchProblem, MatchReport, PredictorOutcome};
pub use optimal::{predict_optimal, predict_optimal_with};
pub use prediction::{
    compare_predictors, Prediction, PredictionSink, PredictionStore, Predictor,
    PredictorAgreement, SinkError, StoredPrediction,
};
pub use roster::{remove_matched, Roster, RosterEntry};

/// Re-export so callers can build cost matrices without naming nalgebra.
pub use nalgebra::DMatrix;
