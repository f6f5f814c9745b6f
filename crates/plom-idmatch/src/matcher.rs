//! Orchestration of a matching run.
//!
//! [`IdMatcher`] wraps a [`MatchConfig`] and turns one snapshot of the exam
//! state ([`MatchInputs`]) into stored predictions:
//!
//! 1. candidate IDs = roster minus IDs already used by identified papers;
//! 2. papers = unidentified papers that have probability data (the rest are
//!    counted and reported, not silently dropped);
//! 3. greedy (`MLGreedy`) and optimal (`MLLAP`) predictors run independently;
//!    a failure of one never stops the other or undoes what it recorded.
//!
//! Running out of papers or IDs is the normal end of an identification
//! session. Greedy then simply predicts nothing; optimal shows up as
//! [`PredictorOutcome::Failed`] with a degenerate error and an `info` log
//! line, never as a panic.

use std::collections::HashSet;

use crate::assignment::Hungarian;
use crate::config::MatchConfig;
use crate::digits::{ProbabilityTable, StudentId};
use crate::error::MatchError;
use crate::greedy::predict_greedy;
use crate::optimal::predict_optimal_with;
use crate::prediction::{
    compare_predictors, Prediction, PredictionSink, Predictor, PredictorAgreement, SinkError,
};
use crate::roster::{remove_matched, Roster};

/// One consistent snapshot of the data a matching run needs.
#[derive(Debug, Clone, Default)]
pub struct MatchInputs {
    /// Every student ID on the classlist.
    pub roster: Vec<StudentId>,
    /// IDs already attached to identified papers.
    pub already_matched: Vec<StudentId>,
    /// Papers still waiting to be identified.
    pub unidentified_papers: Vec<u32>,
    /// Digit probabilities from the ID reader.
    pub probabilities: ProbabilityTable,
}

/// The filtered problem both predictors work on.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchProblem {
    /// Unused candidate IDs, in roster order.
    pub student_ids: Vec<StudentId>,
    /// Unidentified papers with probability data, in input order, each once.
    pub papers: Vec<u32>,
    /// Probabilities restricted to `papers`.
    pub probabilities: ProbabilityTable,
    /// Unidentified papers skipped for lack of probability data.
    pub n_papers_without_probabilities: usize,
}

impl MatchProblem {
    /// Fail with [`MatchError::DegenerateProblem`] if there are no papers or
    /// no candidate IDs left.
    pub fn ensure_solvable(&self) -> Result<(), MatchError> {
        if self.papers.is_empty() || self.student_ids.is_empty() {
            return Err(MatchError::DegenerateProblem {
                n_papers: self.papers.len(),
                n_ids: self.student_ids.len(),
            });
        }
        Ok(())
    }
}

/// What happened to one predictor in a run.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PredictorOutcome {
    /// Predictions were computed and handed to the sink.
    Recorded { n_predictions: usize },
    /// Disabled by configuration.
    Skipped,
    /// The predictor could not run; nothing was recorded for it.
    Failed { code: String, error: String },
}

impl PredictorOutcome {
    fn failed(err: impl std::fmt::Display, code: &str) -> Self {
        Self::Failed {
            code: code.to_string(),
            error: err.to_string(),
        }
    }

    pub fn is_recorded(&self) -> bool {
        matches!(self, Self::Recorded { .. })
    }
}

/// Summary of a matching run.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MatchReport {
    pub n_candidate_ids: usize,
    pub n_papers: usize,
    pub n_papers_without_probabilities: usize,
    pub greedy: PredictorOutcome,
    pub optimal: PredictorOutcome,
    /// Greedy vs optimal, when both produced predictions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agreement: Option<PredictorAgreement>,
}

/// Primary matching interface.
///
/// Create once, run on many snapshots. Holds no state between runs.
#[derive(Debug, Clone, Default)]
pub struct IdMatcher {
    config: MatchConfig,
}

impl IdMatcher {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut MatchConfig {
        &mut self.config
    }

    /// Apply the roster and paper filtering policy.
    pub fn prepare(&self, inputs: &MatchInputs) -> MatchProblem {
        let student_ids = remove_matched(inputs.roster.iter().cloned(), &inputs.already_matched);

        let mut seen = HashSet::new();
        let (papers, skipped): (Vec<u32>, Vec<u32>) = inputs
            .unidentified_papers
            .iter()
            .filter(|&&p| seen.insert(p))
            .partition(|&&p| inputs.probabilities.contains(p));
        let n_repeated = inputs.unidentified_papers.len() - papers.len() - skipped.len();
        if n_repeated > 0 {
            tracing::warn!(n_repeated, "repeated unidentified paper numbers are ignored");
        }
        if !skipped.is_empty() {
            tracing::warn!(
                n_skipped = skipped.len(),
                papers = ?skipped,
                "unidentified papers without ID probabilities are excluded"
            );
        }

        let probabilities = inputs.probabilities.restricted_to(&papers);
        tracing::debug!(
            n_roster = inputs.roster.len(),
            n_already_matched = inputs.already_matched.len(),
            n_candidate_ids = student_ids.len(),
            n_papers = papers.len(),
            "matching problem prepared"
        );

        MatchProblem {
            student_ids,
            papers,
            probabilities,
            n_papers_without_probabilities: skipped.len(),
        }
    }

    /// Greedy predictions for a prepared problem.
    ///
    /// Never degenerate: with no papers or no IDs it predicts nothing.
    pub fn greedy(&self, problem: &MatchProblem) -> Result<Vec<Prediction>, MatchError> {
        predict_greedy(&problem.student_ids, &problem.probabilities)
    }

    /// Optimal-assignment predictions for a prepared problem.
    pub fn optimal(&self, problem: &MatchProblem) -> Result<Vec<Prediction>, MatchError> {
        problem.ensure_solvable()?;
        predict_optimal_with(
            &Hungarian,
            self.config.probability_floor,
            &problem.papers,
            &problem.student_ids,
            &problem.probabilities,
        )
    }

    /// Run both predictors on `inputs` and record their predictions in `sink`.
    pub fn run(&self, inputs: &MatchInputs, sink: &mut dyn PredictionSink) -> MatchReport {
        let problem = self.prepare(inputs);

        let greedy = self
            .config
            .run_greedy
            .then(|| self.greedy(&problem));
        let optimal = self
            .config
            .run_optimal
            .then(|| self.optimal(&problem));

        let agreement = match (&greedy, &optimal) {
            (Some(Ok(g)), Some(Ok(o))) => Some(compare_predictors(g, o)),
            _ => None,
        };
        if let Some(a) = &agreement {
            tracing::info!(
                n_common = a.n_common,
                n_agree = a.n_agree,
                "greedy and optimal predictions compared"
            );
        }

        let greedy = self.store(Predictor::MlGreedy, greedy, sink);
        let optimal = self.store(Predictor::MlLap, optimal, sink);

        MatchReport {
            n_candidate_ids: problem.student_ids.len(),
            n_papers: problem.papers.len(),
            n_papers_without_probabilities: problem.n_papers_without_probabilities,
            greedy,
            optimal,
            agreement,
        }
    }

    /// Record `prename` predictions for every prenamed roster entry.
    ///
    /// Returns the number recorded.
    pub fn record_prenamed(
        &self,
        roster: &Roster,
        sink: &mut dyn PredictionSink,
    ) -> Result<usize, SinkError> {
        let prenamed = roster.prenamed();
        if self.config.replace_previous {
            sink.clear_predictor(Predictor::Prename)?;
        }
        for (paper_number, id) in &prenamed {
            sink.record_prediction(
                *paper_number,
                id,
                self.config.prename_certainty,
                Predictor::Prename,
            )?;
        }
        tracing::info!(n_prenamed = prenamed.len(), "prename predictions recorded");
        Ok(prenamed.len())
    }

    fn store(
        &self,
        predictor: Predictor,
        result: Option<Result<Vec<Prediction>, MatchError>>,
        sink: &mut dyn PredictionSink,
    ) -> PredictorOutcome {
        let predictions = match result {
            None => return PredictorOutcome::Skipped,
            Some(Ok(p)) => p,
            Some(Err(err)) if err.is_degenerate() => {
                tracing::info!(%predictor, "nothing to predict: {}", err);
                return PredictorOutcome::failed(&err, err.code());
            }
            Some(Err(err)) => {
                tracing::warn!(%predictor, "predictor failed: {}", err);
                return PredictorOutcome::failed(&err, err.code());
            }
        };

        if self.config.replace_previous {
            if let Err(err) = sink.clear_predictor(predictor) {
                tracing::warn!(%predictor, "could not clear previous predictions: {}", err);
                return PredictorOutcome::failed(err, "sink");
            }
        }
        for p in &predictions {
            if let Err(err) =
                sink.record_prediction(p.paper_number, &p.student_id, p.certainty, predictor)
            {
                tracing::warn!(
                    %predictor,
                    paper_number = p.paper_number,
                    "could not record prediction: {}",
                    err
                );
                return PredictorOutcome::failed(err, "sink");
            }
        }

        tracing::info!(%predictor, n_predictions = predictions.len(), "predictions recorded");
        PredictorOutcome::Recorded {
            n_predictions: predictions.len(),
        }
    }
}
