//! Prediction triples, predictor tags, and the sink predictions are written to.

use std::collections::BTreeMap;

use crate::digits::StudentId;

/// One predicted `(paper_number, student_id, certainty)` triple.
///
/// `certainty` is the mean per-digit probability of `student_id` on the
/// paper, in `[0, 1]`. It is not derived from the solver's cost.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Prediction {
    pub paper_number: u32,
    pub student_id: StudentId,
    pub certainty: f64,
}

impl Prediction {
    pub fn new(paper_number: u32, student_id: StudentId, certainty: f64) -> Self {
        Self {
            paper_number,
            student_id,
            certainty,
        }
    }
}

/// Which algorithm produced a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum Predictor {
    /// Per-paper best mean digit probability, no exclusivity.
    #[serde(rename = "MLGreedy")]
    MlGreedy,
    /// Optimal one-to-one assignment over log-likelihood costs.
    #[serde(rename = "MLLAP")]
    MlLap,
    /// Paper printed with the student's name.
    #[serde(rename = "prename")]
    Prename,
}

impl Predictor {
    pub const ALL: [Predictor; 3] = [Self::MlGreedy, Self::MlLap, Self::Prename];

    /// Tag stored alongside each prediction.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MlGreedy => "MLGreedy",
            Self::MlLap => "MLLAP",
            Self::Prename => "prename",
        }
    }
}

impl std::fmt::Display for Predictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Predictor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown predictor '{}'", s))
    }
}

/// Error type returned by prediction sinks.
pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// Where predictions go: the persistence layer of the calling system.
pub trait PredictionSink {
    /// Store one prediction tagged with its predictor.
    fn record_prediction(
        &mut self,
        paper_number: u32,
        student_id: &StudentId,
        certainty: f64,
        predictor: Predictor,
    ) -> Result<(), SinkError>;

    /// Drop every stored prediction of `predictor` before a fresh run.
    fn clear_predictor(&mut self, _predictor: Predictor) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Row of a [`PredictionStore`] as serialized.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StoredPrediction {
    pub paper_number: u32,
    pub student_id: StudentId,
    pub certainty: f64,
    pub predictor: Predictor,
}

/// In-memory sink keeping at most one prediction per `(paper, predictor)`.
///
/// Recording again for the same key replaces the earlier prediction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictionStore {
    rows: BTreeMap<(u32, Predictor), (StudentId, f64)>,
}

impl PredictionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Prediction of `predictor` for `paper_number`, if any.
    pub fn get(&self, paper_number: u32, predictor: Predictor) -> Option<Prediction> {
        self.rows
            .get(&(paper_number, predictor))
            .map(|(id, c)| Prediction::new(paper_number, id.clone(), *c))
    }

    /// All predictions of one predictor, by ascending paper number.
    pub fn for_predictor(&self, predictor: Predictor) -> Vec<Prediction> {
        self.rows
            .iter()
            .filter(|((_, p), _)| *p == predictor)
            .map(|(&(paper, _), (id, c))| Prediction::new(paper, id.clone(), *c))
            .collect()
    }

    /// Every row, ordered by paper number then predictor.
    pub fn rows(&self) -> Vec<StoredPrediction> {
        self.rows
            .iter()
            .map(|(&(paper_number, predictor), (id, c))| StoredPrediction {
                paper_number,
                student_id: id.clone(),
                certainty: *c,
                predictor,
            })
            .collect()
    }
}

impl PredictionSink for PredictionStore {
    fn record_prediction(
        &mut self,
        paper_number: u32,
        student_id: &StudentId,
        certainty: f64,
        predictor: Predictor,
    ) -> Result<(), SinkError> {
        self.rows
            .insert((paper_number, predictor), (student_id.clone(), certainty));
        Ok(())
    }

    fn clear_predictor(&mut self, predictor: Predictor) -> Result<(), SinkError> {
        self.rows.retain(|&(_, p), _| p != predictor);
        Ok(())
    }
}

impl serde::Serialize for PredictionStore {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.rows())
    }
}

/// How two predictors compare on the papers both predicted.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PredictorAgreement {
    /// Papers predicted by both.
    pub n_common: usize,
    /// Papers where both chose the same student ID.
    pub n_agree: usize,
    /// Papers where they differ, ascending.
    pub disagreements: Vec<u32>,
}

/// Compare two prediction sets paper by paper.
pub fn compare_predictors(a: &[Prediction], b: &[Prediction]) -> PredictorAgreement {
    let b_by_paper: BTreeMap<u32, &StudentId> =
        b.iter().map(|p| (p.paper_number, &p.student_id)).collect();
    let mut out = PredictorAgreement::default();
    for p in a {
        let Some(other) = b_by_paper.get(&p.paper_number) else {
            continue;
        };
        out.n_common += 1;
        if *other == &p.student_id {
            out.n_agree += 1;
        } else {
            out.disagreements.push(p.paper_number);
        }
    }
    out.disagreements.sort_unstable();
    out.disagreements.dedup();
    out
}
