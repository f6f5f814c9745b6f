//! Matching run configuration: JSON-loadable knobs with documented defaults.

use std::path::Path;

use crate::cost::DEFAULT_PROBABILITY_FLOOR;

/// Tunable parameters of a matching run.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MatchConfig {
    /// Smallest probability used inside the log-likelihood cost.
    /// Default: [`MatchConfig::DEFAULT_PROBABILITY_FLOOR`].
    #[serde(default = "MatchConfig::default_probability_floor")]
    pub probability_floor: f64,
    /// Run the greedy (`MLGreedy`) predictor.
    #[serde(default = "MatchConfig::default_true")]
    pub run_greedy: bool,
    /// Run the optimal-assignment (`MLLAP`) predictor.
    #[serde(default = "MatchConfig::default_true")]
    pub run_optimal: bool,
    /// Clear a predictor's earlier predictions in the sink before recording
    /// the new ones.
    #[serde(default = "MatchConfig::default_true")]
    pub replace_previous: bool,
    /// Certainty attached to `prename` predictions.
    /// Default: [`MatchConfig::DEFAULT_PRENAME_CERTAINTY`].
    #[serde(default = "MatchConfig::default_prename_certainty")]
    pub prename_certainty: f64,
}

impl MatchConfig {
    pub const DEFAULT_PROBABILITY_FLOOR: f64 = DEFAULT_PROBABILITY_FLOOR;
    pub const DEFAULT_PRENAME_CERTAINTY: f64 = 0.9;

    fn default_probability_floor() -> f64 {
        Self::DEFAULT_PROBABILITY_FLOOR
    }

    fn default_prename_certainty() -> f64 {
        Self::DEFAULT_PRENAME_CERTAINTY
    }

    fn default_true() -> bool {
        true
    }

    /// Reject values that would make the cost matrix or certainties meaningless.
    pub fn validate(&self) -> Result<(), String> {
        if !self.probability_floor.is_finite()
            || self.probability_floor <= 0.0
            || self.probability_floor >= 1.0
        {
            return Err(format!(
                "probability_floor must be finite and in (0, 1), got {}",
                self.probability_floor
            ));
        }
        if !(0.0..=1.0).contains(&self.prename_certainty) {
            return Err(format!(
                "prename_certainty must be in [0, 1], got {}",
                self.prename_certainty
            ));
        }
        Ok(())
    }

    /// Load and validate a configuration from JSON. Missing fields take
    /// their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            probability_floor: Self::DEFAULT_PROBABILITY_FLOOR,
            run_greedy: true,
            run_optimal: true,
            replace_previous: true,
            prename_certainty: Self::DEFAULT_PRENAME_CERTAINTY,
        }
    }
}
