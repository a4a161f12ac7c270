use serde::{Deserialize, Serialize};

use crate::encoder::WINDOW_SIZE;
use crate::error::PredictorError;

/// How the tie probability and the Player/Banker average are turned into a displayed prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombinationMode {
    /// Full `[P(Player), P(Banker), P(Tie)]` vector; the label is its arg-max.
    #[default]
    Probabilities,
    /// A single confidence scalar for the winning label.
    Confidence,
}

/// What to predict when neither a tie model nor any ensemble member could be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyModelPolicy {
    /// Repeat the most recent outcome with zero confidence.
    #[default]
    RepeatLast,
    /// Run the normal policy with a tie probability of 0 and an ensemble average of 0.5.
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictorConfig {
    /// Tie probability at or above which the prediction short-circuits to Tie.
    #[serde(default = "default_tie_threshold")]
    pub tie_threshold: f32,
    #[serde(default)]
    pub combination: CombinationMode,
    #[serde(default)]
    pub empty_model_policy: EmptyModelPolicy,
    /// Number of outcomes retained for display. Never below the prediction window.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// Tie model locations in priority order; the first that loads wins.
    #[serde(default = "default_tie_candidates")]
    pub tie_candidates: Vec<String>,
    /// Player/Banker model folders; each one is tried independently.
    #[serde(default = "default_ensemble_candidates", alias = "pb_candidates")]
    pub ensemble_candidates: Vec<String>,
    /// Model description file expected inside every ensemble folder.
    #[serde(default = "default_model_file")]
    pub model_file: String,
    #[serde(default = "default_prediction_element")]
    pub prediction_element: String,
    #[serde(default = "default_history_element")]
    pub history_element: String,
    /// When false the page is expected to render `displayState()` itself.
    #[serde(default = "default_render_to_dom")]
    pub render_to_dom: bool,
}

fn default_tie_threshold() -> f32 {
    0.20
}
fn default_history_capacity() -> usize {
    WINDOW_SIZE
}
fn default_tie_candidates() -> Vec<String> {
    vec!["./tfjs_tie/model.json".to_string()]
}
fn default_ensemble_candidates() -> Vec<String> {
    (1..=5).map(|i| format!("./tfjs_pb_{i}")).collect()
}
fn default_model_file() -> String {
    "model.json".to_string()
}
fn default_prediction_element() -> String {
    "prediction".to_string()
}
fn default_history_element() -> String {
    "history".to_string()
}
fn default_render_to_dom() -> bool {
    true
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            tie_threshold: default_tie_threshold(),
            combination: CombinationMode::default(),
            empty_model_policy: EmptyModelPolicy::default(),
            history_capacity: default_history_capacity(),
            tie_candidates: default_tie_candidates(),
            ensemble_candidates: default_ensemble_candidates(),
            model_file: default_model_file(),
            prediction_element: default_prediction_element(),
            history_element: default_history_element(),
            render_to_dom: default_render_to_dom(),
        }
    }
}

impl PredictorConfig {
    pub fn validate(&self) -> Result<(), PredictorError> {
        if !self.tie_threshold.is_finite() || !(0.0..=1.0).contains(&self.tie_threshold) {
            return Err(PredictorError::InvalidConfig(format!(
                "tie_threshold must lie in [0, 1], got {}",
                self.tie_threshold
            )));
        }
        if self.history_capacity < WINDOW_SIZE {
            return Err(PredictorError::InvalidConfig(format!(
                "history_capacity must be at least {WINDOW_SIZE}, got {}",
                self.history_capacity
            )));
        }
        if self.model_file.trim().is_empty() {
            return Err(PredictorError::InvalidConfig("model_file must not be empty".to_string()));
        }
        Ok(())
    }

    /// Full model description locations for the ensemble folders, in configured order.
    pub fn ensemble_locations(&self) -> Vec<String> {
        self.ensemble_candidates
            .iter()
            .map(|base| format!("{}/{}", base.trim_end_matches('/'), self.model_file))
            .collect()
    }
}
