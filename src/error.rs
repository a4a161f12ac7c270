use std::fmt;

use serde::Serialize;
use thiserror::Error;
use wasm_bindgen::JsValue;

/// Which slot of the model set a candidate location was meant to fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelRole {
    Tie,
    Ensemble,
}

impl fmt::Display for ModelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelRole::Tie => f.write_str("tie"),
            ModelRole::Ensemble => f.write_str("player/banker"),
        }
    }
}

/// Everything that can go wrong between loading a model and rendering a prediction. Apart from
/// `InvalidConfig`, none of these abort a session: they degrade the prediction instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictorError {
    #[error("model not found at {location}: {reason}")]
    ModelNotFound { location: String, reason: String },
    #[error("no {role} model could be loaded from {attempted} candidate(s)")]
    CandidatesExhausted { role: ModelRole, attempted: usize },
    #[error("inference failed for model {model}: {reason}")]
    InferenceFailure { model: String, reason: String },
    #[error("need {needed} results, have {available}")]
    InsufficientHistory { needed: usize, available: usize },
    #[error("unrecognised outcome symbol `{0}`")]
    UnknownOutcome(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<PredictorError> for JsValue {
    fn from(err: PredictorError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}
