use serde::Serialize;

use crate::encoder::WINDOW_SIZE;
use crate::outcome::Outcome;
use crate::predictor::{Prediction, PredictionResult, Score};

/// What the prediction element currently shows.
#[derive(Debug, Clone, PartialEq)]
pub enum Banner {
    /// Empty placeholder, shown after a reset.
    Empty,
    /// Models are loaded and the page is waiting for input.
    Ready,
    NeedMore,
    Predicted(Prediction),
}

impl Banner {
    pub fn from_result(result: PredictionResult) -> Self {
        match result {
            PredictionResult::NotReady { .. } => Banner::NeedMore,
            PredictionResult::Ready(prediction) => Banner::Predicted(prediction),
        }
    }

    pub fn text(&self) -> String {
        match self {
            Banner::Empty => String::new(),
            Banner::Ready => "Ready.".to_string(),
            Banner::NeedMore => format!("Need {WINDOW_SIZE} results first."),
            Banner::Predicted(prediction) => prediction_text(prediction),
        }
    }
}

/// Snapshot handed to the page after every user action.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayState {
    pub prediction_text: String,
    pub label: Option<Outcome>,
    pub confidence: Option<f32>,
    pub probabilities: Option<[f32; 3]>,
    pub history: Vec<Outcome>,
    pub history_text: String,
}

impl DisplayState {
    pub fn new(banner: &Banner, history: Vec<Outcome>) -> Self {
        let (label, confidence, probabilities) = match banner {
            Banner::Predicted(prediction) => match prediction.score {
                Score::Confidence(c) => (Some(prediction.label), Some(c), None),
                Score::Probabilities(p) => (Some(prediction.label), None, Some(p)),
            },
            _ => (None, None, None),
        };
        Self {
            prediction_text: banner.text(),
            label,
            confidence,
            probabilities,
            history_text: history_text(&history),
            history,
        }
    }
}

pub fn prediction_text(prediction: &Prediction) -> String {
    match prediction.score {
        Score::Confidence(c) => {
            format!("Predict: {} | Confidence: {:.2}%", prediction.label, c * 100.0)
        }
        Score::Probabilities([p, b, t]) => format!(
            "Predict: {} | P={:.1}%  B={:.1}%  T={:.1}%",
            prediction.label,
            p * 100.0,
            b * 100.0,
            t * 100.0
        ),
    }
}

pub fn history_text(history: &[Outcome]) -> String {
    let symbols: Vec<&str> = history.iter().map(|o| o.symbol()).collect();
    format!("History: {}", symbols.join(", "))
}
