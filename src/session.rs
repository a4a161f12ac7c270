use log::{debug, info};

use crate::config::PredictorConfig;
use crate::display::{Banner, DisplayState};
use crate::encoder::{self, WINDOW_SIZE};
use crate::error::PredictorError;
use crate::history::HistoryStore;
use crate::loader::{load_model_set, LoadReport};
use crate::model::{ModelLoader, ModelSet};
use crate::outcome::Outcome;
use crate::predictor::{Prediction, PredictionResult, Predictor};

/// Everything a page session owns: the loaded models, the outcome history and the banner
/// currently on display.
#[derive(Debug)]
pub struct Session {
    config: PredictorConfig,
    predictor: Predictor,
    models: ModelSet,
    report: LoadReport,
    history: HistoryStore,
    banner: Banner,
}

impl Session {
    /// Validate `config` and load every model candidate through `loader`.
    pub async fn initialise(
        config: PredictorConfig,
        loader: &dyn ModelLoader,
    ) -> Result<Self, PredictorError> {
        config.validate()?;
        let (models, report) = load_model_set(loader, &config).await;
        let mut session = Self::with_models(config, models)?;
        session.report = report;
        session.banner = Banner::Ready;
        Ok(session)
    }

    /// Build a session around an already loaded model set.
    pub fn with_models(config: PredictorConfig, models: ModelSet) -> Result<Self, PredictorError> {
        config.validate()?;
        Ok(Self {
            predictor: Predictor::from_config(&config),
            history: HistoryStore::new(config.history_capacity),
            models,
            report: LoadReport::default(),
            banner: Banner::Empty,
            config,
        })
    }

    /// Record a user-supplied outcome and recompute the prediction.
    pub async fn on_outcome(&mut self, outcome: Outcome) -> DisplayState {
        self.history.append(outcome);
        debug!("recorded {outcome}, history length {}", self.history.len());
        self.refresh().await;
        self.display_state()
    }

    /// Recompute the banner from the current history.
    pub async fn refresh(&mut self) {
        let result = match self.history.read_last_n(WINDOW_SIZE) {
            Ok(window) => self.predictor.predict(&self.models, &window).await,
            Err(_) => PredictionResult::NotReady {
                needed: WINDOW_SIZE,
                available: self.history.len(),
            },
        };
        self.banner = Banner::from_result(result);
    }

    /// Predict from a caller-supplied window of raw symbols without touching the history.
    /// Unrecognised symbols are encoded as empty rows.
    pub async fn predict_symbols<S: AsRef<str>>(&self, symbols: &[S]) -> PredictionResult {
        if symbols.len() < WINDOW_SIZE {
            return PredictionResult::NotReady {
                needed: WINDOW_SIZE,
                available: symbols.len(),
            };
        }
        let window = &symbols[symbols.len() - WINDOW_SIZE..];
        let last = window.last().and_then(|s| Outcome::from_symbol(s.as_ref()));
        match encoder::encode_symbols(window) {
            Some(input) => {
                let prediction = self.predictor.predict_encoded(&self.models, &input, last).await;
                PredictionResult::Ready(prediction)
            }
            None => PredictionResult::NotReady {
                needed: WINDOW_SIZE,
                available: window.len(),
            },
        }
    }

    /// Clear the history and return the prediction display to its placeholder.
    pub fn reset(&mut self) {
        self.history.reset();
        self.banner = Banner::Empty;
    }

    /// Drop all models and history. The session stays usable but predicts with an empty set.
    pub fn teardown(&mut self) {
        info!(
            "tearing down session ({} ensemble model(s), tie model: {})",
            self.models.ensemble_len(),
            self.models.has_tie_model()
        );
        self.models = ModelSet::default();
        self.reset();
    }

    pub fn display_state(&self) -> DisplayState {
        DisplayState::new(&self.banner, self.history.iter().collect())
    }

    pub fn last_prediction(&self) -> Option<&Prediction> {
        match &self.banner {
            Banner::Predicted(prediction) => Some(prediction),
            _ => None,
        }
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    pub fn models(&self) -> &ModelSet {
        &self.models
    }

    pub fn load_report(&self) -> &LoadReport {
        &self.report
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }
}
