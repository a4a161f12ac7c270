#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! WebAssembly predictor for the next baccarat round (Player, Banker or Tie).
//!
//! The crate exposes a small core and one browser-facing class:
//!
//! * [`Predictor`] – the combination policy. A tie model gates the prediction: when its output
//!   reaches the configured threshold the answer is Tie and nothing else runs. Otherwise the
//!   Player/Banker ensemble is averaged, skipping members that fail, and the result is shown
//!   either as a `[P, B, T]` probability vector or as a single confidence value
//!   ([`CombinationMode`]).
//! * [`Session`] – owns the models, the bounded outcome history and the current display state.
//!   Models are loaded once from ordered candidate locations, tolerating missing files.
//! * [`BaccaratPredictor`] – the wasm-bindgen wrapper. Inference itself stays in JavaScript: the
//!   page passes a loader `(location) => Promise<model>` where each model exposes
//!   `predict(data: Float32Array, shape: number[]) => Promise<number | number[]>` and may expose
//!   `dispose()`.
//!
//! Models see the last five outcomes one-hot encoded in `[Player, Banker, Tie]` order, shaped
//! `[1, 5, 3]`.

mod bindings;
mod config;
mod display;
mod encoder;
mod error;
mod history;
mod loader;
mod logging;
mod model;
mod outcome;
mod predictor;
mod session;

pub use bindings::{BaccaratPredictor, JsModel, JsModelLoader};
pub use config::{CombinationMode, EmptyModelPolicy, PredictorConfig};
pub use display::{Banner, DisplayState};
pub use encoder::{encode, encode_symbols, EncodedInput, INPUT_SHAPE, INPUT_SIZE, WINDOW_SIZE};
pub use error::{ModelRole, PredictorError};
pub use history::HistoryStore;
pub use loader::{load_model_set, CandidateReport, CandidateStatus, LoadReport};
pub use model::{ModelLoader, ModelSet, ProbabilityModel};
pub use outcome::{Outcome, OUTCOME_COUNT};
pub use predictor::{Prediction, PredictionResult, Predictor, Score, NEUTRAL_AVERAGE};
pub use session::Session;

use wasm_bindgen::prelude::*;

/// Install a panic hook sending Rust panics to the browser console. The hook is only compiled in
/// when the `console_error_panic_hook` feature is enabled (default).
#[wasm_bindgen]
pub fn init_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Route the crate's log output to the browser console at `level` (default `info`).
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging(level: Option<String>) {
    logging::init(logging::parse_level(level.as_deref()));
}

/// Number of recent outcomes a prediction needs (5).
#[wasm_bindgen(js_name = windowSize)]
pub fn window_size() -> usize {
    WINDOW_SIZE
}

/// Model input shape, `[1, 5, 3]`.
#[wasm_bindgen(js_name = inputShape)]
pub fn input_shape() -> Vec<u32> {
    INPUT_SHAPE.iter().map(|&dim| dim as u32).collect()
}
