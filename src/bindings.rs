use futures::future::LocalBoxFuture;
use futures::FutureExt;
use log::{debug, warn};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

use crate::config::PredictorConfig;
use crate::display::DisplayState;
use crate::encoder::EncodedInput;
use crate::error::PredictorError;
use crate::model::{ModelLoader, ProbabilityModel};
use crate::outcome::Outcome;
use crate::session::Session;

/// Nesting accepted when unwrapping a model output, enough for `[[p]]` from a batched tensor.
const MAX_OUTPUT_DEPTH: usize = 4;

/// First scalar of whatever a JavaScript model's `predict` Promise resolved to: a number, a
/// typed array from `tensor.data()`, or a (nested) array from `tensor.array()`.
fn first_output(value: &JsValue, depth: usize) -> Option<f32> {
    if let Some(p) = value.as_f64() {
        return Some(p as f32);
    }
    if depth == 0 || !value.is_object() {
        return None;
    }
    let entries = js_sys::Array::from(value);
    if entries.length() == 0 {
        return None;
    }
    first_output(&entries.get(0), depth - 1)
}

fn describe(err: &JsValue) -> String {
    if let Some(message) = err.as_string() {
        return message;
    }
    if let Some(error) = err.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    format!("{err:?}")
}

/// A model living on the JavaScript side. The handle is either a bare `predict` function or an
/// object with `predict(data, shape)` and an optional `dispose()`.
pub struct JsModel {
    name: String,
    handle: JsValue,
    predict: js_sys::Function,
    dispose: Option<js_sys::Function>,
}

impl JsModel {
    pub fn from_handle(name: &str, handle: JsValue) -> Result<JsModel, PredictorError> {
        let not_a_model = |reason: &str| PredictorError::ModelNotFound {
            location: name.to_string(),
            reason: reason.to_string(),
        };
        if let Some(predict) = handle.dyn_ref::<js_sys::Function>() {
            return Ok(JsModel {
                name: name.to_string(),
                predict: predict.clone(),
                handle: JsValue::NULL,
                dispose: None,
            });
        }
        if !handle.is_object() {
            return Err(not_a_model("loader resolved to neither a function nor an object"));
        }
        let predict = js_sys::Reflect::get(&handle, &JsValue::from_str("predict"))
            .map_err(|err| not_a_model(&describe(&err)))?
            .dyn_into::<js_sys::Function>()
            .map_err(|_| not_a_model("handle has no predict method"))?;
        let dispose = js_sys::Reflect::get(&handle, &JsValue::from_str("dispose"))
            .ok()
            .and_then(|value| value.dyn_into::<js_sys::Function>().ok());
        Ok(JsModel {
            name: name.to_string(),
            handle,
            predict,
            dispose,
        })
    }

    fn failure(&self, reason: String) -> PredictorError {
        PredictorError::InferenceFailure {
            model: self.name.clone(),
            reason,
        }
    }

    async fn run(&self, input: &EncodedInput) -> Result<f32, PredictorError> {
        let data = js_sys::Float32Array::from(input.as_slice());
        let shape: js_sys::Array = input
            .shape()
            .iter()
            .map(|&dim| JsValue::from(dim as u32))
            .collect();

        let value = self
            .predict
            .call2(&self.handle, &data, &shape)
            .map_err(|err| self.failure(describe(&err)))?;
        let resolved = JsFuture::from(js_sys::Promise::resolve(&value))
            .await
            .map_err(|err| self.failure(describe(&err)))?;
        first_output(&resolved, MAX_OUTPUT_DEPTH)
            .ok_or_else(|| self.failure(format!("unusable model output {}", describe(&resolved))))
    }
}

impl ProbabilityModel for JsModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict<'a>(
        &'a self,
        input: &'a EncodedInput,
    ) -> LocalBoxFuture<'a, Result<f32, PredictorError>> {
        self.run(input).boxed_local()
    }
}

impl Drop for JsModel {
    fn drop(&mut self) {
        if let Some(dispose) = &self.dispose {
            if let Err(err) = dispose.call0(&self.handle) {
                warn!("disposing model {} failed: {}", self.name, describe(&err));
            }
        }
    }
}

/// Wraps the page's `(location) => Promise<handle>` loader function.
pub struct JsModelLoader {
    loader: js_sys::Function,
}

impl JsModelLoader {
    pub fn new(loader: js_sys::Function) -> Self {
        Self { loader }
    }

    async fn fetch(&self, location: &str) -> Result<Box<dyn ProbabilityModel>, PredictorError> {
        let not_found = |err: JsValue| PredictorError::ModelNotFound {
            location: location.to_string(),
            reason: describe(&err),
        };
        let value = self
            .loader
            .call1(&JsValue::NULL, &JsValue::from_str(location))
            .map_err(not_found)?;
        let handle = JsFuture::from(js_sys::Promise::resolve(&value))
            .await
            .map_err(not_found)?;
        Ok(Box::new(JsModel::from_handle(location, handle)?))
    }
}

impl ModelLoader for JsModelLoader {
    fn load<'a>(
        &'a self,
        location: &'a str,
    ) -> LocalBoxFuture<'a, Result<Box<dyn ProbabilityModel>, PredictorError>> {
        self.fetch(location).boxed_local()
    }
}

/// Serialize for the page as plain objects and arrays, never ES `Map`s or `undefined` holes.
fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(JsValue::from)
}

/// Writes the display state into the page. Missing window, document or elements are skipped.
struct DomRenderer {
    prediction_id: String,
    history_id: String,
    enabled: bool,
}

impl DomRenderer {
    fn from_config(config: &PredictorConfig) -> Self {
        Self {
            prediction_id: config.prediction_element.clone(),
            history_id: config.history_element.clone(),
            enabled: config.render_to_dom,
        }
    }

    fn render(&self, state: &DisplayState) {
        if !self.enabled {
            return;
        }
        let Some(document) = web_sys::window().and_then(|window| window.document()) else {
            return;
        };
        for (id, text) in [
            (&self.prediction_id, &state.prediction_text),
            (&self.history_id, &state.history_text),
        ] {
            match document.get_element_by_id(id) {
                Some(element) => element.set_text_content(Some(text.as_str())),
                None => debug!("element #{id} missing, not rendered"),
            }
        }
    }
}

/// Page-facing predictor: owns the session and keeps the configured elements up to date.
#[wasm_bindgen]
pub struct BaccaratPredictor {
    session: Session,
    renderer: DomRenderer,
}

#[wasm_bindgen]
impl BaccaratPredictor {
    /// Load all candidate models through `loader` and render the initial state. `config` may be
    /// `undefined` for defaults.
    pub async fn load(
        config: JsValue,
        loader: js_sys::Function,
    ) -> Result<BaccaratPredictor, JsValue> {
        let cfg: PredictorConfig = if config.is_undefined() || config.is_null() {
            PredictorConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)?
        };
        let renderer = DomRenderer::from_config(&cfg);
        let session = Session::initialise(cfg, &JsModelLoader::new(loader)).await?;
        let predictor = BaccaratPredictor { session, renderer };
        predictor.render();
        Ok(predictor)
    }

    #[wasm_bindgen(js_name = defaultConfig)]
    pub fn default_config() -> Result<JsValue, JsValue> {
        to_js(&PredictorConfig::default())
    }

    /// Append `symbol` (`P`, `B`, `T` or the full name) and resolve to the new display state.
    #[wasm_bindgen(js_name = recordOutcome)]
    pub async fn record_outcome(&mut self, symbol: String) -> Result<JsValue, JsValue> {
        let outcome: Outcome = symbol.parse()?;
        let state = self.session.on_outcome(outcome).await;
        self.renderer.render(&state);
        to_js(&state)
    }

    /// Predict from an explicit window of symbols; the recorded history is left untouched.
    #[wasm_bindgen(js_name = predictWindow)]
    pub async fn predict_window(&self, symbols: Vec<String>) -> Result<JsValue, JsValue> {
        let result = self.session.predict_symbols(&symbols).await;
        to_js(&result)
    }

    pub fn reset(&mut self) {
        self.session.reset();
        self.render();
    }

    #[wasm_bindgen(js_name = displayState)]
    pub fn display_state(&self) -> Result<JsValue, JsValue> {
        to_js(&self.session.display_state())
    }

    #[wasm_bindgen(js_name = loadReport)]
    pub fn load_report(&self) -> Result<JsValue, JsValue> {
        to_js(self.session.load_report())
    }

    #[wasm_bindgen(js_name = historyLength)]
    pub fn history_length(&self) -> usize {
        self.session.history().len()
    }

    pub fn render(&self) {
        self.renderer.render(&self.session.display_state());
    }

    /// Release every model handle and clear the page. Call on page unload.
    pub fn dispose(&mut self) {
        self.session.teardown();
        self.render();
    }
}
