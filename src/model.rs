use futures::future::LocalBoxFuture;

use crate::encoder::EncodedInput;
use crate::error::PredictorError;

/// Opaque inference capability: given the fixed-shape encoded window, produce one probability.
///
/// Futures are `!Send`; everything runs on the page's single event loop.
pub trait ProbabilityModel {
    /// Location the model was loaded from, used in log lines and errors.
    fn name(&self) -> &str;

    fn predict<'a>(
        &'a self,
        input: &'a EncodedInput,
    ) -> LocalBoxFuture<'a, Result<f32, PredictorError>>;
}

/// Resolves a location (path or URL) to a loaded model.
pub trait ModelLoader {
    fn load<'a>(
        &'a self,
        location: &'a str,
    ) -> LocalBoxFuture<'a, Result<Box<dyn ProbabilityModel>, PredictorError>>;
}

/// Models held for the lifetime of a session.
#[derive(Default)]
pub struct ModelSet {
    pub tie: Option<Box<dyn ProbabilityModel>>,
    pub ensemble: Vec<Box<dyn ProbabilityModel>>,
}

impl ModelSet {
    pub fn new(
        tie: Option<Box<dyn ProbabilityModel>>,
        ensemble: Vec<Box<dyn ProbabilityModel>>,
    ) -> Self {
        Self { tie, ensemble }
    }

    pub fn is_empty(&self) -> bool {
        self.tie.is_none() && self.ensemble.is_empty()
    }

    pub fn has_tie_model(&self) -> bool {
        self.tie.is_some()
    }

    pub fn ensemble_len(&self) -> usize {
        self.ensemble.len()
    }
}

impl std::fmt::Debug for ModelSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSet")
            .field("tie", &self.tie.as_ref().map(|m| m.name()))
            .field("ensemble", &self.ensemble.iter().map(|m| m.name()).collect::<Vec<_>>())
            .finish()
    }
}

/// In-memory models and loaders shared by the unit tests.
#[cfg(test)]
pub(crate) mod testing {
    use std::cell::Cell;
    use std::collections::HashMap;
    use std::rc::Rc;

    use futures::FutureExt;

    use super::*;

    /// Returns a fixed output, or fails when `output` is `None`. Counts its calls.
    pub struct FixedModel {
        pub name: String,
        pub output: Option<f32>,
        pub calls: Rc<Cell<usize>>,
    }

    impl FixedModel {
        pub fn boxed(output: f32) -> Box<dyn ProbabilityModel> {
            Box::new(Self::new("fixed", Some(output)))
        }

        pub fn failing() -> Box<dyn ProbabilityModel> {
            Box::new(Self::new("failing", None))
        }

        pub fn new(name: &str, output: Option<f32>) -> Self {
            Self {
                name: name.to_string(),
                output,
                calls: Rc::new(Cell::new(0)),
            }
        }
    }

    impl ProbabilityModel for FixedModel {
        fn name(&self) -> &str {
            &self.name
        }

        fn predict<'a>(
            &'a self,
            _input: &'a EncodedInput,
        ) -> LocalBoxFuture<'a, Result<f32, PredictorError>> {
            self.calls.set(self.calls.get() + 1);
            let result = self.output.ok_or_else(|| PredictorError::InferenceFailure {
                model: self.name.clone(),
                reason: "synthetic failure".to_string(),
            });
            async move { result }.boxed_local()
        }
    }

    /// Serves `FixedModel`s for known locations and `ModelNotFound` for everything else.
    #[derive(Default)]
    pub struct MapLoader {
        pub outputs: HashMap<String, f32>,
        pub attempts: std::cell::RefCell<Vec<String>>,
    }

    impl MapLoader {
        pub fn with(entries: &[(&str, f32)]) -> Self {
            Self {
                outputs: entries.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
                attempts: Default::default(),
            }
        }
    }

    impl ModelLoader for MapLoader {
        fn load<'a>(
            &'a self,
            location: &'a str,
        ) -> LocalBoxFuture<'a, Result<Box<dyn ProbabilityModel>, PredictorError>> {
            self.attempts.borrow_mut().push(location.to_string());
            let result = match self.outputs.get(location) {
                Some(output) => {
                    let model: Box<dyn ProbabilityModel> =
                        Box::new(FixedModel::new(location, Some(*output)));
                    Ok(model)
                }
                None => Err(PredictorError::ModelNotFound {
                    location: location.to_string(),
                    reason: "404".to_string(),
                }),
            };
            async move { result }.boxed_local()
        }
    }
}
