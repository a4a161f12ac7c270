use log::{debug, warn};
use serde::Serialize;

use crate::config::{CombinationMode, EmptyModelPolicy, PredictorConfig};
use crate::encoder::{self, EncodedInput, WINDOW_SIZE};
use crate::model::{ModelSet, ProbabilityModel};
use crate::outcome::{Outcome, OUTCOME_COUNT};

/// Ensemble average used when no Player/Banker model produced an output.
pub const NEUTRAL_AVERAGE: f32 = 0.5;

/// Strength attached to a predicted label; the variant follows [`CombinationMode`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Score {
    Confidence(f32),
    /// `[P(Player), P(Banker), P(Tie)]`.
    Probabilities([f32; OUTCOME_COUNT]),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub label: Outcome,
    pub score: Score,
    /// Tie model output, or `None` when no tie model answered.
    pub tie_probability: Option<f32>,
    /// Mean Player probability over the members that answered; `None` when not consulted.
    pub ensemble_average: Option<f32>,
    /// Ensemble members whose output went into the average.
    pub ensemble_used: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PredictionResult {
    NotReady { needed: usize, available: usize },
    Ready(Prediction),
}

/// Combines tie gating with the Player/Banker ensemble average.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Predictor {
    pub tie_threshold: f32,
    pub mode: CombinationMode,
    pub empty_model_policy: EmptyModelPolicy,
}

impl Default for Predictor {
    fn default() -> Self {
        Self::from_config(&PredictorConfig::default())
    }
}

impl Predictor {
    pub fn from_config(config: &PredictorConfig) -> Self {
        Self {
            tie_threshold: config.tie_threshold,
            mode: config.combination,
            empty_model_policy: config.empty_model_policy,
        }
    }

    /// Predict the next outcome from the last [`WINDOW_SIZE`] entries of `recent`. Shorter inputs
    /// yield [`PredictionResult::NotReady`] without touching any model.
    pub async fn predict(&self, models: &ModelSet, recent: &[Outcome]) -> PredictionResult {
        if recent.len() < WINDOW_SIZE {
            return PredictionResult::NotReady {
                needed: WINDOW_SIZE,
                available: recent.len(),
            };
        }
        let window = &recent[recent.len() - WINDOW_SIZE..];
        let last = window.last().copied();
        match encoder::encode(window) {
            Some(input) => {
                PredictionResult::Ready(self.predict_encoded(models, &input, last).await)
            }
            None => PredictionResult::NotReady {
                needed: WINDOW_SIZE,
                available: window.len(),
            },
        }
    }

    /// Run the combination policy on an already encoded window. `last` is the most recent
    /// outcome, used by [`EmptyModelPolicy::RepeatLast`]; without it that policy degrades to
    /// the neutral ensemble.
    pub async fn predict_encoded(
        &self,
        models: &ModelSet,
        input: &EncodedInput,
        last: Option<Outcome>,
    ) -> Prediction {
        if models.is_empty() && self.empty_model_policy == EmptyModelPolicy::RepeatLast {
            if let Some(label) = last {
                debug!("no models loaded, repeating last outcome {label}");
                return Prediction {
                    label,
                    score: self.zero_score(),
                    tie_probability: None,
                    ensemble_average: None,
                    ensemble_used: 0,
                };
            }
        }

        let tie_probability = match &models.tie {
            Some(model) => evaluate(model.as_ref(), input).await,
            None => None,
        };
        if let Some(tie) = tie_probability {
            if tie >= self.tie_threshold {
                debug!("tie probability {tie:.3} >= {:.3}, ensemble skipped", self.tie_threshold);
                return Prediction {
                    label: Outcome::Tie,
                    score: match self.mode {
                        CombinationMode::Confidence => Score::Confidence(tie),
                        CombinationMode::Probabilities => Score::Probabilities([0.0, 0.0, tie]),
                    },
                    tie_probability,
                    ensemble_average: None,
                    ensemble_used: 0,
                };
            }
        }

        let mut sum = 0.0;
        let mut used = 0usize;
        for model in &models.ensemble {
            if let Some(p) = evaluate(model.as_ref(), input).await {
                sum += p;
                used += 1;
            }
        }
        let average = if used == 0 { NEUTRAL_AVERAGE } else { sum / used as f32 };

        let (label, score) = match self.mode {
            CombinationMode::Confidence => {
                if average >= NEUTRAL_AVERAGE {
                    (Outcome::Player, Score::Confidence(average))
                } else {
                    (Outcome::Banker, Score::Confidence(1.0 - average))
                }
            }
            CombinationMode::Probabilities => {
                let tie = tie_probability.unwrap_or(0.0);
                let probs = [average * (1.0 - tie), (1.0 - average) * (1.0 - tie), tie];
                (arg_max(&probs), Score::Probabilities(probs))
            }
        };
        Prediction {
            label,
            score,
            tie_probability,
            ensemble_average: Some(average),
            ensemble_used: used,
        }
    }

    fn zero_score(&self) -> Score {
        match self.mode {
            CombinationMode::Confidence => Score::Confidence(0.0),
            CombinationMode::Probabilities => Score::Probabilities([0.0; OUTCOME_COUNT]),
        }
    }
}

/// Evaluate one model, turning failures and non-finite outputs into `None`.
async fn evaluate(model: &dyn ProbabilityModel, input: &EncodedInput) -> Option<f32> {
    match model.predict(input).await {
        Ok(p) if p.is_finite() => Some(p),
        Ok(p) => {
            warn!("model {} returned non-finite output {p}, skipped", model.name());
            None
        }
        Err(err) => {
            warn!("{err}, skipped");
            None
        }
    }
}

/// Index of the largest entry; earlier slots win ties, so Player beats Banker beats Tie.
fn arg_max(probs: &[f32; OUTCOME_COUNT]) -> Outcome {
    let mut best = 0;
    for (idx, p) in probs.iter().enumerate().skip(1) {
        if *p > probs[best] {
            best = idx;
        }
    }
    Outcome::from_index(best).unwrap_or(Outcome::Player)
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;
    use futures::executor::block_on;

    use super::*;
    use crate::model::testing::FixedModel;
    use Outcome::{Banker as B, Player as P, Tie as T};

    fn predictor(mode: CombinationMode) -> Predictor {
        Predictor {
            mode,
            ..Predictor::default()
        }
    }

    fn ready(result: PredictionResult) -> Prediction {
        match result {
            PredictionResult::Ready(prediction) => prediction,
            other => panic!("expected a prediction, got {other:?}"),
        }
    }

    fn confidence(prediction: &Prediction) -> f32 {
        match prediction.score {
            Score::Confidence(c) => c,
            other => panic!("expected confidence, got {other:?}"),
        }
    }

    #[test]
    fn short_history_is_not_ready_and_skips_models() {
        let tie = FixedModel::new("tie", Some(0.9));
        let member = FixedModel::new("pb", Some(0.6));
        let tie_calls = tie.calls.clone();
        let member_calls = member.calls.clone();
        let tie: Box<dyn ProbabilityModel> = Box::new(tie);
        let member: Box<dyn ProbabilityModel> = Box::new(member);
        let models = ModelSet::new(Some(tie), vec![member]);
        for len in 0..WINDOW_SIZE {
            let history = vec![P; len];
            let result = block_on(Predictor::default().predict(&models, &history));
            assert_eq!(result, PredictionResult::NotReady { needed: 5, available: len });
        }
        assert_eq!(tie_calls.get(), 0);
        assert_eq!(member_calls.get(), 0);
    }

    #[test]
    fn unanimous_ensemble_without_tie_model() {
        let models = ModelSet::new(None, (0..5).map(|_| FixedModel::boxed(0.6)).collect());
        let prediction = ready(block_on(
            predictor(CombinationMode::Confidence).predict(&models, &[P, B, P, B, P]),
        ));
        assert_eq!(prediction.label, P);
        assert_approx_eq!(confidence(&prediction), 0.6, 1e-6);
        assert_eq!(prediction.tie_probability, None);
        assert_eq!(prediction.ensemble_used, 5);
    }

    #[test]
    fn tie_gate_short_circuits_ensemble() {
        let member = FixedModel::new("pb", Some(0.9));
        let member_calls = member.calls.clone();
        let member: Box<dyn ProbabilityModel> = Box::new(member);
        let models = ModelSet::new(Some(FixedModel::boxed(0.35)), vec![member]);

        let prediction = ready(block_on(
            predictor(CombinationMode::Confidence).predict(&models, &[T, T, P, B, T]),
        ));
        assert_eq!(prediction.label, T);
        assert_approx_eq!(confidence(&prediction), 0.35, 1e-6);
        assert_eq!(member_calls.get(), 0);

        let prediction = ready(block_on(
            predictor(CombinationMode::Probabilities).predict(&models, &[T, T, P, B, T]),
        ));
        assert_eq!(prediction.label, T);
        assert_eq!(prediction.score, Score::Probabilities([0.0, 0.0, 0.35]));
    }

    #[test]
    fn tie_at_threshold_counts_as_tie() {
        let models = ModelSet::new(Some(FixedModel::boxed(0.2)), vec![FixedModel::boxed(0.99)]);
        let prediction = ready(block_on(Predictor::default().predict(&models, &[P, P, P, P, P])));
        assert_eq!(prediction.label, T);
    }

    #[test]
    fn missing_tie_model_never_gates_even_at_zero_threshold() {
        let models = ModelSet::new(None, vec![FixedModel::boxed(0.3)]);
        let predictor = Predictor {
            tie_threshold: 0.0,
            mode: CombinationMode::Confidence,
            ..Predictor::default()
        };
        let prediction = ready(block_on(predictor.predict(&models, &[T, T, T, T, T])));
        assert_eq!(prediction.label, B);
        assert_approx_eq!(confidence(&prediction), 0.7, 1e-6);
    }

    #[test]
    fn failed_members_are_excluded_from_average() {
        let models = ModelSet::new(
            None,
            vec![
                FixedModel::boxed(0.9),
                FixedModel::failing(),
                FixedModel::boxed(0.3),
                FixedModel::failing(),
                FixedModel::boxed(0.6),
            ],
        );
        let prediction = ready(block_on(
            predictor(CombinationMode::Confidence).predict(&models, &[P, B, P, B, P]),
        ));
        assert_eq!(prediction.ensemble_used, 3);
        assert_approx_eq!(prediction.ensemble_average.unwrap(), 0.6, 1e-6);
        assert_eq!(prediction.label, P);
    }

    #[test]
    fn non_finite_outputs_are_excluded() {
        let models = ModelSet::new(None, vec![FixedModel::boxed(f32::NAN), FixedModel::boxed(0.2)]);
        let prediction = ready(block_on(
            predictor(CombinationMode::Confidence).predict(&models, &[P, B, P, B, P]),
        ));
        assert_eq!(prediction.ensemble_used, 1);
        assert_eq!(prediction.label, B);
        assert_approx_eq!(confidence(&prediction), 0.8, 1e-6);
    }

    #[test]
    fn all_members_failing_defaults_to_player() {
        let models = ModelSet::new(None, vec![FixedModel::failing(), FixedModel::failing()]);
        let prediction = ready(block_on(
            predictor(CombinationMode::Confidence).predict(&models, &[B, B, B, B, B]),
        ));
        assert_eq!(prediction.ensemble_average, Some(0.5));
        assert_eq!(prediction.label, P);
        assert_approx_eq!(confidence(&prediction), 0.5, 1e-6);
    }

    #[test]
    fn failing_tie_model_is_treated_as_absent() {
        let models = ModelSet::new(Some(FixedModel::failing()), vec![FixedModel::boxed(0.4)]);
        let prediction = ready(block_on(Predictor::default().predict(&models, &[P, B, P, B, P])));
        assert_eq!(prediction.tie_probability, None);
        assert_eq!(prediction.label, B);
        match prediction.score {
            Score::Probabilities([p, b, t]) => {
                assert_approx_eq!(p, 0.4, 1e-6);
                assert_approx_eq!(b, 0.6, 1e-6);
                assert_approx_eq!(t, 0.0, 1e-6);
            }
            other => panic!("expected probabilities, got {other:?}"),
        }
    }

    #[test]
    fn probabilities_mode_scales_by_tie_complement() {
        let models = ModelSet::new(
            Some(FixedModel::boxed(0.1)),
            vec![FixedModel::boxed(0.7), FixedModel::boxed(0.5)],
        );
        let prediction = ready(block_on(Predictor::default().predict(&models, &[P, B, P, B, P])));
        assert_eq!(prediction.label, P);
        match prediction.score {
            Score::Probabilities([p, b, t]) => {
                assert_approx_eq!(p, 0.54, 1e-6);
                assert_approx_eq!(b, 0.36, 1e-6);
                assert_approx_eq!(t, 0.1, 1e-6);
            }
            other => panic!("expected probabilities, got {other:?}"),
        }
    }

    #[test]
    fn probabilities_mode_can_pick_tie_below_high_threshold() {
        let models = ModelSet::new(Some(FixedModel::boxed(0.4)), vec![FixedModel::boxed(0.5)]);
        let predictor = Predictor {
            tie_threshold: 0.9,
            ..Predictor::default()
        };
        let prediction = ready(block_on(predictor.predict(&models, &[P, B, P, B, P])));
        // 0.3 / 0.3 / 0.4
        assert_eq!(prediction.label, T);
    }

    #[test]
    fn empty_model_set_repeats_last_outcome() {
        let models = ModelSet::default();
        let prediction = ready(block_on(
            predictor(CombinationMode::Confidence)
                .predict(&models, &[P, P, P, P, P, B, T, B, P, T]),
        ));
        assert_eq!(prediction.label, T);
        assert_eq!(prediction.score, Score::Confidence(0.0));

        let prediction = ready(block_on(Predictor::default().predict(&models, &[P, P, P, P, B])));
        assert_eq!(prediction.label, B);
        assert_eq!(prediction.score, Score::Probabilities([0.0, 0.0, 0.0]));
    }

    #[test]
    fn empty_model_set_with_neutral_policy_resolves_to_player() {
        let predictor = Predictor {
            empty_model_policy: EmptyModelPolicy::Neutral,
            ..Predictor::default()
        };
        let prediction = ready(block_on(predictor.predict(&ModelSet::default(), &[B, B, B, B, B])));
        assert_eq!(prediction.label, P);
        assert_eq!(prediction.score, Score::Probabilities([0.5, 0.5, 0.0]));
    }

    #[test]
    fn predict_encoded_without_last_uses_neutral_ensemble() {
        let input = encoder::encode_symbols(&["?", "?", "?", "?", "?"]).unwrap();
        let models = ModelSet::default();
        let prediction = block_on(Predictor::default().predict_encoded(&models, &input, None));
        assert_eq!(prediction.label, P);
        assert_eq!(prediction.ensemble_average, Some(0.5));
    }
}
