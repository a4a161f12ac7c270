use crate::outcome::{Outcome, OUTCOME_COUNT};

/// Number of recent outcomes fed to the models.
pub const WINDOW_SIZE: usize = 5;
/// Flattened input length (5 outcomes × 3 indicator slots = 15 entries).
pub const INPUT_SIZE: usize = WINDOW_SIZE * OUTCOME_COUNT;
/// Tensor shape expected by every model: a batch of one 5×3 window.
pub const INPUT_SHAPE: [usize; 3] = [1, WINDOW_SIZE, OUTCOME_COUNT];

/// One-hot encoded history window, laid out row-major as `[batch][step][outcome]`.
///
/// The buffer is owned by the value, so it is released as soon as the prediction that built it
/// returns, whichever way it returns.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedInput {
    data: [f32; INPUT_SIZE],
}

impl EncodedInput {
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn shape(&self) -> [usize; 3] {
        INPUT_SHAPE
    }

    /// Indicator row of the `step`-th outcome in the window.
    pub fn step(&self, step: usize) -> &[f32] {
        let start = step * OUTCOME_COUNT;
        &self.data[start..start + OUTCOME_COUNT]
    }
}

/// Encode exactly [`WINDOW_SIZE`] outcomes. Returns `None` for any other length.
pub fn encode(window: &[Outcome]) -> Option<EncodedInput> {
    if window.len() != WINDOW_SIZE {
        return None;
    }
    let mut data = [0.0; INPUT_SIZE];
    for (row, outcome) in data.chunks_exact_mut(OUTCOME_COUNT).zip(window) {
        row.copy_from_slice(&outcome.one_hot());
    }
    Some(EncodedInput { data })
}

/// Encode raw page symbols. Unrecognised symbols become an all-zero row rather than an error.
pub fn encode_symbols<S: AsRef<str>>(window: &[S]) -> Option<EncodedInput> {
    if window.len() != WINDOW_SIZE {
        return None;
    }
    let mut data = [0.0; INPUT_SIZE];
    for (row, symbol) in data.chunks_exact_mut(OUTCOME_COUNT).zip(window) {
        if let Some(outcome) = Outcome::from_symbol(symbol.as_ref()) {
            row.copy_from_slice(&outcome.one_hot());
        }
    }
    Some(EncodedInput { data })
}
