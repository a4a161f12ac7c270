use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PredictorError;

/// Number of distinct round results (Player, Banker, Tie).
pub const OUTCOME_COUNT: usize = 3;

/// Result of a single round. The discriminant doubles as the index of the outcome's slot in the
/// one-hot indicator and in three-way probability vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    #[serde(rename = "P", alias = "Player")]
    Player = 0,
    #[serde(rename = "B", alias = "Banker")]
    Banker = 1,
    #[serde(rename = "T", alias = "Tie")]
    Tie = 2,
}

impl Outcome {
    pub const ALL: [Outcome; OUTCOME_COUNT] = [Outcome::Player, Outcome::Banker, Outcome::Tie];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub const fn from_index(index: usize) -> Option<Outcome> {
        match index {
            0 => Some(Outcome::Player),
            1 => Some(Outcome::Banker),
            2 => Some(Outcome::Tie),
            _ => None,
        }
    }

    /// Single-letter symbol used by the page and the history display.
    pub const fn symbol(self) -> &'static str {
        match self {
            Outcome::Player => "P",
            Outcome::Banker => "B",
            Outcome::Tie => "T",
        }
    }

    /// Parse a short (`P`) or long (`player`) symbol, ignoring case.
    pub fn from_symbol(symbol: &str) -> Option<Outcome> {
        let symbol = symbol.trim();
        Outcome::ALL.into_iter().find(|outcome| {
            symbol.eq_ignore_ascii_case(outcome.symbol())
                || symbol.eq_ignore_ascii_case(outcome.name())
        })
    }

    pub const fn name(self) -> &'static str {
        match self {
            Outcome::Player => "Player",
            Outcome::Banker => "Banker",
            Outcome::Tie => "Tie",
        }
    }

    /// Indicator vector in the fixed `[Player, Banker, Tie]` order.
    pub fn one_hot(self) -> [f32; OUTCOME_COUNT] {
        let mut indicator = [0.0; OUTCOME_COUNT];
        indicator[self.index()] = 1.0;
        indicator
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Outcome {
    type Err = PredictorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Outcome::from_symbol(s).ok_or_else(|| PredictorError::UnknownOutcome(s.to_string()))
    }
}
