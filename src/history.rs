use std::collections::VecDeque;

use crate::error::PredictorError;
use crate::outcome::Outcome;

/// Bounded record of recent outcomes, oldest first.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    entries: VecDeque<Outcome>,
    capacity: usize,
}

impl HistoryStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push `outcome` at the end, evicting the oldest entry once the bound is exceeded.
    pub fn append(&mut self, outcome: Outcome) {
        self.entries.push_back(outcome);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// The most recent `n` outcomes, oldest first.
    pub fn read_last_n(&self, n: usize) -> Result<Vec<Outcome>, PredictorError> {
        let available = self.entries.len();
        if available < n {
            return Err(PredictorError::InsufficientHistory { needed: n, available });
        }
        Ok(self.entries.iter().skip(available - n).copied().collect())
    }

    pub fn last(&self) -> Option<Outcome> {
        self.entries.back().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = Outcome> + '_ {
        self.entries.iter().copied()
    }
}
