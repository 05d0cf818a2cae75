use std::collections::VecDeque;

use super::status::EvaluationResult;

pub const MAX_HISTORY_CAPACITY: usize = u8::MAX as usize;

/// Bounded FIFO of the most recent results, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryRing {
    entries: VecDeque<EvaluationResult>,
    capacity: usize,
}

impl HistoryRing {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.min(MAX_HISTORY_CAPACITY);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn from_entries(capacity: usize, entries: Vec<EvaluationResult>) -> Self {
        let mut ring = Self::with_capacity(capacity);
        for entry in entries {
            ring.append(entry);
        }
        ring
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn append(&mut self, result: EvaluationResult) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(result);
    }

    /// Shrinking drops the oldest entries right away; growing never brings them back.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.min(MAX_HISTORY_CAPACITY);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn snapshot(&self) -> Vec<EvaluationResult> {
        self.entries.iter().cloned().collect()
    }
}
