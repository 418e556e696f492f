//! Bounded in-memory log: keeps the most recent turns, drops the oldest.

use std::collections::VecDeque;
use ragsmith_core::{ConversationLog, ConversationTurn};
use tracing::trace;

/// Default number of turns retained.
pub const DEFAULT_CAPACITY: usize = 50;

/// A ring of at most `capacity` turns.
#[derive(Debug, Clone)]
pub struct BoundedConversationLog {
    turns: VecDeque<ConversationTurn>,
    capacity: usize,
}

impl BoundedConversationLog {
    /// Create a log holding at most `capacity` turns (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            turns: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate over every held turn, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }
}

impl Default for BoundedConversationLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ConversationLog for BoundedConversationLog {
    fn append(&mut self, turn: ConversationTurn) {
        if self.turns.len() == self.capacity {
            self.turns.pop_front();
            trace!(capacity = self.capacity, "History full, dropped oldest turn");
        }
        self.turns.push_back(turn);
    }

    fn recent(&self, n: usize) -> Vec<ConversationTurn> {
        let skip = self.turns.len().saturating_sub(n);
        self.turns.iter().skip(skip).cloned().collect()
    }

    fn len(&self) -> usize {
        self.turns.len()
    }

    fn clear(&mut self) {
        self.turns.clear();
    }
}
