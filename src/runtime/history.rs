//! History ledger
//!
//! A zipper over the actions of one event run: `history` (past, oldest
//! first), `present` (the action mirrored into live state) and `future`
//! (next action first).

use std::collections::VecDeque;

use crate::types::Action;

/// Three-part zipper over recorded actions
#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    history: VecDeque<Action>,
    present: Option<Action>,
    future: VecDeque<Action>,
    /// Maximum number of past actions to keep
    capacity: usize,
    /// Number of advances minus retreats since the last reset
    step: usize,
}

impl Ledger {
    /// Create a ledger keeping at most `capacity` past actions
    pub fn new(capacity: usize) -> Self {
        Self {
            history: VecDeque::new(),
            present: None,
            future: VecDeque::new(),
            capacity: capacity.max(1),
            step: 0,
        }
    }

    /// Replace the future wholesale
    pub fn set_future(&mut self, actions: Vec<Action>) {
        self.future = actions.into();
    }

    /// Go forward one action. Returns false when the future is empty.
    pub fn advance(&mut self) -> bool {
        let Some(next) = self.future.pop_front() else {
            return false;
        };
        if let Some(present) = self.present.take() {
            self.history.push_back(present);
            if self.history.len() > self.capacity {
                self.history.pop_front();
            }
        }
        self.present = Some(next);
        self.step += 1;
        true
    }

    /// Go back one action. Returns false when there is no past.
    pub fn retreat(&mut self) -> bool {
        let Some(previous) = self.history.pop_back() else {
            return false;
        };
        if let Some(present) = self.present.take() {
            self.future.push_front(present);
        }
        self.present = Some(previous);
        self.step = self.step.saturating_sub(1);
        true
    }

    pub fn current(&self) -> Option<&Action> {
        self.present.as_ref()
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.present = None;
        self.future.clear();
        self.step = 0;
    }

    pub fn can_retreat(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn can_advance(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.present.is_none() && self.history.is_empty() && self.future.is_empty()
    }

    /// Position of `present` counted from the start of the run, 1-based
    pub fn step(&self) -> usize {
        self.step
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn future_len(&self) -> usize {
        self.future.len()
    }

    /// The last `n` past actions, oldest first
    pub fn tail(&self, n: usize) -> Vec<Action> {
        let skip = self.history.len().saturating_sub(n);
        self.history.iter().skip(skip).cloned().collect()
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(10_000)
    }
}
