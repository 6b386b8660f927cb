// Repetition tracking
//
// Each player keeps a short, capped list of the positions they produced. The
// search consults it to push repeating moves to the back of the ordering and
// the evaluator turns matches into a score penalty; nothing is ever forbidden.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::config::LoopDetectionConfig;
use crate::types::Player;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopDetector {
    capacity: usize,
    window: usize,
    recency_weight: i32,
    histories: [VecDeque<u64>; 2],
}

impl LoopDetector {
    pub fn new(capacity: usize, window: usize, recency_weight: i32) -> Self {
        LoopDetector {
            capacity: capacity.max(1),
            window: window.max(1),
            recency_weight: recency_weight.max(0),
            histories: [VecDeque::new(), VecDeque::new()],
        }
    }

    pub fn from_config(config: &LoopDetectionConfig) -> Self {
        Self::new(
            config.history_capacity,
            config.window,
            config.recency_weight,
        )
    }

    /// Records a position produced by `player`, evicting the oldest past the cap
    pub fn register(&mut self, player: Player, fingerprint: u64) {
        let history = &mut self.histories[player.index()];
        history.push_back(fingerprint);
        while history.len() > self.capacity {
            history.pop_front();
        }
    }

    /// Penalty for `player` producing `fingerprint` again.
    ///
    /// Each match among the last `window` entries adds
    /// `1 + recency_weight * (window - 1 - age)`, where age 0 is the most
    /// recent entry. Adding a match never lowers the result.
    pub fn penalty(&self, player: Player, fingerprint: u64) -> i32 {
        self.histories[player.index()]
            .iter()
            .rev()
            .take(self.window)
            .enumerate()
            .filter(|(_, &fp)| fp == fingerprint)
            .map(|(age, _)| 1 + self.recency_weight * (self.window - 1 - age) as i32)
            .sum()
    }

    pub fn history(&self, player: Player) -> &VecDeque<u64> {
        &self.histories[player.index()]
    }

    pub fn clear(&mut self) {
        for history in self.histories.iter_mut() {
            history.clear();
        }
    }
}
