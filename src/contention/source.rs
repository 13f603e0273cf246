//! Shared resource sources (food) placed on the map

use serde::{Deserialize, Serialize};

use crate::core::types::{CellKey, SourceId};

/// A place that yields a fixed amount of food each tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSource {
    pub id: SourceId,
    pub cell: CellKey,
    /// Food produced per tick, split among every population that can reach it
    pub total_output: f32,
}

impl ResourceSource {
    pub fn new(id: SourceId, cell: CellKey, total_output: f32) -> Self {
        Self {
            id,
            cell,
            total_output: total_output.max(0.0),
        }
    }
}

/// Per-tick bookkeeping for one source
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct SourceLedger {
    /// Food not yet taken this tick
    pub remaining_output: f32,
    /// Dominance of contenders that reach this source and have not yet been
    /// processed this tick
    pub remaining_budget: f32,
    /// Food handed out this tick
    pub taken: f32,
}

impl SourceLedger {
    /// Take up to `amount`, returning what was actually taken
    pub fn take(&mut self, amount: f32) -> f32 {
        let taken = amount.min(self.remaining_output).max(0.0);
        self.remaining_output = (self.remaining_output - taken).max(0.0);
        self.taken += taken;
        taken
    }

    /// Remove a processed contender's dominance from the budget
    pub fn release_budget(&mut self, dominance: f32) {
        self.remaining_budget = (self.remaining_budget - dominance).max(0.0);
    }
}
