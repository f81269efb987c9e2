use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BattleRules {
    pub rounds_per_side: usize,
}

impl BattleRules {
    /// Total verses in a battle, both sides together.
    pub fn verse_budget(&self) -> usize {
        self.rounds_per_side * 2
    }
}

impl Default for BattleRules {
    fn default() -> Self {
        Self { rounds_per_side: 3 }
    }
}
