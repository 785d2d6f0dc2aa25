use hoodtrack_game::{Count, ItemId, WorldModel};
use serde::{Deserialize, Serialize};

// Multiset of held items and triggered events, indexed by ItemId. This is
// the state every access rule is evaluated against. It only ever grows
// within one solve; external inventory changes rebuild it from scratch.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgressionState {
    counts: Vec<Count>,
}

impl ProgressionState {
    pub fn new(world: &WorldModel) -> Self {
        ProgressionState {
            counts: vec![0; world.item_isv.keys.len()],
        }
    }

    pub fn count(&self, item: ItemId) -> Count {
        self.counts[item]
    }

    pub fn has(&self, item: ItemId, count: Count) -> bool {
        self.counts[item] >= count
    }

    // Grant an item directly, without applying aliases. Used by the solver
    // for event items and by the all-keys pass.
    pub fn grant(&mut self, item: ItemId, count: Count) {
        self.counts[item] += count;
    }

    pub fn set_count(&mut self, item: ItemId, count: Count) {
        self.counts[item] = count;
    }

    // Collect a player-visible item, also granting whatever the alias table
    // says it implies (e.g. holding a shield implies its "buy" variant).
    pub fn collect(&mut self, world: &WorldModel, item: ItemId, count: Count) {
        self.counts[item] += count;
        for &(held, implied) in &world.item_aliases {
            if held == item {
                self.counts[implied] += count;
            }
        }
    }

    // Superset-or-equal comparison, used by the monotonicity checks.
    pub fn covers(&self, other: &ProgressionState) -> bool {
        self.counts
            .iter()
            .zip(other.counts.iter())
            .all(|(a, b)| a >= b)
    }
}
