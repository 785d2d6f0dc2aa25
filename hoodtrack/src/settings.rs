use hoodtrack_game::ExitCategory;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub enum KeyPlacement {
    Vanilla,
    OwnDungeon,
    Anywhere,
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub enum ScrubShuffle {
    Off,
    Affordable,
    Full,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct TrackerSettings {
    pub shuffle_dungeon_entrances: bool,
    pub shuffle_interior_entrances: bool,
    pub shuffle_special_interior_entrances: bool,
    pub shuffle_grotto_entrances: bool,
    pub shuffle_overworld_entrances: bool,
    pub shuffle_boss_entrances: bool,
    pub owl_drops: bool,
    pub warp_songs: bool,
    pub spawn_positions: bool,
    // All non-warp pools merged into one candidate pool.
    pub mixed_entrance_pools: bool,
    // Forward and reverse directions of a connection resolve independently.
    pub decoupled_entrances: bool,
    // Whether scrub grottos are shown as one fungible group or split out.
    pub scrub_grottos_combined: bool,
    pub shuffle_scrubs: ScrubShuffle,
    pub key_placement: KeyPlacement,
    pub free_scarecrow: bool,
    pub no_epona_race: bool,
    pub root_region: String,
    pub win_location: Option<String>,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        TrackerSettings {
            shuffle_dungeon_entrances: false,
            shuffle_interior_entrances: false,
            shuffle_special_interior_entrances: false,
            shuffle_grotto_entrances: false,
            shuffle_overworld_entrances: false,
            shuffle_boss_entrances: false,
            owl_drops: false,
            warp_songs: false,
            spawn_positions: false,
            mixed_entrance_pools: false,
            decoupled_entrances: false,
            scrub_grottos_combined: true,
            shuffle_scrubs: ScrubShuffle::Off,
            key_placement: KeyPlacement::OwnDungeon,
            free_scarecrow: false,
            no_epona_race: false,
            root_region: "Root".to_string(),
            win_location: None,
        }
    }
}

impl TrackerSettings {
    // Which static-table categories are actually shuffled under these
    // settings. Special graves only join the pool when both grottos and
    // special interiors are shuffled.
    pub fn shuffled_categories(&self) -> Vec<ExitCategory> {
        let mut categories = vec![];
        if self.shuffle_dungeon_entrances {
            categories.push(ExitCategory::Dungeon);
        }
        if self.shuffle_interior_entrances {
            categories.push(ExitCategory::Interior);
        }
        if self.shuffle_special_interior_entrances {
            categories.push(ExitCategory::SpecialInterior);
        }
        if self.shuffle_grotto_entrances {
            categories.push(ExitCategory::Grotto);
            categories.push(ExitCategory::Grave);
        }
        if self.shuffle_overworld_entrances {
            categories.push(ExitCategory::Overworld);
        }
        if self.shuffle_boss_entrances {
            categories.push(ExitCategory::BossDoor);
        }
        if self.owl_drops {
            categories.push(ExitCategory::OwlDrop);
        }
        if self.warp_songs {
            categories.push(ExitCategory::WarpSong);
        }
        if self.spawn_positions {
            categories.push(ExitCategory::Spawn);
        }
        if self.shuffle_grotto_entrances && self.shuffle_special_interior_entrances {
            categories.push(ExitCategory::SpecialGrave);
        }
        categories
    }

    pub fn all_keys_pass_enabled(&self) -> bool {
        self.key_placement != KeyPlacement::Anywhere
    }
}
