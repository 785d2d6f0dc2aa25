#![allow(dead_code)]

use hoodtrack::settings::TrackerSettings;
use hoodtrack::tracker::Tracker;

// A small world exercising every connection class and rule form: two-way
// overworld links (one with an asymmetric reverse side), fungible grottos,
// an interior, a keyed dungeon with a boss door, a spawn point, time-of-day
// and age gates, and an event item chain.
pub const WORLD: &str = r#"
{
    "regions": [
        {
            "region_name": "Root",
            "exits": {"Hyrule Field": true}
        },
        {
            "region_name": "Hyrule Field",
            "provides_time": "day",
            "exits": {
                "Kakariko Village": true,
                "Zora River": true,
                "Lake Hylia": {"age": "adult"},
                "Grotto A": true,
                "Deku Tree Lobby": true
            },
            "locations": {
                "HF Ocarina": true,
                "Rescue Zelda": {"kind": "event", "rule": true}
            }
        },
        {
            "region_name": "Kakariko Village",
            "exits": {
                "Hyrule Field": true,
                "Grotto B": true,
                "Shooting Gallery": true,
                "Death Mountain Trail": true
            },
            "locations": {
                "Show Letter": {"kind": "event", "rule": true},
                "Open Gate Chest": {"rule": "Zelda's Letter"},
                "Sun Fairy": {"rule": {"at": "day"}},
                "Dampe Dig": {"rule": {"at": "dampe"}},
                "Adult Roof Chest": {"rule": {"age": "adult"}},
                "Shield Check": {"rule": "Buy Deku Shield"}
            }
        },
        {
            "region_name": "Death Mountain Trail",
            "exits": {"Kakariko Village": true}
        },
        {
            "region_name": "Zora River",
            "exits": {"Zora River Front": true}
        },
        {
            "region_name": "Zora River Front",
            "exits": {"Hyrule Field": true, "Zora River": true}
        },
        {
            "region_name": "Lake Hylia",
            "exits": {"Hyrule Field": true}
        },
        {
            "region_name": "Grotto A",
            "exits": {"Hyrule Field": true},
            "locations": {
                "Grotto A Chest": {"rule": true, "tags": ["Grottos"]}
            }
        },
        {
            "region_name": "Grotto B",
            "exits": {"Kakariko Village": true},
            "locations": {
                "Grotto B Scrub": {"rule": true, "tags": ["Deku Scrub"]}
            }
        },
        {
            "region_name": "Shooting Gallery",
            "exits": {"Kakariko Village": true},
            "locations": {
                "Gallery Prize": true
            }
        },
        {
            "region_name": "Deku Tree Lobby",
            "dungeon": "Deku Tree",
            "exits": {
                "Hyrule Field": true,
                "Deku Tree Basement": {"item": "Small Key (Deku Tree)"}
            },
            "locations": {
                "Deku Tree Map Chest": true
            }
        },
        {
            "region_name": "Deku Tree Basement",
            "dungeon": "Deku Tree",
            "exits": {"Deku Tree Lobby": true, "Gohma Lair": true},
            "locations": {
                "Deku Tree Basement Chest": true
            }
        },
        {
            "region_name": "Gohma Lair",
            "exits": {"Deku Tree Basement": true}
        }
    ],
    "item_aliases": {
        "Deku Shield": "Buy Deku Shield"
    },
    "item_events": {
        "Show Letter": "Zelda's Letter"
    },
    "win_location": "Rescue Zelda",
    "small_keys": {
        "Small Key (Deku Tree)": 1
    },
    "equipment": {
        "Deku Shield": 1,
        "Kokiri Sword": 1,
        "Progressive Wallet": 2,
        "Small Key (Deku Tree)": 1
    }
}
"#;

pub const TABLE: &str = r#"
[
    {"category": "Overworld",
     "forward": "Hyrule Field -> Kakariko Village",
     "reverse": "Kakariko Village -> Hyrule Field"},
    {"category": "Overworld",
     "forward": "Hyrule Field -> Zora River",
     "reverse": "Zora River Front -> Hyrule Field"},
    {"category": "Overworld",
     "forward": "Hyrule Field -> Lake Hylia",
     "reverse": "Lake Hylia -> Hyrule Field"},
    {"category": "Grotto",
     "forward": "Hyrule Field -> Grotto A",
     "reverse": "Grotto A -> Hyrule Field",
     "grotto_kind": "generic_grotto"},
    {"category": "Grotto",
     "forward": "Kakariko Village -> Grotto B",
     "reverse": "Grotto B -> Kakariko Village",
     "grotto_kind": "generic_grotto"},
    {"category": "OwlDrop",
     "forward": "Death Mountain Trail -> Kakariko Village"},
    {"category": "Interior",
     "forward": "Kakariko Village -> Shooting Gallery",
     "reverse": "Shooting Gallery -> Kakariko Village"},
    {"category": "Dungeon",
     "forward": "Hyrule Field -> Deku Tree Lobby",
     "reverse": "Deku Tree Lobby -> Hyrule Field"},
    {"category": "BossDoor",
     "forward": "Deku Tree Basement -> Gohma Lair",
     "reverse": "Gohma Lair -> Deku Tree Basement"},
    {"category": "Spawn",
     "forward": "Root -> Hyrule Field"},
    {"category": "Extra", "region": "Zora River"}
]
"#;

pub fn make_tracker(settings: TrackerSettings) -> Tracker {
    Tracker::from_strs(WORLD, TABLE, settings).unwrap()
}

pub fn possible_names(tracker: &Tracker) -> Vec<String> {
    tracker
        .result
        .possible_locations
        .iter()
        .map(|&l| tracker.world.locations[l].name.clone())
        .collect()
}

pub fn collected_names(tracker: &Tracker) -> Vec<String> {
    tracker
        .result
        .collected_locations
        .iter()
        .map(|&l| tracker.world.locations[l].name.clone())
        .collect()
}

pub fn explore_names(tracker: &Tracker) -> Vec<String> {
    tracker
        .result
        .please_explore
        .iter()
        .map(|&x| tracker.world.exits[x].name.clone())
        .collect()
}
