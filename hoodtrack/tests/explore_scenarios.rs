mod common;

use common::{explore_names, make_tracker, possible_names};
use hoodtrack::settings::TrackerSettings;

fn overworld_settings() -> TrackerSettings {
    TrackerSettings {
        shuffle_overworld_entrances: true,
        ..TrackerSettings::default()
    }
}

fn grotto_settings() -> TrackerSettings {
    TrackerSettings {
        shuffle_grotto_entrances: true,
        ..TrackerSettings::default()
    }
}

#[test]
fn overworld_candidates_exclude_own_region_and_consumed() {
    let mut tracker = make_tracker(overworld_settings());

    let candidates = tracker
        .candidates_for("Kakariko Village -> Hyrule Field")
        .unwrap();
    // "Kakariko Village" itself is never offered; the asymmetric Zora River
    // pair is offered by its table destination, not its literal region.
    assert_eq!(
        candidates,
        vec![
            "Hyrule Field".to_string(),
            "Lake Hylia".to_string(),
            "Zora River".to_string(),
        ]
    );

    tracker
        .set_known_exit("Kakariko Village -> Hyrule Field", "Zora River")
        .unwrap();
    let candidates = tracker
        .candidates_for("Hyrule Field -> Kakariko Village")
        .unwrap();
    assert!(!candidates.contains(&"Zora River".to_string()));
}

// The destination committed is the opposite exit's destination per the
// static table, which differs from the counterpart's parent region when the
// reverse side sits in a sub-area.
#[test]
fn overworld_pairing_uses_table_destination() {
    let mut tracker = make_tracker(overworld_settings());
    tracker
        .set_known_exit("Kakariko Village -> Hyrule Field", "Zora River")
        .unwrap();

    let world = &tracker.world;
    let kak_exit = world.get_exit_id("Kakariko Village -> Hyrule Field").unwrap();
    let zrf_exit = world.get_exit_id("Zora River Front -> Hyrule Field").unwrap();
    let zora_river = world.get_region_id("Zora River").unwrap();
    let kakariko = world.get_region_id("Kakariko Village").unwrap();

    assert_eq!(world.exits[kak_exit].connected_region, Some(zora_river));
    assert_eq!(world.exits[zrf_exit].connected_region, Some(kakariko));
    assert_eq!(world.exits[kak_exit].coupled_exit, Some(zrf_exit));
    assert_eq!(world.exits[zrf_exit].coupled_exit, Some(kak_exit));
    assert_eq!(world.exits[kak_exit].consumed_exit, Some(zrf_exit));
}

#[test]
fn overworld_rejects_self_loop_and_exhausted_destination() {
    let mut tracker = make_tracker(overworld_settings());
    assert!(tracker
        .set_known_exit("Kakariko Village -> Hyrule Field", "Kakariko Village")
        .is_err());

    tracker
        .set_known_exit("Kakariko Village -> Hyrule Field", "Zora River")
        .unwrap();
    // Only one overworld connection leads into Zora River.
    assert!(tracker
        .set_known_exit("Hyrule Field -> Kakariko Village", "Zora River")
        .is_err());
}

#[test]
fn grotto_placeholder_serves_unclaimed_regions_in_order() {
    let mut tracker = make_tracker(grotto_settings());

    let candidates = tracker.candidates_for("Hyrule Field -> Grotto A").unwrap();
    assert_eq!(candidates, vec!["Auto Generic Grotto".to_string()]);

    tracker
        .set_known_exit("Hyrule Field -> Grotto A", "Auto Generic Grotto")
        .unwrap();
    let world = &tracker.world;
    let forward = world.get_exit_id("Hyrule Field -> Grotto A").unwrap();
    let grotto_a = world.get_region_id("Grotto A").unwrap();
    assert_eq!(world.exits[forward].connected_region, Some(grotto_a));

    // Grotto A is claimed now, so the placeholder serves Grotto B next.
    let grotto_b = tracker.world.get_region_id("Grotto B").unwrap();
    assert_eq!(
        tracker
            .resolver
            .unclaimed_members(&tracker.world, "Auto Generic Grotto"),
        vec![grotto_b]
    );
    tracker
        .set_known_exit("Kakariko Village -> Grotto B", "Auto Generic Grotto")
        .unwrap();
    let world = &tracker.world;
    let second = world.get_exit_id("Kakariko Village -> Grotto B").unwrap();
    let grotto_b = world.get_region_id("Grotto B").unwrap();
    assert_eq!(world.exits[second].connected_region, Some(grotto_b));

    // A resolved exit cannot be resolved again.
    assert!(tracker
        .set_known_exit("Hyrule Field -> Grotto A", "Auto Generic Grotto")
        .is_err());
}

#[test]
fn substitution_is_deterministic() {
    for _ in 0..2 {
        let mut a = make_tracker(grotto_settings());
        let mut b = make_tracker(grotto_settings());
        for tracker in [&mut a, &mut b] {
            tracker
                .set_known_exit("Kakariko Village -> Grotto B", "Auto Generic Grotto")
                .unwrap();
        }
        let exit = a.world.get_exit_id("Kakariko Village -> Grotto B").unwrap();
        assert_eq!(
            a.world.exits[exit].connected_region,
            b.world.exits[exit].connected_region
        );
    }
}

#[test]
fn inside_out_candidates_name_overworld_side() {
    let tracker = make_tracker(grotto_settings());
    let candidates = tracker.candidates_for("Grotto A -> Hyrule Field").unwrap();
    assert_eq!(
        candidates,
        vec!["Hyrule Field".to_string(), "Kakariko Village".to_string()]
    );
}

#[test]
fn resolving_an_exit_opens_its_destination() {
    let mut tracker = make_tracker(grotto_settings());
    assert!(explore_names(&tracker).contains(&"Hyrule Field -> Grotto A".to_string()));
    assert!(!possible_names(&tracker).contains(&"Grotto A Chest".to_string()));

    tracker
        .set_known_exit("Hyrule Field -> Grotto A", "Auto Generic Grotto")
        .unwrap();
    assert!(!explore_names(&tracker).contains(&"Hyrule Field -> Grotto A".to_string()));
    assert!(possible_names(&tracker).contains(&"Grotto A Chest".to_string()));
}

#[test]
fn reshuffle_unresolves_both_sides() {
    let mut tracker = make_tracker(grotto_settings());
    tracker
        .set_known_exit("Hyrule Field -> Grotto A", "Grotto A")
        .unwrap();

    tracker.reshuffle_exit("Hyrule Field -> Grotto A").unwrap();
    let world = &tracker.world;
    let forward = world.get_exit_id("Hyrule Field -> Grotto A").unwrap();
    let reverse = world.get_exit_id("Grotto A -> Hyrule Field").unwrap();
    for exit_id in [forward, reverse] {
        assert!(world.exits[exit_id].shuffled);
        assert_eq!(world.exits[exit_id].connected_region, None);
        assert_eq!(world.exits[exit_id].coupled_exit, None);
        assert_eq!(world.exits[exit_id].consumed_exit, None);
    }

    // The released region is fungible again.
    let candidates = tracker.candidates_for("Hyrule Field -> Grotto A").unwrap();
    assert_eq!(candidates, vec!["Auto Generic Grotto".to_string()]);
}

#[test]
fn decoupled_mode_resolves_one_side_only() {
    let settings = TrackerSettings {
        shuffle_overworld_entrances: true,
        decoupled_entrances: true,
        ..TrackerSettings::default()
    };
    let mut tracker = make_tracker(settings);
    tracker
        .set_known_exit("Kakariko Village -> Hyrule Field", "Zora River")
        .unwrap();

    let world = &tracker.world;
    let kak_exit = world.get_exit_id("Kakariko Village -> Hyrule Field").unwrap();
    let zrf_exit = world.get_exit_id("Zora River Front -> Hyrule Field").unwrap();
    assert!(!world.exits[kak_exit].shuffled);
    assert!(world.exits[zrf_exit].shuffled);
    assert_eq!(world.exits[kak_exit].coupled_exit, None);
    // The counterpart is consumed even though it stays unresolved.
    assert_eq!(world.exits[zrf_exit].consumed_exit, Some(kak_exit));
    let candidates = tracker
        .candidates_for("Hyrule Field -> Kakariko Village")
        .unwrap();
    assert!(!candidates.contains(&"Zora River".to_string()));
}

#[test]
fn owl_drop_resolves_one_way() {
    let settings = TrackerSettings {
        owl_drops: true,
        ..TrackerSettings::default()
    };
    let mut tracker = make_tracker(settings);

    let candidates = tracker
        .candidates_for("Death Mountain Trail -> Kakariko Village")
        .unwrap();
    // Overworld destinations plus the extra flight target.
    assert_eq!(
        candidates,
        vec![
            "Hyrule Field".to_string(),
            "Kakariko Village".to_string(),
            "Lake Hylia".to_string(),
            "Zora River".to_string(),
        ]
    );

    assert!(tracker
        .set_known_exit("Death Mountain Trail -> Kakariko Village", "Grotto A")
        .is_err());
    tracker
        .set_known_exit("Death Mountain Trail -> Kakariko Village", "Zora River")
        .unwrap();
    let world = &tracker.world;
    let owl = world.get_exit_id("Death Mountain Trail -> Kakariko Village").unwrap();
    let zora_river = world.get_region_id("Zora River").unwrap();
    assert_eq!(world.exits[owl].connected_region, Some(zora_river));
    assert_eq!(world.exits[owl].coupled_exit, None);
    assert_eq!(world.exits[owl].consumed_exit, None);
}

// Connecting a boss door attaches the surrounding dungeon's name to the
// boss room for hint grouping; reshuffling detaches it again.
#[test]
fn boss_door_records_dungeon_for_hints() {
    let settings = TrackerSettings {
        shuffle_boss_entrances: true,
        ..TrackerSettings::default()
    };
    let mut tracker = make_tracker(settings);

    let candidates = tracker
        .candidates_for("Deku Tree Basement -> Gohma Lair")
        .unwrap();
    assert_eq!(candidates, vec!["Gohma Lair".to_string()]);

    let gohma = tracker.world.get_region_id("Gohma Lair").unwrap();
    assert_eq!(tracker.world.regions[gohma].dungeon, None);

    tracker
        .set_known_exit("Deku Tree Basement -> Gohma Lair", "Gohma Lair")
        .unwrap();
    assert_eq!(
        tracker.world.regions[gohma].dungeon,
        Some("Deku Tree".to_string())
    );
    let reverse = tracker
        .world
        .get_exit_id("Gohma Lair -> Deku Tree Basement")
        .unwrap();
    assert!(!tracker.world.exits[reverse].shuffled);

    tracker
        .reshuffle_exit("Deku Tree Basement -> Gohma Lair")
        .unwrap();
    assert_eq!(tracker.world.regions[gohma].dungeon, None);
    assert!(tracker.world.exits[reverse].shuffled);
}

// Spawn points pick from the fixed destination set and never couple.
#[test]
fn spawn_resolves_against_fixed_destinations() {
    let settings = TrackerSettings {
        spawn_positions: true,
        ..TrackerSettings::default()
    };
    let mut tracker = make_tracker(settings);

    let candidates = tracker.candidates_for("Root -> Hyrule Field").unwrap();
    assert_eq!(
        candidates,
        vec![
            "Hyrule Field".to_string(),
            "Kakariko Village".to_string(),
            "Lake Hylia".to_string(),
            "Shooting Gallery".to_string(),
            "Zora River".to_string(),
        ]
    );

    assert!(tracker
        .set_known_exit("Root -> Hyrule Field", "Grotto A")
        .is_err());
    tracker
        .set_known_exit("Root -> Hyrule Field", "Shooting Gallery")
        .unwrap();
    let world = &tracker.world;
    let spawn = world.get_exit_id("Root -> Hyrule Field").unwrap();
    let gallery = world.get_region_id("Shooting Gallery").unwrap();
    assert_eq!(world.exits[spawn].connected_region, Some(gallery));
    assert_eq!(world.exits[spawn].coupled_exit, None);
    assert_eq!(world.exits[spawn].consumed_exit, None);
    assert!(possible_names(&tracker).contains(&"Gallery Prize".to_string()));
}

#[test]
fn mixed_pool_labels_and_resolution() {
    let settings = TrackerSettings {
        shuffle_overworld_entrances: true,
        shuffle_grotto_entrances: true,
        shuffle_interior_entrances: true,
        mixed_entrance_pools: true,
        ..TrackerSettings::default()
    };
    let mut tracker = make_tracker(settings);

    let candidates = tracker.candidates_for("Hyrule Field -> Grotto A").unwrap();
    assert!(candidates.contains(&"Auto Generic Grotto".to_string()));
    assert!(candidates.contains(&"Shooting Gallery".to_string()));
    // An asymmetric overworld pair is qualified by where the exit sits.
    assert!(candidates.contains(&"Zora River (from Zora River Front)".to_string()));

    tracker
        .set_known_exit("Hyrule Field -> Grotto A", "Zora River (from Zora River Front)")
        .unwrap();
    let world = &tracker.world;
    let forward = world.get_exit_id("Hyrule Field -> Grotto A").unwrap();
    let zrf_exit = world.get_exit_id("Zora River Front -> Hyrule Field").unwrap();
    let zora_river = world.get_region_id("Zora River").unwrap();
    assert_eq!(world.exits[forward].connected_region, Some(zora_river));
    assert_eq!(world.exits[forward].coupled_exit, Some(zrf_exit));
    // The reverse side leads back to where the player entered from.
    let hyrule_field = world.get_region_id("Hyrule Field").unwrap();
    assert_eq!(world.exits[zrf_exit].connected_region, Some(hyrule_field));
}
