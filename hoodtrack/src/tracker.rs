use anyhow::{ensure, Context, Result};
use hashbrown::HashMap;
use hoodtrack_game::{Count, ExitId, ItemId, LocationId, Requirement, WorldModel};
use hoodtrack_logic::ProgressionState;
use log::{info, warn};

use crate::auto_grotto::SubstitutionResolver;
use crate::explore::{shuffle_exits, ExitGraph};
use crate::settings::TrackerSettings;
use crate::solve::{solve, SolveResult};
use crate::text_format;

const SECTION_PRIORITIES: [&str; 4] = [
    "please_explore",
    "possible_locations",
    "known_exits",
    "other_shuffled_exits",
];

// One tracking session: owns the world model, the entrance-resolution
// state, the player's inventory input, and the latest solve. Every
// externally visible mutation runs a full solve before returning.
pub struct Tracker {
    pub world: WorldModel,
    pub settings: TrackerSettings,
    pub exit_graph: ExitGraph,
    pub resolver: SubstitutionResolver,
    inventory: HashMap<ItemId, Count>,
    checked_off: Vec<String>,
    one_wallet: Vec<String>,
    two_wallets: Vec<String>,
    pub result: SolveResult,
}

impl Tracker {
    pub fn new(mut world: WorldModel, settings: TrackerSettings) -> Result<Self> {
        if let Some(win) = &settings.win_location {
            world.win_location = Some(world.get_location_id(win)?);
        }
        shuffle_exits(&mut world, &settings);
        let exit_graph = ExitGraph::new(&world, &settings);
        let resolver = SubstitutionResolver::new(&world, &settings);
        let progression = ProgressionState::new(&world);
        let result = solve(&world, &settings, &progression);
        let mut tracker = Tracker {
            world,
            settings,
            exit_graph,
            resolver,
            inventory: HashMap::new(),
            checked_off: vec![],
            one_wallet: vec![],
            two_wallets: vec![],
            result,
        };
        tracker.update();
        Ok(tracker)
    }

    pub fn from_strs(
        world_str: &str,
        table_str: &str,
        settings: TrackerSettings,
    ) -> Result<Self> {
        let world = WorldModel::load_str(world_str, table_str, &settings.root_region)?;
        Tracker::new(world, settings)
    }

    // Rebuild the progression state from the inventory input and re-solve.
    pub fn update(&mut self) {
        let mut progression = ProgressionState::new(&self.world);
        for (&item, &count) in &self.inventory {
            if count > 0 {
                progression.collect(&self.world, item, count);
            }
        }
        for (name, enabled) in [
            ("Scarecrow Song", self.settings.free_scarecrow),
            ("Epona", self.settings.no_epona_race),
        ] {
            if enabled {
                if let Some(&item) = self.world.item_isv.index_by_key.get(name) {
                    progression.grant(item, 1);
                }
            }
        }

        self.result = solve(&self.world, &self.settings, &progression);

        for exit in &mut self.world.exits {
            exit.please_explore = false;
        }
        for &exit_id in &self.result.please_explore {
            self.world.exits[exit_id].please_explore = true;
        }
    }

    pub fn collect_item(&mut self, name: &str, count: Count) -> Result<()> {
        let (item, max) = self
            .world
            .tracked_equipment
            .iter()
            .copied()
            .find(|&(item, _)| self.world.item_isv.keys[item] == name)
            .with_context(|| format!("'{}' is not tracked equipment", name))?;
        let current = self.inventory.entry(item).or_insert(0);
        let new_count = *current + count;
        ensure!(
            (0..=max).contains(&new_count),
            "Cannot hold {} of '{}' (max {})",
            new_count,
            name,
            max
        );
        *current = new_count;
        info!("User set {} to {}", name, new_count);
        self.update();
        Ok(())
    }

    pub fn set_known_exit(&mut self, exit_name: &str, destination_label: &str) -> Result<()> {
        self.exit_graph
            .set_known_exit(&mut self.world, &self.resolver, exit_name, destination_label)?;
        self.update();
        Ok(())
    }

    pub fn reshuffle_exit(&mut self, exit_name: &str) -> Result<()> {
        self.exit_graph.reshuffle_exit(&mut self.world, exit_name)?;
        self.update();
        Ok(())
    }

    pub fn candidates_for(&self, exit_name: &str) -> Result<Vec<String>> {
        let exit_id = self.world.get_exit_id(exit_name)?;
        self.exit_graph
            .candidates(&self.world, &self.resolver, exit_id)
    }

    pub fn set_checked_off(&mut self, location_name: &str, checked: bool) -> Result<()> {
        self.world.get_location_id(location_name)?;
        let present = self.checked_off.iter().any(|n| n == location_name);
        if checked && !present {
            self.checked_off.push(location_name.to_string());
        } else if !checked && present {
            self.checked_off.retain(|n| n != location_name);
        }
        Ok(())
    }

    // Checks the player does not want to see: non-upgrade scrubs when scrub
    // and grotto shuffle are both off, and free grotto chests under grotto
    // shuffle (assumed looted the moment the grotto is found).
    pub fn location_is_ignored(&self, location_id: LocationId) -> bool {
        let loc = &self.world.locations[location_id];
        let scrubs_off = self.settings.shuffle_scrubs == crate::settings::ScrubShuffle::Off;
        if scrubs_off && !self.settings.shuffle_grotto_entrances {
            let is_scrub = loc.tags.iter().any(|t| t == "Deku Scrub");
            let is_upgrade = loc.tags.iter().any(|t| t == "Deku Scrub Upgrades");
            if is_scrub && !is_upgrade {
                return true;
            }
        }
        if self.settings.shuffle_grotto_entrances
            && loc.tags.iter().any(|t| t == "Grottos")
            && loc.rule == Requirement::Free
        {
            return true;
        }
        false
    }

    pub fn all_keys_flag(&self, location_id: LocationId) -> bool {
        self.result.all_keys_possible.contains(&location_id)
    }

    fn possible_location_line(&mut self, location_id: LocationId) -> String {
        let (child, adult) = self.result.location_ages(&self.world, location_id);
        let loc = &self.world.locations[location_id];
        let region = self.world.region_name(loc.parent_region);
        let ages = match (child, adult) {
            (true, true) => "(child or adult)",
            (true, false) => "(child)",
            (false, true) => "(adult)",
            // Possible via a state the current solve can no longer show
            // (e.g. an event consumed along the way); should not happen.
            (false, false) => "(unknown)",
        };
        format!("{} (in {}) {}", loc.name, region, ages)
    }

    pub fn save(&mut self) -> String {
        let mut data: HashMap<String, Vec<String>> = HashMap::new();

        data.insert(
            "settings".to_string(),
            vec![serde_json::to_string(&self.settings).unwrap()],
        );

        let mut equipment = vec![];
        let mut possible_equipment = vec![];
        for &(item, max) in &self.world.tracked_equipment {
            let name = &self.world.item_isv.keys[item];
            let current = self.inventory.get(&item).copied().unwrap_or(0);
            for _ in 0..current {
                equipment.push(name.clone());
            }
            for _ in current..max {
                possible_equipment.push(name.clone());
            }
        }
        data.insert("equipment".to_string(), equipment);
        data.insert("possible_equipment".to_string(), possible_equipment);
        data.insert("checked_off".to_string(), self.checked_off.clone());
        data.insert("one_wallet".to_string(), self.one_wallet.clone());
        data.insert("two_wallets".to_string(), self.two_wallets.clone());

        // Resolved exits, in world order, with pairings emitted once.
        let mut known_exits = vec![];
        for (exit_id, exit) in self.world.exits.iter().enumerate() {
            if !exit.marked_known {
                continue;
            }
            if let Some(dest) = exit.connected_region {
                known_exits.push(text_format::format_goesto(
                    &exit.name,
                    self.world.region_name(dest),
                ));
            }
            if let Some(partner) = exit.coupled_exit {
                if exit_id < partner {
                    known_exits.push(text_format::format_pairswith(
                        &exit.name,
                        &self.world.exits[partner].name,
                    ));
                }
            }
        }
        data.insert("known_exits".to_string(), known_exits);

        let please_explore: Vec<String> = self
            .result
            .please_explore
            .iter()
            .map(|&x| text_format::format_goesto(&self.world.exits[x].name, "?"))
            .collect();
        let explore_set: Vec<ExitId> = self.result.please_explore.clone();
        let other_shuffled: Vec<String> = self
            .world
            .exits
            .iter()
            .enumerate()
            .filter(|(exit_id, exit)| exit.shuffled && !explore_set.contains(exit_id))
            .map(|(_, exit)| exit.name.clone())
            .collect();
        if !please_explore.is_empty() {
            data.insert("please_explore".to_string(), please_explore);
        }
        data.insert("other_shuffled_exits".to_string(), other_shuffled);

        let mut possible_lines = vec![];
        let mut all_keys_lines = vec![];
        let possible = self.result.possible_locations.clone();
        for location_id in possible {
            let checked = {
                let name = &self.world.locations[location_id].name;
                self.checked_off.iter().any(|n| n == name)
            };
            if checked || self.location_is_ignored(location_id) {
                continue;
            }
            possible_lines.push(self.possible_location_line(location_id));
        }
        let mut all_keys: Vec<LocationId> = self.result.all_keys_possible.iter().copied().collect();
        all_keys.sort();
        for location_id in all_keys {
            all_keys_lines.push(self.world.locations[location_id].name.clone());
        }
        data.insert("possible_locations".to_string(), possible_lines);
        if !all_keys_lines.is_empty() {
            data.insert("all_keys_possible".to_string(), all_keys_lines);
        }

        text_format::write_sections(&data, &SECTION_PRIORITIES)
    }

    pub fn load_session(&mut self, text: &str) -> Result<()> {
        let mut data = text_format::read_sections(text)?;
        for key in ["equipment", "checked_off", "one_wallet", "two_wallets", "known_exits"] {
            data.entry(key.to_string()).or_default();
        }

        // Strip trailing annotations like "(in Kokiri Forest) (child)".
        for key in ["checked_off", "one_wallet", "two_wallets"] {
            for line in data.get_mut(key).unwrap() {
                *line = strip_annotation(line).to_string();
            }
        }

        // A please-explore line whose "?" the player replaced with a real
        // destination becomes a known exit.
        if let Some(explore_lines) = data.remove("please_explore") {
            for line in explore_lines {
                if let Ok((_, dest)) = text_format::parse_goesto(&line) {
                    if dest != "?" {
                        data.get_mut("known_exits").unwrap().push(line);
                    }
                }
            }
        }

        for name in data["equipment"].clone() {
            self.collect_item_quiet(&name, 1)?;
        }
        for name in data["checked_off"].clone() {
            self.set_checked_off(&name, true)?;
        }

        let wallet = self.world.item_isv.add("Progressive Wallet");
        for (key, count) in [("one_wallet", 1), ("two_wallets", 2)] {
            for name in data[key].clone() {
                let location_id = self.world.get_location_id(&name)?;
                self.world
                    .add_location_rule(location_id, Requirement::Item(wallet, count));
                if key == "one_wallet" {
                    self.one_wallet.push(name);
                } else {
                    self.two_wallets.push(name);
                }
            }
        }

        self.apply_known_exits(&data["known_exits"].clone())?;
        self.update();
        Ok(())
    }

    fn collect_item_quiet(&mut self, name: &str, count: Count) -> Result<()> {
        let (item, max) = self
            .world
            .tracked_equipment
            .iter()
            .copied()
            .find(|&(item, _)| self.world.item_isv.keys[item] == name)
            .with_context(|| format!("'{}' is not tracked equipment", name))?;
        let current = self.inventory.entry(item).or_insert(0);
        ensure!(*current + count <= max, "Too many '{}'", name);
        *current += count;
        Ok(())
    }

    // Re-apply connections from a saved session. Entries for exits that are
    // no longer shuffled under the current settings are discarded rather
    // than treated as errors, so settings changes do not wedge the file.
    fn apply_known_exits(&mut self, lines: &[String]) -> Result<()> {
        // Pairswith lines name the exact counterpart. Restoring through a
        // destination label alone picks the first same-class match in table
        // order, which is wrong when the player cross-connected entrances.
        let mut saved_partner: HashMap<ExitId, ExitId> = HashMap::new();
        for line in lines {
            if let Some((a, b)) = text_format::parse_pairswith(line) {
                let a_id = self.world.get_exit_id(a)?;
                let b_id = self.world.get_exit_id(b)?;
                if self.world.exits[a_id].shuffled && self.world.exits[b_id].shuffled {
                    saved_partner.insert(a_id, b_id);
                    saved_partner.insert(b_id, a_id);
                } else if !self.world.exits[a_id].shuffled && !self.world.exits[b_id].shuffled {
                    self.world.exits[a_id].coupled_exit = Some(b_id);
                    self.world.exits[b_id].coupled_exit = Some(a_id);
                }
            }
        }
        for line in lines {
            if text_format::parse_pairswith(line).is_some() {
                continue;
            }
            let (exit_name, dest_name) = text_format::parse_goesto(line)?;
            let exit_id = self.world.get_exit_id(exit_name)?;
            if !self.world.exits[exit_id].shuffled {
                if self.world.exits[exit_id].marked_known {
                    // Reverse side of a pairing we already applied.
                    continue;
                }
                warn!(
                    "Discarding saved connection '{}': exit is not shuffled under current settings",
                    line
                );
                continue;
            }
            if let Some(&counterpart) = saved_partner.get(&exit_id) {
                self.exit_graph
                    .restore_known_pair(&mut self.world, exit_id, counterpart)
                    .with_context(|| format!("applying saved connection '{}'", line))?;
                continue;
            }
            self.exit_graph
                .set_known_exit(&mut self.world, &self.resolver, exit_name, dest_name)
                .with_context(|| format!("applying saved connection '{}'", line))?;
        }
        Ok(())
    }
}

fn strip_annotation(line: &str) -> &str {
    match line.find(" (") {
        Some(idx) => line[..idx].trim_end(),
        None => line.trim_end(),
    }
}
