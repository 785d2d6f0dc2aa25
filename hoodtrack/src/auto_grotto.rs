use anyhow::{Context, Result};
use hashbrown::HashMap;
use hoodtrack_game::{GrottoKind, RegionId, WorldModel};
use log::info;

use crate::settings::TrackerSettings;

// Interchangeable one-entrance destinations (grottos of a given content
// type, fairy fountains) are shown to the player as a single placeholder
// until one is committed. Membership comes from the static shuffle table;
// whether a member is already claimed is derived from the live exit state,
// so reshuffling returns it to the pool with no extra bookkeeping.
pub struct SubstitutionResolver {
    groups: Vec<(String, Vec<RegionId>)>,
    group_by_region: HashMap<RegionId, usize>,
    group_by_name: HashMap<String, usize>,
}

fn placeholder_name(kind: GrottoKind, combined_scrubs: bool) -> Option<&'static str> {
    match kind {
        GrottoKind::GenericGrotto => Some("Auto Generic Grotto"),
        GrottoKind::ScrubGrotto => {
            if combined_scrubs {
                Some("Auto Scrub Grotto")
            } else {
                // Split mode: scrub grottos are distinguishable by content,
                // so each one is shown under its concrete name.
                None
            }
        }
        GrottoKind::FairyFountain => Some("Auto Fairy Fountain"),
        GrottoKind::GreatFairyFountain => Some("Auto Great Fairy Fountain"),
    }
}

impl SubstitutionResolver {
    pub fn new(world: &WorldModel, settings: &TrackerSettings) -> Self {
        let mut resolver = SubstitutionResolver {
            groups: vec![],
            group_by_region: HashMap::new(),
            group_by_name: HashMap::new(),
        };
        for row in &world.shuffle_table.rows {
            let Some(kind) = row.grotto_kind else {
                continue;
            };
            let Some(name) = placeholder_name(kind, settings.scrub_grottos_combined) else {
                continue;
            };
            let member = world.exits[row.forward].vanilla_connection;
            let group_idx = *resolver
                .group_by_name
                .entry(name.to_string())
                .or_insert_with(|| {
                    resolver.groups.push((name.to_string(), vec![]));
                    resolver.groups.len() - 1
                });
            resolver.groups[group_idx].1.push(member);
            resolver.group_by_region.insert(member, group_idx);
        }
        resolver
    }

    pub fn is_placeholder(&self, name: &str) -> bool {
        self.group_by_name.contains_key(name)
    }

    // A fungible region is claimed once a player-made connection leads into
    // it; from then on it is shown under its concrete name.
    fn is_claimed(world: &WorldModel, region_id: RegionId) -> bool {
        world
            .exits
            .iter()
            .any(|x| !x.shuffled && x.marked_known && x.connected_region == Some(region_id))
    }

    // The label to display for a candidate destination region.
    pub fn substitute(&self, world: &WorldModel, region_id: RegionId) -> String {
        if let Some(&group_idx) = self.group_by_region.get(&region_id) {
            if !Self::is_claimed(world, region_id) {
                return self.groups[group_idx].0.clone();
            }
        }
        world.region_name(region_id).to_string()
    }

    // Resolve a placeholder to the first member region that has no incoming
    // connection yet. Deterministic (table order), so replaying the same
    // resolution sequence picks the same regions.
    pub fn serve(&self, world: &WorldModel, placeholder: &str) -> Result<RegionId> {
        let &group_idx = self
            .group_by_name
            .get(placeholder)
            .with_context(|| format!("Unknown auto placeholder '{}'", placeholder))?;
        let region_id = self.groups[group_idx]
            .1
            .iter()
            .copied()
            .find(|&r| !Self::is_claimed(world, r))
            .with_context(|| format!("No unclaimed region left for '{}'", placeholder))?;
        info!(
            "{} chose {}",
            placeholder,
            world.region_name(region_id)
        );
        Ok(region_id)
    }

    // Members of a group that are still unclaimed, in table order.
    pub fn unclaimed_members(&self, world: &WorldModel, placeholder: &str) -> Vec<RegionId> {
        match self.group_by_name.get(placeholder) {
            Some(&group_idx) => self.groups[group_idx]
                .1
                .iter()
                .copied()
                .filter(|&r| !Self::is_claimed(world, r))
                .collect(),
            None => vec![],
        }
    }
}
