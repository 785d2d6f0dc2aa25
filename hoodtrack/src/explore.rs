use anyhow::{bail, ensure, Context, Result};
use hashbrown::{HashMap, HashSet};
use hoodtrack_game::{ExitCategory, ExitId, RegionId, WorldModel};
use log::info;

use crate::auto_grotto::SubstitutionResolver;
use crate::settings::TrackerSettings;

// The seven connection classes. An exit's class decides how its candidate
// destinations are computed and how a player-supplied connection is
// validated.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ConnectionClass {
    InteriorOverworld,
    OverworldOverworld,
    GrottoOverworld,
    DungeonOverworld,
    BossDoor,
    OwlFlight,
    SpawnWarp,
}

impl ConnectionClass {
    pub fn from_category(category: ExitCategory) -> ConnectionClass {
        match category {
            ExitCategory::Interior | ExitCategory::SpecialInterior => {
                ConnectionClass::InteriorOverworld
            }
            ExitCategory::Grotto | ExitCategory::Grave | ExitCategory::SpecialGrave => {
                ConnectionClass::GrottoOverworld
            }
            ExitCategory::Dungeon => ConnectionClass::DungeonOverworld,
            ExitCategory::Overworld => ConnectionClass::OverworldOverworld,
            ExitCategory::BossDoor => ConnectionClass::BossDoor,
            ExitCategory::OwlDrop => ConnectionClass::OwlFlight,
            ExitCategory::WarpSong | ExitCategory::Spawn => ConnectionClass::SpawnWarp,
        }
    }

    pub fn is_one_entrance(self) -> bool {
        matches!(
            self,
            ConnectionClass::InteriorOverworld
                | ConnectionClass::GrottoOverworld
                | ConnectionClass::DungeonOverworld
                | ConnectionClass::BossDoor
        )
    }

    pub fn is_warp(self) -> bool {
        matches!(self, ConnectionClass::OwlFlight | ConnectionClass::SpawnWarp)
    }
}

#[derive(Copy, Clone, Debug)]
struct ExitInfo {
    class: ConnectionClass,
    // True for the outside-in direction of a two-way row (or the only
    // direction of a one-way row).
    is_forward: bool,
}

// Mark every exit covered by the shuffled categories as unresolved.
pub fn shuffle_exits(world: &mut WorldModel, settings: &TrackerSettings) {
    let categories: HashSet<ExitCategory> = settings.shuffled_categories().into_iter().collect();
    let mut shuffle_these: Vec<ExitId> = vec![];
    for row in &world.shuffle_table.rows {
        if !categories.contains(&row.category) {
            continue;
        }
        shuffle_these.push(row.forward);
        if let Some(reverse) = row.reverse {
            shuffle_these.push(reverse);
        }
    }
    for exit_id in shuffle_these {
        let exit = &mut world.exits[exit_id];
        exit.shuffled = true;
        exit.connected_region = None;
    }
}

pub struct ExitGraph {
    info_by_exit: HashMap<ExitId, ExitInfo>,
    class_exits: HashMap<ConnectionClass, Vec<ExitId>>,
    // Expected number of overworld-class connections into each region,
    // derived by counting the static table.
    expected_indegree: HashMap<RegionId, usize>,
    owl_destinations: Vec<RegionId>,
    spawn_destinations: Vec<RegionId>,
    mixed_pool: bool,
    decoupled: bool,
}

impl ExitGraph {
    pub fn new(world: &WorldModel, settings: &TrackerSettings) -> Self {
        let categories: HashSet<ExitCategory> =
            settings.shuffled_categories().into_iter().collect();
        let mut info_by_exit = HashMap::new();
        let mut class_exits: HashMap<ConnectionClass, Vec<ExitId>> = HashMap::new();
        let mut expected_indegree: HashMap<RegionId, usize> = HashMap::new();
        let mut owl_destinations: HashSet<RegionId> = HashSet::new();
        let mut spawn_destinations: HashSet<RegionId> = HashSet::new();

        for row in &world.shuffle_table.rows {
            let class = ConnectionClass::from_category(row.category);

            // Destination sets and in-degrees come from the full table, not
            // just the categories shuffled under the current settings.
            match row.category {
                ExitCategory::Overworld => {
                    for exit_id in [Some(row.forward), row.reverse].into_iter().flatten() {
                        let dest = world.exits[exit_id].vanilla_connection;
                        *expected_indegree.entry(dest).or_insert(0) += 1;
                        owl_destinations.insert(dest);
                        spawn_destinations.insert(dest);
                    }
                }
                ExitCategory::OwlDrop | ExitCategory::WarpSong => {
                    let dest = world.exits[row.forward].vanilla_connection;
                    owl_destinations.insert(dest);
                    spawn_destinations.insert(dest);
                }
                ExitCategory::Interior | ExitCategory::SpecialInterior | ExitCategory::Spawn => {
                    spawn_destinations.insert(world.exits[row.forward].vanilla_connection);
                }
                _ => {}
            }

            if !categories.contains(&row.category) {
                continue;
            }
            info_by_exit.insert(
                row.forward,
                ExitInfo {
                    class,
                    is_forward: true,
                },
            );
            class_exits.entry(class).or_default().push(row.forward);
            if let Some(reverse) = row.reverse {
                info_by_exit.insert(
                    reverse,
                    ExitInfo {
                        class,
                        is_forward: false,
                    },
                );
                class_exits.entry(class).or_default().push(reverse);
            }
        }

        for &region_id in &world.shuffle_table.extra_destinations {
            owl_destinations.insert(region_id);
            spawn_destinations.insert(region_id);
        }

        let mut owl_destinations: Vec<RegionId> = owl_destinations.into_iter().collect();
        owl_destinations.sort();
        let mut spawn_destinations: Vec<RegionId> = spawn_destinations.into_iter().collect();
        spawn_destinations.sort();

        ExitGraph {
            info_by_exit,
            class_exits,
            expected_indegree,
            owl_destinations,
            spawn_destinations,
            mixed_pool: settings.mixed_entrance_pools,
            decoupled: settings.decoupled_entrances,
        }
    }

    fn class_list(&self, class: ConnectionClass) -> &[ExitId] {
        self.class_exits.get(&class).map_or(&[], |v| v.as_slice())
    }

    // Destination assigned when `counterpart` is chosen: the destination of
    // the counterpart's own paired exit per the static table. This is never
    // the counterpart's parent region; some places have multiple logical
    // entrances whose natural reverse differs from the literal opposite.
    fn paired_destination(&self, world: &WorldModel, counterpart: ExitId) -> Result<RegionId> {
        let partner = world.shuffle_table.partner(counterpart).with_context(|| {
            format!(
                "Exit '{}' has no paired exit in the shuffle table",
                world.exits[counterpart].name
            )
        })?;
        Ok(world.exits[partner].vanilla_connection)
    }

    // How many resolved connections of `class` currently lead into `region`.
    fn resolved_indegree(&self, world: &WorldModel, class: ConnectionClass, region: RegionId) -> usize {
        self.class_list(class)
            .iter()
            .filter(|&&x| {
                let exit = &world.exits[x];
                !exit.shuffled && exit.connected_region == Some(region)
            })
            .count()
    }

    // The candidate destination labels to offer the player for an
    // unresolved exit, already substituted, deduplicated and sorted.
    pub fn candidates(
        &self,
        world: &WorldModel,
        resolver: &SubstitutionResolver,
        exit_id: ExitId,
    ) -> Result<Vec<String>> {
        let info = *self
            .info_by_exit
            .get(&exit_id)
            .with_context(|| format!("Exit '{}' is not shuffled", world.exits[exit_id].name))?;
        ensure!(
            world.exits[exit_id].shuffled,
            "Exit '{}' is already resolved",
            world.exits[exit_id].name
        );

        let mut labels: Vec<String> = if self.mixed_pool && !info.class.is_warp() {
            self.mixed_candidates(world, resolver, exit_id)
        } else {
            match info.class {
                ConnectionClass::OverworldOverworld => self
                    .class_list(info.class)
                    .iter()
                    .filter(|&&c| c != exit_id)
                    .filter(|&&c| world.exits[c].shuffled && world.exits[c].consumed_exit.is_none())
                    .filter_map(|&c| self.paired_destination(world, c).ok())
                    .filter(|&dest| dest != world.exits[exit_id].parent_region)
                    .map(|dest| world.region_name(dest).to_string())
                    .collect(),
                ConnectionClass::OwlFlight => self
                    .owl_destinations
                    .iter()
                    .map(|&r| world.region_name(r).to_string())
                    .collect(),
                ConnectionClass::SpawnWarp => self
                    .spawn_destinations
                    .iter()
                    .map(|&r| world.region_name(r).to_string())
                    .collect(),
                class if info.is_forward => {
                    // Outside-in: any one-entrance place of this class that
                    // nothing connects to yet.
                    self.one_entrance_regions(world, class)
                        .into_iter()
                        .filter(|&place| self.resolved_indegree(world, class, place) == 0)
                        .map(|place| resolver.substitute(world, place))
                        .collect()
                }
                class => {
                    // Inside-out: the overworld side of any still-shuffled
                    // forward exit of the same class.
                    self.class_list(class)
                        .iter()
                        .filter(|&&c| {
                            self.info_by_exit[&c].is_forward && world.exits[c].shuffled
                        })
                        .map(|&c| world.region_name(world.exits[c].parent_region).to_string())
                        .collect()
                }
            }
        };

        labels.sort_by_key(|name| name.to_lowercase());
        labels.dedup();
        Ok(labels)
    }

    // Mixed-pool mode: every non-warp class shares one pool. Candidates are
    // the other unconsumed exits; each is displayed as the region its
    // counterpart leads to, qualified with "(from X)" when that region is
    // not where the candidate itself sits.
    fn mixed_candidates(
        &self,
        world: &WorldModel,
        resolver: &SubstitutionResolver,
        exit_id: ExitId,
    ) -> Vec<String> {
        let mut labels = vec![];
        for (&c, info) in &self.info_by_exit {
            if c == exit_id || info.class.is_warp() {
                continue;
            }
            let candidate = &world.exits[c];
            if !candidate.shuffled || candidate.consumed_exit.is_some() {
                continue;
            }
            let Ok(dest) = self.paired_destination(world, c) else {
                continue;
            };
            if candidate.parent_region == dest {
                labels.push(resolver.substitute(world, dest));
            } else {
                labels.push(format!(
                    "{} (from {})",
                    world.region_name(dest),
                    world.region_name(candidate.parent_region)
                ));
            }
        }
        labels
    }

    // All one-entrance destination regions of a class, per the table.
    fn one_entrance_regions(&self, world: &WorldModel, class: ConnectionClass) -> Vec<RegionId> {
        self.class_list(class)
            .iter()
            .filter(|&&c| self.info_by_exit[&c].is_forward)
            .map(|&c| world.exits[c].vanilla_connection)
            .collect()
    }

    // Re-commit a pairing from a saved session. Label resolution cannot
    // distinguish cross-connected entrances of the same class, so restores
    // go through the exact counterpart instead.
    pub fn restore_known_pair(
        &self,
        world: &mut WorldModel,
        exit_id: ExitId,
        counterpart: ExitId,
    ) -> Result<()> {
        ensure!(
            self.info_by_exit.contains_key(&exit_id)
                && self.info_by_exit.contains_key(&counterpart),
            "Saved pairing '{}' with '{}' names an exit outside the shuffled pools",
            world.exits[exit_id].name,
            world.exits[counterpart].name
        );
        ensure!(
            world.exits[exit_id].shuffled,
            "Exit '{}' is already resolved",
            world.exits[exit_id].name
        );
        self.commit_pair(world, exit_id, counterpart)
    }

    // Commit a player-confirmed connection. Validates the choice against
    // the class rules, resolves placeholders, and mutates both sides.
    pub fn set_known_exit(
        &self,
        world: &mut WorldModel,
        resolver: &SubstitutionResolver,
        exit_name: &str,
        destination_label: &str,
    ) -> Result<()> {
        let exit_id = world.get_exit_id(exit_name)?;
        let info = *self
            .info_by_exit
            .get(&exit_id)
            .with_context(|| format!("Exit '{}' is not shuffled", exit_name))?;
        ensure!(
            world.exits[exit_id].shuffled,
            "Exit '{}' is already resolved",
            exit_name
        );

        if self.mixed_pool && !info.class.is_warp() {
            return self.set_known_exit_mixed(world, resolver, exit_id, destination_label);
        }

        match info.class {
            ConnectionClass::OverworldOverworld => {
                let dest = world.get_region_id(destination_label)?;
                ensure!(
                    dest != world.exits[exit_id].parent_region,
                    "'{}' cannot lead back into its own region",
                    exit_name
                );
                let expected = self.expected_indegree.get(&dest).copied().unwrap_or(0);
                ensure!(
                    self.resolved_indegree(world, info.class, dest) < expected,
                    "All overworld connections into '{}' are already accounted for",
                    destination_label
                );
                let counterpart = self
                    .class_list(info.class)
                    .iter()
                    .copied()
                    .find(|&c| {
                        c != exit_id
                            && world.exits[c].shuffled
                            && world.exits[c].consumed_exit.is_none()
                            && self.paired_destination(world, c).ok() == Some(dest)
                    })
                    .with_context(|| {
                        format!("No shuffled overworld counterpart leads to '{}'", destination_label)
                    })?;
                self.commit_pair(world, exit_id, counterpart)
            }
            class if class.is_one_entrance() && info.is_forward => {
                // Substitute a concrete region for an auto placeholder.
                let dest = if resolver.is_placeholder(destination_label) {
                    resolver.serve(world, destination_label)?
                } else {
                    world.get_region_id(destination_label)?
                };
                ensure!(
                    self.resolved_indegree(world, class, dest) == 0,
                    "'{}' is already connected",
                    world.region_name(dest)
                );
                let counterpart = self
                    .class_list(class)
                    .iter()
                    .copied()
                    .find(|&c| {
                        self.info_by_exit[&c].is_forward
                            && world.exits[c].vanilla_connection == dest
                    })
                    .and_then(|forward| world.shuffle_table.partner(forward))
                    .with_context(|| {
                        format!("'{}' is not a destination of this pool", world.region_name(dest))
                    })?;
                self.commit_pair(world, exit_id, counterpart)
            }
            class if class.is_one_entrance() => {
                // Inside-out: the chosen label names the overworld region of
                // some still-shuffled forward exit.
                let dest = world.get_region_id(destination_label)?;
                let counterpart = self
                    .class_list(class)
                    .iter()
                    .copied()
                    .find(|&c| {
                        self.info_by_exit[&c].is_forward
                            && world.exits[c].shuffled
                            && world.exits[c].consumed_exit.is_none()
                            && world.exits[c].parent_region == dest
                    })
                    .with_context(|| {
                        format!("No shuffled entrance in '{}' for this pool", destination_label)
                    })?;
                self.commit_pair(world, exit_id, counterpart)
            }
            ConnectionClass::OwlFlight | ConnectionClass::SpawnWarp => {
                let dest = world.get_region_id(destination_label)?;
                let valid = if info.class == ConnectionClass::OwlFlight {
                    &self.owl_destinations
                } else {
                    &self.spawn_destinations
                };
                ensure!(
                    valid.contains(&dest),
                    "'{}' is not a valid destination for '{}'",
                    destination_label,
                    exit_name
                );
                self.resolve_single(world, exit_id, dest);
                Ok(())
            }
            class => bail!("Unknown connection type {:?}", class),
        }
    }

    fn set_known_exit_mixed(
        &self,
        world: &mut WorldModel,
        resolver: &SubstitutionResolver,
        exit_id: ExitId,
        destination_label: &str,
    ) -> Result<()> {
        // "Y (from X)" labels name the candidate exit by its own region;
        // bare labels name a one-entrance place (possibly a placeholder).
        let counterpart = if let Some((dest_name, from_name)) = parse_from_label(destination_label)
        {
            let dest = world.get_region_id(dest_name)?;
            let from = world.get_region_id(from_name)?;
            self.info_by_exit
                .keys()
                .copied()
                .find(|&c| {
                    c != exit_id
                        && !self.info_by_exit[&c].class.is_warp()
                        && world.exits[c].shuffled
                        && world.exits[c].consumed_exit.is_none()
                        && world.exits[c].parent_region == from
                        && self.paired_destination(world, c).ok() == Some(dest)
                })
                .with_context(|| format!("No candidate matches '{}'", destination_label))?
        } else {
            let dest = if resolver.is_placeholder(destination_label) {
                resolver.serve(world, destination_label)?
            } else {
                world.get_region_id(destination_label)?
            };
            self.info_by_exit
                .keys()
                .copied()
                .find(|&c| {
                    c != exit_id
                        && !self.info_by_exit[&c].class.is_warp()
                        && world.exits[c].shuffled
                        && world.exits[c].consumed_exit.is_none()
                        && world.exits[c].parent_region == dest
                        && self.paired_destination(world, c).ok() == Some(dest)
                })
                .with_context(|| format!("No candidate matches '{}'", destination_label))?
        };
        self.commit_pair(world, exit_id, counterpart)
    }

    // Resolve `exit_id` together with its chosen counterpart. Both sides are
    // mutated before returning, so observers never see a half-made pair.
    fn commit_pair(&self, world: &mut WorldModel, exit_id: ExitId, counterpart: ExitId) -> Result<()> {
        let exit_dest = self.paired_destination(world, counterpart)?;
        let counterpart_dest = self.paired_destination(world, exit_id)?;

        self.resolve_single(world, exit_id, exit_dest);
        if !self.decoupled {
            if world.exits[counterpart].shuffled {
                self.resolve_single(world, counterpart, counterpart_dest);
            } else {
                // A redundant reverse connection is fine as long as it
                // agrees with what is already there.
                ensure!(
                    world.exits[counterpart].connected_region == Some(counterpart_dest),
                    "Reverse exit '{}' is already connected elsewhere",
                    world.exits[counterpart].name
                );
            }
            world.exits[exit_id].coupled_exit = Some(counterpart);
            world.exits[counterpart].coupled_exit = Some(exit_id);
        }
        world.exits[exit_id].consumed_exit = Some(counterpart);
        world.exits[counterpart].consumed_exit = Some(exit_id);
        Ok(())
    }

    fn resolve_single(&self, world: &mut WorldModel, exit_id: ExitId, dest: RegionId) {
        {
            let exit = &mut world.exits[exit_id];
            exit.shuffled = false;
            exit.connected_region = Some(dest);
            exit.marked_known = true;
            exit.please_explore = false;
        }
        info!(
            "exit {} goesto {}",
            world.exits[exit_id].name,
            world.region_name(dest)
        );
        // Connecting a boss door tells us which dungeon the boss room
        // belongs to; remember that for hint grouping.
        if let Some(info) = self.info_by_exit.get(&exit_id) {
            if info.class == ConnectionClass::BossDoor && info.is_forward {
                let dungeon = world.regions[world.exits[exit_id].parent_region].dungeon.clone();
                world.regions[dest].dungeon = dungeon;
            }
        }
    }

    // Undo a resolution, including the coupled partner and any side
    // annotations it left behind.
    pub fn reshuffle_exit(&self, world: &mut WorldModel, exit_name: &str) -> Result<()> {
        let exit_id = world.get_exit_id(exit_name)?;
        ensure!(
            self.info_by_exit.contains_key(&exit_id),
            "Exit '{}' is not shuffled under the current settings",
            exit_name
        );
        ensure!(
            !world.exits[exit_id].shuffled,
            "Exit '{}' is not resolved",
            exit_name
        );
        self.unresolve(world, exit_id);
        Ok(())
    }

    fn unresolve(&self, world: &mut WorldModel, exit_id: ExitId) {
        if world.exits[exit_id].shuffled {
            return;
        }

        if let Some(info) = self.info_by_exit.get(&exit_id) {
            if info.class == ConnectionClass::BossDoor && info.is_forward {
                if let Some(dest) = world.exits[exit_id].connected_region {
                    world.regions[dest].dungeon = None;
                }
            }
        }

        let coupled = world.exits[exit_id].coupled_exit.take();
        if let Some(consumed) = world.exits[exit_id].consumed_exit.take() {
            world.exits[consumed].consumed_exit = None;
        }
        {
            let exit = &mut world.exits[exit_id];
            exit.shuffled = true;
            exit.connected_region = None;
            exit.marked_known = false;
            exit.please_explore = false;
        }
        info!("exit {} reshuffled", world.exits[exit_id].name);

        if let Some(partner) = coupled {
            world.exits[partner].coupled_exit = None;
            self.unresolve(world, partner);
        }
    }
}

// Split a mixed-pool "Y (from X)" label into (Y, X).
fn parse_from_label(label: &str) -> Option<(&str, &str)> {
    let rest = label.strip_suffix(')')?;
    let (dest, from) = rest.rsplit_once(" (from ")?;
    Some((dest, from))
}
