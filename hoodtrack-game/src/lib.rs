pub mod shuffle_table;

use anyhow::{bail, ensure, Context, Result};
use hashbrown::HashMap;
use json::JsonValue;
use serde::{Deserialize, Serialize};
use std::hash::Hash;
use strum_macros::EnumString;

pub use shuffle_table::{ExitCategory, GrottoKind, ShuffleRow, ShuffleTable};

pub type RegionId = usize; // Index into WorldModel.region_isv.keys
pub type ExitId = usize; // Index into WorldModel.exits
pub type LocationId = usize; // Index into WorldModel.locations
pub type ItemId = usize; // Index into WorldModel.item_isv.keys
pub type Count = i32; // Data type used to represent item/event quantities

// Time-of-day bits that a region can provide or that a rule can demand.
// DAMPE is the special NPC-availability window.
pub type TodMask = u8;
pub const TOD_NONE: TodMask = 0x0;
pub const TOD_DAY: TodMask = 0x1;
pub const TOD_DAMPE: TodMask = 0x2;
pub const TOD_ALL: TodMask = 0x3;

#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, EnumString, Serialize, Deserialize, PartialOrd, Ord,
)]
#[strum(serialize_all = "lowercase")]
pub enum Age {
    Child,
    Adult,
}

impl Age {
    pub const BOTH: [Age; 2] = [Age::Child, Age::Adult];
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum LocationKind {
    Normal,
    Event,
    Drop,
    HintStone,
    Shop,
    Boss,
}

#[derive(Default, Clone)]
pub struct IndexedVec<T: Hash + Eq> {
    pub keys: Vec<T>,
    pub index_by_key: HashMap<T, usize>,
}

impl<T: Hash + Eq> IndexedVec<T> {
    pub fn add<U: ToOwned<Owned = T> + ?Sized>(&mut self, name: &U) -> usize {
        if !self.index_by_key.contains_key(&name.to_owned()) {
            let idx = self.keys.len();
            self.index_by_key.insert(name.to_owned(), self.keys.len());
            self.keys.push(name.to_owned());
            idx
        } else {
            self.index_by_key[&name.to_owned()]
        }
    }
}

// Access rule attached to an exit or location. Evaluation lives in the
// tracker crate, next to the time-of-day propagation it depends on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Requirement {
    Free,
    Never,
    Item(ItemId, Count),
    IsAge(Age),
    AtTimeOfDay(TodMask),
    And(Vec<Requirement>),
    Or(Vec<Requirement>),
}

impl Requirement {
    pub fn make_and(mut reqs: Vec<Requirement>) -> Requirement {
        if reqs.len() == 1 {
            reqs.pop().unwrap()
        } else {
            Requirement::And(reqs)
        }
    }
}

pub struct Region {
    pub name: String,
    pub exits: Vec<ExitId>,
    pub locations: Vec<LocationId>,
    pub provides_time: TodMask,
    // For ordinary dungeon rooms this comes from the world data. For boss
    // rooms it is assigned when a boss door is connected and cleared when
    // that connection is reshuffled.
    pub dungeon: Option<String>,
}

pub struct Exit {
    pub name: String,
    pub parent_region: RegionId,
    // Destination per the static world data. Never changes after load;
    // connected_region is the mutable resolution state.
    pub vanilla_connection: RegionId,
    pub rule: Requirement,
    pub shuffled: bool,
    pub connected_region: Option<RegionId>,
    pub coupled_exit: Option<ExitId>,
    pub consumed_exit: Option<ExitId>,
    pub please_explore: bool,
    pub marked_known: bool,
}

impl Exit {
    // Valid traversal target only when resolution state is consistent.
    pub fn destination(&self) -> Option<RegionId> {
        if self.shuffled {
            None
        } else {
            self.connected_region
        }
    }
}

pub struct Location {
    pub name: String,
    pub parent_region: RegionId,
    pub kind: LocationKind,
    pub rule: Requirement,
    pub item: Option<ItemId>,
    pub locked: bool,
    // Filter tags from the world data, used to decide which locations the
    // player actually wants to see (e.g. non-upgrade scrubs).
    pub tags: Vec<String>,
}

pub struct WorldModel {
    pub region_isv: IndexedVec<String>,
    pub item_isv: IndexedVec<String>,
    pub regions: Vec<Region>,
    pub exits: Vec<Exit>,
    pub locations: Vec<Location>,
    pub exit_id_by_name: HashMap<String, ExitId>,
    pub location_id_by_name: HashMap<String, LocationId>,
    pub shuffle_table: ShuffleTable,
    pub root_region: RegionId,
    // Holding the left item implies holding the right one (e.g. a shield in
    // hand implies its "buy" variant for shop rules).
    pub item_aliases: Vec<(ItemId, ItemId)>,
    // Unlocking these locations grants a synthetic event item immediately.
    pub item_events: HashMap<LocationId, ItemId>,
    // The win-condition location is never auto-collected.
    pub win_location: Option<LocationId>,
    // Dungeon small keys and the maximum count that can exist, for the
    // informational all-keys pass.
    pub small_keys: Vec<(ItemId, Count)>,
    // Player-visible inventory: item and its maximum count.
    pub tracked_equipment: Vec<(ItemId, Count)>,
}

fn parse_tod(s: &str) -> Result<TodMask> {
    Ok(match s {
        "none" => TOD_NONE,
        "day" => TOD_DAY,
        "dampe" => TOD_DAMPE,
        "all" => TOD_ALL,
        _ => bail!("Unknown time-of-day '{}'", s),
    })
}

impl WorldModel {
    pub fn load_str(world_str: &str, table_str: &str, root_region: &str) -> Result<Self> {
        let world_json = json::parse(world_str).context("unable to parse world data")?;
        let table_json = json::parse(table_str).context("unable to parse shuffle table")?;
        Self::load(&world_json, &table_json, root_region)
    }

    pub fn load(
        world_json: &JsonValue,
        table_json: &JsonValue,
        root_region: &str,
    ) -> Result<Self> {
        let mut world = WorldModel {
            region_isv: IndexedVec::default(),
            item_isv: IndexedVec::default(),
            regions: vec![],
            exits: vec![],
            locations: vec![],
            exit_id_by_name: HashMap::new(),
            location_id_by_name: HashMap::new(),
            shuffle_table: ShuffleTable::default(),
            root_region: 0,
            item_aliases: vec![],
            item_events: HashMap::new(),
            win_location: None,
            small_keys: vec![],
            tracked_equipment: vec![],
        };
        world.load_regions(&world_json["regions"])?;
        world.load_item_tables(world_json)?;
        world.shuffle_table = ShuffleTable::load(
            table_json,
            &world.exit_id_by_name,
            &world.region_isv.index_by_key,
        )?;
        world.root_region = *world
            .region_isv
            .index_by_key
            .get(root_region)
            .with_context(|| format!("Root region '{}' not found", root_region))?;
        Ok(world)
    }

    fn load_regions(&mut self, regions_json: &JsonValue) -> Result<()> {
        ensure!(regions_json.is_array(), "'regions' must be an array");

        // First pass: intern all region names, so exits can refer to regions
        // defined later in the file.
        for region_json in regions_json.members() {
            let name = region_json["region_name"]
                .as_str()
                .context("Missing 'region_name' in region")?;
            let region_id = self.region_isv.add(name);
            ensure!(
                region_id == self.regions.len(),
                "Duplicate region '{}'",
                name
            );
            self.regions.push(Region {
                name: name.to_string(),
                exits: vec![],
                locations: vec![],
                provides_time: TOD_NONE,
                dungeon: None,
            });
        }

        for region_json in regions_json.members() {
            let name = region_json["region_name"].as_str().unwrap();
            let region_id = self.region_isv.index_by_key[name];

            if region_json.has_key("provides_time") {
                let tod_str = region_json["provides_time"]
                    .as_str()
                    .context("'provides_time' must be a string")?;
                self.regions[region_id].provides_time = parse_tod(tod_str)?;
            }
            if region_json.has_key("dungeon") {
                self.regions[region_id].dungeon = region_json["dungeon"].as_str().map(str::to_string);
            }

            for (dest_name, rule_json) in region_json["exits"].entries() {
                let exit_name = format!("{} -> {}", name, dest_name);
                let dest_id = *self
                    .region_isv
                    .index_by_key
                    .get(dest_name)
                    .with_context(|| format!("Unknown destination region in '{}'", exit_name))?;
                let rule = self
                    .parse_rule(rule_json)
                    .with_context(|| format!("parsing rule for exit '{}'", exit_name))?;
                let exit_id = self.exits.len();
                ensure!(
                    !self.exit_id_by_name.contains_key(&exit_name),
                    "Duplicate exit '{}'",
                    exit_name
                );
                self.exit_id_by_name.insert(exit_name.clone(), exit_id);
                self.exits.push(Exit {
                    name: exit_name,
                    parent_region: region_id,
                    vanilla_connection: dest_id,
                    rule,
                    shuffled: false,
                    connected_region: Some(dest_id),
                    coupled_exit: None,
                    consumed_exit: None,
                    please_explore: false,
                    marked_known: false,
                });
                self.regions[region_id].exits.push(exit_id);
            }

            for (loc_name, loc_json) in region_json["locations"].entries() {
                let location_id = self
                    .load_location(loc_name, loc_json, region_id)
                    .with_context(|| format!("loading location '{}'", loc_name))?;
                self.regions[region_id].locations.push(location_id);
            }
        }
        Ok(())
    }

    fn load_location(
        &mut self,
        name: &str,
        loc_json: &JsonValue,
        region_id: RegionId,
    ) -> Result<LocationId> {
        // A location is either a bare rule, or an object with
        // rule/kind/vanilla_item/tags fields.
        let is_expanded = loc_json.is_object()
            && (loc_json.has_key("rule")
                || loc_json.has_key("kind")
                || loc_json.has_key("vanilla_item")
                || loc_json.has_key("tags"));

        let (rule, kind, item, locked, tags) = if is_expanded {
            let rule = if loc_json.has_key("rule") {
                self.parse_rule(&loc_json["rule"])?
            } else {
                Requirement::Free
            };
            let kind = match loc_json["kind"].as_str() {
                Some(s) => s
                    .parse::<LocationKind>()
                    .ok()
                    .with_context(|| format!("Unknown location kind '{}'", s))?,
                None => LocationKind::Normal,
            };
            let item = loc_json["vanilla_item"]
                .as_str()
                .map(|s| self.item_isv.add(s));
            let mut tags: Vec<String> = vec![];
            for tag in loc_json["tags"].members() {
                tags.push(tag.as_str().context("'tags' must be strings")?.to_string());
            }
            // A locked location with a vanilla item is collected by the
            // solver automatically; the player never sees it as a check.
            let locked = item.is_some() && loc_json["locked"].as_bool().unwrap_or(false);
            (rule, kind, item, locked, tags)
        } else {
            (self.parse_rule(loc_json)?, LocationKind::Normal, None, false, vec![])
        };

        let location_id = self.locations.len();
        ensure!(
            !self.location_id_by_name.contains_key(name),
            "Duplicate location '{}'",
            name
        );
        self.location_id_by_name.insert(name.to_string(), location_id);
        self.locations.push(Location {
            name: name.to_string(),
            parent_region: region_id,
            kind,
            rule,
            item,
            locked,
            tags,
        });
        Ok(location_id)
    }

    fn load_item_tables(&mut self, world_json: &JsonValue) -> Result<()> {
        for (held, implied) in world_json["item_aliases"].entries() {
            let held_id = self.item_isv.add(held);
            let implied_id = self.item_isv.add(
                implied
                    .as_str()
                    .context("'item_aliases' values must be item names")?,
            );
            self.item_aliases.push((held_id, implied_id));
        }

        for (loc_name, item) in world_json["item_events"].entries() {
            let location_id = *self
                .location_id_by_name
                .get(loc_name)
                .with_context(|| format!("Unknown location '{}' in item_events", loc_name))?;
            let item_id = self.item_isv.add(
                item.as_str()
                    .context("'item_events' values must be item names")?,
            );
            self.item_events.insert(location_id, item_id);
        }

        if let Some(win) = world_json["win_location"].as_str() {
            let location_id = *self
                .location_id_by_name
                .get(win)
                .with_context(|| format!("Unknown win location '{}'", win))?;
            self.win_location = Some(location_id);
        }

        for (key, max) in world_json["small_keys"].entries() {
            let item_id = self.item_isv.add(key);
            let max = max
                .as_i32()
                .with_context(|| format!("Bad key count for '{}'", key))?;
            self.small_keys.push((item_id, max));
        }

        for (name, max) in world_json["equipment"].entries() {
            let item_id = self.item_isv.add(name);
            let max = max
                .as_i32()
                .with_context(|| format!("Bad equipment count for '{}'", name))?;
            self.tracked_equipment.push((item_id, max));
        }
        Ok(())
    }

    pub fn parse_rule(&mut self, rule_json: &JsonValue) -> Result<Requirement> {
        if let Some(b) = rule_json.as_bool() {
            return Ok(if b { Requirement::Free } else { Requirement::Never });
        }
        if let Some(s) = rule_json.as_str() {
            return Ok(Requirement::Item(self.item_isv.add(s), 1));
        }
        ensure!(rule_json.is_object(), "Rule must be a bool, string or object");
        if rule_json.has_key("item") {
            let name = rule_json["item"]
                .as_str()
                .context("'item' must be a string")?;
            let count = if rule_json.has_key("count") {
                rule_json["count"].as_i32().context("Bad 'count' in rule")?
            } else {
                1
            };
            return Ok(Requirement::Item(self.item_isv.add(name), count));
        }
        if rule_json.has_key("age") {
            let age_str = rule_json["age"].as_str().context("'age' must be a string")?;
            let age = age_str
                .parse::<Age>()
                .ok()
                .with_context(|| format!("Unknown age '{}'", age_str))?;
            return Ok(Requirement::IsAge(age));
        }
        if rule_json.has_key("at") {
            let tod = parse_tod(rule_json["at"].as_str().context("'at' must be a string")?)?;
            ensure!(tod != TOD_NONE, "'at' rule requires a specific time bit");
            return Ok(Requirement::AtTimeOfDay(tod));
        }
        for (key, variant) in [("and", true), ("or", false)] {
            if rule_json.has_key(key) {
                ensure!(rule_json[key].is_array(), "'{}' must be an array", key);
                let mut reqs = vec![];
                for sub in rule_json[key].members() {
                    reqs.push(self.parse_rule(sub)?);
                }
                return Ok(if variant {
                    Requirement::And(reqs)
                } else {
                    Requirement::Or(reqs)
                });
            }
        }
        bail!("Unrecognized rule: {}", rule_json);
    }

    pub fn get_region_id(&self, name: &str) -> Result<RegionId> {
        self.region_isv
            .index_by_key
            .get(name)
            .copied()
            .with_context(|| format!("Unknown region '{}'", name))
    }

    pub fn get_exit_id(&self, name: &str) -> Result<ExitId> {
        self.exit_id_by_name
            .get(name)
            .copied()
            .with_context(|| format!("Unknown exit '{}'", name))
    }

    pub fn get_location_id(&self, name: &str) -> Result<LocationId> {
        self.location_id_by_name
            .get(name)
            .copied()
            .with_context(|| format!("Unknown location '{}'", name))
    }

    pub fn region_name(&self, region_id: RegionId) -> &str {
        &self.regions[region_id].name
    }

    // AND an additional requirement onto a location (e.g. wallet-size rules
    // the player enables for specific shop checks).
    pub fn add_location_rule(&mut self, location_id: LocationId, req: Requirement) {
        let old = std::mem::replace(&mut self.locations[location_id].rule, Requirement::Free);
        self.locations[location_id].rule = Requirement::make_and(vec![old, req]);
    }

    // Populate a fixed (vanilla) item on a location and lock it, so the
    // solver auto-collects it instead of offering it as a check.
    pub fn populate_fixed_item(&mut self, location_id: LocationId, item: ItemId) {
        self.locations[location_id].item = Some(item);
        self.locations[location_id].locked = true;
    }
}
