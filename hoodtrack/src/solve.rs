use hashbrown::{HashMap, HashSet};
use hoodtrack_game::{
    Age, ExitId, LocationId, LocationKind, RegionId, Requirement, TodMask, WorldModel,
};
use hoodtrack_logic::ProgressionState;

use crate::settings::TrackerSettings;

// Evaluate an access rule for one age. `tod` pins the evaluation to a
// specific time-of-day bit (used while propagating that bit); when it is
// None, time-gated rules fall back to asking whether the bit can be pushed
// to the spot's region through already-resolved exits.
pub fn eval_rule(
    world: &WorldModel,
    rule: &Requirement,
    state: &ProgressionState,
    reached: &mut HashMap<RegionId, TodMask>,
    age: Age,
    tod: Option<TodMask>,
    spot_region: RegionId,
) -> bool {
    match rule {
        Requirement::Free => true,
        Requirement::Never => false,
        Requirement::Item(item, count) => state.has(*item, *count),
        Requirement::IsAge(rule_age) => age == *rule_age,
        Requirement::AtTimeOfDay(bit) => match tod {
            Some(pinned) => pinned & bit != 0,
            None => can_reach_tod(world, state, reached, age, *bit, spot_region),
        },
        Requirement::And(reqs) => reqs
            .iter()
            .all(|r| eval_rule(world, r, state, reached, age, tod, spot_region)),
        Requirement::Or(reqs) => reqs
            .iter()
            .any(|r| eval_rule(world, r, state, reached, age, tod, spot_region)),
    }
}

// Secondary reachability: can `goal` be reached with `tod` active, walking
// only resolved exits whose rules hold under that specific bit? Bits are
// unioned into the reached map as they spread, so successful propagation is
// memoized for the rest of the outer fixpoint; re-invocation as the outer
// state grows stays correct because the map only accumulates.
fn can_reach_tod(
    world: &WorldModel,
    state: &ProgressionState,
    reached: &mut HashMap<RegionId, TodMask>,
    age: Age,
    tod: TodMask,
    goal: RegionId,
) -> bool {
    if reached.get(&goal).is_some_and(|&bits| bits & tod != 0) {
        return true;
    }

    let mut queue: Vec<ExitId> = vec![];
    for (&region_id, &bits) in reached.iter() {
        if bits & tod != 0 {
            queue.extend(&world.regions[region_id].exits);
        }
    }

    let mut i = 0;
    while i < queue.len() {
        let exit = &world.exits[queue[i]];
        i += 1;
        if exit.shuffled {
            continue;
        }
        let Some(dest) = exit.destination() else {
            continue;
        };
        if !reached.contains_key(&dest) {
            continue;
        }
        if reached[&dest] & tod != 0 {
            continue;
        }
        if eval_rule(
            world,
            &exit.rule,
            state,
            reached,
            age,
            Some(tod),
            exit.parent_region,
        ) {
            *reached.get_mut(&dest).unwrap() |= tod;
            if dest == goal {
                return true;
            }
            queue.extend(&world.regions[dest].exits);
        }
    }
    false
}

#[derive(Clone)]
struct SolverState {
    // Per age: region -> time-of-day bits proven reachable.
    reached: [HashMap<RegionId, TodMask>; 2],
    // Per age: exits to test; failures stay queued for the next pass.
    queues: [Vec<ExitId>; 2],
    locked: Vec<LocationId>,
    possible: Vec<LocationId>,
    collected: Vec<LocationId>,
    please_explore: HashSet<ExitId>,
    progression: ProgressionState,
    passes: usize,
}

impl SolverState {
    fn new(world: &WorldModel, progression: &ProgressionState) -> Self {
        let root = world.root_region;
        let mut reached = HashMap::new();
        reached.insert(root, world.regions[root].provides_time);
        let queue: Vec<ExitId> = world.regions[root].exits.clone();
        SolverState {
            reached: [reached.clone(), reached],
            queues: [queue.clone(), queue],
            locked: (0..world.locations.len()).collect(),
            possible: vec![],
            collected: vec![],
            please_explore: HashSet::new(),
            progression: progression.clone(),
            passes: 0,
        }
    }

    // Try every queued exit for one age. Shuffled exits with satisfiable
    // rules become please-explore candidates; resolved ones extend the
    // frontier. Unsatisfiable exits are kept for the next pass.
    fn expand_regions(&mut self, world: &WorldModel, age: Age) -> usize {
        let root = world.root_region;
        let reached = &mut self.reached[age as usize];
        let queue = &mut self.queues[age as usize];
        let mut failed: Vec<ExitId> = vec![];
        let mut changes = 0;

        let mut i = 0;
        while i < queue.len() {
            let exit_id = queue[i];
            i += 1;
            let exit = &world.exits[exit_id];

            if exit.shuffled {
                if eval_rule(
                    world,
                    &exit.rule,
                    &self.progression,
                    reached,
                    age,
                    None,
                    exit.parent_region,
                ) {
                    if self.please_explore.insert(exit_id) {
                        changes += 1;
                    }
                } else {
                    failed.push(exit_id);
                }
                continue;
            }

            let Some(dest) = exit.destination() else {
                continue;
            };
            if reached.contains_key(&dest) {
                continue;
            }
            if eval_rule(
                world,
                &exit.rule,
                &self.progression,
                reached,
                age,
                None,
                exit.parent_region,
            ) {
                changes += 1;
                let bits = world.regions[dest].provides_time;
                reached.insert(dest, bits);
                // The root region stands for "time states currently
                // available anywhere", so destination bits flow back to it.
                *reached.get_mut(&root).unwrap() |= bits;
                queue.extend(&world.regions[dest].exits);
            } else {
                failed.push(exit_id);
            }
        }
        self.queues[age as usize] = failed;
        changes
    }

    // Move locations whose parent region is reachable and whose rule holds
    // from locked to possible. Certain locations grant a synthetic event
    // item the moment they unlock.
    fn unlock_locations(&mut self, world: &WorldModel, age: Age) -> usize {
        let reached = &mut self.reached[age as usize];
        let mut unlock_these: Vec<LocationId> = vec![];
        for &location_id in &self.locked {
            let loc = &world.locations[location_id];
            if !reached.contains_key(&loc.parent_region) {
                continue;
            }
            if !eval_rule(
                world,
                &loc.rule,
                &self.progression,
                reached,
                age,
                None,
                loc.parent_region,
            ) {
                continue;
            }
            unlock_these.push(location_id);
        }

        for &location_id in &unlock_these {
            if let Some(&item) = world.item_events.get(&location_id) {
                self.progression.grant(item, 1);
            }
            self.locked.retain(|&l| l != location_id);
            self.possible.push(location_id);
        }
        unlock_these.len()
    }

    // Events, drops, hint stones and vanilla-locked locations are collected
    // without player confirmation. The win-condition location stays visible.
    fn autocollect(&mut self, world: &WorldModel) -> usize {
        let mut move_these: Vec<LocationId> = vec![];
        for &location_id in &self.possible {
            if world.win_location == Some(location_id) {
                continue;
            }
            let loc = &world.locations[location_id];
            let auto = loc.locked
                || matches!(
                    loc.kind,
                    LocationKind::Event | LocationKind::Drop | LocationKind::HintStone
                );
            if auto {
                move_these.push(location_id);
            }
        }

        for &location_id in &move_these {
            if let Some(item) = world.locations[location_id].item {
                self.progression.grant(item, 1);
            }
            self.possible.retain(|&l| l != location_id);
            self.collected.push(location_id);
        }
        move_these.len()
    }

    fn run_fixpoint(&mut self, world: &WorldModel) {
        loop {
            let mut changes = 0;
            for age in Age::BOTH {
                changes += self.expand_regions(world, age);
                changes += self.unlock_locations(world, age);
            }
            changes += self.autocollect(world);
            self.passes += 1;
            if changes == 0 {
                break;
            }
        }
    }
}

pub struct SolveResult {
    // Indexed by Age.
    pub reached: [HashMap<RegionId, TodMask>; 2],
    pub possible_locations: Vec<LocationId>,
    pub collected_locations: Vec<LocationId>,
    pub please_explore: Vec<ExitId>,
    // Locations only reachable when assuming maximal dungeon keys.
    // Informational; never feeds back into the primary results.
    pub all_keys_possible: HashSet<LocationId>,
    pub progression: ProgressionState,
    pub passes: usize,
}

impl SolveResult {
    pub fn is_reached(&self, age: Age, region: RegionId) -> bool {
        self.reached[age as usize].contains_key(&region)
    }

    // Which ages can actually check a possible location right now.
    pub fn location_ages(&mut self, world: &WorldModel, location_id: LocationId) -> (bool, bool) {
        let loc = &world.locations[location_id];
        let mut result = [false, false];
        for age in Age::BOTH {
            let reached = &mut self.reached[age as usize];
            result[age as usize] = reached.contains_key(&loc.parent_region)
                && eval_rule(
                    world,
                    &loc.rule,
                    &self.progression,
                    reached,
                    age,
                    None,
                    loc.parent_region,
                );
        }
        (result[Age::Child as usize], result[Age::Adult as usize])
    }
}

pub fn solve(
    world: &WorldModel,
    settings: &TrackerSettings,
    progression: &ProgressionState,
) -> SolveResult {
    let mut state = SolverState::new(world, progression);
    state.run_fixpoint(world);

    let mut all_keys_possible = HashSet::new();
    if settings.all_keys_pass_enabled() && !world.small_keys.is_empty() {
        // Second, independent pass on a copy of the whole state: grant the
        // maximum count of every dungeon key and see what else opens up.
        let mut aux = state.clone();
        for &(key, max) in &world.small_keys {
            if aux.progression.count(key) < max {
                aux.progression.set_count(key, max);
            }
        }
        aux.run_fixpoint(world);
        let base: HashSet<LocationId> = state.possible.iter().copied().collect();
        for &location_id in &aux.possible {
            if !base.contains(&location_id) {
                all_keys_possible.insert(location_id);
            }
        }
    }

    let mut please_explore: Vec<ExitId> = state.please_explore.into_iter().collect();
    please_explore.sort_by(|&a, &b| {
        world.exits[a]
            .name
            .to_lowercase()
            .cmp(&world.exits[b].name.to_lowercase())
    });

    SolveResult {
        reached: state.reached,
        possible_locations: state.possible,
        collected_locations: state.collected,
        please_explore,
        all_keys_possible,
        progression: state.progression,
        passes: state.passes,
    }
}
