//! Goal resolver: decomposes "obtain N of item X" into a linear plan of
//! tasks whose producers precede their consumers.
//!
//! Resolution works over a deficit map seeded with the goal. Each item
//! gets at most one production node (duplicate sub-deficits accumulate
//! into it), a production mode chosen by priority smelt > craft > gather
//! > harvest with fallback on failure, and a visiting stack for cycle
//! detection. Mode attempts run against a cloned state so a failed
//! branch never leaks reservations. Emission walks the node graph in
//! dependency order, stable by first-creation index.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::agent::error::AgentError;
use crate::agent::inventory::Inventory;
use crate::agent::task::{FuelPlan, Plan, StationKind, Task};
use crate::config;
use crate::knowledge::drops;
use crate::knowledge::recipes::{self, Family, Slot};
use crate::knowledge::smelting::{self, FuelChoice};
use crate::knowledge::tools::{self, Tier, ToolCheck};
use crate::world::World;

pub struct Resolver<'a, W: World> {
    world: &'a W,
}

#[derive(Debug, Clone)]
enum Mode {
    Craft {
        output_count: u32,
        inputs: Vec<(String, u32)>,
        needs_table: bool,
    },
    Smelt {
        input: String,
        fuel: String,
        fuel_count: u32,
    },
    Gather {
        block: String,
        drop_min: u32,
    },
    Harvest {
        crop: String,
        drop_min: u32,
    },
}

#[derive(Debug, Clone)]
struct Node {
    mode: Mode,
    /// Units of the item this node must produce in total.
    total: u32,
    seq: usize,
    /// Items this production consumes or requires first.
    deps: Vec<String>,
    /// Tool to ensure immediately before this gather/harvest.
    needs_tool: Option<String>,
}

#[derive(Debug, Clone)]
struct State {
    /// Snapshot minus reservations made while planning.
    remaining: Inventory,
    nodes: HashMap<String, Node>,
    /// Node keys in creation order, for deterministic emission.
    order: Vec<String>,
}

impl State {
    fn insert(&mut self, item: &str, mode: Mode, total: u32, deps: Vec<String>, needs_tool: Option<String>) {
        let seq = self.order.len();
        self.nodes.insert(item.to_string(), Node { mode, total, seq, deps, needs_tool });
        self.order.push(item.to_string());
    }
}

impl<'a, W: World> Resolver<'a, W> {
    pub fn new(world: &'a W) -> Self {
        Self { world }
    }

    /// Produce a plan that brings the inventory up to `count` of
    /// `goal_item`. An already-satisfied goal yields the empty plan.
    pub fn resolve(&self, goal_item: &str, count: u32, inventory: &Inventory) -> Result<Plan, AgentError> {
        let mut state = State {
            remaining: inventory.clone(),
            nodes: HashMap::new(),
            order: Vec::new(),
        };
        let goal = self.canonical_goal(goal_item, &state);
        debug!(goal = %goal, count, "resolving goal");
        let mut stack = Vec::new();
        self.resolve_deficit(&goal, count, &mut stack, &mut state, false)?;
        Ok(self.emit(&state, inventory))
    }

    /// Map bare family aliases ("planks", "log") onto the variant the
    /// inventory or the nearby world can actually produce.
    fn canonical_goal(&self, item: &str, state: &State) -> String {
        match recipes::family_by_name(item) {
            Some(family) => self.available_variant(family, state),
            None => item.to_string(),
        }
    }

    // ─── Probes ──────────────────────────────────────────────────────

    fn block_nearby(&self, name: &str) -> bool {
        self.world
            .find_block(&|n| n == name, config::BLOCK_SEARCH_RADIUS)
            .is_some()
    }

    fn station_nearby(&self, kind: StationKind) -> bool {
        self.world
            .find_block(&|n| n == kind.as_str(), config::STATION_SEARCH_RADIUS)
            .is_some()
    }

    /// Whether some block dropping `item` is reachable.
    fn gatherable(&self, item: &str) -> bool {
        drops::gather_sources(item).any(|d| self.block_nearby(d.block))
    }

    /// Pick a concrete family member: largest held, then any variant whose
    /// wood is held as logs, then any variant present in the world, then
    /// the canonical default.
    fn available_variant(&self, family: &'static Family, state: &State) -> String {
        let held = |i: &str| state.remaining.held(i);
        if let Some(best) = family.best_held(&held) {
            return best.to_string();
        }
        if family.name == recipes::PLANKS.name {
            if let Some(log) = recipes::LOGS.best_held(&held) {
                if let Some(wood) = recipes::wood_of(log) {
                    return format!("{wood}_planks");
                }
            }
            if let Some(log) = recipes::LOGS.members.iter().find(|m| self.block_nearby(m)) {
                if let Some(wood) = recipes::wood_of(log) {
                    return format!("{wood}_planks");
                }
            }
        }
        if let Some(member) = family.members.iter().find(|m| self.block_nearby(m)) {
            return member.to_string();
        }
        family.canonical.to_string()
    }

    fn resolve_slot(&self, slot: &Slot, state: &State) -> String {
        match *slot {
            Slot::Exact(item) => item.to_string(),
            Slot::Group(family) => self.available_variant(family, state),
        }
    }

    // ─── Deficit resolution ──────────────────────────────────────────

    fn resolve_deficit(
        &self,
        item: &str,
        count: u32,
        stack: &mut Vec<String>,
        state: &mut State,
        in_fuel: bool,
    ) -> Result<(), AgentError> {
        let have = state.remaining.reserve(item, count);
        let needed = count - have;
        if needed == 0 {
            return Ok(());
        }
        if stack.iter().any(|s| s == item) {
            return Err(AgentError::Cycle(item.to_string()));
        }
        stack.push(item.to_string());
        let result = if state.nodes.contains_key(item) {
            self.grow_node(item, needed, stack, state, in_fuel)
        } else {
            self.plan_new_node(item, needed, stack, state, in_fuel)
        };
        stack.pop();
        result
    }

    /// Choose a production mode for an item not yet planned. Each mode is
    /// attempted against a cloned state; the first success commits.
    fn plan_new_node(
        &self,
        item: &str,
        needed: u32,
        stack: &mut Vec<String>,
        state: &mut State,
        in_fuel: bool,
    ) -> Result<(), AgentError> {
        fn note(e: AgentError, cycle_seen: &mut bool, last_err: &mut Option<AgentError>) {
            if matches!(e, AgentError::Cycle(_)) {
                *cycle_seen = true;
            }
            *last_err = Some(e);
        }
        let mut cycle_seen = false;
        let mut last_err: Option<AgentError> = None;

        if let Some(recipe) = smelting::smelt_for(item) {
            let mut attempt = state.clone();
            match self.plan_smelt(item, needed, recipe, stack, &mut attempt, in_fuel) {
                Ok(()) => {
                    *state = attempt;
                    return Ok(());
                }
                Err(e) => note(e, &mut cycle_seen, &mut last_err),
            }
        }
        if let Some(recipe) = recipes::recipe_for(item) {
            let mut attempt = state.clone();
            match self.plan_craft(item, needed, recipe, stack, &mut attempt, in_fuel) {
                Ok(()) => {
                    *state = attempt;
                    return Ok(());
                }
                Err(e) => note(e, &mut cycle_seen, &mut last_err),
            }
        }
        match self.plan_gather(item, needed, stack, state, in_fuel) {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            Err(e) => note(e, &mut cycle_seen, &mut last_err),
        }
        if let Some(crop) = drops::harvest_source(item) {
            if self.block_nearby(crop.block) {
                state.insert(
                    item,
                    Mode::Harvest { crop: crop.block.to_string(), drop_min: crop.min },
                    needed,
                    Vec::new(),
                    None,
                );
                return Ok(());
            }
            note(
                AgentError::ResourceExhausted(crop.block.to_string()),
                &mut cycle_seen,
                &mut last_err,
            );
        }

        if cycle_seen {
            Err(AgentError::Cycle(item.to_string()))
        } else {
            Err(last_err.unwrap_or_else(|| AgentError::Unsatisfiable(item.to_string())))
        }
    }

    fn plan_smelt(
        &self,
        item: &str,
        needed: u32,
        recipe: &'static smelting::SmeltingRecipe,
        stack: &mut Vec<String>,
        state: &mut State,
        in_fuel: bool,
    ) -> Result<(), AgentError> {
        let input = self.choose_smelt_input(recipe, state);
        self.resolve_deficit(&input, needed, stack, state, in_fuel)?;
        let (fuel, fuel_count) = self.choose_fuel(item, needed, stack, state, !in_fuel)?;
        // Resolving the fuel deficit inside a fuel branch pins nested
        // smelts to gatherable fuels, bounding the recursion to one level.
        self.resolve_deficit(&fuel, fuel_count, stack, state, true)?;
        let mut deps = vec![input.clone(), fuel.clone()];
        self.require_station_item(StationKind::Furnace, stack, state, in_fuel, &mut deps)?;
        state.insert(
            item,
            Mode::Smelt { input, fuel, fuel_count },
            needed,
            deps,
            None,
        );
        Ok(())
    }

    fn choose_smelt_input(&self, recipe: &'static smelting::SmeltingRecipe, state: &State) -> String {
        let candidates = std::iter::once(recipe.input).chain(recipe.alternates.iter().copied());
        // Prefer a held variant, then one the world offers, then canonical.
        if let Some(held) = candidates.clone().find(|c| state.remaining.held(c) > 0) {
            return held.to_string();
        }
        if let Some(gatherable) = candidates.clone().find(|c| self.gatherable(c)) {
            return gatherable.to_string();
        }
        recipe.input.to_string()
    }

    /// First fuel on the priority list with `held + gatherable` covering
    /// the burn; a second pass may admit a smeltable fuel (charcoal) when
    /// permitted, which is what breaks the charcoal-needs-charcoal loop.
    fn choose_fuel(
        &self,
        for_item: &str,
        count: u32,
        stack: &[String],
        state: &State,
        allow_smelted: bool,
    ) -> Result<(String, u32), AgentError> {
        let on_stack = |fuel: &str| stack.iter().any(|s| s == fuel);
        let mut candidates: Vec<String> = Vec::new();
        for choice in smelting::FUEL_PRIORITY {
            match *choice {
                FuelChoice::Item(item) => candidates.push(item.to_string()),
                FuelChoice::Variants(family) => {
                    candidates.push(self.available_variant(family, state))
                }
            }
        }

        for fuel in &candidates {
            if on_stack(fuel) {
                continue;
            }
            let need = smelting::fuel_needed(fuel, count);
            if need == u32::MAX {
                continue;
            }
            if state.remaining.held(fuel) >= need || self.gatherable(fuel) {
                return Ok((fuel.clone(), need));
            }
        }
        if allow_smelted {
            for fuel in &candidates {
                if on_stack(fuel) {
                    continue;
                }
                let Some(sub) = smelting::smelt_for(fuel) else { continue };
                let feedable = state.remaining.held(sub.input) > 0
                    || sub.alternates.iter().any(|a| state.remaining.held(a) > 0)
                    || self.gatherable(sub.input)
                    || sub.alternates.iter().any(|a| self.gatherable(a));
                if feedable {
                    return Ok((fuel.clone(), smelting::fuel_needed(fuel, count)));
                }
            }
        }
        Err(AgentError::Unsatisfiable(format!("fuel for {for_item}")))
    }

    fn plan_craft(
        &self,
        item: &str,
        needed: u32,
        recipe: &'static recipes::Recipe,
        stack: &mut Vec<String>,
        state: &mut State,
        in_fuel: bool,
    ) -> Result<(), AgentError> {
        let inputs: Vec<(String, u32)> = recipe
            .inputs
            .iter()
            .map(|i| (self.resolve_slot(&i.slot, state), i.count))
            .collect();
        let reps = needed.div_ceil(recipe.output_count);
        let mut deps = Vec::new();
        for (ing, per) in &inputs {
            self.resolve_deficit(ing, per * reps, stack, state, in_fuel)?;
            deps.push(ing.clone());
        }
        if recipe.needs_table {
            self.require_station_item(StationKind::CraftingTable, stack, state, in_fuel, &mut deps)?;
        }
        state.insert(
            item,
            Mode::Craft {
                output_count: recipe.output_count,
                inputs,
                needs_table: recipe.needs_table,
            },
            needed,
            deps,
            None,
        );
        Ok(())
    }

    /// Plan production of a station item when none is reachable and none
    /// is held. The station node becomes a dependency so its craft is
    /// emitted before the first consumer.
    fn require_station_item(
        &self,
        kind: StationKind,
        stack: &mut Vec<String>,
        state: &mut State,
        in_fuel: bool,
        deps: &mut Vec<String>,
    ) -> Result<(), AgentError> {
        let item = kind.as_str();
        if self.station_nearby(kind) {
            return Ok(());
        }
        if state.remaining.held(item) > 0 {
            return Ok(());
        }
        if !state.nodes.contains_key(item) {
            self.resolve_deficit(item, 1, stack, state, in_fuel)?;
        }
        deps.push(item.to_string());
        Ok(())
    }

    /// Returns Ok(true) when a gather node was planned, Ok(false) when the
    /// item has no gather sources at all.
    fn plan_gather(
        &self,
        item: &str,
        needed: u32,
        stack: &mut Vec<String>,
        state: &mut State,
        in_fuel: bool,
    ) -> Result<bool, AgentError> {
        let mut any_source = false;
        let mut first_block: Option<&'static str> = None;
        for source in drops::gather_sources(item) {
            any_source = true;
            first_block.get_or_insert(source.block);
            if !self.block_nearby(source.block) {
                continue;
            }
            let req = match tools::tool_requirement_for(source.block) {
                Some(r) => r,
                None => continue,
            };
            let mut attempt = state.clone();
            let mut deps = Vec::new();
            let mut needs_tool = None;
            if req.tier > Tier::None {
                let check = tools::has_adequate(attempt.remaining.item_names(), source.block);
                match check {
                    ToolCheck::Adequate(_) => {}
                    ToolCheck::Unbreakable => continue,
                    ToolCheck::Missing(req) => {
                        let tool = match self.planned_tool_for(&req, &attempt) {
                            Some(t) => t,
                            None => {
                                let tool = req.minimal_tool();
                                if self
                                    .resolve_deficit(&tool, 1, stack, &mut attempt, in_fuel)
                                    .is_err()
                                {
                                    continue;
                                }
                                tool
                            }
                        };
                        deps.push(tool.clone());
                        needs_tool = Some(tool);
                    }
                }
            }
            attempt.insert(
                item,
                Mode::Gather { block: source.block.to_string(), drop_min: source.min },
                needed,
                deps,
                needs_tool,
            );
            *state = attempt;
            return Ok(true);
        }
        if !any_source {
            return Ok(false);
        }
        Err(AgentError::ResourceExhausted(
            first_block.unwrap_or(item).to_string(),
        ))
    }

    /// A tool already scheduled for production that satisfies `req`.
    fn planned_tool_for(&self, req: &tools::ToolRequirement, state: &State) -> Option<String> {
        state
            .order
            .iter()
            .find(|k| req.kind.matches(k) && Tier::of_tool(k) >= req.tier)
            .cloned()
    }

    /// Accumulate an additional demand onto an existing node, propagating
    /// only the marginal ingredient and fuel deltas.
    fn grow_node(
        &self,
        item: &str,
        delta: u32,
        stack: &mut Vec<String>,
        state: &mut State,
        in_fuel: bool,
    ) -> Result<(), AgentError> {
        let node = state.nodes.get(item).expect("grow_node on missing node").clone();
        match node.mode {
            Mode::Craft { output_count, ref inputs, .. } => {
                let old_reps = node.total.div_ceil(output_count);
                let new_reps = (node.total + delta).div_ceil(output_count);
                let delta_reps = new_reps - old_reps;
                for (ing, per) in inputs {
                    self.resolve_deficit(ing, per * delta_reps, stack, state, in_fuel)?;
                }
            }
            Mode::Smelt { ref input, ref fuel, fuel_count } => {
                self.resolve_deficit(input, delta, stack, state, in_fuel)?;
                let new_fuel = smelting::fuel_needed(fuel, node.total + delta);
                let fuel_delta = new_fuel.saturating_sub(fuel_count);
                self.resolve_deficit(fuel, fuel_delta, stack, state, true)?;
                if let Some(n) = state.nodes.get_mut(item) {
                    if let Mode::Smelt { fuel_count, .. } = &mut n.mode {
                        *fuel_count = new_fuel;
                    }
                }
            }
            Mode::Gather { .. } | Mode::Harvest { .. } => {}
        }
        if let Some(n) = state.nodes.get_mut(item) {
            n.total += delta;
        }
        Ok(())
    }

    // ─── Emission ────────────────────────────────────────────────────

    /// Walk nodes in dependency order and emit tasks, interleaving
    /// `EnsureStation` before the first station consumer and `EnsureTool`
    /// before the first gather that needed one. `running` simulates the
    /// inventory through the plan to stamp skip thresholds.
    fn emit(&self, state: &State, snapshot: &Inventory) -> Plan {
        let mut plan: Plan = Vec::new();
        let mut emitted: HashSet<String> = HashSet::new();
        let mut stations: HashSet<StationKind> = HashSet::new();
        let mut ensured_tools: HashSet<String> = HashSet::new();
        let mut running = snapshot.clone();

        while emitted.len() < state.order.len() {
            let next = state
                .order
                .iter()
                .find(|k| {
                    !emitted.contains(k.as_str())
                        && state.nodes[k.as_str()].deps.iter().all(|d| {
                            !state.nodes.contains_key(d.as_str()) || emitted.contains(d.as_str())
                        })
                })
                .expect("node graph has a dependency cycle")
                .clone();
            let node = &state.nodes[next.as_str()];
            match &node.mode {
                Mode::Craft { output_count, inputs, needs_table } => {
                    if *needs_table && stations.insert(StationKind::CraftingTable) {
                        plan.push(Task::EnsureStation { kind: StationKind::CraftingTable });
                    }
                    let reps = node.total.div_ceil(*output_count);
                    for (ing, per) in inputs {
                        running.remove(ing, per * reps);
                    }
                    running.add(&next, output_count * reps);
                    plan.push(Task::Craft {
                        output: next.clone(),
                        output_count: *output_count,
                        inputs: inputs.clone(),
                        repetitions: reps,
                        needs_table: *needs_table,
                        stock_target: running.held(&next),
                    });
                }
                Mode::Smelt { input, fuel, fuel_count } => {
                    if stations.insert(StationKind::Furnace) {
                        plan.push(Task::EnsureStation { kind: StationKind::Furnace });
                    }
                    running.remove(input, node.total);
                    running.remove(fuel, *fuel_count);
                    running.add(&next, node.total);
                    plan.push(Task::Smelt {
                        output: next.clone(),
                        input: input.clone(),
                        count: node.total,
                        fuel: FuelPlan { fuel: fuel.clone(), count: *fuel_count },
                        stock_target: running.held(&next),
                    });
                }
                Mode::Gather { block, drop_min } => {
                    if let Some(tool) = &node.needs_tool {
                        if ensured_tools.insert(tool.clone()) {
                            plan.push(Task::EnsureTool { tool: tool.clone() });
                        }
                    }
                    let blocks = node.total.div_ceil(*drop_min);
                    running.add(&next, blocks * drop_min);
                    plan.push(Task::Gather {
                        block: block.clone(),
                        count: blocks,
                        stock_target: running.held(&next),
                    });
                }
                Mode::Harvest { crop, drop_min } => {
                    if let Some(tool) = &node.needs_tool {
                        if ensured_tools.insert(tool.clone()) {
                            plan.push(Task::EnsureTool { tool: tool.clone() });
                        }
                    }
                    let plots = node.total.div_ceil(*drop_min);
                    running.add(&next, plots * drop_min);
                    plan.push(Task::Harvest {
                        crop: crop.clone(),
                        count: plots,
                        stock_target: running.held(&next),
                    });
                }
            }
            emitted.insert(next.clone());
        }
        plan
    }
}
