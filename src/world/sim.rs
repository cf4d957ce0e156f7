//! Deterministic in-process world used offline and throughout the test
//! suite. Blocks live in a sparse voxel map (everything else is air),
//! the furnace burns fuel against the tokio clock, and navigation simply
//! teleports the avatar next to its goal.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use rand::Rng;
use tokio::time::{sleep, Duration, Instant};

use crate::config::{REACH_DISTANCE, SMELT_TICKS_PER_ITEM, TICK_MS};
use crate::knowledge::recipes::{self, Slot};
use crate::knowledge::smelting;
use crate::knowledge::tools::{self, Tier, ToolCheck};
use crate::world::{
    Block, BlockPos, Entity, FacadeError, FacadeResult, ItemStack, NavError, Vec3, World,
};

static NEXT_ENTITY_ID: AtomicU32 = AtomicU32::new(1);

/// Latency of a single facade action.
const ACTION_MS: u64 = 10;

#[derive(Debug, Clone)]
struct SimEntity {
    id: u32,
    kind: String,
    pos: Vec3,
    health: f64,
}

#[derive(Debug)]
struct SimFurnace {
    input: Option<(String, u32)>,
    output: Option<(String, u32)>,
    /// Remaining burn-tick pool from inserted fuel.
    burn: u64,
    /// Ticks of progress toward the current item.
    progress: u64,
    last: Instant,
    pending_ms: u64,
}

impl SimFurnace {
    fn new(now: Instant) -> Self {
        Self { input: None, output: None, burn: 0, progress: 0, last: now, pending_ms: 0 }
    }

    /// Advance smelting to `now`, one burn tick at a time in bulk steps.
    fn advance(&mut self, now: Instant) {
        let elapsed = now.duration_since(self.last).as_millis() as u64 + self.pending_ms;
        self.last = now;
        let mut ticks = elapsed / TICK_MS;
        self.pending_ms = elapsed % TICK_MS;
        while ticks > 0 && self.burn > 0 {
            let Some((item, count)) = self.input.clone() else {
                self.progress = 0;
                break;
            };
            let Some(output) = smelting::smelt_output_of(&item) else {
                self.progress = 0;
                break;
            };
            let per_item = SMELT_TICKS_PER_ITEM as u64;
            let step = ticks.min(self.burn).min(per_item - self.progress);
            self.progress += step;
            self.burn -= step;
            ticks -= step;
            if self.progress >= per_item {
                self.progress = 0;
                self.input = if count > 1 { Some((item, count - 1)) } else { None };
                match &mut self.output {
                    Some((name, n)) if name == output => *n += 1,
                    slot @ None => *slot = Some((output.to_string(), 1)),
                    // A different item already sits in the output slot;
                    // the smelted item is lost, as a real furnace would jam.
                    Some(_) => {}
                }
            }
        }
    }
}

#[derive(Debug)]
struct SimState {
    blocks: HashMap<BlockPos, String>,
    inventory: HashMap<String, u32>,
    equipped: Option<String>,
    pos: Vec3,
    health: f64,
    food: f64,
    players: HashMap<String, Vec3>,
    entities: Vec<SimEntity>,
    furnaces: HashMap<BlockPos, SimFurnace>,
    tossed: Vec<(String, u32)>,
    /// Fail this many upcoming path_to calls.
    nav_failures: u32,
}

pub struct SimWorld {
    state: Mutex<SimState>,
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SimWorld {
    pub fn new() -> Self {
        let state = SimState {
            blocks: HashMap::new(),
            inventory: HashMap::new(),
            equipped: None,
            pos: Vec3::new(0.5, 1.0, 0.5),
            health: 20.0,
            food: 20.0,
            players: HashMap::new(),
            entities: Vec::new(),
            furnaces: HashMap::new(),
            tossed: Vec::new(),
            nav_failures: 0,
        };
        Self { state: Mutex::new(state) }
    }

    /// Small ready-made world for offline runs: a grass plain with oak
    /// trees, exposed stone and ores, and a cow.
    pub fn demo() -> Self {
        let world = Self::new();
        for x in -16..16 {
            for z in -16..16 {
                world.set_block(BlockPos::new(x, 0, z), "grass_block");
            }
        }
        for (tx, tz) in [(5, 3), (7, -4), (-6, 6), (-3, -8)] {
            for y in 1..5 {
                world.set_block(BlockPos::new(tx, y, tz), "oak_log");
            }
        }
        for i in 0..12 {
            world.set_block(BlockPos::new(10, 0, -8 + i), "stone");
            world.set_block(BlockPos::new(11, 0, -8 + i), "stone");
        }
        for i in 0..4 {
            world.set_block(BlockPos::new(12, 0, -8 + i), "coal_ore");
            world.set_block(BlockPos::new(12, 0, -4 + i), "iron_ore");
        }
        world.spawn_entity("cow", Vec3::new(-8.5, 1.0, -3.5), 10.0);
        world
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimState> {
        self.state.lock().expect("sim state poisoned")
    }

    // ─── Test and setup helpers ──────────────────────────────────────

    pub fn set_block(&self, pos: BlockPos, name: &str) {
        self.lock().blocks.insert(pos, name.to_string());
    }

    pub fn clear_block(&self, pos: BlockPos) {
        self.lock().blocks.remove(&pos);
    }

    pub fn block_name(&self, pos: BlockPos) -> String {
        self.lock().blocks.get(&pos).cloned().unwrap_or_else(|| "air".to_string())
    }

    pub fn give(&self, item: &str, count: u32) {
        *self.lock().inventory.entry(item.to_string()).or_insert(0) += count;
    }

    pub fn held(&self, item: &str) -> u32 {
        self.lock().inventory.get(item).copied().unwrap_or(0)
    }

    pub fn equipped(&self) -> Option<String> {
        self.lock().equipped.clone()
    }

    pub fn set_position(&self, pos: Vec3) {
        self.lock().pos = pos;
    }

    pub fn set_health(&self, health: f64) {
        self.lock().health = health;
    }

    pub fn add_player(&self, name: &str, pos: Vec3) {
        self.lock().players.insert(name.to_string(), pos);
    }

    pub fn spawn_entity(&self, kind: &str, pos: Vec3, health: f64) -> u32 {
        let id = NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed);
        self.lock().entities.push(SimEntity { id, kind: kind.to_string(), pos, health });
        id
    }

    pub fn fail_next_navs(&self, count: u32) {
        self.lock().nav_failures = count;
    }

    pub fn tossed(&self) -> Vec<(String, u32)> {
        self.lock().tossed.clone()
    }

    fn take_items(state: &mut SimState, item: &str, count: u32) -> bool {
        let held = state.inventory.get(item).copied().unwrap_or(0);
        if held < count {
            return false;
        }
        if held == count {
            state.inventory.remove(item);
        } else {
            state.inventory.insert(item.to_string(), held - count);
        }
        true
    }

    fn equipped_damage(state: &SimState) -> f64 {
        let Some(tool) = &state.equipped else { return 1.0 };
        let tier_bonus = Tier::of_tool(tool) as u32 as f64;
        if tool.ends_with("_sword") {
            4.0 + tier_bonus
        } else if tool.ends_with("_axe") && !tool.ends_with("_pickaxe") {
            3.0 + tier_bonus
        } else {
            1.0
        }
    }

    fn mob_drops(kind: &str) -> &'static [(&'static str, u32)] {
        match kind {
            "cow" => &[("beef", 2), ("leather", 1)],
            "pig" => &[("porkchop", 2)],
            "sheep" => &[("mutton", 1), ("white_wool", 1)],
            "zombie" => &[("rotten_flesh", 1)],
            "skeleton" => &[("bone", 1), ("arrow", 2)],
            _ => &[],
        }
    }
}

impl World for SimWorld {
    fn connected(&self) -> bool {
        true
    }

    fn position(&self) -> Vec3 {
        self.lock().pos
    }

    fn health(&self) -> f64 {
        self.lock().health
    }

    fn food(&self) -> f64 {
        self.lock().food
    }

    fn block_at(&self, pos: BlockPos) -> Option<Block> {
        let state = self.lock();
        let name = state.blocks.get(&pos).cloned().unwrap_or_else(|| "air".to_string());
        Some(Block { pos, name })
    }

    fn find_block(&self, matcher: &dyn Fn(&str) -> bool, max_distance: u32) -> Option<Block> {
        let state = self.lock();
        let origin = state.pos;
        state
            .blocks
            .iter()
            .filter(|(pos, name)| {
                matcher(name) && pos.distance_to(origin) <= max_distance as f64
            })
            .min_by(|a, b| {
                a.0.distance_to(origin)
                    .partial_cmp(&b.0.distance_to(origin))
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.0.cmp(b.0))
            })
            .map(|(pos, name)| Block { pos: *pos, name: name.clone() })
    }

    fn find_blocks(
        &self,
        matcher: &dyn Fn(&str) -> bool,
        max_distance: u32,
        limit: usize,
    ) -> Vec<Block> {
        let state = self.lock();
        let origin = state.pos;
        let mut found: Vec<Block> = state
            .blocks
            .iter()
            .filter(|(pos, name)| {
                matcher(name) && pos.distance_to(origin) <= max_distance as f64
            })
            .map(|(pos, name)| Block { pos: *pos, name: name.clone() })
            .collect();
        found.sort_by(|a, b| {
            a.pos
                .distance_to(origin)
                .partial_cmp(&b.pos.distance_to(origin))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.pos.cmp(&b.pos))
        });
        found.truncate(limit);
        found
    }

    fn inventory_items(&self) -> Vec<ItemStack> {
        let state = self.lock();
        let mut items: Vec<ItemStack> = state
            .inventory
            .iter()
            .map(|(name, count)| ItemStack { name: name.clone(), count: *count })
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        items
    }

    fn player_position(&self, name: &str) -> Option<Vec3> {
        self.lock().players.get(name).copied()
    }

    fn nearest_entity(&self, kind: &str, radius: f64) -> Option<Entity> {
        let state = self.lock();
        let origin = state.pos;
        state
            .entities
            .iter()
            .filter(|e| e.kind == kind && e.pos.distance_to(origin) <= radius)
            .min_by(|a, b| {
                a.pos
                    .distance_to(origin)
                    .partial_cmp(&b.pos.distance_to(origin))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|e| Entity { id: e.id, kind: e.kind.clone(), pos: e.pos, health: e.health })
    }

    fn entity_health(&self, id: u32) -> Option<f64> {
        self.lock().entities.iter().find(|e| e.id == id).map(|e| e.health)
    }

    fn clear_goals(&self) {}

    async fn path_to(&self, goal: Vec3, range: f64) -> Result<(), NavError> {
        sleep(Duration::from_millis(ACTION_MS)).await;
        let mut state = self.lock();
        if state.nav_failures > 0 {
            state.nav_failures -= 1;
            return Err(NavError::Unreachable);
        }
        if state.pos.distance_to(goal) <= range {
            return Ok(());
        }
        // Land just inside range, offset sideways so the avatar does not
        // end up inside the goal cell.
        let d = (range * 0.8).min(2.0);
        state.pos = Vec3::new(goal.x + d, goal.y, goal.z);
        Ok(())
    }

    async fn look_at(&self, _target: Vec3) {}

    async fn dig(&self, pos: BlockPos) -> FacadeResult<()> {
        sleep(Duration::from_millis(ACTION_MS)).await;
        let mut state = self.lock();
        let Some(name) = state.blocks.remove(&pos) else {
            return Err(FacadeError(format!("no block to dig at {pos}")));
        };
        // Drops only arrive when the equipped tool meets the requirement.
        let adequate = match tools::tool_requirement_for(&name) {
            None => {
                state.blocks.insert(pos, name);
                return Err(FacadeError("block is unbreakable".to_string()));
            }
            Some(req) if req.tier == Tier::None => true,
            Some(_) => matches!(
                tools::has_adequate(state.equipped.as_deref().into_iter(), &name),
                ToolCheck::Adequate(_)
            ),
        };
        if adequate {
            if let Some(drop) = crate::knowledge::drops::drop_for(&name) {
                let count = rand::thread_rng().gen_range(drop.min..=drop.max);
                *state.inventory.entry(drop.item.to_string()).or_insert(0) += count;
            } else if let Some(crop) = crate::knowledge::drops::crop_for(&name) {
                let count = rand::thread_rng().gen_range(crop.min..=crop.max);
                *state.inventory.entry(crop.item.to_string()).or_insert(0) += count;
            }
        }
        Ok(())
    }

    async fn place_block(&self, reference: BlockPos, face: BlockPos) -> FacadeResult<()> {
        sleep(Duration::from_millis(ACTION_MS)).await;
        let mut state = self.lock();
        let Some(item) = state.equipped.clone() else {
            return Err(FacadeError("nothing equipped".to_string()));
        };
        if !state.blocks.contains_key(&reference) {
            return Err(FacadeError(format!("no reference block at {reference}")));
        }
        let target = reference + face;
        if let Some(existing) = state.blocks.get(&target) {
            if !crate::knowledge::support::is_replaceable(existing) {
                return Err(FacadeError(format!("cell {target} is occupied")));
            }
        }
        if !Self::take_items(&mut state, &item, 1) {
            return Err(FacadeError(format!("no {item} left to place")));
        }
        state.blocks.insert(target, item);
        Ok(())
    }

    async fn equip(&self, item: &str) -> FacadeResult<()> {
        sleep(Duration::from_millis(ACTION_MS)).await;
        let mut state = self.lock();
        if state.inventory.get(item).copied().unwrap_or(0) == 0 {
            return Err(FacadeError(format!("cannot equip {item}: not held")));
        }
        state.equipped = Some(item.to_string());
        Ok(())
    }

    async fn toss(&self, item: &str, count: u32) -> FacadeResult<()> {
        sleep(Duration::from_millis(ACTION_MS)).await;
        let mut state = self.lock();
        if !Self::take_items(&mut state, item, count) {
            return Err(FacadeError(format!("cannot toss {count} {item}")));
        }
        state.tossed.push((item.to_string(), count));
        Ok(())
    }

    async fn attack(&self, entity_id: u32) -> FacadeResult<()> {
        sleep(Duration::from_millis(ACTION_MS)).await;
        let mut state = self.lock();
        let damage = Self::equipped_damage(&state);
        let Some(idx) = state.entities.iter().position(|e| e.id == entity_id) else {
            return Err(FacadeError(format!("no entity {entity_id}")));
        };
        state.entities[idx].health -= damage;
        if state.entities[idx].health <= 0.0 {
            let kind = state.entities.remove(idx).kind;
            for (item, count) in Self::mob_drops(&kind) {
                *state.inventory.entry(item.to_string()).or_insert(0) += count;
            }
        }
        Ok(())
    }

    async fn craft(&self, output: &str) -> FacadeResult<()> {
        sleep(Duration::from_millis(ACTION_MS)).await;
        let mut state = self.lock();
        let Some(recipe) = recipes::recipe_for(output) else {
            return Err(FacadeError(format!("no recipe for {output}")));
        };
        if recipe.needs_table {
            let near_table = state.blocks.iter().any(|(pos, name)| {
                name == "crafting_table" && pos.distance_to(state.pos) <= REACH_DISTANCE
            });
            if !near_table {
                return Err(FacadeError("no crafting table within reach".to_string()));
            }
        }
        // Resolve group slots against what is actually held.
        let mut needed: Vec<(String, u32)> = Vec::new();
        for input in recipe.inputs {
            let item = match input.slot {
                Slot::Exact(item) => item.to_string(),
                Slot::Group(family) => {
                    let held = |i: &str| state.inventory.get(i).copied().unwrap_or(0);
                    family
                        .best_held(&held)
                        .unwrap_or(family.canonical)
                        .to_string()
                }
            };
            needed.push((item, input.count));
        }
        for (item, count) in &needed {
            if state.inventory.get(item).copied().unwrap_or(0) < *count {
                return Err(FacadeError(format!("missing ingredient {item}")));
            }
        }
        for (item, count) in &needed {
            Self::take_items(&mut state, item, *count);
        }
        *state.inventory.entry(output.to_string()).or_insert(0) += recipe.output_count;
        Ok(())
    }

    async fn furnace_put_input(&self, pos: BlockPos, item: &str, count: u32) -> FacadeResult<()> {
        sleep(Duration::from_millis(ACTION_MS)).await;
        let now = Instant::now();
        let mut state = self.lock();
        if state.blocks.get(&pos).map(String::as_str) != Some("furnace") {
            return Err(FacadeError(format!("no furnace at {pos}")));
        }
        if !Self::take_items(&mut state, item, count) {
            return Err(FacadeError(format!("not holding {count} {item}")));
        }
        let furnace = state.furnaces.entry(pos).or_insert_with(|| SimFurnace::new(now));
        furnace.advance(now);
        match &mut furnace.input {
            Some((name, n)) if name == item => *n += count,
            slot => *slot = Some((item.to_string(), count)),
        }
        Ok(())
    }

    async fn furnace_put_fuel(&self, pos: BlockPos, item: &str, count: u32) -> FacadeResult<()> {
        sleep(Duration::from_millis(ACTION_MS)).await;
        let now = Instant::now();
        let ticks = smelting::fuel_ticks(item);
        if ticks == 0 {
            return Err(FacadeError(format!("{item} is not a fuel")));
        }
        let mut state = self.lock();
        if state.blocks.get(&pos).map(String::as_str) != Some("furnace") {
            return Err(FacadeError(format!("no furnace at {pos}")));
        }
        if !Self::take_items(&mut state, item, count) {
            return Err(FacadeError(format!("not holding {count} {item}")));
        }
        let furnace = state.furnaces.entry(pos).or_insert_with(|| SimFurnace::new(now));
        furnace.advance(now);
        furnace.burn += ticks as u64 * count as u64;
        Ok(())
    }

    fn furnace_output(&self, pos: BlockPos) -> Option<ItemStack> {
        let now = Instant::now();
        let mut state = self.lock();
        let furnace = state.furnaces.get_mut(&pos)?;
        furnace.advance(now);
        furnace
            .output
            .as_ref()
            .map(|(name, count)| ItemStack { name: name.clone(), count: *count })
    }

    async fn furnace_take_output(&self, pos: BlockPos) -> FacadeResult<Option<ItemStack>> {
        sleep(Duration::from_millis(ACTION_MS)).await;
        let now = Instant::now();
        let mut state = self.lock();
        let Some(furnace) = state.furnaces.get_mut(&pos) else {
            return Ok(None);
        };
        furnace.advance(now);
        let taken = furnace.output.take();
        if let Some((name, count)) = &taken {
            *state.inventory.entry(name.clone()).or_insert(0) += count;
        }
        Ok(taken.map(|(name, count)| ItemStack { name, count }))
    }
}
