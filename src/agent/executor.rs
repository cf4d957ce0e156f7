//! Serial plan executor.
//!
//! Walks a linear plan one task at a time, re-reading the inventory at
//! every boundary, skipping tasks the world already satisfied, and
//! halting the remainder of the plan on the first failure. Navigation
//! retries transient failures with a short backoff; everything else
//! fails the task on first occurrence.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::time::{sleep, Duration, Instant};
use tracing::{info, warn};

use crate::agent::error::AgentError;
use crate::agent::inventory::Inventory;
use crate::agent::resolver::Resolver;
use crate::agent::station;
use crate::agent::task::{FuelPlan, StationKind, Task};
use crate::config;
use crate::knowledge::drops;
use crate::knowledge::tools::{self, ToolCheck, ToolKind};
use crate::msg::{Event, Outbox};
use crate::world::{Vec3, World};

/// Structured outcome of one plan run.
#[derive(Debug)]
pub struct ExecReport {
    pub completed: usize,
    pub skipped: usize,
    pub total: usize,
    pub error: Option<AgentError>,
}

impl ExecReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    /// Tasks not yet attempted, the failing one included.
    pub fn remaining(&self) -> usize {
        self.total - self.completed - self.skipped
    }
}

pub struct Executor<'a, W: World> {
    pub(crate) world: &'a W,
    pub(crate) outbox: Outbox,
    pub(crate) abort: Arc<AtomicBool>,
}

impl<'a, W: World> Executor<'a, W> {
    pub fn new(world: &'a W, outbox: Outbox, abort: Arc<AtomicBool>) -> Self {
        Self { world, outbox, abort }
    }

    pub(crate) fn aborted(&self) -> bool {
        self.abort.load(Ordering::Relaxed)
    }

    pub(crate) fn chat(&self, message: impl Into<String>) {
        let _ = self.outbox.send(Event::Chat { message: message.into() });
    }

    /// Execute every task in order. A later task never starts before its
    /// predecessor resolved; completed side effects are never rolled back.
    pub async fn execute(&self, plan: &[Task]) -> ExecReport {
        let mut report = ExecReport { completed: 0, skipped: 0, total: plan.len(), error: None };
        for task in plan {
            if self.aborted() {
                self.world.clear_goals();
                report.error = Some(AgentError::Aborted);
                return report;
            }
            let inventory = Inventory::snapshot(self.world);
            if let Some((item, target)) = task.stock_target() {
                if inventory.held(&item) >= target {
                    info!(task = %task.describe(), "already satisfied, skipping");
                    report.skipped += 1;
                    continue;
                }
            }
            info!(task = %task.describe(), "running task");
            match self.run_task(task, &inventory).await {
                Ok(()) => report.completed += 1,
                Err(e) => {
                    warn!(
                        task = %task.describe(),
                        error = %e,
                        remaining = report.remaining(),
                        "task failed, halting plan"
                    );
                    report.error = Some(e);
                    return report;
                }
            }
        }
        report
    }

    /// Execute a nested plan (tool bootstrap, station production).
    pub(crate) async fn run_subplan(&self, plan: &[Task]) -> Result<(), AgentError> {
        let report = Box::pin(self.execute(plan)).await;
        match report.error {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }

    async fn run_task(&self, task: &Task, inventory: &Inventory) -> Result<(), AgentError> {
        match task {
            Task::Gather { block, count, .. } => self.gather(block, *count, inventory).await,
            Task::Harvest { crop, count, .. } => self.harvest(crop, *count, inventory).await,
            Task::Craft { output, inputs, repetitions, needs_table, .. } => {
                self.craft(output, inputs, *repetitions, *needs_table).await
            }
            Task::Smelt { input, count, fuel, .. } => self.smelt(input, *count, fuel).await,
            Task::EnsureTool { tool } => self.ensure_tool(tool).await,
            Task::EnsureStation { kind } => station::ensure(self, *kind).await.map(|_| ()),
            Task::Deliver { player, item, count } => self.deliver(player, item, *count).await,
        }
    }

    /// Navigate with retries for transient failures.
    pub(crate) async fn nav_to(&self, goal: Vec3, range: f64) -> Result<(), AgentError> {
        let mut attempts = 0;
        loop {
            match self.world.path_to(goal, range).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    let err = AgentError::from(e);
                    attempts += 1;
                    if !err.is_transient() || attempts >= config::TASK_RETRIES {
                        return Err(err);
                    }
                    warn!(error = %err, attempts, "navigation failed, retrying");
                    sleep(Duration::from_millis(config::RETRY_BACKOFF_MS)).await;
                }
            }
        }
    }

    // ─── Gather ──────────────────────────────────────────────────────

    async fn gather(&self, block: &str, count: u32, inventory: &Inventory) -> Result<(), AgentError> {
        let tool = match tools::has_adequate(inventory.item_names(), block) {
            ToolCheck::Adequate(tool) => tool,
            ToolCheck::Missing(req) => return Err(AgentError::ToolMissing(req)),
            ToolCheck::Unbreakable => return Err(AgentError::Unsatisfiable(block.to_string())),
        };
        if let Some(tool) = &tool {
            self.world.equip(tool).await?;
        }
        for _ in 0..count {
            if self.aborted() {
                return Err(AgentError::Aborted);
            }
            let found = self
                .world
                .find_block(&|n| n == block, config::BLOCK_SEARCH_RADIUS)
                .ok_or_else(|| AgentError::ResourceExhausted(block.to_string()))?;
            self.nav_to(found.pos.center(), config::REACH_DISTANCE).await?;
            self.world.dig(found.pos).await?;
            // Give the dropped item a moment to be picked up.
            sleep(Duration::from_millis(config::GATHER_PICKUP_DELAY_MS)).await;
        }
        Ok(())
    }

    // ─── Harvest ─────────────────────────────────────────────────────

    async fn harvest(
        &self,
        crop: &str,
        count: u32,
        inventory: &Inventory,
    ) -> Result<(), AgentError> {
        let seed = drops::crop_for(crop).map(|c| c.seed);
        // Crops break bare-handed; a hoe is equipped when one is carried.
        if let Some((hoe, _)) = inventory.best_tool_of_kind(ToolKind::Hoe) {
            self.world.equip(&hoe).await?;
        }
        for _ in 0..count {
            if self.aborted() {
                return Err(AgentError::Aborted);
            }
            let found = self
                .world
                .find_block(&|n| n == crop, config::BLOCK_SEARCH_RADIUS)
                .ok_or_else(|| AgentError::ResourceExhausted(crop.to_string()))?;
            self.nav_to(found.pos.center(), config::REACH_DISTANCE).await?;
            self.world.dig(found.pos).await?;
            sleep(Duration::from_millis(config::GATHER_PICKUP_DELAY_MS)).await;
            if let Some(seed) = seed {
                self.replant(found.pos, seed).await;
            }
        }
        Ok(())
    }

    /// Replanting is best-effort: failures are logged, never propagated.
    async fn replant(&self, pos: crate::world::BlockPos, seed: &str) {
        let inventory = Inventory::snapshot(self.world);
        if inventory.held(seed) == 0 {
            return;
        }
        let result = async {
            self.world.equip(seed).await?;
            self.world.place_block(pos.down(), crate::world::BlockPos::new(0, 1, 0)).await
        }
        .await;
        if let Err(e) = result {
            warn!(seed, error = %e, "replant failed");
        }
    }

    // ─── Craft ───────────────────────────────────────────────────────

    async fn craft(
        &self,
        output: &str,
        inputs: &[(String, u32)],
        repetitions: u32,
        needs_table: bool,
    ) -> Result<(), AgentError> {
        if needs_table {
            station::ensure(self, StationKind::CraftingTable).await?;
        }
        let inventory = Inventory::snapshot(self.world);
        for (item, per) in inputs {
            if inventory.held(item) < per * repetitions {
                return Err(AgentError::Unsatisfiable(item.clone()));
            }
        }
        for _ in 0..repetitions {
            if self.aborted() {
                return Err(AgentError::Aborted);
            }
            self.world.craft(output).await?;
            sleep(Duration::from_millis(config::CRAFT_DELAY_MS)).await;
        }
        Ok(())
    }

    // ─── Smelt ───────────────────────────────────────────────────────

    async fn smelt(&self, input: &str, count: u32, fuel: &FuelPlan) -> Result<(), AgentError> {
        let furnace = station::ensure(self, StationKind::Furnace).await?;
        let inventory = Inventory::snapshot(self.world);
        if inventory.held(input) < count {
            return Err(AgentError::Unsatisfiable(input.to_string()));
        }
        if inventory.held(&fuel.fuel) < fuel.count {
            return Err(AgentError::Unsatisfiable(fuel.fuel.clone()));
        }
        self.world.furnace_put_input(furnace, input, count).await?;
        self.world.furnace_put_fuel(furnace, &fuel.fuel, fuel.count).await?;

        let started = Instant::now();
        let mut last_progress = started;
        let mut last_count = 0;
        loop {
            if self.aborted() {
                return Err(AgentError::Aborted);
            }
            sleep(Duration::from_millis(config::SMELT_POLL_MS)).await;
            let now = Instant::now();
            let out = self.world.furnace_output(furnace).map(|s| s.count).unwrap_or(0);
            if out >= count {
                break;
            }
            if out > last_count {
                last_count = out;
                last_progress = now;
            }
            if now.duration_since(last_progress).as_secs() >= config::SMELT_STALL_SECS {
                return Err(AgentError::Timeout("smelting"));
            }
            if now.duration_since(started).as_secs() >= config::SMELT_TIMEOUT_SECS {
                return Err(AgentError::Timeout("smelting"));
            }
        }
        self.world.furnace_take_output(furnace).await?;
        Ok(())
    }

    // ─── Ensure tool ─────────────────────────────────────────────────

    /// No-op when the tool is held; otherwise the world changed since
    /// planning and the tool is produced via a nested resolution.
    async fn ensure_tool(&self, tool: &str) -> Result<(), AgentError> {
        let inventory = Inventory::snapshot(self.world);
        if inventory.held(tool) > 0 {
            self.world.equip(tool).await?;
            return Ok(());
        }
        info!(tool, "tool missing at execution time, bootstrapping");
        let plan = Resolver::new(self.world).resolve(tool, 1, &inventory)?;
        self.run_subplan(&plan).await?;
        self.world.equip(tool).await?;
        Ok(())
    }

    // ─── Deliver ─────────────────────────────────────────────────────

    async fn deliver(&self, player: &str, item: &str, count: u32) -> Result<(), AgentError> {
        let inventory = Inventory::snapshot(self.world);
        if inventory.held(item) < count {
            return Err(AgentError::Unsatisfiable(item.to_string()));
        }
        let target = self
            .world
            .player_position(player)
            .ok_or_else(|| AgentError::Facade(format!("player {player} is not visible")))?;
        self.nav_to(target, config::REACH_DISTANCE).await?;
        self.world.toss(item, count).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::sim::SimWorld;
    use crate::world::BlockPos;

    fn harness(world: &SimWorld) -> (Executor<'_, SimWorld>, Arc<AtomicBool>) {
        let abort = Arc::new(AtomicBool::new(false));
        let (outbox, _rx) = tokio::sync::broadcast::channel(64);
        (Executor::new(world, outbox, abort.clone()), abort)
    }

    fn forest_world() -> SimWorld {
        let world = SimWorld::new();
        for x in -8..12 {
            for z in -8..12 {
                world.set_block(BlockPos::new(x, 0, z), "grass_block");
            }
        }
        for i in 0..8 {
            world.set_block(BlockPos::new(3 + i, 1, 2), "oak_log");
            world.set_block(BlockPos::new(-4, 1, 3 + i), "stone");
        }
        world
    }

    #[tokio::test(start_paused = true)]
    async fn simple_gather_executes() {
        // S1 end to end: three stone mined into three cobblestone.
        let world = forest_world();
        world.give("wooden_pickaxe", 1);
        let (exec, _) = harness(&world);
        let plan = vec![Task::Gather { block: "stone".into(), count: 3, stock_target: 3 }];
        let report = exec.execute(&plan).await;
        assert!(report.succeeded(), "{report:?}");
        assert_eq!(report.completed, 1);
        assert_eq!(world.held("cobblestone"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn bootstrap_executes_end_to_end() {
        // S2 end to end: from an empty inventory to a stone pickaxe.
        let world = forest_world();
        let (exec, _) = harness(&world);
        let plan = Resolver::new(&world)
            .resolve("stone_pickaxe", 1, &Inventory::new())
            .unwrap();
        let report = exec.execute(&plan).await;
        assert!(report.succeeded(), "{report:?}");
        assert_eq!(world.held("stone_pickaxe"), 1);
        assert_eq!(world.held("wooden_pickaxe"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn smelt_executes_with_fuel_plan() {
        // S3 end to end.
        let world = forest_world();
        world.set_block(BlockPos::new(2, 1, -2), "furnace");
        world.give("raw_iron", 4);
        world.give("oak_log", 2);
        let (exec, _) = harness(&world);
        let start = Inventory::snapshot(&world);
        let plan = Resolver::new(&world).resolve("iron_ingot", 4, &start).unwrap();
        let report = exec.execute(&plan).await;
        assert!(report.succeeded(), "{report:?}");
        assert_eq!(world.held("iron_ingot"), 4);
        assert_eq!(world.held("oak_log"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn smelt_times_out_without_progress() {
        let world = SimWorld::new();
        world.set_block(BlockPos::new(2, 1, 0), "furnace");
        world.give("raw_iron", 1);
        world.give("stick", 1);
        let (exec, _) = harness(&world);
        // A single stick is 100 ticks; the item needs 200 and never lands.
        let plan = vec![Task::Smelt {
            output: "iron_ingot".into(),
            input: "raw_iron".into(),
            count: 1,
            fuel: FuelPlan { fuel: "stick".into(), count: 1 },
            stock_target: 1,
        }];
        let report = exec.execute(&plan).await;
        assert_eq!(report.error, Some(AgentError::Timeout("smelting")));
    }

    #[tokio::test(start_paused = true)]
    async fn satisfied_tasks_are_skipped() {
        let world = forest_world();
        world.give("cobblestone", 5);
        let (exec, _) = harness(&world);
        let plan = vec![Task::Gather { block: "stone".into(), count: 3, stock_target: 3 }];
        let report = exec.execute(&plan).await;
        assert!(report.succeeded());
        assert_eq!(report.skipped, 1);
        assert_eq!(report.completed, 0);
        // Nothing was mined.
        assert_eq!(world.held("cobblestone"), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn resolve_execute_resolve_is_idempotent() {
        let world = forest_world();
        let (exec, _) = harness(&world);
        let plan = Resolver::new(&world)
            .resolve("stone_pickaxe", 1, &Inventory::new())
            .unwrap();
        assert!(exec.execute(&plan).await.succeeded());
        let again = Resolver::new(&world)
            .resolve("stone_pickaxe", 1, &Inventory::snapshot(&world))
            .unwrap();
        assert!(again.is_empty(), "{again:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn nav_failures_are_retried() {
        let world = forest_world();
        world.give("wooden_pickaxe", 1);
        world.fail_next_navs(2);
        let (exec, _) = harness(&world);
        let plan = vec![Task::Gather { block: "stone".into(), count: 1, stock_target: 1 }];
        let report = exec.execute(&plan).await;
        assert!(report.succeeded(), "{report:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn nav_failure_exhausts_retries() {
        let world = forest_world();
        world.give("wooden_pickaxe", 1);
        world.fail_next_navs(10);
        let (exec, _) = harness(&world);
        let plan = vec![Task::Gather { block: "stone".into(), count: 1, stock_target: 1 }];
        let report = exec.execute(&plan).await;
        assert!(matches!(report.error, Some(AgentError::Nav(_))), "{report:?}");
        assert_eq!(report.remaining(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn abort_stops_between_tasks() {
        let world = forest_world();
        world.give("wooden_pickaxe", 1);
        let (exec, abort) = harness(&world);
        abort.store(true, Ordering::Relaxed);
        let plan = vec![Task::Gather { block: "stone".into(), count: 1, stock_target: 1 }];
        let report = exec.execute(&plan).await;
        assert_eq!(report.error, Some(AgentError::Aborted));
        assert_eq!(report.completed, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn gather_reports_exhaustion() {
        let world = SimWorld::new();
        world.give("wooden_pickaxe", 1);
        let (exec, _) = harness(&world);
        let plan = vec![Task::Gather { block: "stone".into(), count: 1, stock_target: 1 }];
        let report = exec.execute(&plan).await;
        assert_eq!(report.error, Some(AgentError::ResourceExhausted("stone".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn deliver_tosses_within_reach() {
        let world = SimWorld::new();
        world.give("bread", 3);
        world.add_player("explorer", Vec3::new(12.0, 1.0, 4.0));
        let (exec, _) = harness(&world);
        let plan = vec![Task::Deliver { player: "explorer".into(), item: "bread".into(), count: 3 }];
        let report = exec.execute(&plan).await;
        assert!(report.succeeded(), "{report:?}");
        assert_eq!(world.tossed(), vec![("bread".to_string(), 3)]);
        assert!(world.position().distance_to(Vec3::new(12.0, 1.0, 4.0)) <= config::REACH_DISTANCE);
    }

    #[tokio::test(start_paused = true)]
    async fn harvest_collects_and_replants() {
        let world = SimWorld::new();
        world.set_block(BlockPos::new(4, 1, 0), "wheat");
        world.set_block(BlockPos::new(4, 0, 0), "farmland");
        world.give("wheat_seeds", 2);
        world.give("iron_hoe", 1);
        let (exec, _) = harness(&world);
        let plan = vec![Task::Harvest { crop: "wheat".into(), count: 1, stock_target: 1 }];
        let report = exec.execute(&plan).await;
        assert!(report.succeeded(), "{report:?}");
        assert_eq!(world.held("wheat"), 1);
        // Best-effort replant happened against the farmland below.
        assert_eq!(world.block_name(BlockPos::new(4, 1, 0)), "wheat_seeds");
    }

    #[tokio::test(start_paused = true)]
    async fn ensure_tool_bootstraps_after_world_drift() {
        let world = forest_world();
        let (exec, _) = harness(&world);
        let plan = vec![Task::EnsureTool { tool: "wooden_pickaxe".into() }];
        let report = exec.execute(&plan).await;
        assert!(report.succeeded(), "{report:?}");
        assert_eq!(world.held("wooden_pickaxe"), 1);
        assert_eq!(world.equipped(), Some("wooden_pickaxe".to_string()));
    }
}
