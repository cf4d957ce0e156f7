//! Agent front-end: turns parsed intents into plans and drives them,
//! guarding against concurrent commands and handling stop/status out of
//! band.

pub mod blueprint;
pub mod builder;
pub mod combat;
pub mod error;
pub mod executor;
pub mod inventory;
pub mod resolver;
pub mod station;
pub mod task;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use crate::agent::blueprint::Blueprint;
use crate::agent::builder::BuildOptions;
use crate::agent::error::AgentError;
use crate::agent::executor::Executor;
use crate::agent::inventory::Inventory;
use crate::agent::resolver::Resolver;
use crate::agent::task::{describe_plan, Plan, Task};
use crate::config;
use crate::knowledge::drops;
use crate::msg::{Event, Intent, IntentDocument, Outbox, StatusPayload};
use crate::world::{BlockPos, Vec3, World};

pub struct Agent<W: World> {
    world: Arc<W>,
    outbox: Outbox,
    abort: Arc<AtomicBool>,
    processing: Arc<AtomicBool>,
    current_action: Mutex<Option<String>>,
    loaded_blueprint: Mutex<Option<Blueprint>>,
}

impl<W: World> Agent<W> {
    pub fn new(world: Arc<W>, outbox: Outbox) -> Self {
        Self {
            world,
            outbox,
            abort: Arc::new(AtomicBool::new(false)),
            processing: Arc::new(AtomicBool::new(false)),
            current_action: Mutex::new(None),
            loaded_blueprint: Mutex::new(None),
        }
    }

    fn chat(&self, message: impl Into<String>) {
        let _ = self.outbox.send(Event::Chat { message: message.into() });
    }

    pub fn status(&self) -> StatusPayload {
        let pos = self.world.position();
        StatusPayload {
            connected: self.world.connected(),
            position: [pos.x, pos.y, pos.z],
            health: self.world.health(),
            food: self.world.food(),
            current_action: self.current_action.lock().expect("action lock poisoned").clone(),
            processing: self.processing.load(Ordering::Acquire),
        }
    }

    fn send_status(&self) {
        let _ = self.outbox.send(Event::Status(self.status()));
    }

    /// Request cancellation of whatever is running. Takes effect at the
    /// next task or voxel boundary.
    fn stop(&self) {
        self.abort.store(true, Ordering::Relaxed);
        self.world.clear_goals();
        self.chat("Stopping.");
    }

    /// Entry point for one parsed document. Stop, status and respond are
    /// served even while a plan is running; everything else is rejected
    /// with a busy notice rather than queued.
    pub async fn handle(&self, document: IntentDocument) {
        let steps: Vec<Intent> = match document {
            IntentDocument::Failure { error } => {
                warn!(%error, "intent parser failed");
                self.chat(format!("I couldn't work that out: {error}"));
                return;
            }
            IntentDocument::Multi { steps, .. } => steps,
            IntentDocument::Single(intent) => vec![intent],
        };
        if let [only] = &steps[..] {
            match only {
                Intent::Stop => {
                    self.stop();
                    return;
                }
                Intent::Status => {
                    self.send_status();
                    return;
                }
                Intent::Respond { message } => {
                    self.chat(message.clone());
                    return;
                }
                _ => {}
            }
        }
        if self
            .processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.chat(AgentError::Busy.to_string());
            return;
        }
        self.abort.store(false, Ordering::Relaxed);

        for (index, intent) in steps.iter().enumerate() {
            *self.current_action.lock().expect("action lock poisoned") = Some(intent.label());
            info!(step = index + 1, total = steps.len(), action = %intent.label(), "running step");
            match self.run_intent(intent).await {
                Ok(line) => self.chat(line),
                Err(e) => {
                    // Halt the remaining steps; completed side effects stay.
                    self.chat(format!("{} failed: {e}", intent.label()));
                    break;
                }
            }
        }
        *self.current_action.lock().expect("action lock poisoned") = None;
        self.processing.store(false, Ordering::Release);
    }

    async fn run_intent(&self, intent: &Intent) -> Result<String, AgentError> {
        let exec = Executor::new(self.world.as_ref(), self.outbox.clone(), self.abort.clone());
        match intent {
            Intent::Mine { block_type, count } => {
                // Mining a block means obtaining what it drops.
                let goal = drops::drop_for(block_type)
                    .map(|d| d.item.to_string())
                    .unwrap_or_else(|| block_type.clone());
                self.run_goal(&exec, &goal, *count).await
            }
            Intent::Craft { item_name, count } | Intent::Smelt { item_name, count } => {
                self.run_goal(&exec, item_name, *count).await
            }
            Intent::Give { player_name, item_name, count } => {
                let inventory = Inventory::snapshot(self.world.as_ref());
                let mut plan =
                    Resolver::new(self.world.as_ref()).resolve(item_name, *count, &inventory)?;
                plan.push(Task::Deliver {
                    player: player_name.clone(),
                    item: item_name.clone(),
                    count: *count,
                });
                self.run_plan(&exec, &plan).await?;
                Ok(format!("Delivered {count} {item_name} to {player_name}."))
            }
            Intent::Fight { mob_type, radius } => {
                let kills = combat::fight(&exec, mob_type, *radius).await?;
                Ok(format!("Fought off {kills} {mob_type}."))
            }
            Intent::Harvest { crop_type, radius } => {
                let crop = drops::crop_for(crop_type)
                    .or_else(|| drops::harvest_source(crop_type))
                    .ok_or_else(|| AgentError::Unsatisfiable(crop_type.clone()))?;
                let found = self.world.find_blocks(
                    &|n| n == crop.block,
                    *radius as u32,
                    256,
                );
                if found.is_empty() {
                    return Err(AgentError::ResourceExhausted(crop.block.to_string()));
                }
                let plan = vec![Task::Harvest {
                    crop: crop.block.to_string(),
                    count: found.len() as u32,
                    stock_target: u32::MAX,
                }];
                self.run_plan(&exec, &plan).await?;
                Ok(format!("Harvested {} {}.", found.len(), crop.block))
            }
            Intent::Follow { player_name, distance } => {
                self.follow(&exec, player_name, distance.unwrap_or(config::FOLLOW_DEFAULT_DISTANCE))
                    .await
            }
            Intent::Goto { x, y, z } => {
                exec.nav_to(Vec3::new(*x, *y, *z), 1.0).await?;
                Ok(format!("Arrived at ({x:.0}, {y:.0}, {z:.0})."))
            }
            Intent::Respond { message } => Ok(message.clone()),
            Intent::LoadBlueprint { file_path } => {
                let blueprint = Blueprint::load(file_path)?;
                let blocks = blueprint.voxels.len();
                let [dx, dy, dz] = blueprint.dims;
                *self.loaded_blueprint.lock().expect("blueprint lock poisoned") = Some(blueprint);
                Ok(format!("Loaded blueprint: {dx}x{dy}x{dz}, {blocks} blocks."))
            }
            Intent::BuildStructure { blueprint, position } => {
                let loaded = match blueprint {
                    Some(path) => Blueprint::load(path)?,
                    None => self
                        .loaded_blueprint
                        .lock()
                        .expect("blueprint lock poisoned")
                        .clone()
                        .ok_or_else(|| AgentError::Facade("no blueprint loaded".to_string()))?,
                };
                let origin = match position {
                    Some([x, y, z]) => BlockPos::new(*x, *y, *z),
                    // Default: just in front of where the avatar stands.
                    None => self.world.position().floor().offset(2, 0, 2),
                };
                let report =
                    builder::build(&exec, &loaded, origin, &BuildOptions::default()).await?;
                Ok(format!(
                    "Build finished: {} placed, {} skipped, {} failed.",
                    report.placed, report.skipped, report.failed
                ))
            }
            Intent::Stop => {
                self.stop();
                Ok("Stopped.".to_string())
            }
            Intent::Status => {
                self.send_status();
                Ok("Status sent.".to_string())
            }
        }
    }

    async fn run_goal(
        &self,
        exec: &Executor<'_, W>,
        goal: &str,
        count: u32,
    ) -> Result<String, AgentError> {
        let inventory = Inventory::snapshot(self.world.as_ref());
        let plan = Resolver::new(self.world.as_ref()).resolve(goal, count, &inventory)?;
        if plan.is_empty() {
            return Ok(format!("Already holding {count} {goal}."));
        }
        self.chat(format!("Plan: {}", describe_plan(&plan)));
        self.run_plan(exec, &plan).await?;
        Ok(format!("Done: {count} {goal}."))
    }

    async fn run_plan(&self, exec: &Executor<'_, W>, plan: &Plan) -> Result<(), AgentError> {
        let report = exec.execute(plan).await;
        match report.error {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }

    async fn follow(
        &self,
        exec: &Executor<'_, W>,
        player: &str,
        distance: f64,
    ) -> Result<String, AgentError> {
        loop {
            if self.abort.load(Ordering::Relaxed) {
                return Ok(format!("Stopped following {player}."));
            }
            let Some(target) = self.world.player_position(player) else {
                return Err(AgentError::Facade(format!("player {player} is not visible")));
            };
            if self.world.position().distance_to(target) > distance {
                exec.nav_to(target, distance).await?;
            }
            sleep(Duration::from_millis(config::FOLLOW_POLL_MS)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast;

    use crate::world::sim::SimWorld;

    fn agent_with_events(world: SimWorld) -> (Arc<Agent<SimWorld>>, broadcast::Receiver<Event>) {
        let (outbox, rx) = broadcast::channel(256);
        (Arc::new(Agent::new(Arc::new(world), outbox)), rx)
    }

    fn drain_chat(rx: &mut broadcast::Receiver<Event>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let Event::Chat { message } = event {
                out.push(message);
            }
        }
        out
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
    async fn mine_command_runs_to_completion() {
        let world = forest_world();
        world.give("wooden_pickaxe", 1);
        let (agent, mut rx) = agent_with_events(world);
        agent
            .handle(IntentDocument::Single(Intent::Mine {
                block_type: "stone".into(),
                count: 3,
            }))
            .await;
        let chats = drain_chat(&mut rx);
        assert!(chats.iter().any(|c| c.starts_with("Plan:")), "{chats:?}");
        assert!(chats.iter().any(|c| c.starts_with("Done:")), "{chats:?}");
        assert_eq!(agent.world.inventory_items().iter().find(|s| s.name == "cobblestone").map(|s| s.count), Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn busy_commands_are_rejected_not_queued() {
        let world = forest_world();
        let (agent, mut rx) = agent_with_events(world);
        agent.processing.store(true, Ordering::Release);
        agent
            .handle(IntentDocument::Single(Intent::Mine {
                block_type: "stone".into(),
                count: 1,
            }))
            .await;
        let chats = drain_chat(&mut rx);
        assert_eq!(chats, vec![AgentError::Busy.to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn status_bypasses_the_busy_guard() {
        let world = forest_world();
        let (agent, mut rx) = agent_with_events(world);
        agent.processing.store(true, Ordering::Release);
        agent.handle(IntentDocument::Single(Intent::Status)).await;
        let mut saw_status = false;
        while let Ok(event) = rx.try_recv() {
            if let Event::Status(status) = event {
                assert!(status.processing);
                saw_status = true;
            }
        }
        assert!(saw_status);
    }

    #[tokio::test(start_paused = true)]
    async fn multistep_halts_on_first_failure() {
        let world = forest_world();
        let (agent, mut rx) = agent_with_events(world);
        agent
            .handle(IntentDocument::Multi {
                is_multistep: true,
                steps: vec![
                    Intent::Mine { block_type: "bedrock".into(), count: 1 },
                    Intent::Respond { message: "never reached".into() },
                ],
            })
            .await;
        let chats = drain_chat(&mut rx);
        assert!(chats.iter().any(|c| c.contains("failed")), "{chats:?}");
        assert!(!chats.iter().any(|c| c == "never reached"), "{chats:?}");
        assert!(!agent.processing.load(Ordering::Acquire));
    }

    #[tokio::test(start_paused = true)]
    async fn multistep_executes_in_order() {
        let world = forest_world();
        let (agent, mut rx) = agent_with_events(world);
        agent
            .handle(IntentDocument::Multi {
                is_multistep: true,
                steps: vec![
                    Intent::Mine { block_type: "oak_log".into(), count: 2 },
                    Intent::Craft { item_name: "oak_planks".into(), count: 4 },
                ],
            })
            .await;
        let chats = drain_chat(&mut rx);
        let dones: Vec<&String> = chats.iter().filter(|c| c.starts_with("Done:")).collect();
        assert_eq!(dones.len(), 2, "{chats:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn parser_failure_is_reported() {
        let (agent, mut rx) = agent_with_events(SimWorld::new());
        agent
            .handle(IntentDocument::Failure { error: "no verb".into() })
            .await;
        let chats = drain_chat(&mut rx);
        assert_eq!(chats.len(), 1);
        assert!(chats[0].contains("no verb"));
    }

    #[tokio::test(start_paused = true)]
    async fn give_resolves_then_delivers() {
        let world = forest_world();
        world.give("bread", 2);
        world.add_player("friend", Vec3::new(8.0, 1.0, 8.0));
        let (agent, mut rx) = agent_with_events(world);
        agent
            .handle(IntentDocument::Single(Intent::Give {
                player_name: "friend".into(),
                item_name: "bread".into(),
                count: 2,
            }))
            .await;
        let chats = drain_chat(&mut rx);
        assert!(chats.iter().any(|c| c.starts_with("Delivered 2 bread")), "{chats:?}");
        assert_eq!(agent.world.inventory_items().iter().find(|s| s.name == "bread"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn unsatisfiable_goal_reports_cleanly() {
        // S6 at the command layer.
        let world = forest_world();
        let (agent, mut rx) = agent_with_events(world);
        agent
            .handle(IntentDocument::Single(Intent::Mine {
                block_type: "bedrock".into(),
                count: 1,
            }))
            .await;
        let chats = drain_chat(&mut rx);
        assert!(
            chats.iter().any(|c| c.contains("no way to obtain bedrock")),
            "{chats:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn goto_navigates() {
        let (agent, mut rx) = agent_with_events(SimWorld::new());
        agent
            .handle(IntentDocument::Single(Intent::Goto { x: 30.0, y: 2.0, z: -10.0 }))
            .await;
        let chats = drain_chat(&mut rx);
        assert!(chats.iter().any(|c| c.starts_with("Arrived")), "{chats:?}");
        assert!(agent.world.position().distance_to(Vec3::new(30.0, 2.0, -10.0)) <= 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn blueprint_load_and_build() {
        let world = forest_world();
        world.give("cobblestone", 4);
        let (agent, mut rx) = agent_with_events(world);

        let dir = std::env::temp_dir().join("stonewright-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("slab.json");
        std::fs::write(
            &path,
            r#"{"dims":[2,1,2],"voxels":[
                {"offset":[0,0,0],"block":"cobblestone"},
                {"offset":[1,0,0],"block":"cobblestone"},
                {"offset":[0,0,1],"block":"cobblestone"},
                {"offset":[1,0,1],"block":"cobblestone"}
            ]}"#,
        )
        .unwrap();

        agent
            .handle(IntentDocument::Single(Intent::LoadBlueprint {
                file_path: path.to_string_lossy().into_owned(),
            }))
            .await;
        agent
            .handle(IntentDocument::Single(Intent::BuildStructure {
                blueprint: None,
                position: Some([4, 1, 4]),
            }))
            .await;
        let chats = drain_chat(&mut rx);
        assert!(chats.iter().any(|c| c.starts_with("Loaded blueprint: 2x1x2")), "{chats:?}");
        assert!(
            chats.iter().any(|c| c.contains("4 placed, 0 skipped, 0 failed")),
            "{chats:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stop_aborts_a_running_follow() {
        let world = SimWorld::new();
        world.add_player("friend", Vec3::new(40.0, 1.0, 0.0));
        let (agent, mut rx) = agent_with_events(world);
        let runner = {
            let agent = agent.clone();
            tokio::spawn(async move {
                agent
                    .handle(IntentDocument::Single(Intent::Follow {
                        player_name: "friend".into(),
                        distance: None,
                    }))
                    .await;
            })
        };
        // Let the follow loop spin a few times, then stop it.
        sleep(Duration::from_secs(2)).await;
        agent.handle(IntentDocument::Single(Intent::Stop)).await;
        runner.await.unwrap();
        let chats = drain_chat(&mut rx);
        assert!(chats.iter().any(|c| c.contains("Stopped following")), "{chats:?}");
        assert!(!agent.processing.load(Ordering::Acquire));
    }
}
