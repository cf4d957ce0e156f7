//! Single-target engagement: hunt the nearest matching mob until the
//! radius is clear, with stall and hard-cap timeouts per target.

use tokio::time::{sleep, Duration, Instant};
use tracing::{info, warn};

use crate::agent::error::AgentError;
use crate::agent::executor::Executor;
use crate::agent::inventory::Inventory;
use crate::config;
use crate::world::World;

/// Weapon preference: swords over axes, then tier, golden last.
fn weapon_rank(name: &str) -> Option<u32> {
    let kind = if name.ends_with("_sword") {
        100
    } else if name.ends_with("_axe") && !name.ends_with("_pickaxe") {
        0
    } else {
        return None;
    };
    let tier = match name.split('_').next() {
        Some("netherite") => 6,
        Some("diamond") => 5,
        Some("iron") => 4,
        Some("stone") => 3,
        Some("wooden") => 2,
        Some("golden") => 1,
        _ => return None,
    };
    Some(kind + tier)
}

pub fn best_weapon(inventory: &Inventory) -> Option<String> {
    inventory
        .list_items(|name| weapon_rank(name).is_some())
        .into_iter()
        .max_by_key(|name| weapon_rank(name).unwrap_or(0))
}

/// Fight matching mobs inside `radius` until none remain. Returns the
/// number of kills.
pub async fn fight<W: World>(
    cx: &Executor<'_, W>,
    mob: &str,
    radius: f64,
) -> Result<u32, AgentError> {
    if let Some(weapon) = best_weapon(&Inventory::snapshot(cx.world)) {
        cx.world.equip(&weapon).await?;
    }

    let mut kills = 0u32;
    let mut engaged: Option<u32> = None;
    let mut target_start = Instant::now();
    let mut last_hp = f64::MAX;
    let mut last_progress = Instant::now();

    loop {
        if cx.aborted() {
            return Err(AgentError::Aborted);
        }
        if cx.world.health() < config::RETREAT_HEALTH {
            warn!("health too low, disengaging");
            return Err(AgentError::Aborted);
        }
        let Some(target) = cx.world.nearest_entity(mob, radius) else {
            if kills == 0 {
                return Err(AgentError::ResourceExhausted(mob.to_string()));
            }
            info!(mob, kills, "area clear");
            return Ok(kills);
        };
        let now = Instant::now();
        if engaged != Some(target.id) {
            engaged = Some(target.id);
            target_start = now;
            last_hp = target.health;
            last_progress = now;
        }
        if now.duration_since(target_start).as_secs() >= config::ATTACK_TIMEOUT_SECS {
            return Err(AgentError::Timeout("attack"));
        }
        if now.duration_since(last_progress).as_secs() >= config::ATTACK_STALL_SECS {
            return Err(AgentError::Timeout("attack"));
        }

        if target.pos.distance_to(cx.world.position()) > config::ATTACK_RANGE {
            cx.nav_to(target.pos, config::ATTACK_RANGE * 0.8).await?;
        } else {
            cx.world.look_at(target.pos).await;
            cx.world.attack(target.id).await?;
            match cx.world.entity_health(target.id) {
                None => {
                    kills += 1;
                    engaged = None;
                }
                Some(hp) => {
                    if hp < last_hp {
                        last_hp = hp;
                        last_progress = Instant::now();
                    }
                }
            }
        }
        sleep(Duration::from_millis(config::ATTACK_TICK_MS)).await;
    }
}
