//! Station manager: puts a crafting table or furnace within reach.
//!
//! Resolution order: walk to an existing station, place a held one on
//! solid ground nearby, or produce one via the resolver and then place
//! it. The crafting table's stationless recipe keeps the recursion
//! grounded.

use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use crate::agent::error::{AgentError, PlaceFailure};
use crate::agent::executor::Executor;
use crate::agent::inventory::Inventory;
use crate::agent::resolver::Resolver;
use crate::agent::task::StationKind;
use crate::config;
use crate::knowledge::support;
use crate::world::{BlockPos, World};

/// Horizontal cells tried around the avatar, nearest first.
const PLACE_RING: [(i32, i32); 10] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (-1, -1),
    (1, -1),
    (-1, 1),
    (2, 0),
    (0, 2),
];

pub(crate) async fn ensure<W: World>(
    cx: &Executor<'_, W>,
    kind: StationKind,
) -> Result<BlockPos, AgentError> {
    // An existing station beats placing or crafting one.
    if let Some(found) = cx
        .world
        .find_block(&|n| n == kind.as_str(), config::STATION_SEARCH_RADIUS)
    {
        cx.nav_to(found.pos.center(), config::REACH_DISTANCE).await?;
        return Ok(found.pos);
    }
    let inventory = Inventory::snapshot(cx.world);
    if inventory.held(kind.as_str()) > 0 {
        return place_station(cx, kind).await;
    }
    info!(station = kind.as_str(), "no station nearby, producing one");
    let plan = Resolver::new(cx.world).resolve(kind.as_str(), 1, &inventory)?;
    cx.run_subplan(&plan).await?;
    place_station(cx, kind).await
}

/// A cell is a placement candidate when it is free (or replaceable) and
/// sits on a full solid cube.
fn candidate_cell<W: World>(world: &W, origin: BlockPos, dx: i32, dz: i32) -> Option<BlockPos> {
    for dy in [0, 1, -1] {
        let cell = origin.offset(dx, dy, dz);
        let cell_name = world.block_at(cell).map(|b| b.name)?;
        let below_name = world.block_at(cell.down()).map(|b| b.name)?;
        if support::is_replaceable(&cell_name) && support::is_solid_support(&below_name) {
            return Some(cell);
        }
    }
    None
}

async fn place_station<W: World>(
    cx: &Executor<'_, W>,
    kind: StationKind,
) -> Result<BlockPos, AgentError> {
    let item = kind.as_str();
    let origin = cx.world.position().floor();
    if cx.world.equip(item).await.is_err() {
        return Err(AgentError::PlacementFailed {
            pos: origin,
            reason: PlaceFailure::EquipFailed,
        });
    }
    let mut attempts = 0;
    for (dx, dz) in PLACE_RING {
        if attempts >= config::STATION_PLACE_ATTEMPTS {
            break;
        }
        let Some(cell) = candidate_cell(cx.world, origin, dx, dz) else {
            continue;
        };
        attempts += 1;
        match cx.world.place_block(cell.down(), BlockPos::new(0, 1, 0)).await {
            Ok(()) => {
                sleep(Duration::from_millis(config::PLACE_VERIFY_DELAY_MS)).await;
                let placed = cx.world.block_at(cell).map(|b| b.name).unwrap_or_default();
                if placed == item {
                    info!(station = item, %cell, "station placed");
                    return Ok(cell);
                }
                warn!(station = item, %cell, "placement did not verify");
            }
            Err(e) => warn!(station = item, %cell, error = %e, "placement attempt failed"),
        }
    }
    Err(AgentError::PlacementFailed { pos: origin, reason: PlaceFailure::NoReference })
}
