//! Structure builder: turns a blueprint into verified block placements.
//!
//! Phases: material acquisition (deficits delegated to the resolver),
//! optional ground preparation and area clearing, then bottom-up ordered
//! placement. Every placement is verified after a settle delay; a voxel
//! gets three attempts and optionally a scaffolding block underneath
//! before it is counted as failed. Failed voxels do not halt the build;
//! they are reported at the end.

use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use crate::agent::blueprint::{BlockProperties, Blueprint, Voxel};
use crate::agent::error::{AgentError, PlaceFailure};
use crate::agent::executor::Executor;
use crate::agent::inventory::Inventory;
use crate::agent::resolver::Resolver;
use crate::config;
use crate::knowledge::support;
use crate::world::{BlockPos, World, FACES};

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub prepare_ground: bool,
    pub clear_area: bool,
    pub scaffolding: bool,
    /// Sort placements bottom-up by (y, x, z). When cleared the
    /// blueprint's listed voxel order is kept verbatim; only the sorted
    /// order guarantees every voxel meets a support face.
    pub layer_by_layer: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self { prepare_ground: false, clear_area: false, scaffolding: true, layer_by_layer: true }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub placed: u32,
    pub skipped: u32,
    pub failed: u32,
}

enum PlaceOutcome {
    Placed,
    Skipped,
}

pub async fn build<W: World>(
    cx: &Executor<'_, W>,
    blueprint: &Blueprint,
    origin: BlockPos,
    options: &BuildOptions,
) -> Result<BuildReport, AgentError> {
    blueprint.validate()?;
    acquire_materials(cx, blueprint, origin).await?;
    if options.prepare_ground {
        prepare_ground(cx, blueprint, origin).await?;
    }
    if options.clear_area {
        clear_area(cx, blueprint, origin).await?;
    }

    let order: Vec<&Voxel> = if options.layer_by_layer {
        blueprint.ordered()
    } else {
        blueprint.voxels.iter().collect()
    };
    let mut report = BuildReport::default();
    for voxel in order {
        if cx.aborted() {
            cx.world.clear_goals();
            return Err(AgentError::Aborted);
        }
        let target = blueprint.world_pos(origin, voxel);
        match place_voxel(cx, target, voxel, options).await {
            Ok(PlaceOutcome::Placed) => report.placed += 1,
            Ok(PlaceOutcome::Skipped) => report.skipped += 1,
            Err(e) => {
                warn!(%target, block = %voxel.block, error = %e, "voxel failed");
                report.failed += 1;
            }
        }
    }
    info!(placed = report.placed, skipped = report.skipped, failed = report.failed, "build finished");
    Ok(report)
}

/// Bring the inventory up to the material multiset of the voxels still
/// missing from the world, one deficit at a time through the resolver.
async fn acquire_materials<W: World>(
    cx: &Executor<'_, W>,
    blueprint: &Blueprint,
    origin: BlockPos,
) -> Result<(), AgentError> {
    let missing = blueprint.voxels.iter().filter(|voxel| {
        let cell = blueprint.world_pos(origin, voxel);
        cx.world.block_at(cell).map(|b| b.name).unwrap_or_default() != voxel.block
    });
    for (block, count) in Blueprint::material_multiset(missing) {
        let inventory = Inventory::snapshot(cx.world);
        if inventory.held(&block) >= count {
            continue;
        }
        info!(block = %block, count, "acquiring build materials");
        let plan = Resolver::new(cx.world).resolve(&block, count, &inventory)?;
        cx.run_subplan(&plan).await?;
    }
    Ok(())
}

/// Ensure every cell under the base rectangle is a solid cube, filling
/// holes with whatever fill material is held.
async fn prepare_ground<W: World>(
    cx: &Executor<'_, W>,
    blueprint: &Blueprint,
    origin: BlockPos,
) -> Result<(), AgentError> {
    for (x, z) in blueprint.base_footprint() {
        if cx.aborted() {
            return Err(AgentError::Aborted);
        }
        let cell = origin.offset(x, -1, z);
        let name = cx.world.block_at(cell).map(|b| b.name).unwrap_or_default();
        if support::is_solid_support(&name) {
            continue;
        }
        let inventory = Inventory::snapshot(cx.world);
        let Some(fill) = support::GROUND_FILL.iter().find(|f| inventory.held(f) > 0) else {
            warn!(%cell, "no fill material held, leaving gap in ground");
            continue;
        };
        if !support::is_replaceable(&name) {
            cx.nav_to(cell.center(), config::REACH_DISTANCE).await?;
            cx.world.dig(cell).await?;
        }
        if let Err(e) = place_cube(cx, cell, fill).await {
            warn!(%cell, error = %e, "ground fill failed");
        }
    }
    Ok(())
}

/// Dig every block in the bounding box that differs from its target.
async fn clear_area<W: World>(
    cx: &Executor<'_, W>,
    blueprint: &Blueprint,
    origin: BlockPos,
) -> Result<(), AgentError> {
    let [dx, dy, dz] = blueprint.dims;
    // Top-down so nothing collapses onto cells cleared below it.
    for y in (0..dy).rev() {
        for x in 0..dx {
            for z in 0..dz {
                if cx.aborted() {
                    return Err(AgentError::Aborted);
                }
                let target = blueprint
                    .block_at([x, y, z])
                    .map(|v| v.block.as_str())
                    .unwrap_or("air");
                let cell = origin.offset(x, y, z);
                let name = cx.world.block_at(cell).map(|b| b.name).unwrap_or_default();
                if name == "air" || name == target {
                    continue;
                }
                cx.nav_to(cell.center(), config::REACH_DISTANCE).await?;
                cx.world.dig(cell).await?;
            }
        }
    }
    Ok(())
}

/// Neighbour scan order, biased by the voxel's orientation: wall-mounted
/// blocks look behind themselves first, top-half blocks look up first,
/// everything else prefers the block below.
fn reference_scan_order(properties: &BlockProperties) -> Vec<BlockPos> {
    let mut order: Vec<BlockPos> = FACES.to_vec();
    if properties.half.as_deref() == Some("top") {
        order.rotate_right(1); // puts the above-neighbour first
        return order;
    }
    if let Some(facing) = properties.facing.as_deref() {
        let attachment = match facing {
            "north" => Some(BlockPos::new(0, 0, 1)),
            "south" => Some(BlockPos::new(0, 0, -1)),
            "west" => Some(BlockPos::new(1, 0, 0)),
            "east" => Some(BlockPos::new(-1, 0, 0)),
            _ => None,
        };
        if let Some(att) = attachment {
            order.retain(|o| *o != att);
            order.insert(0, att);
        }
    }
    order
}

/// Find a neighbour offering a valid support face for `target`.
fn find_reference<W: World>(
    world: &W,
    target: BlockPos,
    properties: &BlockProperties,
) -> Option<(BlockPos, BlockPos)> {
    for offset in reference_scan_order(properties) {
        let neighbour = target + offset;
        let Some(block) = world.block_at(neighbour) else {
            continue;
        };
        if support::is_solid_support(&block.name) {
            // Face normal points from the neighbour back toward the target.
            return Some((neighbour, target - neighbour));
        }
    }
    None
}

async fn place_voxel<W: World>(
    cx: &Executor<'_, W>,
    target: BlockPos,
    voxel: &Voxel,
    options: &BuildOptions,
) -> Result<PlaceOutcome, AgentError> {
    let current = cx.world.block_at(target).map(|b| b.name).unwrap_or_default();
    if current == voxel.block {
        return Ok(PlaceOutcome::Skipped);
    }
    step_out_of_cell(cx, target).await?;
    if current != "air" && !support::is_replaceable(&current) {
        cx.nav_to(target.center(), config::REACH_DISTANCE).await?;
        cx.world.dig(target).await?;
    }

    let mut reason = PlaceFailure::NoReference;
    for attempt in 0..config::PLACE_RETRIES {
        if cx.aborted() {
            return Err(AgentError::Aborted);
        }
        if cx.world.position().distance_to(target.center()) > config::REACH_DISTANCE {
            cx.nav_to(target.center(), config::REACH_DISTANCE).await?;
        }
        if cx.world.equip(&voxel.block).await.is_err() {
            return Err(AgentError::PlacementFailed {
                pos: target,
                reason: PlaceFailure::EquipFailed,
            });
        }
        match find_reference(cx.world, target, &voxel.properties) {
            Some((reference, face)) => {
                cx.world.look_at(reference.center()).await;
                if cx.world.place_block(reference, face).await.is_ok() {
                    sleep(Duration::from_millis(config::PLACE_VERIFY_DELAY_MS)).await;
                    let placed = cx.world.block_at(target).map(|b| b.name).unwrap_or_default();
                    if placed == voxel.block {
                        return Ok(PlaceOutcome::Placed);
                    }
                    reason = PlaceFailure::VerifyMismatch;
                } else {
                    reason = PlaceFailure::VerifyMismatch;
                }
            }
            None => reason = PlaceFailure::NoReference,
        }
        // Last resort: drop a scaffolding cube underneath and try again.
        if attempt + 1 == config::PLACE_RETRIES && options.scaffolding {
            if let Some(fill) = held_fill(cx) {
                if place_cube(cx, target.down(), fill).await.is_ok() {
                    if let Some((reference, face)) = find_reference(cx.world, target, &voxel.properties) {
                        cx.world.equip(&voxel.block).await.ok();
                        cx.world.look_at(reference.center()).await;
                        if cx.world.place_block(reference, face).await.is_ok() {
                            sleep(Duration::from_millis(config::PLACE_VERIFY_DELAY_MS)).await;
                            let placed =
                                cx.world.block_at(target).map(|b| b.name).unwrap_or_default();
                            if placed == voxel.block {
                                return Ok(PlaceOutcome::Placed);
                            }
                        }
                    }
                }
            }
        }
    }
    Err(AgentError::PlacementFailed { pos: target, reason })
}

fn held_fill<W: World>(cx: &Executor<'_, W>) -> Option<&'static str> {
    let inventory = Inventory::snapshot(cx.world);
    support::GROUND_FILL.iter().copied().find(|f| inventory.held(f) > 0)
}

/// Place a plain cube (fill or scaffolding) at a cell, no orientation.
async fn place_cube<W: World>(
    cx: &Executor<'_, W>,
    cell: BlockPos,
    block: &str,
) -> Result<(), AgentError> {
    let (reference, face) = find_reference(cx.world, cell, &BlockProperties::default())
        .ok_or(AgentError::PlacementFailed { pos: cell, reason: PlaceFailure::NoReference })?;
    if cx.world.position().distance_to(cell.center()) > config::REACH_DISTANCE {
        cx.nav_to(cell.center(), config::REACH_DISTANCE).await?;
    }
    if cx.world.equip(block).await.is_err() {
        return Err(AgentError::PlacementFailed { pos: cell, reason: PlaceFailure::EquipFailed });
    }
    cx.world.look_at(reference.center()).await;
    cx.world.place_block(reference, face).await?;
    sleep(Duration::from_millis(config::PLACE_VERIFY_DELAY_MS)).await;
    let placed = cx.world.block_at(cell).map(|b| b.name).unwrap_or_default();
    if placed == block {
        Ok(())
    } else {
        Err(AgentError::PlacementFailed { pos: cell, reason: PlaceFailure::VerifyMismatch })
    }
}

/// Micro-step sideways when the avatar stands in the cell being built.
async fn step_out_of_cell<W: World>(
    cx: &Executor<'_, W>,
    target: BlockPos,
) -> Result<(), AgentError> {
    let feet = cx.world.position().floor();
    if feet != target && feet.down() != target && feet.up() != target {
        return Ok(());
    }
    for (dx, dz) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
        let cell = feet.offset(dx, 0, dz);
        let name = cx.world.block_at(cell).map(|b| b.name).unwrap_or_default();
        if support::is_replaceable(&name) {
            cx.nav_to(cell.center(), 0.6).await?;
            return Ok(());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use crate::agent::blueprint::Voxel;
    use crate::world::sim::SimWorld;
    use crate::world::Vec3;

    fn harness(world: &SimWorld) -> (Executor<'_, SimWorld>, Arc<AtomicBool>) {
        let abort = Arc::new(AtomicBool::new(false));
        let (outbox, _rx) = tokio::sync::broadcast::channel(64);
        (Executor::new(world, outbox, abort.clone()), abort)
    }

    fn grounded_world() -> SimWorld {
        let world = SimWorld::new();
        for x in -4..12 {
            for z in -4..12 {
                world.set_block(BlockPos::new(x, 0, z), "grass_block");
            }
        }
        world
    }

    fn voxel(x: i32, y: i32, z: i32, block: &str) -> Voxel {
        Voxel { offset: [x, y, z], block: block.to_string(), properties: BlockProperties::default() }
    }

    fn slab() -> Blueprint {
        let mut voxels = Vec::new();
        for x in 0..3 {
            for z in 0..3 {
                voxels.push(voxel(x, 0, z, "cobblestone"));
            }
        }
        Blueprint { dims: [3, 1, 3], voxels }
    }

    #[tokio::test(start_paused = true)]
    async fn builds_a_slab_from_inventory() {
        // S5: nine cobblestone held, 3x1x3 slab, ground as reference.
        let world = grounded_world();
        world.give("cobblestone", 9);
        let (cx, _) = harness(&world);
        let origin = BlockPos::new(4, 1, 4);
        let report = build(&cx, &slab(), origin, &BuildOptions::default()).await.unwrap();
        assert_eq!(report, BuildReport { placed: 9, skipped: 0, failed: 0 });
        for x in 0..3 {
            for z in 0..3 {
                assert_eq!(world.block_name(origin.offset(x, 0, z)), "cobblestone");
            }
        }
        assert_eq!(world.held("cobblestone"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rebuild_skips_matching_blocks() {
        let world = grounded_world();
        world.give("cobblestone", 9);
        let (cx, _) = harness(&world);
        let origin = BlockPos::new(4, 1, 4);
        build(&cx, &slab(), origin, &BuildOptions::default()).await.unwrap();
        let report = build(&cx, &slab(), origin, &BuildOptions::default()).await.unwrap();
        assert_eq!(report, BuildReport { placed: 0, skipped: 9, failed: 0 });
    }

    #[tokio::test(start_paused = true)]
    async fn tower_uses_prior_layers_as_support() {
        let world = grounded_world();
        world.give("stone_bricks", 4);
        let (cx, _) = harness(&world);
        let bp = Blueprint {
            dims: [1, 4, 1],
            voxels: (0..4).map(|y| voxel(0, y, 0, "stone_bricks")).collect(),
        };
        let origin = BlockPos::new(6, 1, 6);
        let report = build(&cx, &bp, origin, &BuildOptions::default()).await.unwrap();
        assert_eq!(report.placed, 4);
        for y in 0..4 {
            assert_eq!(world.block_name(origin.offset(0, y, 0)), "stone_bricks");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn listed_order_is_kept_without_layer_sorting() {
        let world = grounded_world();
        world.give("stone_bricks", 4);
        let (cx, _) = harness(&world);
        // Tower listed top-first: without layer sorting only the grounded
        // base block finds a support face.
        let bp = Blueprint {
            dims: [1, 4, 1],
            voxels: (0..4).rev().map(|y| voxel(0, y, 0, "stone_bricks")).collect(),
        };
        let origin = BlockPos::new(6, 1, 6);
        let options =
            BuildOptions { layer_by_layer: false, scaffolding: false, ..Default::default() };
        let report = build(&cx, &bp, origin, &options).await.unwrap();
        assert_eq!(report.placed, 1);
        assert_eq!(report.failed, 3);
        // Restoring the default bottom-up order finishes the tower.
        let options = BuildOptions { scaffolding: false, ..Default::default() };
        let report = build(&cx, &bp, origin, &options).await.unwrap();
        assert_eq!(report.placed, 3);
        assert_eq!(report.skipped, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_materials_are_resolved_first() {
        let world = grounded_world();
        // Stone to mine, pickaxe to mine with; no cobblestone held.
        for i in 0..10 {
            world.set_block(BlockPos::new(-4 + i, 1, -4), "stone");
        }
        world.give("wooden_pickaxe", 1);
        let (cx, _) = harness(&world);
        let origin = BlockPos::new(4, 1, 4);
        let report = build(&cx, &slab(), origin, &BuildOptions::default()).await.unwrap();
        assert_eq!(report.placed, 9);
        assert_eq!(report.failed, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn scaffolding_rescues_a_floating_voxel() {
        let world = grounded_world();
        world.give("oak_planks", 1);
        world.give("dirt", 4);
        let (cx, _) = harness(&world);
        // A single voxel floating one cell above the ground surface: no
        // neighbour support, but a scaffold cube below can reach the ground.
        let bp = Blueprint { dims: [1, 1, 1], voxels: vec![voxel(0, 0, 0, "oak_planks")] };
        let origin = BlockPos::new(5, 2, 5);
        let report = build(&cx, &bp, origin, &BuildOptions::default()).await.unwrap();
        assert_eq!(report, BuildReport { placed: 1, skipped: 0, failed: 0 });
        assert_eq!(world.block_name(origin), "oak_planks");
        // The scaffold cube sits underneath.
        assert_eq!(world.block_name(origin.down()), "dirt");
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_voxel_is_reported_not_fatal() {
        let world = grounded_world();
        world.give("oak_planks", 1);
        let (cx, _) = harness(&world);
        // Floating, scaffolding disabled: no reference face exists.
        let bp = Blueprint { dims: [1, 1, 1], voxels: vec![voxel(0, 0, 0, "oak_planks")] };
        let origin = BlockPos::new(5, 6, 5);
        let options = BuildOptions { scaffolding: false, ..Default::default() };
        let report = build(&cx, &bp, origin, &options).await.unwrap();
        assert_eq!(report, BuildReport { placed: 0, skipped: 0, failed: 1 });
    }

    #[tokio::test(start_paused = true)]
    async fn clear_area_digs_mismatched_blocks() {
        let world = grounded_world();
        world.give("cobblestone", 1);
        let origin = BlockPos::new(4, 1, 4);
        world.set_block(origin, "oak_leaves");
        let (cx, _) = harness(&world);
        let bp = Blueprint { dims: [1, 1, 1], voxels: vec![voxel(0, 0, 0, "cobblestone")] };
        let options = BuildOptions { clear_area: true, ..Default::default() };
        let report = build(&cx, &bp, origin, &options).await.unwrap();
        assert_eq!(report.placed, 1);
        assert_eq!(world.block_name(origin), "cobblestone");
    }

    #[tokio::test(start_paused = true)]
    async fn prepare_ground_fills_holes() {
        let world = grounded_world();
        world.give("cobblestone", 1);
        world.give("dirt", 4);
        let origin = BlockPos::new(4, 1, 4);
        // Knock a hole in the ground under the build.
        world.clear_block(origin.down());
        let (cx, _) = harness(&world);
        let bp = Blueprint { dims: [1, 1, 1], voxels: vec![voxel(0, 0, 0, "cobblestone")] };
        let options = BuildOptions { prepare_ground: true, ..Default::default() };
        let report = build(&cx, &bp, origin, &options).await.unwrap();
        assert_eq!(report.placed, 1);
        assert_eq!(world.block_name(origin.down()), "dirt");
    }

    #[tokio::test(start_paused = true)]
    async fn abort_interrupts_the_build() {
        let world = grounded_world();
        world.give("cobblestone", 9);
        let (cx, abort) = harness(&world);
        abort.store(true, Ordering::Relaxed);
        let err = build(&cx, &slab(), BlockPos::new(4, 1, 4), &BuildOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err, AgentError::Aborted);
    }

    #[test]
    fn scan_order_biases() {
        // Default: below first.
        let order = reference_scan_order(&BlockProperties::default());
        assert_eq!(order[0], BlockPos::new(0, -1, 0));
        // Top-half blocks look up first.
        let top = BlockProperties { half: Some("top".into()), ..Default::default() };
        assert_eq!(reference_scan_order(&top)[0], BlockPos::new(0, 1, 0));
        // A north-facing wall block attaches to its south neighbour.
        let facing = BlockProperties { facing: Some("north".into()), ..Default::default() };
        assert_eq!(reference_scan_order(&facing)[0], BlockPos::new(0, 0, 1));
        assert_eq!(reference_scan_order(&facing).len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn steps_out_of_the_target_cell() {
        let world = grounded_world();
        world.give("cobblestone", 1);
        let origin = BlockPos::new(4, 1, 4);
        world.set_position(Vec3::new(4.5, 1.0, 4.5));
        let (cx, _) = harness(&world);
        let bp = Blueprint { dims: [1, 1, 1], voxels: vec![voxel(0, 0, 0, "cobblestone")] };
        let report = build(&cx, &bp, origin, &BuildOptions::default()).await.unwrap();
        assert_eq!(report.placed, 1);
        assert!(world.position().floor() != origin);
    }
}
