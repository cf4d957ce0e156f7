#![allow(dead_code)]
/// All agent constants — ranges, timeouts, retry caps.

pub const PORT: u16 = 8791;

// Reach and search
/// Maximum distance at which the avatar can interact with a block.
pub const REACH_DISTANCE: f64 = 4.5;
/// Radius scanned for gatherable blocks.
pub const BLOCK_SEARCH_RADIUS: u32 = 64;
/// Radius scanned for an existing crafting table or furnace.
pub const STATION_SEARCH_RADIUS: u32 = 32;
/// Candidate offsets tried when placing a station around the avatar.
pub const STATION_PLACE_ATTEMPTS: usize = 10;

// Smelting
/// Burn ticks consumed per smelted item (20 ticks = 1 second).
pub const SMELT_TICKS_PER_ITEM: u32 = 200;
/// Wall-clock length of one game tick.
pub const TICK_MS: u64 = 50;
/// Polling interval while waiting on a furnace.
pub const SMELT_POLL_MS: u64 = 500;
/// Abort smelting after this long without the output slot growing.
pub const SMELT_STALL_SECS: u64 = 30;
/// Hard cap on a single smelt task.
pub const SMELT_TIMEOUT_SECS: u64 = 300;

// Gathering and crafting
/// Pause after digging so drops can be picked up.
pub const GATHER_PICKUP_DELAY_MS: u64 = 500;
/// Pause between successive craft invocations.
pub const CRAFT_DELAY_MS: u64 = 150;

// Building
/// Settle time between issuing a placement and verifying it.
pub const PLACE_VERIFY_DELAY_MS: u64 = 300;
/// Placement attempts per voxel before scaffolding or failure.
pub const PLACE_RETRIES: u32 = 3;

// Combat
pub const ATTACK_RANGE: f64 = 3.5;
pub const ATTACK_TICK_MS: u64 = 500;
/// Abort an engagement after this long without damaging the target.
pub const ATTACK_STALL_SECS: u64 = 10;
/// Hard cap per target.
pub const ATTACK_TIMEOUT_SECS: u64 = 30;
/// Disengage below this health.
pub const RETREAT_HEALTH: f64 = 10.0;

// Task failure policy
/// Retries for transient failures (navigation, placement) within a task.
pub const TASK_RETRIES: u32 = 3;
/// Backoff between retries.
pub const RETRY_BACKOFF_MS: u64 = 750;

// Follow
pub const FOLLOW_DEFAULT_DISTANCE: f64 = 3.0;
pub const FOLLOW_POLL_MS: u64 = 750;
