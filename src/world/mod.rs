//! World facade: the seam between the agent core and whatever actually
//! moves the avatar. The core depends only on this trait; `sim` provides
//! the in-process implementation used offline and in tests.

pub mod sim;

use std::fmt;

// ─── Geometry ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    pub fn down(self) -> Self {
        self.offset(0, -1, 0)
    }

    pub fn up(self) -> Self {
        self.offset(0, 1, 0)
    }

    /// Centre of the block cell.
    pub fn center(self) -> Vec3 {
        Vec3::new(self.x as f64 + 0.5, self.y as f64 + 0.5, self.z as f64 + 0.5)
    }

    pub fn distance_to(self, other: Vec3) -> f64 {
        self.center().distance_to(other)
    }
}

impl std::ops::Add for BlockPos {
    type Output = BlockPos;
    fn add(self, rhs: BlockPos) -> BlockPos {
        self.offset(rhs.x, rhs.y, rhs.z)
    }
}

impl std::ops::Sub for BlockPos {
    type Output = BlockPos;
    fn sub(self, rhs: BlockPos) -> BlockPos {
        self.offset(-rhs.x, -rhs.y, -rhs.z)
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance_to(self, other: Vec3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Cell this point falls in.
    pub fn floor(self) -> BlockPos {
        BlockPos::new(
            self.x.floor() as i32,
            self.y.floor() as i32,
            self.z.floor() as i32,
        )
    }
}

/// The six face offsets, bottom first (the commonest reference face).
pub const FACES: [BlockPos; 6] = [
    BlockPos::new(0, -1, 0),
    BlockPos::new(1, 0, 0),
    BlockPos::new(-1, 0, 0),
    BlockPos::new(0, 0, 1),
    BlockPos::new(0, 0, -1),
    BlockPos::new(0, 1, 0),
];

// ─── World objects ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub pos: BlockPos,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: u32,
    pub kind: String,
    pub pos: Vec3,
    pub health: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemStack {
    pub name: String,
    pub count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavError {
    Unreachable,
    Timeout,
}

impl fmt::Display for NavError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavError::Unreachable => write!(f, "unreachable"),
            NavError::Timeout => write!(f, "timeout"),
        }
    }
}

/// Opaque failure reported by the facade.
#[derive(Debug, Clone, PartialEq)]
pub struct FacadeError(pub String);

impl fmt::Display for FacadeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub type FacadeResult<T> = Result<T, FacadeError>;

// ─── The facade trait ────────────────────────────────────────────────

/// Contract the agent core executes against.
///
/// Queries are synchronous reads of locally tracked state (loaded chunks,
/// the avatar's own inventory); actions are asynchronous and yield until
/// the world acknowledges them. Implementations report failures rather
/// than panicking when the world changed under the caller.
pub trait World: Send + Sync + 'static {
    // Queries
    fn connected(&self) -> bool;
    fn position(&self) -> Vec3;
    fn health(&self) -> f64;
    fn food(&self) -> f64;
    /// Block at a position; `None` when the cell is not loaded.
    fn block_at(&self, pos: BlockPos) -> Option<Block>;
    /// Nearest block whose name satisfies the matcher, within
    /// `max_distance` of the avatar.
    fn find_block(&self, matcher: &dyn Fn(&str) -> bool, max_distance: u32) -> Option<Block>;
    fn find_blocks(
        &self,
        matcher: &dyn Fn(&str) -> bool,
        max_distance: u32,
        limit: usize,
    ) -> Vec<Block>;
    fn inventory_items(&self) -> Vec<ItemStack>;
    fn player_position(&self, name: &str) -> Option<Vec3>;
    fn nearest_entity(&self, kind: &str, radius: f64) -> Option<Entity>;
    fn entity_health(&self, id: u32) -> Option<f64>;
    /// Drop any pending pathfinding goal.
    fn clear_goals(&self);

    // Actions
    fn path_to(
        &self,
        goal: Vec3,
        range: f64,
    ) -> impl std::future::Future<Output = Result<(), NavError>> + Send;
    fn look_at(&self, target: Vec3) -> impl std::future::Future<Output = ()> + Send;
    fn dig(&self, pos: BlockPos) -> impl std::future::Future<Output = FacadeResult<()>> + Send;
    /// Place the equipped block against `reference`, on the face pointing
    /// toward `face` (a unit offset from reference to the new cell).
    fn place_block(
        &self,
        reference: BlockPos,
        face: BlockPos,
    ) -> impl std::future::Future<Output = FacadeResult<()>> + Send;
    fn equip(&self, item: &str) -> impl std::future::Future<Output = FacadeResult<()>> + Send;
    fn toss(
        &self,
        item: &str,
        count: u32,
    ) -> impl std::future::Future<Output = FacadeResult<()>> + Send;
    fn attack(&self, entity_id: u32) -> impl std::future::Future<Output = FacadeResult<()>> + Send;
    /// Invoke the crafting primitive once for the named output.
    fn craft(&self, output: &str) -> impl std::future::Future<Output = FacadeResult<()>> + Send;

    // Furnace container, keyed by the furnace block position.
    fn furnace_put_input(
        &self,
        pos: BlockPos,
        item: &str,
        count: u32,
    ) -> impl std::future::Future<Output = FacadeResult<()>> + Send;
    fn furnace_put_fuel(
        &self,
        pos: BlockPos,
        item: &str,
        count: u32,
    ) -> impl std::future::Future<Output = FacadeResult<()>> + Send;
    /// Current contents of the output slot.
    fn furnace_output(&self, pos: BlockPos) -> Option<ItemStack>;
    fn furnace_take_output(
        &self,
        pos: BlockPos,
    ) -> impl std::future::Future<Output = FacadeResult<Option<ItemStack>>> + Send;
}
