//! Block → drop and crop → harvest tables.

#[derive(Debug, Clone, Copy)]
pub struct BlockDrop {
    pub block: &'static str,
    pub item: &'static str,
    pub min: u32,
    pub max: u32,
}

const fn drop1(block: &'static str, item: &'static str) -> BlockDrop {
    BlockDrop { block, item, min: 1, max: 1 }
}

/// What breaking a block yields when mined with an adequate tool.
/// Ordering matters: `gather_sources` scans front to back, so the block
/// usually found in the world comes first (stone before cobblestone).
pub const DROPS: &[BlockDrop] = &[
    BlockDrop { block: "stone", item: "cobblestone", min: 1, max: 1 },
    drop1("cobblestone", "cobblestone"),
    drop1("oak_log", "oak_log"),
    drop1("spruce_log", "spruce_log"),
    drop1("birch_log", "birch_log"),
    drop1("jungle_log", "jungle_log"),
    drop1("acacia_log", "acacia_log"),
    drop1("dark_oak_log", "dark_oak_log"),
    drop1("coal_ore", "coal"),
    drop1("iron_ore", "raw_iron"),
    drop1("copper_ore", "raw_copper"),
    drop1("gold_ore", "raw_gold"),
    drop1("diamond_ore", "diamond"),
    BlockDrop { block: "redstone_ore", item: "redstone", min: 4, max: 5 },
    BlockDrop { block: "lapis_ore", item: "lapis_lazuli", min: 4, max: 9 },
    drop1("dirt", "dirt"),
    drop1("grass_block", "dirt"),
    drop1("sand", "sand"),
    drop1("gravel", "gravel"),
    BlockDrop { block: "clay", item: "clay_ball", min: 4, max: 4 },
    drop1("obsidian", "obsidian"),
    drop1("netherrack", "netherrack"),
    drop1("snow_block", "snow_block"),
];

pub fn drop_for(block: &str) -> Option<&'static BlockDrop> {
    DROPS.iter().find(|d| d.block == block)
}

/// Blocks that yield `item` when mined, in search preference order.
pub fn gather_sources(item: &str) -> impl Iterator<Item = &'static BlockDrop> + '_ {
    DROPS.iter().filter(move |d| d.item == item)
}

// ─── Crops ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct Crop {
    /// Block name of the mature crop.
    pub block: &'static str,
    pub item: &'static str,
    pub min: u32,
    pub max: u32,
    /// Item replanted after harvesting.
    pub seed: &'static str,
}

pub const CROPS: &[Crop] = &[
    Crop { block: "wheat", item: "wheat", min: 1, max: 1, seed: "wheat_seeds" },
    Crop { block: "carrots", item: "carrot", min: 2, max: 4, seed: "carrot" },
    Crop { block: "potatoes", item: "potato", min: 2, max: 4, seed: "potato" },
    Crop { block: "beetroots", item: "beetroot", min: 1, max: 1, seed: "beetroot_seeds" },
];

pub fn crop_for(block: &str) -> Option<&'static Crop> {
    CROPS.iter().find(|c| c.block == block)
}

/// Crop whose harvest yields `item`, if any.
pub fn harvest_source(item: &str) -> Option<&'static Crop> {
    CROPS.iter().find(|c| c.item == item)
}
