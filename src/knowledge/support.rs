//! Placement-support classification.
//!
//! A block can only be placed against a neighbour that is a full solid
//! cube. "Not air" is nowhere near sufficient: stairs, slabs, doors,
//! torches, leaves and snow layers all occupy a cell without offering a
//! usable face. Classification is a whitelist of known cubes plus name
//! patterns, gated by a blacklist pattern test, with a handful of
//! explicit exceptions (snow_block is a cube, snow is a layer).

use once_cell::sync::Lazy;
use std::collections::HashSet;

static SOLID_CUBES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "stone",
        "cobblestone",
        "smooth_stone",
        "stone_bricks",
        "deepslate",
        "cobbled_deepslate",
        "andesite",
        "diorite",
        "granite",
        "dirt",
        "grass_block",
        "podzol",
        "mycelium",
        "sand",
        "sandstone",
        "gravel",
        "clay",
        "netherrack",
        "soul_sand",
        "obsidian",
        "crying_obsidian",
        "bedrock",
        "glass",
        "bricks",
        "bookshelf",
        "pumpkin",
        "melon",
        "snow_block",
        "ice",
        "packed_ice",
        "blue_ice",
        "iron_block",
        "gold_block",
        "diamond_block",
        "coal_block",
        "hay_block",
    ]
    .into_iter()
    .collect()
});

const CUBE_SUFFIXES: &[&str] = &[
    "_planks", "_log", "_wood", "_ore", "_wool", "_terracotta", "_concrete",
];

const NON_SUPPORT_PATTERNS: &[&str] = &[
    "stairs", "slab", "door", "trapdoor", "fence", "gate", "ladder", "torch", "button",
    "lever", "rail", "carpet", "pane", "bars", "chest", "barrel", "furnace",
    "crafting_table", "pressure_plate", "sign", "bed", "leaves", "sapling", "flower",
    "water", "lava", "air",
];

/// Whether a block offers a full solid face to place against.
pub fn is_solid_support(name: &str) -> bool {
    // Exact whitelist wins: "bedrock" must not fall to the "bed" pattern,
    // just as "snow_block" is a cube while "snow" is a layer.
    if SOLID_CUBES.contains(name) {
        return true;
    }
    // Blacklist patterns win over the suffix rules below.
    if NON_SUPPORT_PATTERNS.iter().any(|p| name.contains(p)) {
        return false;
    }
    if CUBE_SUFFIXES.iter().any(|s| name.ends_with(s)) {
        return true;
    }
    name == "terracotta" || name.ends_with("_concrete_powder")
}

/// Blocks that may be overwritten by a placement without digging first.
pub fn is_replaceable(name: &str) -> bool {
    matches!(
        name,
        "air" | "cave_air" | "grass" | "short_grass" | "tall_grass" | "fern" | "large_fern"
            | "dead_bush" | "snow" | "vine" | "seagrass" | "water"
    )
}

/// Fill preference for ground preparation under a build footprint.
pub const GROUND_FILL: &[&str] = &["dirt", "cobblestone", "stone", "netherrack"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cubes_are_supports() {
        for name in ["stone", "dirt", "grass_block", "oak_planks", "spruce_log", "iron_ore",
                     "deepslate_iron_ore", "snow_block", "white_wool", "red_concrete", "ice"] {
            assert!(is_solid_support(name), "{name} should be a support");
        }
        // Exact whitelist beats the "bed" blacklist pattern.
        assert!(is_solid_support("bedrock"));
        assert!(!is_solid_support("red_bed"));
    }

    #[test]
    fn partial_blocks_are_not_supports() {
        for name in ["oak_stairs", "stone_slab", "oak_door", "ladder", "torch", "oak_fence",
                     "iron_bars", "chest", "furnace", "crafting_table", "oak_leaves",
                     "stone_pressure_plate", "white_carpet", "glass_pane", "air", "snow"] {
            assert!(!is_solid_support(name), "{name} should not be a support");
        }
    }

    #[test]
    fn snow_layer_vs_snow_block() {
        assert!(is_solid_support("snow_block"));
        assert!(!is_solid_support("snow"));
        assert!(is_replaceable("snow"));
        assert!(!is_replaceable("snow_block"));
    }

    #[test]
    fn plants_are_replaceable() {
        for name in ["grass", "tall_grass", "fern", "dead_bush", "air"] {
            assert!(is_replaceable(name), "{name} should be replaceable");
        }
        assert!(!is_replaceable("stone"));
        assert!(!is_replaceable("oak_sapling"));
    }
}
