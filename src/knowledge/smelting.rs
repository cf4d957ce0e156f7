//! Smelting and fuel tables.
//!
//! Fuel is decoupled from smelting recipes: any fuel item covers any
//! smelt, and burn time is accounted in ticks (20 per second, 200 per
//! smelted item).

use crate::config::SMELT_TICKS_PER_ITEM;
use crate::knowledge::recipes::{Family, LOGS, PLANKS};

#[derive(Debug, Clone, Copy)]
pub struct SmeltingRecipe {
    pub output: &'static str,
    pub input: &'static str,
    pub alternates: &'static [&'static str],
}

pub const SMELTING: &[SmeltingRecipe] = &[
    SmeltingRecipe { output: "iron_ingot", input: "raw_iron", alternates: &["iron_ore"] },
    SmeltingRecipe { output: "gold_ingot", input: "raw_gold", alternates: &["gold_ore"] },
    SmeltingRecipe { output: "copper_ingot", input: "raw_copper", alternates: &["copper_ore"] },
    SmeltingRecipe {
        output: "charcoal",
        input: "oak_log",
        alternates: &["spruce_log", "birch_log", "jungle_log", "acacia_log", "dark_oak_log"],
    },
    SmeltingRecipe { output: "glass", input: "sand", alternates: &[] },
    SmeltingRecipe { output: "stone", input: "cobblestone", alternates: &[] },
    SmeltingRecipe { output: "smooth_stone", input: "stone", alternates: &[] },
    SmeltingRecipe { output: "brick", input: "clay_ball", alternates: &[] },
    SmeltingRecipe { output: "cooked_beef", input: "beef", alternates: &[] },
    SmeltingRecipe { output: "cooked_porkchop", input: "porkchop", alternates: &[] },
];

pub fn smelt_for(item: &str) -> Option<&'static SmeltingRecipe> {
    SMELTING.iter().find(|r| r.output == item)
}

/// What smelting `input` yields, if it is a valid furnace input.
pub fn smelt_output_of(input: &str) -> Option<&'static str> {
    SMELTING
        .iter()
        .find(|r| r.input == input || r.alternates.contains(&input))
        .map(|r| r.output)
}

/// Burn ticks of a fuel item; 0 if the item is not a fuel.
pub fn fuel_ticks(item: &str) -> u32 {
    match item {
        "coal" | "charcoal" => 1600,
        "lava_bucket" => 20000,
        "stick" => 100,
        _ if item.ends_with("_log") || item.ends_with("_planks") => 300,
        _ => 0,
    }
}

/// Fuel items needed to smelt `count` items with the given fuel.
pub fn fuel_needed(fuel: &str, count: u32) -> u32 {
    let ticks = fuel_ticks(fuel);
    if ticks == 0 {
        return u32::MAX;
    }
    (count * SMELT_TICKS_PER_ITEM).div_ceil(ticks)
}

/// One step of the ordered fuel preference list.
#[derive(Debug, Clone, Copy)]
pub enum FuelChoice {
    Item(&'static str),
    Variants(&'static Family),
}

/// Preference order for fuel selection: coal, charcoal, any log, any
/// plank, sticks.
pub const FUEL_PRIORITY: &[FuelChoice] = &[
    FuelChoice::Item("coal"),
    FuelChoice::Item("charcoal"),
    FuelChoice::Variants(&LOGS),
    FuelChoice::Variants(&PLANKS),
    FuelChoice::Item("stick"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smelt_lookup() {
        assert_eq!(smelt_for("iron_ingot").unwrap().input, "raw_iron");
        assert_eq!(smelt_for("charcoal").unwrap().input, "oak_log");
        assert!(smelt_for("cobblestone").is_none());
    }

    #[test]
    fn reverse_lookup_covers_alternates() {
        assert_eq!(smelt_output_of("raw_iron"), Some("iron_ingot"));
        assert_eq!(smelt_output_of("iron_ore"), Some("iron_ingot"));
        assert_eq!(smelt_output_of("birch_log"), Some("charcoal"));
        assert_eq!(smelt_output_of("stick"), None);
    }

    #[test]
    fn burn_ticks() {
        assert_eq!(fuel_ticks("coal"), 1600);
        assert_eq!(fuel_ticks("birch_log"), 300);
        assert_eq!(fuel_ticks("spruce_planks"), 300);
        assert_eq!(fuel_ticks("stick"), 100);
        assert_eq!(fuel_ticks("cobblestone"), 0);
    }

    #[test]
    fn fuel_arithmetic() {
        // ceil(4 * 200 / 300) = 3 logs for four smelts.
        assert_eq!(fuel_needed("oak_log", 4), 3);
        // ceil(2 * 200 / 300) = 2.
        assert_eq!(fuel_needed("oak_log", 2), 2);
        // One coal covers eight smelts.
        assert_eq!(fuel_needed("coal", 8), 1);
        assert_eq!(fuel_needed("coal", 9), 2);
        assert_eq!(fuel_needed("cobblestone", 1), u32::MAX);
    }
}
