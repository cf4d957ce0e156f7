//! Crafting recipe table.
//!
//! Shaped and shapeless recipes are erased to an aggregate input multiset.
//! Wood-variant ingredients are expressed as group slots (`Group(LOGS)`,
//! `Group(PLANKS)`) and resolved against the caller's inventory at plan
//! time, so a bot holding only spruce logs plans spruce planks.

// ─── Item families ───────────────────────────────────────────────────

/// A set of interchangeable item variants with a canonical default.
#[derive(Debug)]
pub struct Family {
    pub name: &'static str,
    pub canonical: &'static str,
    pub members: &'static [&'static str],
}

pub const LOGS: Family = Family {
    name: "log",
    canonical: "oak_log",
    members: &["oak_log", "spruce_log", "birch_log", "jungle_log", "acacia_log", "dark_oak_log"],
};

pub const PLANKS: Family = Family {
    name: "planks",
    canonical: "oak_planks",
    members: &[
        "oak_planks",
        "spruce_planks",
        "birch_planks",
        "jungle_planks",
        "acacia_planks",
        "dark_oak_planks",
    ],
};

impl Family {
    /// Variant held in the largest quantity; ties break to the
    /// lexicographically smallest name. `None` when nothing is held.
    pub fn best_held(&self, held: &dyn Fn(&str) -> u32) -> Option<&'static str> {
        self.members
            .iter()
            .map(|m| (*m, held(m)))
            .filter(|(_, n)| *n > 0)
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(m, _)| m)
    }
}

/// Wood species of a `*_log` or `*_planks` name, e.g. `spruce`.
pub fn wood_of(item: &str) -> Option<&str> {
    item.strip_suffix("_log").or_else(|| item.strip_suffix("_planks"))
}

// ─── Recipes ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub enum Slot {
    Exact(&'static str),
    Group(&'static Family),
}

#[derive(Debug, Clone, Copy)]
pub struct Input {
    pub slot: Slot,
    pub count: u32,
}

const fn exact(item: &'static str, count: u32) -> Input {
    Input { slot: Slot::Exact(item), count }
}

const fn group(family: &'static Family, count: u32) -> Input {
    Input { slot: Slot::Group(family), count }
}

#[derive(Debug, Clone, Copy)]
pub struct Recipe {
    pub output: &'static str,
    pub output_count: u32,
    pub inputs: &'static [Input],
    /// Whether the 3x3 grid of a crafting table is required.
    pub needs_table: bool,
}

pub const RECIPES: &[Recipe] = &[
    // Wood processing (one entry per plank variant; a single log yields four).
    Recipe { output: "oak_planks", output_count: 4, inputs: &[exact("oak_log", 1)], needs_table: false },
    Recipe { output: "spruce_planks", output_count: 4, inputs: &[exact("spruce_log", 1)], needs_table: false },
    Recipe { output: "birch_planks", output_count: 4, inputs: &[exact("birch_log", 1)], needs_table: false },
    Recipe { output: "jungle_planks", output_count: 4, inputs: &[exact("jungle_log", 1)], needs_table: false },
    Recipe { output: "acacia_planks", output_count: 4, inputs: &[exact("acacia_log", 1)], needs_table: false },
    Recipe { output: "dark_oak_planks", output_count: 4, inputs: &[exact("dark_oak_log", 1)], needs_table: false },
    Recipe { output: "stick", output_count: 4, inputs: &[group(&PLANKS, 2)], needs_table: false },
    // Stations. The crafting table itself needs no station (2x2 bootstrap).
    Recipe { output: "crafting_table", output_count: 1, inputs: &[group(&PLANKS, 4)], needs_table: false },
    Recipe { output: "furnace", output_count: 1, inputs: &[exact("cobblestone", 8)], needs_table: true },
    Recipe { output: "chest", output_count: 1, inputs: &[group(&PLANKS, 8)], needs_table: true },
    // Wooden tools.
    Recipe { output: "wooden_pickaxe", output_count: 1, inputs: &[group(&PLANKS, 3), exact("stick", 2)], needs_table: true },
    Recipe { output: "wooden_axe", output_count: 1, inputs: &[group(&PLANKS, 3), exact("stick", 2)], needs_table: true },
    Recipe { output: "wooden_shovel", output_count: 1, inputs: &[group(&PLANKS, 1), exact("stick", 2)], needs_table: true },
    Recipe { output: "wooden_hoe", output_count: 1, inputs: &[group(&PLANKS, 2), exact("stick", 2)], needs_table: true },
    Recipe { output: "wooden_sword", output_count: 1, inputs: &[group(&PLANKS, 2), exact("stick", 1)], needs_table: true },
    // Stone tools.
    Recipe { output: "stone_pickaxe", output_count: 1, inputs: &[exact("cobblestone", 3), exact("stick", 2)], needs_table: true },
    Recipe { output: "stone_axe", output_count: 1, inputs: &[exact("cobblestone", 3), exact("stick", 2)], needs_table: true },
    Recipe { output: "stone_shovel", output_count: 1, inputs: &[exact("cobblestone", 1), exact("stick", 2)], needs_table: true },
    Recipe { output: "stone_hoe", output_count: 1, inputs: &[exact("cobblestone", 2), exact("stick", 2)], needs_table: true },
    Recipe { output: "stone_sword", output_count: 1, inputs: &[exact("cobblestone", 2), exact("stick", 1)], needs_table: true },
    // Iron and diamond tools.
    Recipe { output: "iron_pickaxe", output_count: 1, inputs: &[exact("iron_ingot", 3), exact("stick", 2)], needs_table: true },
    Recipe { output: "iron_axe", output_count: 1, inputs: &[exact("iron_ingot", 3), exact("stick", 2)], needs_table: true },
    Recipe { output: "iron_shovel", output_count: 1, inputs: &[exact("iron_ingot", 1), exact("stick", 2)], needs_table: true },
    Recipe { output: "iron_sword", output_count: 1, inputs: &[exact("iron_ingot", 2), exact("stick", 1)], needs_table: true },
    Recipe { output: "diamond_pickaxe", output_count: 1, inputs: &[exact("diamond", 3), exact("stick", 2)], needs_table: true },
    Recipe { output: "diamond_sword", output_count: 1, inputs: &[exact("diamond", 2), exact("stick", 1)], needs_table: true },
    // Misc.
    Recipe { output: "torch", output_count: 4, inputs: &[exact("coal", 1), exact("stick", 1)], needs_table: false },
    Recipe { output: "ladder", output_count: 3, inputs: &[exact("stick", 7)], needs_table: true },
    Recipe { output: "iron_block", output_count: 1, inputs: &[exact("iron_ingot", 9)], needs_table: true },
    Recipe { output: "bread", output_count: 1, inputs: &[exact("wheat", 3)], needs_table: true },
];

/// Canonical recipe producing `item`, if one exists.
pub fn recipe_for(item: &str) -> Option<&'static Recipe> {
    RECIPES.iter().find(|r| r.output == item)
}

/// Family named by a bare alias such as `planks` or `log`.
pub fn family_by_name(name: &str) -> Option<&'static Family> {
    match name {
        "log" | "logs" => Some(&LOGS),
        "planks" | "plank" => Some(&PLANKS),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn held_fn(pairs: &[(&str, u32)]) -> HashMap<String, u32> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn recipe_lookup() {
        assert!(recipe_for("stone_pickaxe").is_some());
        assert!(recipe_for("oak_planks").is_some());
        assert!(recipe_for("cobblestone").is_none());
    }

    #[test]
    fn crafting_table_bootstraps_without_a_table() {
        assert!(!recipe_for("crafting_table").unwrap().needs_table);
        assert!(!recipe_for("stick").unwrap().needs_table);
        assert!(recipe_for("wooden_pickaxe").unwrap().needs_table);
    }

    #[test]
    fn family_best_held_prefers_quantity_then_name() {
        let inv = held_fn(&[("spruce_log", 5), ("oak_log", 2)]);
        let held = |i: &str| inv.get(i).copied().unwrap_or(0);
        assert_eq!(LOGS.best_held(&held), Some("spruce_log"));

        let inv = held_fn(&[("spruce_log", 2), ("birch_log", 2)]);
        let held = |i: &str| inv.get(i).copied().unwrap_or(0);
        assert_eq!(LOGS.best_held(&held), Some("birch_log"));

        let inv = held_fn(&[]);
        let held = |i: &str| inv.get(i).copied().unwrap_or(0);
        assert_eq!(LOGS.best_held(&held), None);
    }

    #[test]
    fn wood_species_extraction() {
        assert_eq!(wood_of("spruce_log"), Some("spruce"));
        assert_eq!(wood_of("dark_oak_planks"), Some("dark_oak"));
        assert_eq!(wood_of("cobblestone"), None);
    }

    #[test]
    fn every_plank_variant_has_a_log_recipe() {
        for planks in PLANKS.members {
            let recipe = recipe_for(planks).unwrap();
            assert_eq!(recipe.output_count, 4);
            match recipe.inputs[0].slot {
                Slot::Exact(log) => {
                    assert_eq!(wood_of(log), wood_of(planks));
                }
                Slot::Group(_) => panic!("plank recipes take a specific log"),
            }
        }
    }
}
