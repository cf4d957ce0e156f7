//! The task vocabulary the resolver emits and the executor walks.

use crate::knowledge::drops;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StationKind {
    CraftingTable,
    Furnace,
}

impl StationKind {
    /// Block and item share the name for both stations.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CraftingTable => "crafting_table",
            Self::Furnace => "furnace",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuelPlan {
    pub fuel: String,
    pub count: u32,
}

/// One step of a linear plan. Plans are produced once, executed once,
/// and discarded.
#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    /// Locate and break `count` blocks of a type, collecting the drops.
    Gather {
        block: String,
        count: u32,
        /// Inventory level of the drop item this task brings the plan to;
        /// used by the executor to skip already-satisfied work.
        stock_target: u32,
    },
    /// Gather variant for mature crops, with best-effort replanting.
    Harvest { crop: String, count: u32, stock_target: u32 },
    Craft {
        output: String,
        output_count: u32,
        /// Aggregate input multiset for a single repetition, with group
        /// slots already resolved to concrete variants.
        inputs: Vec<(String, u32)>,
        repetitions: u32,
        needs_table: bool,
        stock_target: u32,
    },
    Smelt {
        output: String,
        input: String,
        count: u32,
        fuel: FuelPlan,
        stock_target: u32,
    },
    /// Verify (and if the world drifted, produce) a tool before its first
    /// consumer.
    EnsureTool { tool: String },
    /// Locate, place, or craft a station and stand within reach of it.
    EnsureStation { kind: StationKind },
    /// Drop items within reach of a player.
    Deliver { player: String, item: String, count: u32 },
}

impl Task {
    /// The skip threshold for already-satisfied production tasks.
    pub fn stock_target(&self) -> Option<(String, u32)> {
        match self {
            Task::Gather { block, stock_target, .. } => {
                drops::drop_for(block).map(|d| (d.item.to_string(), *stock_target))
            }
            Task::Harvest { crop, stock_target, .. } => {
                drops::crop_for(crop).map(|c| (c.item.to_string(), *stock_target))
            }
            Task::Craft { output, stock_target, .. } => Some((output.clone(), *stock_target)),
            Task::Smelt { output, stock_target, .. } => Some((output.clone(), *stock_target)),
            _ => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Task::Gather { block, count, .. } => format!("gather {count} {block}"),
            Task::Harvest { crop, count, .. } => format!("harvest {count} {crop}"),
            Task::Craft { output, repetitions, .. } => {
                format!("craft {output} x{repetitions}")
            }
            Task::Smelt { output, input, count, fuel, .. } => format!(
                "smelt {count} {output} from {input} (fuel: {} x{})",
                fuel.fuel, fuel.count
            ),
            Task::EnsureTool { tool } => format!("ensure tool {tool}"),
            Task::EnsureStation { kind } => format!("ensure {}", kind.as_str()),
            Task::Deliver { player, item, count } => {
                format!("deliver {count} {item} to {player}")
            }
        }
    }
}

pub type Plan = Vec<Task>;

/// One chat-sized summary of a plan.
pub fn describe_plan(plan: &[Task]) -> String {
    if plan.is_empty() {
        return "nothing to do".to_string();
    }
    plan.iter().map(Task::describe).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gather_stock_target_tracks_the_drop_item() {
        let t = Task::Gather { block: "stone".into(), count: 3, stock_target: 3 };
        assert_eq!(t.stock_target(), Some(("cobblestone".to_string(), 3)));
    }

    #[test]
    fn craft_stock_target_names_the_output() {
        let t = Task::Craft {
            output: "stick".into(),
            output_count: 4,
            inputs: vec![("oak_planks".into(), 2)],
            repetitions: 2,
            needs_table: false,
            stock_target: 8,
        };
        assert_eq!(t.stock_target(), Some(("stick".to_string(), 8)));
    }

    #[test]
    fn ensure_tasks_have_no_stock_target() {
        assert_eq!(Task::EnsureStation { kind: StationKind::Furnace }.stock_target(), None);
        assert_eq!(Task::EnsureTool { tool: "wooden_pickaxe".into() }.stock_target(), None);
    }

    #[test]
    fn descriptions_are_single_lines() {
        let t = Task::Smelt {
            output: "iron_ingot".into(),
            input: "raw_iron".into(),
            count: 4,
            fuel: FuelPlan { fuel: "oak_log".into(), count: 3 },
            stock_target: 4,
        };
        assert_eq!(t.describe(), "smelt 4 iron_ingot from raw_iron (fuel: oak_log x3)");
        assert_eq!(describe_plan(&[]), "nothing to do");
    }
}
