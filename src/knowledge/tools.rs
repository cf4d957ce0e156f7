//! Tool tiers, kinds, and per-block harvest requirements.
//!
//! A block is minable with bare hands unless its requirement names a tier
//! above `Tier::None`; in that case the held tool must match the kind and
//! meet the tier. Blocks absent from the requirement table entirely
//! (bedrock, barrier) cannot be broken by any tool.

// ─── Tiers ───────────────────────────────────────────────────────────

/// Mining-capability ladder. Ordering is the tier comparison used for
/// adequacy checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    None,
    Wooden,
    Stone,
    Iron,
    Diamond,
    Netherite,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Wooden => "wooden",
            Self::Stone => "stone",
            Self::Iron => "iron",
            Self::Diamond => "diamond",
            Self::Netherite => "netherite",
        }
    }

    /// Tier of a named tool, by prefix. Golden tools mine at wooden level.
    pub fn of_tool(name: &str) -> Tier {
        match name.split('_').next() {
            Some("wooden") | Some("golden") => Tier::Wooden,
            Some("stone") => Tier::Stone,
            Some("iron") => Tier::Iron,
            Some("diamond") => Tier::Diamond,
            Some("netherite") => Tier::Netherite,
            _ => Tier::None,
        }
    }
}

// ─── Kinds ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Any,
    Pickaxe,
    Axe,
    Shovel,
    Hoe,
}

impl ToolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Pickaxe => "pickaxe",
            Self::Axe => "axe",
            Self::Shovel => "shovel",
            Self::Hoe => "hoe",
        }
    }

    /// Whether the named item is a tool of this kind.
    pub fn matches(self, item: &str) -> bool {
        match self {
            Self::Any => {
                item.ends_with("_pickaxe")
                    || item.ends_with("_axe")
                    || item.ends_with("_shovel")
                    || item.ends_with("_hoe")
            }
            Self::Pickaxe => item.ends_with("_pickaxe"),
            // "_axe" is a suffix of "_pickaxe" too; exclude it explicitly.
            Self::Axe => item.ends_with("_axe") && !item.ends_with("_pickaxe"),
            Self::Shovel => item.ends_with("_shovel"),
            Self::Hoe => item.ends_with("_hoe"),
        }
    }
}

// ─── Requirements ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolRequirement {
    pub tier: Tier,
    pub kind: ToolKind,
}

impl ToolRequirement {
    const fn new(tier: Tier, kind: ToolKind) -> Self {
        Self { tier, kind }
    }

    /// The cheapest tool item satisfying this requirement, e.g.
    /// `wooden_pickaxe` for stone.
    pub fn minimal_tool(&self) -> String {
        let tier = match self.tier {
            Tier::None => Tier::Wooden,
            t => t,
        };
        let kind = match self.kind {
            ToolKind::Any => ToolKind::Pickaxe,
            k => k,
        };
        format!("{}_{}", tier.as_str(), kind.as_str())
    }
}

const HAND: ToolRequirement = ToolRequirement::new(Tier::None, ToolKind::Any);
const WOOD_PICK: ToolRequirement = ToolRequirement::new(Tier::Wooden, ToolKind::Pickaxe);
const STONE_PICK: ToolRequirement = ToolRequirement::new(Tier::Stone, ToolKind::Pickaxe);
const IRON_PICK: ToolRequirement = ToolRequirement::new(Tier::Iron, ToolKind::Pickaxe);
const DIAMOND_PICK: ToolRequirement = ToolRequirement::new(Tier::Diamond, ToolKind::Pickaxe);

/// Minimum tool needed to break a block and collect its drop.
/// `None` means the block is unbreakable.
pub fn tool_requirement_for(block: &str) -> Option<ToolRequirement> {
    match block {
        "bedrock" | "barrier" | "end_portal_frame" => None,
        "stone" | "cobblestone" | "deepslate" | "cobbled_deepslate" | "andesite" | "diorite"
        | "granite" | "sandstone" | "netherrack" | "coal_ore" | "furnace" | "smooth_stone"
        | "stone_bricks" => Some(WOOD_PICK),
        "iron_ore" | "deepslate_iron_ore" | "lapis_ore" | "copper_ore" => Some(STONE_PICK),
        "gold_ore" | "diamond_ore" | "deepslate_diamond_ore" | "redstone_ore"
        | "emerald_ore" => Some(IRON_PICK),
        "obsidian" | "crying_obsidian" | "ancient_debris" => Some(DIAMOND_PICK),
        _ => Some(HAND),
    }
}

/// Tool kind that digs a block fastest; used for equip selection when the
/// requirement itself is satisfied bare-handed.
pub fn preferred_kind(block: &str) -> ToolKind {
    if block.ends_with("_log") || block.ends_with("_planks") || block.ends_with("_wood") {
        ToolKind::Axe
    } else if matches!(
        block,
        "dirt" | "grass_block" | "sand" | "gravel" | "clay" | "snow_block" | "soul_sand"
    ) {
        ToolKind::Shovel
    } else {
        ToolKind::Pickaxe
    }
}

// ─── Adequacy ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCheck {
    /// The block can be broken; the tool to equip, if any beats bare hands.
    Adequate(Option<String>),
    /// A tool of at least this requirement must be obtained first.
    Missing(ToolRequirement),
    /// No tool tier can break this block.
    Unbreakable,
}

/// Best held tool of a kind, ranked by tier. `held` is an iterator of item
/// names currently in inventory.
pub fn best_tool<'a>(
    held: impl Iterator<Item = &'a str>,
    kind: ToolKind,
) -> Option<(&'a str, Tier)> {
    held.filter(|name| kind.matches(name))
        .map(|name| (name, Tier::of_tool(name)))
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
}

/// Check whether the held items can break `block`, per the requirement
/// table. Monotone: adding items never turns an adequate inventory
/// inadequate.
pub fn has_adequate<'a>(held: impl Iterator<Item = &'a str> + Clone, block: &str) -> ToolCheck {
    let req = match tool_requirement_for(block) {
        Some(r) => r,
        None => return ToolCheck::Unbreakable,
    };
    if req.tier == Tier::None {
        // Bare hands suffice; still prefer the fastest matching tool.
        let pick = best_tool(held, preferred_kind(block)).map(|(n, _)| n.to_string());
        return ToolCheck::Adequate(pick);
    }
    match best_tool(held, req.kind) {
        Some((name, tier)) if tier >= req.tier => ToolCheck::Adequate(Some(name.to_string())),
        _ => ToolCheck::Missing(req),
    }
}
