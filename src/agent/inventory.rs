//! Inventory accountant.
//!
//! A multiset view over the avatar's inventory. The world facade is
//! authoritative: a fresh snapshot is read before planning and at every
//! task boundary rather than keeping an independent ledger that could
//! drift.

use std::collections::HashMap;

use crate::knowledge::tools::{self, Tier, ToolKind};
use crate::world::World;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inventory {
    items: HashMap<String, u32>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh read of the avatar's inventory.
    pub fn snapshot<W: World>(world: &W) -> Self {
        let mut inv = Inventory::new();
        for stack in world.inventory_items() {
            inv.add(&stack.name, stack.count);
        }
        inv
    }

    pub fn held(&self, item: &str) -> u32 {
        self.items.get(item).copied().unwrap_or(0)
    }

    pub fn has(&self, item: &str, qty: u32) -> bool {
        self.held(item) >= qty
    }

    pub fn add(&mut self, item: &str, qty: u32) {
        if qty == 0 {
            return;
        }
        *self.items.entry(item.to_string()).or_insert(0) += qty;
    }

    /// Remove exactly `qty`; refuses (returning false) rather than going
    /// negative — underflow here is a planning bug, not a world state.
    pub fn remove(&mut self, item: &str, qty: u32) -> bool {
        if qty == 0 {
            return true;
        }
        let current = self.held(item);
        if current < qty {
            return false;
        }
        let remaining = current - qty;
        if remaining == 0 {
            self.items.remove(item);
        } else {
            self.items.insert(item.to_string(), remaining);
        }
        true
    }

    /// Take up to `qty`, returning how many were actually available.
    pub fn reserve(&mut self, item: &str, qty: u32) -> u32 {
        let taken = self.held(item).min(qty);
        self.remove(item, taken);
        taken
    }

    pub fn item_names(&self) -> impl Iterator<Item = &str> + Clone {
        self.items.keys().map(|s| s.as_str())
    }

    pub fn list_items(&self, predicate: impl Fn(&str) -> bool) -> Vec<String> {
        let mut out: Vec<String> = self
            .items
            .keys()
            .filter(|k| predicate(k))
            .cloned()
            .collect();
        out.sort();
        out
    }

    /// Highest-tier held tool of the given kind.
    pub fn best_tool_of_kind(&self, kind: ToolKind) -> Option<(String, Tier)> {
        tools::best_tool(self.item_names(), kind).map(|(n, t)| (n.to_string(), t))
    }
}
