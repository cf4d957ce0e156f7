//! Static knowledge base: recipe, smelting, fuel, tool and drop tables,
//! plus the placement-support classifier. Pure data and lookups, no I/O.

pub mod drops;
pub mod recipes;
pub mod smelting;
pub mod support;
pub mod tools;
