//! Voxel blueprints: the logical structure description the builder
//! consumes. Loaded from JSON; air cells are simply absent.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::agent::error::AgentError;
use crate::world::BlockPos;

/// Orientation hints for directional blocks. The facade cannot set all
/// of these on every backend; they bias reference-face selection and are
/// otherwise best-effort.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facing: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub half: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axis: Option<String>,
}

impl BlockProperties {
    pub fn is_empty(&self) -> bool {
        self.facing.is_none() && self.half.is_none() && self.axis.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voxel {
    /// Origin-relative offset (dx, dy, dz).
    pub offset: [i32; 3],
    pub block: String,
    #[serde(default, skip_serializing_if = "BlockProperties::is_empty")]
    pub properties: BlockProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    pub dims: [i32; 3],
    pub voxels: Vec<Voxel>,
}

impl Blueprint {
    pub fn load(path: &str) -> Result<Blueprint, AgentError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AgentError::Facade(format!("blueprint {path}: {e}")))?;
        let blueprint: Blueprint = serde_json::from_str(&raw)
            .map_err(|e| AgentError::Facade(format!("blueprint {path}: {e}")))?;
        blueprint.validate()?;
        Ok(blueprint)
    }

    pub fn validate(&self) -> Result<(), AgentError> {
        let [dx, dy, dz] = self.dims;
        if dx <= 0 || dy <= 0 || dz <= 0 {
            return Err(AgentError::Facade("blueprint has empty dimensions".to_string()));
        }
        for voxel in &self.voxels {
            let [x, y, z] = voxel.offset;
            if x < 0 || y < 0 || z < 0 || x >= dx || y >= dy || z >= dz {
                return Err(AgentError::Facade(format!(
                    "voxel ({x}, {y}, {z}) outside dims ({dx}, {dy}, {dz})"
                )));
            }
            if voxel.block.is_empty() || voxel.block == "air" {
                return Err(AgentError::Facade("air voxels must be elided".to_string()));
            }
        }
        Ok(())
    }

    /// Placement order: bottom-up layers, then x, then z, so the block
    /// below is almost always already present as support.
    pub fn ordered(&self) -> Vec<&Voxel> {
        let mut voxels: Vec<&Voxel> = self.voxels.iter().collect();
        voxels.sort_by_key(|v| (v.offset[1], v.offset[0], v.offset[2]));
        voxels
    }

    /// Aggregate a voxel set into a material multiset, sorted by name.
    /// Pass `blueprint.voxels.iter()` for the whole build, or a filtered
    /// iterator for just the voxels still missing from the world.
    pub fn material_multiset<'a>(
        voxels: impl Iterator<Item = &'a Voxel>,
    ) -> Vec<(String, u32)> {
        let mut materials: HashMap<&str, u32> = HashMap::new();
        for voxel in voxels {
            *materials.entry(voxel.block.as_str()).or_insert(0) += 1;
        }
        let mut out: Vec<(String, u32)> = materials
            .into_iter()
            .map(|(name, count)| (name.to_string(), count))
            .collect();
        out.sort();
        out
    }

    /// Target block of a cell, if the blueprint defines one.
    pub fn block_at(&self, offset: [i32; 3]) -> Option<&Voxel> {
        self.voxels.iter().find(|v| v.offset == offset)
    }

    /// The (x, z) footprint under the structure, for ground preparation.
    pub fn base_footprint(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        let [dx, _, dz] = self.dims;
        (0..dx).flat_map(move |x| (0..dz).map(move |z| (x, z)))
    }

    pub fn world_pos(&self, origin: BlockPos, voxel: &Voxel) -> BlockPos {
        origin.offset(voxel.offset[0], voxel.offset[1], voxel.offset[2])
    }
}
