//! Closed error taxonomy for resolution and execution.

use thiserror::Error;

use crate::knowledge::tools::ToolRequirement;
use crate::world::{BlockPos, FacadeError, NavError};

#[derive(Debug, Clone, PartialEq)]
pub enum PlaceFailure {
    NoReference,
    EquipFailed,
    VerifyMismatch,
}

impl std::fmt::Display for PlaceFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoReference => write!(f, "no reference face"),
            Self::EquipFailed => write!(f, "equip failed"),
            Self::VerifyMismatch => write!(f, "placed block did not match"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AgentError {
    #[error("no way to obtain {0}")]
    Unsatisfiable(String),
    #[error("no reachable {0} left nearby")]
    ResourceExhausted(String),
    #[error("missing required tool: {} {}", .0.tier.as_str(), .0.kind.as_str())]
    ToolMissing(ToolRequirement),
    #[error("navigation failed: {0}")]
    Nav(NavError),
    #[error("placement failed at {pos}: {reason}")]
    PlacementFailed { pos: BlockPos, reason: PlaceFailure },
    #[error("producing {0} loops back onto itself")]
    Cycle(String),
    #[error("busy with another command")]
    Busy,
    #[error("{0} timed out")]
    Timeout(&'static str),
    #[error("aborted")]
    Aborted,
    #[error("world interface: {0}")]
    Facade(String),
}

impl From<NavError> for AgentError {
    fn from(e: NavError) -> Self {
        AgentError::Nav(e)
    }
}

impl From<FacadeError> for AgentError {
    fn from(e: FacadeError) -> Self {
        AgentError::Facade(e.0)
    }
}

impl AgentError {
    /// Transient failures are retried within a task; everything else
    /// fails the task on first occurrence.
    pub fn is_transient(&self) -> bool {
        matches!(self, AgentError::Nav(_) | AgentError::PlacementFailed { .. })
    }
}
