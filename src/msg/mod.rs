//! Wire documents: intents arriving from the NL parser and events going
//! back out over the control channel. Everything is JSON.

use serde::{Deserialize, Serialize};

fn default_count() -> u32 {
    1
}

fn default_radius() -> f64 {
    16.0
}

/// A single actionable verb, tagged by `action`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Intent {
    Mine {
        block_type: String,
        #[serde(default = "default_count")]
        count: u32,
    },
    Craft {
        item_name: String,
        #[serde(default = "default_count")]
        count: u32,
    },
    Smelt {
        item_name: String,
        #[serde(default = "default_count")]
        count: u32,
    },
    Fight {
        mob_type: String,
        #[serde(default = "default_radius")]
        radius: f64,
    },
    Harvest {
        crop_type: String,
        #[serde(default = "default_radius")]
        radius: f64,
    },
    Follow {
        player_name: String,
        #[serde(default)]
        distance: Option<f64>,
    },
    Give {
        player_name: String,
        item_name: String,
        #[serde(default = "default_count")]
        count: u32,
    },
    Goto {
        x: f64,
        y: f64,
        z: f64,
    },
    Respond {
        message: String,
    },
    LoadBlueprint {
        file_path: String,
    },
    BuildStructure {
        #[serde(default)]
        blueprint: Option<String>,
        #[serde(default)]
        position: Option<[i32; 3]>,
    },
    Stop,
    Status,
}

impl Intent {
    /// Short label used for `current_action` reporting.
    pub fn label(&self) -> String {
        match self {
            Intent::Mine { block_type, count } => format!("mine {count} {block_type}"),
            Intent::Craft { item_name, count } => format!("craft {count} {item_name}"),
            Intent::Smelt { item_name, count } => format!("smelt {count} {item_name}"),
            Intent::Fight { mob_type, .. } => format!("fight {mob_type}"),
            Intent::Harvest { crop_type, .. } => format!("harvest {crop_type}"),
            Intent::Follow { player_name, .. } => format!("follow {player_name}"),
            Intent::Give { player_name, item_name, count } => {
                format!("give {count} {item_name} to {player_name}")
            }
            Intent::Goto { x, y, z } => format!("goto {x:.0} {y:.0} {z:.0}"),
            Intent::Respond { .. } => "respond".to_string(),
            Intent::LoadBlueprint { .. } => "load blueprint".to_string(),
            Intent::BuildStructure { .. } => "build structure".to_string(),
            Intent::Stop => "stop".to_string(),
            Intent::Status => "status".to_string(),
        }
    }
}

/// Top-level document: a single step, a multi-step sequence, or a parser
/// failure. Variants are discriminated structurally.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum IntentDocument {
    Failure { error: String },
    Multi { is_multistep: bool, steps: Vec<Intent> },
    Single(Intent),
}

pub fn parse_intent(raw: &str) -> Result<IntentDocument, serde_json::Error> {
    serde_json::from_str(raw)
}

// ─── Outbound events ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPayload {
    pub connected: bool,
    pub position: [f64; 3],
    pub health: f64,
    pub food: f64,
    pub current_action: Option<String>,
    pub processing: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Chat { message: String },
    Status(StatusPayload),
}

/// Broadcast side of the control channel; every connection write task
/// subscribes.
pub type Outbox = tokio::sync::broadcast::Sender<Event>;
