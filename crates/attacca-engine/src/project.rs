//! Project snapshots: the engine state that survives save/load.

use crate::config::PluginType;
use crate::error::{Error, Result};
use crate::graph::{PortGroup, SYSTEM_PLUGIN};
use attacca_plugin::CustomData;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Saved state of one plugin slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectPlugin {
    pub kind: PluginType,
    pub label: String,
    pub name: String,
    #[serde(default)]
    pub filename: Option<String>,
    pub midi_channel_mask: u16,
    /// Real (denormalised) values in parameter-index order.
    pub parameters: Vec<f32>,
    #[serde(default)]
    pub program: Option<u32>,
    #[serde(default)]
    pub midi_program: Option<u32>,
    #[serde(default)]
    pub custom_data: Vec<CustomData>,
    #[serde(default)]
    pub chunk: Option<Vec<u8>>,
}

/// A saved connection endpoint.
///
/// `plugin` is the position of the plugin in [`Project::plugins`], or
/// [`SYSTEM_PLUGIN`]; slot ids are reassigned at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPort {
    pub plugin: u32,
    pub group: PortGroup,
    pub index: u32,
}

impl ProjectPort {
    pub fn is_system(&self) -> bool {
        self.plugin == SYSTEM_PLUGIN
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConnection {
    pub source: ProjectPort,
    pub sink: ProjectPort,
}

/// A whole-engine snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Project {
    /// Plugins in slot-id order, holes compacted away.
    pub plugins: Vec<ProjectPlugin>,
    #[serde(default)]
    pub connections: Vec<ProjectConnection>,
}

impl Project {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::StateCorrupt(e.to_string()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::StateCorrupt(e.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}
