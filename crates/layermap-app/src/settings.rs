use crate::{ConnectPolicy, InteractionController};
use anyhow::{Context, Result};
use layermap_core::KindPreset;
use layermap_graph::{GraphModel, LayoutConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration of one board, read from a JSON settings file.
///
/// Every section falls back to its default, so partial files are valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardSettings {
    pub name: String,
    pub kinds: KindPreset,
    pub layout: LayoutConfig,
    pub connect: ConnectPolicy,
    /// Key the board is saved under in a snapshot store.
    pub storage_key: String,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            name: "Architecture".to_string(),
            kinds: KindPreset::Architecture,
            layout: LayoutConfig::default(),
            connect: ConnectPolicy::default(),
            storage_key: "architecture-graph".to_string(),
        }
    }
}

impl BoardSettings {
    /// Preset for the screen map board.
    pub fn screen_map() -> Self {
        Self {
            name: "Screen map".to_string(),
            kinds: KindPreset::Screen,
            storage_key: "screen-graph".to_string(),
            ..Self::default()
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        let settings = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))?;
        tracing::info!("Settings loaded from {}", path.display());
        Ok(settings)
    }

    /// Falls back to defaults when the file is missing or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            tracing::info!("Settings file not found, using defaults");
            return Self::default();
        }
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::error!("{:#}", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write settings file {}", path.display()))?;
        Ok(())
    }

    /// An empty model restricted to the configured kinds.
    pub fn empty_model(&self) -> GraphModel {
        match self.kinds.kind_set() {
            Some(kinds) => GraphModel::with_kinds(kinds),
            None => GraphModel::new(),
        }
    }

    pub fn controller(&self) -> InteractionController {
        self.controller_for(self.empty_model())
    }

    pub fn controller_for(&self, model: GraphModel) -> InteractionController {
        InteractionController::new(model)
            .with_layout_config(self.layout.clone())
            .with_policy(self.connect)
    }
}
