/// Application configuration: load, save, and sanitize.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::color::HexColor;

const CONFIG_FILE_NAME: &str = "viz.json";

const MIN_HISTORY_ENTRIES: usize = 1;
const MAX_HISTORY_ENTRIES: usize = 1_000;
const MIN_CANVAS_SIDE: u32 = 16;
const MAX_CANVAS_SIDE: u32 = 8_192;

/// Top-level configuration for the canvas creation tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VizConfig {
    /// Snapshots kept per editing session.
    pub max_history_entries: usize,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub background: HexColor,
    /// Fill for shapes added without an explicit color.
    pub default_fill: HexColor,
}

impl Default for VizConfig {
    fn default() -> Self {
        Self {
            max_history_entries: 50,
            canvas_width: 1080,
            canvas_height: 1080,
            background: HexColor::WHITE,
            default_fill: HexColor::VIOLET,
        }
    }
}

impl VizConfig {
    /// Returns the config file path.
    ///
    /// Resolution order:
    /// 1. `viz.json` next to the executable
    /// 2. `viz/viz.json` under the user's config directory
    /// 3. `viz.json` in the working directory
    pub fn config_path() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|d| d.join(CONFIG_FILE_NAME)))
            .or_else(|| dirs::config_dir().map(|d| d.join("viz").join(CONFIG_FILE_NAME)))
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
    }

    /// Loads config from `path`, creating a default file if it doesn't exist.
    /// Returns defaults on any error (unreadable file, parse error, etc.).
    pub fn load_or_create(path: &Path) -> Self {
        if !path.exists() {
            let config = Self::default();
            if let Err(e) = config.save(path) {
                tracing::warn!("Failed to create default config at {}: {e:#}", path.display());
            }
            return config;
        }

        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                // Leave the broken file in place for the user to fix.
                tracing::warn!("Failed to load config at {}: {e:#}", path.display());
                Self::default()
            }
        }
    }

    /// Reads and sanitizes config from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.sanitize();
        Ok(config)
    }

    /// Saves config to `path` as pretty-printed JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Clamps values to valid ranges.
    pub fn sanitize(&mut self) {
        self.max_history_entries = self
            .max_history_entries
            .clamp(MIN_HISTORY_ENTRIES, MAX_HISTORY_ENTRIES);
        self.canvas_width = self.canvas_width.clamp(MIN_CANVAS_SIDE, MAX_CANVAS_SIDE);
        self.canvas_height = self.canvas_height.clamp(MIN_CANVAS_SIDE, MAX_CANVAS_SIDE);
    }
}
