use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use timegrid_core::GridLayout;

use crate::palette::{HashedPalette, Rgb};

const APP_DIR: &str = "timegrid";
const CONFIG_FILE: &str = "config.toml";
const DATA_FILE: &str = "tasks.json";

/// Top-level configuration loaded from `<config_dir>/timegrid/config.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Week view geometry.
    #[serde(default)]
    pub grid: GridConfig,
    /// Where tasks are kept.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Client color overrides.
    #[serde(default)]
    pub colors: ColorsConfig,
}

impl AppConfig {
    /// Default location of the configuration file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load from an explicit path, or from [`default_path`](Self::default_path).
    ///
    /// An explicit path must exist; a missing default file yields the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => {
                if !path.exists() {
                    bail!("config file {} does not exist", path.display());
                }
                Self::from_path(path)
            }
            None => Self::default_path().map_or_else(|| Ok(Self::default()), Self::from_path),
        }
    }

    /// Load from `path`, falling back to defaults when the file is missing.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let config_path = path.as_ref();
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid configuration in {}", config_path.display()))?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.grid.ensure_positive_sizes()?;
        self.colors.ensure_named_clients()
    }

    /// Grid geometry.
    pub const fn layout(&self) -> GridLayout {
        GridLayout::new(self.grid.slot_px, self.grid.day_column_width)
    }

    /// Color palette with the configured overrides.
    pub fn palette(&self) -> HashedPalette {
        HashedPalette::with_overrides(self.colors.overrides.iter().map(|(client, color)| (client, *color)))
    }

    /// Data file: the configured path, else `<data_dir>/timegrid/tasks.json`.
    pub fn data_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.storage.path {
            return Ok(path.clone());
        }
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR).join(DATA_FILE))
            .ok_or_else(|| anyhow!("failed to resolve a data directory; set [storage] path"))
    }
}

/// `[grid]` block: pixel sizes of the week view.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GridConfig {
    /// Height of one half-hour slot.
    #[serde(default = "default_slot_px")]
    pub slot_px: f32,
    /// Width of one day column.
    #[serde(default = "default_day_column_width")]
    pub day_column_width: f32,
}

fn default_slot_px() -> f32 {
    GridLayout::default().slot_px
}

fn default_day_column_width() -> f32 {
    GridLayout::default().day_column_width
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            slot_px: default_slot_px(),
            day_column_width: default_day_column_width(),
        }
    }
}

impl GridConfig {
    fn ensure_positive_sizes(&self) -> Result<()> {
        for (name, value) in [("slot_px", self.slot_px), ("day_column_width", self.day_column_width)] {
            if !value.is_finite() || value <= 0.0 {
                bail!("grid.{name} must be a positive number, got {value}");
            }
        }
        Ok(())
    }
}

/// `[storage]` block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    /// Data file override.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// `[colors]` block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ColorsConfig {
    /// Background colors keyed by client name.
    #[serde(default)]
    pub overrides: BTreeMap<String, Rgb>,
}

impl ColorsConfig {
    fn ensure_named_clients(&self) -> Result<()> {
        if self.overrides.keys().any(|client| client.trim().is_empty()) {
            bail!("colors.overrides keys must be non-empty client names");
        }
        Ok(())
    }
}
