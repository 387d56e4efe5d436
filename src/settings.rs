//! Persistent user settings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::WeightUnit;
use crate::store;

fn default_window_days() -> u32 {
    30
}

/// User preferences stored as JSON in the platform config directory.
///
/// Every field has a default so older or partial files still load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Overrides the default database location.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    /// Trailing window used by the performance view.
    #[serde(default = "default_window_days")]
    pub performance_window_days: u32,
    #[serde(default)]
    pub weight_unit: WeightUnit,
    /// Seed the exercise catalog when the database is empty.
    #[serde(default = "default_true")]
    pub seed_catalog: bool,
}

fn default_true() -> bool {
    true
}

impl Settings {
    const FILE: &'static str = "ppl_tracker_settings.json";

    pub fn path() -> Option<PathBuf> {
        dirs_next::config_dir().map(|p| p.join(Self::FILE))
    }

    /// Load settings, falling back to defaults when the file is missing or
    /// unreadable.
    pub fn load() -> Self {
        if let Some(path) = Self::path() {
            if let Ok(data) = std::fs::read_to_string(&path) {
                match serde_json::from_str(&data) {
                    Ok(cfg) => return cfg,
                    Err(e) => log::warn!("Ignoring invalid settings in {}: {e}", path.display()),
                }
            }
        }
        Self::default()
    }

    pub fn save(&self) -> Result<()> {
        if let Some(path) = Self::path() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        }
        Ok(())
    }

    /// Configured database path or the default one in the data directory.
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(p) => Ok(p.clone()),
            None => store::default_db_path(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: None,
            performance_window_days: default_window_days(),
            weight_unit: WeightUnit::Lbs,
            seed_catalog: true,
        }
    }
}
