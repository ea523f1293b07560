//! Application Configuration
//!
//! Read from a JSON file; every field has a default so a partial (or missing)
//! file is fine.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::repository::IN_MEMORY;

/// Overrides `data_dir` when set
pub const DATA_DIR_ENV: &str = "OPSDESK_DATA_DIR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    /// File name under `data_dir`, or `":memory:"`
    pub database_file: String,
    /// Defaults to `<data_dir>/logs`
    pub log_dir: Option<PathBuf>,
    pub app_name: String,
    /// 0 keeps history forever
    pub history_retention_days: u32,
    pub event_buffer: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            database_file: "opsdesk.db".to_string(),
            log_dir: None,
            app_name: "OpsDesk".to_string(),
            history_retention_days: 0,
            event_buffer: 64,
        }
    }
}

impl AppConfig {
    /// Load from `path`, falling back to defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self, String> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| format!("Failed to read config {}: {}", path.display(), e))?;
            serde_json::from_str::<AppConfig>(&raw)
                .map_err(|e| format!("Invalid config {}: {}", path.display(), e))?
        } else {
            AppConfig::default()
        };

        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.trim().is_empty() {
                config.data_dir = PathBuf::from(dir);
            }
        }
        Ok(config)
    }

    /// Configuration for a throwaway in-memory instance
    pub fn in_memory() -> Self {
        Self {
            database_file: IN_MEMORY.to_string(),
            ..Self::default()
        }
    }

    pub fn db_path(&self) -> PathBuf {
        if self.database_file == IN_MEMORY {
            PathBuf::from(IN_MEMORY)
        } else {
            self.data_dir.join(&self.database_file)
        }
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("logs"))
    }
}
