/// Store configuration.
/// Read from `<config dir>/taskboard/store.json`; every field has a default.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    /// Storage key for the columns half of the board.
    #[serde(default = "default_columns_key")]
    pub columns_key: String,
    /// Storage key for the tasks half of the board.
    #[serde(default = "default_tasks_key")]
    pub tasks_key: String,
    /// Color tag given to columns created by `add_column`.
    #[serde(default = "default_column_color")]
    pub default_column_color: String,
    /// Buffered updates per broadcast receiver before it starts lagging.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_columns_key() -> String {
    "kanban-columns".to_string()
}

fn default_tasks_key() -> String {
    "kanban-tasks".to_string()
}

fn default_column_color() -> String {
    "bg-slate-100".to_string()
}

fn default_event_capacity() -> usize {
    64
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            columns_key: default_columns_key(),
            tasks_key: default_tasks_key(),
            default_column_color: default_column_color(),
            event_capacity: default_event_capacity(),
        }
    }
}

/// Default config path: ~/.config/taskboard/store.json
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskboard")
        .join("store.json")
}

/// Default directory for `FileStorage`: ~/.local/share/taskboard
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskboard")
}

/// Load config from path. Returns defaults if the file is missing or malformed.
pub fn load_config(path: &Path) -> StoreConfig {
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!(
                "[taskboard.config] Failed to parse config {}: {}",
                path.display(),
                e
            );
            StoreConfig::default()
        }),
        Err(_) => {
            log::info!(
                "[taskboard.config] No config at {}, using defaults",
                path.display()
            );
            StoreConfig::default()
        }
    }
}
