// config.rs — The `memory:` section of memvex.yaml.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which backend stores memories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Persisted SQLite file with full-text search.
    #[default]
    Sqlite,
    /// Volatile, lost on exit.
    Memory,
}

/// Memory configuration as written in memvex.yaml.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub storage: StorageKind,

    /// Database file. Defaults to `.memvex/memory.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            storage: StorageKind::Sqlite,
            path: None,
        }
    }
}
