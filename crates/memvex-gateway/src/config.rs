// config.rs — memvex.yaml loading and the on-disk layout.
//
// MemvexConfig is the parsed memvex.yaml. GatewayConfig is where state lives
// on disk; `for_project()` derives it from the project root (the directory
// holding memvex.yaml) so that the CLI and the MCP server always resolve the
// same `.memvex/guard.db` and `.memvex/memory.db`.
//
// Config lookup order: explicit path → $MEMVEX_CONFIG → ./memvex.yaml.

use std::path::{Path, PathBuf};

use memvex_guard::GuardConfig;
use memvex_memory::MemoryConfig;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// File name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "memvex.yaml";

/// Environment variable overriding the config location.
pub const CONFIG_ENV_VAR: &str = "MEMVEX_CONFIG";

/// Starter config written by `memvex init`.
pub const STARTER_CONFIG: &str = r#"# memvex configuration
identity:
  name: ""
  role: ""
  coding:
    style: functional
  communication:
    team: casual
    external: professional

memory:
  enabled: true
  storage: sqlite        # sqlite | memory

guard:
  enabled: true
  rules:
    - action: spend_money
      require_approval_above: 50
      max: 500
    - action: send_external_email
      require_approval: true
    - action: modify_production
      blocked: true
      message: "Production changes must go through the deploy pipeline"
"#;

/// Parsed memvex.yaml.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemvexConfig {
    /// User identity and preferences. Carried through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<serde_yaml::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard: Option<GuardConfig>,
}

impl MemvexConfig {
    /// Read and validate the config at `path`.
    pub fn load(path: &Path) -> Result<Self, GatewayError> {
        if !path.is_file() {
            return Err(GatewayError::ConfigNotFound(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path).map_err(|source| GatewayError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&raw).map_err(|source| GatewayError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Parse YAML text. An empty document is an empty config.
    pub fn parse(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    /// Reject configs the services cannot run with.
    pub fn validate(&self) -> Result<(), GatewayError> {
        if let Some(guard) = &self.guard {
            guard
                .rule_set()
                .map_err(|e| GatewayError::InvalidConfig(e.to_string()))?;
        }
        for (module, path) in [
            ("guard", self.guard.as_ref().and_then(|g| g.path.as_deref())),
            ("memory", self.memory.as_ref().and_then(|m| m.path.as_deref())),
        ] {
            if path.is_some_and(|p| p.as_os_str().is_empty()) {
                return Err(GatewayError::InvalidConfig(format!(
                    "{}.path must not be empty",
                    module
                )));
            }
        }
        Ok(())
    }

    /// Guard settings; a missing section means the guard is off.
    pub fn guard_config(&self) -> GuardConfig {
        self.guard.clone().unwrap_or_else(GuardConfig::disabled)
    }

    /// Memory settings; a missing section means SQLite at the default path.
    pub fn memory_config(&self) -> MemoryConfig {
        self.memory.clone().unwrap_or_default()
    }
}

/// Pick the config file: explicit path, then $MEMVEX_CONFIG, then
/// `memvex.yaml` in `cwd`.
pub fn resolve_config_path(explicit: Option<&Path>, cwd: &Path) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    match std::env::var_os(CONFIG_ENV_VAR) {
        Some(env) if !env.is_empty() => PathBuf::from(env),
        _ => cwd.join(CONFIG_FILE_NAME),
    }
}

/// Where memvex keeps its state for one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Directory holding memvex.yaml. Relative paths in the config resolve
    /// against it.
    pub project_root: PathBuf,

    /// `.memvex/` under the project root.
    pub data_dir: PathBuf,

    /// Default approval queue file.
    pub guard_db: PathBuf,

    /// Default memory store file.
    pub memory_db: PathBuf,
}

impl GatewayConfig {
    /// Standard `.memvex/` layout for a project.
    pub fn for_project(project_root: impl AsRef<Path>) -> Self {
        let root = project_root.as_ref().to_path_buf();
        let data_dir = root.join(".memvex");
        Self {
            guard_db: data_dir.join("guard.db"),
            memory_db: data_dir.join("memory.db"),
            data_dir,
            project_root: root,
        }
    }

    /// Layout for the project whose config file is `config_path`.
    pub fn for_config_file(config_path: &Path) -> Self {
        match config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => Self::for_project(parent),
            _ => Self::for_project("."),
        }
    }

    /// Resolve a configured path against the project root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }
}
