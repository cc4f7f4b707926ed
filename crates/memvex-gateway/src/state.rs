// state.rs — Explicitly constructed services shared by every entry point.
//
// Each process (CLI command, MCP server) builds its own GatewayState from
// memvex.yaml. There are no global singletons; two processes share data only
// by resolving the same database files, which GatewayConfig guarantees for a
// given project root.

use std::path::Path;

use memvex_guard::GuardService;
use memvex_memory::MemoryService;
use serde::Serialize;

use crate::config::{GatewayConfig, MemvexConfig};
use crate::error::GatewayError;

/// The guard and memory services for one project.
#[derive(Debug)]
pub struct GatewayState {
    pub config: GatewayConfig,
    pub guard: GuardService,
    /// `None` when memory is disabled in memvex.yaml.
    pub memory: Option<MemoryService>,
}

/// What `memvex status` prints.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub project_root: String,
    pub guard_enabled: bool,
    pub guard_backend: String,
    pub guard_rules: usize,
    pub pending_approvals: usize,
    pub memory_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_backend: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_count: Option<usize>,
}

impl GatewayState {
    /// Build services from a parsed config and a resolved layout.
    pub fn new(memvex: &MemvexConfig, config: GatewayConfig) -> Result<Self, GatewayError> {
        memvex.validate()?;

        // Configured paths are relative to the project root, so resolve them
        // here and pass the result as the services' default path.
        let guard_config = memvex.guard_config();
        let guard_db = guard_config
            .path
            .as_deref()
            .map(|p| config.resolve(p))
            .unwrap_or_else(|| config.guard_db.clone());
        let guard_config = memvex_guard::GuardConfig {
            path: None,
            ..guard_config
        };
        let guard = GuardService::from_config(&guard_config, &guard_db)?;

        let memory_config = memvex.memory_config();
        let memory = if memory_config.enabled {
            let memory_db = memory_config
                .path
                .as_deref()
                .map(|p| config.resolve(p))
                .unwrap_or_else(|| config.memory_db.clone());
            let resolved = memvex_memory::MemoryConfig {
                path: None,
                ..memory_config
            };
            Some(MemoryService::from_config(&resolved, &memory_db))
        } else {
            tracing::debug!("memory disabled");
            None
        };

        Ok(Self {
            config,
            guard,
            memory,
        })
    }

    /// Load memvex.yaml at `config_path` and build services for its project.
    pub fn load(config_path: &Path) -> Result<Self, GatewayError> {
        let memvex = MemvexConfig::load(config_path)?;
        Self::new(&memvex, GatewayConfig::for_config_file(config_path))
    }

    /// The memory service, or `ModuleDisabled`.
    pub fn memory(&self) -> Result<&MemoryService, GatewayError> {
        self.memory.as_ref().ok_or(GatewayError::ModuleDisabled("memory"))
    }

    pub fn status(&self) -> Result<StatusReport, GatewayError> {
        let memory_count = match &self.memory {
            Some(memory) => Some(memory.list(None)?.len()),
            None => None,
        };
        Ok(StatusReport {
            project_root: self.config.project_root.display().to_string(),
            guard_enabled: self.guard.is_enabled(),
            guard_backend: self.guard.backend_name().to_string(),
            guard_rules: self.guard.engine().rules().len(),
            pending_approvals: self.guard.pending_approvals()?.len(),
            memory_enabled: self.memory.is_some(),
            memory_backend: self.memory.as_ref().map(|m| m.backend_name().to_string()),
            memory_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_layout_creates_both_files() {
        let dir = tempdir().unwrap();
        let memvex = MemvexConfig::parse("guard:\n  enabled: true\n").unwrap();
        let state = GatewayState::new(&memvex, GatewayConfig::for_project(dir.path())).unwrap();

        assert!(dir.path().join(".memvex/guard.db").exists());
        assert!(dir.path().join(".memvex/memory.db").exists());
        let status = state.status().unwrap();
        assert!(status.guard_enabled);
        assert_eq!(status.guard_backend, "sqlite");
        assert_eq!(status.memory_backend.as_deref(), Some("sqlite"));
    }

    #[test]
    fn relative_paths_resolve_against_project_root() {
        let dir = tempdir().unwrap();
        let memvex = MemvexConfig::parse(
            "guard:\n  path: state/approvals.db\nmemory:\n  path: state/mem.db\n",
        )
        .unwrap();
        GatewayState::new(&memvex, GatewayConfig::for_project(dir.path())).unwrap();
        assert!(dir.path().join("state/approvals.db").exists());
        assert!(dir.path().join("state/mem.db").exists());
    }

    #[test]
    fn disabled_memory_reports_module_disabled() {
        let dir = tempdir().unwrap();
        let memvex = MemvexConfig::parse("memory:\n  enabled: false\n").unwrap();
        let state = GatewayState::new(&memvex, GatewayConfig::for_project(dir.path())).unwrap();
        assert!(matches!(state.memory(), Err(GatewayError::ModuleDisabled("memory"))));
        assert!(!state.status().unwrap().memory_enabled);
    }

    #[test]
    fn missing_guard_section_is_permissive() {
        let dir = tempdir().unwrap();
        let state = GatewayState::new(&MemvexConfig::default(), GatewayConfig::for_project(dir.path()))
            .unwrap();
        assert!(!state.guard.is_enabled());
        assert!(state.guard.check("anything", None, None).unwrap().decision.allowed);
        assert!(!dir.path().join(".memvex/guard.db").exists());
    }

    #[test]
    fn load_uses_config_file_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("memvex.yaml");
        std::fs::write(&path, crate::config::STARTER_CONFIG).unwrap();

        let state = GatewayState::load(&path).unwrap();
        assert_eq!(state.config.project_root, dir.path());
        assert_eq!(state.guard.engine().rules().len(), 3);
    }
}
