//! # memvex-gateway
//!
//! Wires memvex.yaml to the guard and memory services and exposes them as
//! tools.
//!
//! - [`MemvexConfig`] is the parsed memvex.yaml; [`GatewayConfig`] is the
//!   on-disk layout derived from the project root.
//! - [`GatewayState`] owns one [`memvex_guard::GuardService`] and, when
//!   enabled, one [`memvex_memory::MemoryService`].
//! - [`tools`] holds the tool functions; [`MemvexServer`] serves them over
//!   MCP.
//!
//! ## Key invariants
//!
//! - **No globals**: every process builds its own state. Processes share data
//!   only through the database files under `<project_root>/.memvex/`.
//! - **Humans decide**: approve and deny are never exposed as tools.
//! - **Invalid config is fatal**: bad YAML or an invalid rule fails startup
//!   instead of silently running with fewer rules.

pub mod config;
pub mod error;
pub mod server;
pub mod state;
pub mod tools;

pub use config::{
    resolve_config_path, GatewayConfig, MemvexConfig, CONFIG_ENV_VAR, CONFIG_FILE_NAME,
    STARTER_CONFIG,
};
pub use error::GatewayError;
pub use server::MemvexServer;
pub use state::{GatewayState, StatusReport};
pub use tools::{dispatch, TOOL_NAMES};
