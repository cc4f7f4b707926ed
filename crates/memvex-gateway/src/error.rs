// error.rs — Error types for config loading and the tool layer.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading config or serving tool calls.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No memvex.yaml at the resolved location.
    #[error("config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// memvex.yaml exists but is not valid YAML for the expected shape.
    #[error("failed to parse {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    /// memvex.yaml parsed but describes an unusable setup.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A guard operation failed.
    #[error("guard error: {0}")]
    Guard(#[from] memvex_guard::GuardError),

    /// A memory operation failed.
    #[error("memory error: {0}")]
    Memory(#[from] memvex_memory::MemoryError),

    /// A tool result could not be rendered as JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A tool was called with arguments it cannot use.
    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    /// The tool name is not part of the surface.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// The module backing this tool is turned off in memvex.yaml.
    #[error("{0} module is disabled in memvex.yaml")]
    ModuleDisabled(&'static str),

    /// An I/O operation failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
