pub mod guard;
pub mod init;
pub mod memory;
pub mod serve;
pub mod status;

use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Local, Utc};
use memvex_gateway::GatewayState;

/// Build this command's services from the config file.
pub fn load_state(config_path: &Path) -> anyhow::Result<GatewayState> {
    GatewayState::load(config_path).with_context(|| {
        format!(
            "cannot start memvex from {} (run `memvex init` to create one)",
            config_path.display()
        )
    })
}

/// Parse a user-supplied id. Anything that is not a UUID cannot name a
/// request or memory.
pub fn parse_id(raw: &str) -> anyhow::Result<uuid::Uuid> {
    uuid::Uuid::parse_str(raw.trim()).with_context(|| format!("'{}' is not a valid id", raw))
}

/// Local wall-clock time for table output.
pub fn fmt_time(at: &DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Truncate `text` to `max` characters for table output.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
