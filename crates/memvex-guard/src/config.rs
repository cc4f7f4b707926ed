// config.rs — The `guard:` section of memvex.yaml.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::GuardError;
use crate::rule::{GuardRule, RuleSet};

/// Guard configuration as written in memvex.yaml.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardConfig {
    /// When false, every action is allowed and no approvals are created.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Persist approval requests to SQLite. When false, the queue is volatile.
    #[serde(default = "default_true")]
    pub persist: bool,

    /// Database file for approval requests. Defaults to `.memvex/guard.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    #[serde(default)]
    pub rules: Vec<GuardRule>,
}

fn default_true() -> bool {
    true
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            persist: true,
            path: None,
            rules: Vec::new(),
        }
    }
}

impl GuardConfig {
    /// Configuration used when memvex.yaml has no `guard:` section.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Validate the rules into an immutable RuleSet.
    pub fn rule_set(&self) -> Result<RuleSet, GuardError> {
        RuleSet::new(self.rules.clone())
    }
}
