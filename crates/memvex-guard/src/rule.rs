// rule.rs — GuardRule configuration entities and the immutable RuleSet.
//
// Rules come from the `guard.rules` list in memvex.yaml, e.g.:
//
//   - action: spend_money
//     require_approval_above: 50
//     max: 500
//   - action: send_external_email
//     require_approval: true
//   - action: modify_production
//     blocked: true
//
// They are loaded once at startup and never mutated afterwards, so a RuleSet
// can be shared freely between threads.

use serde::{Deserialize, Serialize};

use crate::error::GuardError;

/// One per-action policy rule.
///
/// Field names stay snake_case because they are written by hand in YAML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuardRule {
    /// The action name this rule governs (e.g., "spend_money").
    pub action: String,

    /// Completely block this action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked: Option<bool>,

    /// Always require human approval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_approval: Option<bool>,

    /// Require approval when `params.amount` is strictly above this value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_approval_above: Option<f64>,

    /// Hard cap: `params.amount` strictly above this value is denied outright.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    /// Message shown when the action is blocked or pending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl GuardRule {
    /// Create a rule for `action` with no clauses set (permits everything).
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Self::default()
        }
    }

    pub fn blocked(mut self) -> Self {
        self.blocked = Some(true);
        self
    }

    pub fn require_approval(mut self) -> Self {
        self.require_approval = Some(true);
        self
    }

    pub fn require_approval_above(mut self, threshold: f64) -> Self {
        self.require_approval_above = Some(threshold);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Check that the rule is well-formed.
    ///
    /// Malformed rules are configuration errors and must stop startup rather
    /// than leave the policy undefined.
    pub fn validate(&self) -> Result<(), GuardError> {
        if self.action.trim().is_empty() {
            return Err(GuardError::InvalidRule {
                action: self.action.clone(),
                reason: "action name must not be empty".to_string(),
            });
        }
        for (field, value) in [
            ("require_approval_above", self.require_approval_above),
            ("max", self.max),
        ] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(GuardError::InvalidRule {
                        action: self.action.clone(),
                        reason: format!("{} must be a finite, non-negative number (got {})", field, v),
                    });
                }
            }
        }
        Ok(())
    }
}

/// An ordered, immutable collection of rules.
///
/// Lookup is first-match-wins by action name.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<GuardRule>,
}

impl RuleSet {
    /// Build a rule set, validating every rule.
    ///
    /// Duplicate action names are kept (the first one wins at lookup) but
    /// logged as a warning, since the later ones can never match.
    pub fn new(rules: Vec<GuardRule>) -> Result<Self, GuardError> {
        for (idx, rule) in rules.iter().enumerate() {
            rule.validate()?;
            if rules[..idx].iter().any(|r| r.action == rule.action) {
                tracing::warn!(
                    action = %rule.action,
                    position = idx,
                    "duplicate guard rule ignored; the first rule for this action wins"
                );
            }
        }
        Ok(Self { rules })
    }

    /// An empty rule set: every action is allowed.
    pub fn permissive() -> Self {
        Self { rules: Vec::new() }
    }

    /// Find the rule governing `action`, if any.
    pub fn find(&self, action: &str) -> Option<&GuardRule> {
        self.rules.iter().find(|r| r.action == action)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GuardRule> {
        self.rules.iter()
    }
}
