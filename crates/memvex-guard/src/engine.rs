// engine.rs — Rules evaluation engine.
//
// The RulesEngine maps (action, params) to a GuardDecision. It is pure and
// synchronous: no I/O, no clock, no state beyond the immutable RuleSet.
// Every check walks the same priority chain, first applicable clause wins:
//
// 1. No rule for the action?                         → Allow ("no rule defined")
// 2. Rule is `blocked`?                              → Deny
// 3. Rule has `require_approval`?                    → RequireApproval
// 4. `amount` strictly above `require_approval_above`? → RequireApproval
// 5. `amount` strictly above `max`?                  → Deny (hard cap, no escalation)
// 6. Otherwise                                       → Allow
//
// Threshold clauses only apply when `params.amount` coerces to a finite
// number. A missing or non-numeric amount skips the clause instead of failing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::rule::{GuardRule, RuleSet};

/// The verdict for one action + parameters pair.
///
/// Serialized in camelCase because it is relayed verbatim to agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardDecision {
    pub action: String,
    pub allowed: bool,
    pub requires_approval: bool,
    pub reason: String,
}

impl GuardDecision {
    fn allow(action: &str, reason: impl Into<String>) -> Self {
        Self {
            action: action.to_string(),
            allowed: true,
            requires_approval: false,
            reason: reason.into(),
        }
    }

    fn deny(action: &str, reason: impl Into<String>) -> Self {
        Self {
            action: action.to_string(),
            allowed: false,
            requires_approval: false,
            reason: reason.into(),
        }
    }

    fn escalate(action: &str, reason: impl Into<String>) -> Self {
        Self {
            action: action.to_string(),
            allowed: false,
            requires_approval: true,
            reason: reason.into(),
        }
    }
}

/// Evaluates actions against a loaded RuleSet.
#[derive(Debug, Clone, Default)]
pub struct RulesEngine {
    rules: RuleSet,
}

impl RulesEngine {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    /// An engine with no rules: every action is allowed.
    pub fn permissive() -> Self {
        Self::new(RuleSet::permissive())
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Evaluate `action` with optional parameters.
    pub fn check(&self, action: &str, params: Option<&Map<String, Value>>) -> GuardDecision {
        let rule = match self.rules.find(action) {
            Some(rule) => rule,
            None => return GuardDecision::allow(action, "No rule defined for this action"),
        };

        if rule.blocked == Some(true) {
            return GuardDecision::deny(
                action,
                message_or(rule, format!("Action \"{}\" is blocked", action)),
            );
        }

        if rule.require_approval == Some(true) {
            return GuardDecision::escalate(
                action,
                message_or(rule, format!("Action \"{}\" requires approval", action)),
            );
        }

        let amount = params.and_then(amount_param);

        if let (Some(threshold), Some(amount)) = (rule.require_approval_above, amount) {
            if amount > threshold {
                return GuardDecision::escalate(
                    action,
                    format!(
                        "Amount ${} exceeds auto-approval limit of ${}",
                        amount, threshold
                    ),
                );
            }
        }

        if let (Some(max), Some(amount)) = (rule.max, amount) {
            if amount > max {
                return GuardDecision::deny(
                    action,
                    format!("Amount ${} exceeds maximum of ${}", amount, max),
                );
            }
        }

        GuardDecision::allow(action, "Action permitted by rules")
    }
}

fn message_or(rule: &GuardRule, default: String) -> String {
    match rule.message.as_deref() {
        Some(m) if !m.trim().is_empty() => m.to_string(),
        _ => default,
    }
}

/// Coerce `params.amount` to a finite number.
///
/// Accepts JSON numbers and numeric strings ("75", " 12.5 "). Anything else
/// (absent, null, bool, object, unparseable text) counts as "no amount".
fn amount_param(params: &Map<String, Value>) -> Option<f64> {
    let amount = match params.get("amount")? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    amount.is_finite().then_some(amount)
}
