// approval.rs — ApprovalRequest state machine and the ApprovalBackend trait.
//
// An ApprovalRequest is created Pending whenever a check needs a human, and
// transitions exactly once:
//
//   Pending → Approved
//   Pending → Denied
//
// Approved and Denied are terminal. There is no cancellation or expiry.
// Backends own requests for their whole lifetime; callers only ever see
// copies.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::GuardError;

/// Number of requests returned by `get_history` when no limit is given.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Lifecycle state of an approval request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Waiting for a human decision.
    Pending,
    /// A human approved the action.
    Approved,
    /// A human denied the action.
    Denied,
}

impl ApprovalStatus {
    /// Only Pending → Approved and Pending → Denied exist.
    pub fn can_transition_to(self, next: ApprovalStatus) -> bool {
        matches!(
            (self, next),
            (ApprovalStatus::Pending, ApprovalStatus::Approved)
                | (ApprovalStatus::Pending, ApprovalStatus::Denied)
        )
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, ApprovalStatus::Pending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Denied => "denied",
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ApprovalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ApprovalStatus::Pending),
            "approved" => Ok(ApprovalStatus::Approved),
            "denied" => Ok(ApprovalStatus::Denied),
            other => Err(format!("unknown approval status '{}'", other)),
        }
    }
}

/// A human-decidable record created when a decision defers to a person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    /// Assigned by the backend at creation, never by the caller.
    pub id: Uuid,

    /// The action awaiting approval (e.g., "spend_money").
    pub action: String,

    /// Which agent asked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,

    /// The parameters the action was checked with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Map<String, Value>>,

    /// Why approval is needed (the rule's reason or the agent's own words).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    pub status: ApprovalStatus,

    pub created_at: DateTime<Utc>,

    /// Set exactly once, when the request leaves Pending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
}

/// Current time at the millisecond precision the SQLite queue stores, so a
/// request compares equal before and after a round trip.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

impl ApprovalRequest {
    /// Create a fresh Pending request with a random id.
    pub fn pending(
        action: impl Into<String>,
        agent: Option<String>,
        params: Option<Map<String, Value>>,
        reason: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            action: action.into(),
            agent,
            params,
            reason,
            status: ApprovalStatus::Pending,
            created_at: now(),
            decided_at: None,
        }
    }

    /// Move to `next` if the state machine allows it.
    ///
    /// Returns false (and leaves the request untouched) otherwise.
    pub fn decide(&mut self, next: ApprovalStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        self.decided_at = Some(now());
        true
    }
}

/// Storage for approval requests.
///
/// Implementations must provide identical semantics:
/// - `submit` always inserts a new Pending row (no deduplication).
/// - `approve`/`deny` are a single atomic check-and-set: `None` when the id
///   is unknown or the request is no longer Pending.
/// - `get_pending` is oldest first; `get_history` is newest first across all
///   statuses.
///
/// Backends serialize their own operations, so they are shared via `&self`.
pub trait ApprovalBackend: Send + Sync {
    /// Short backend identifier for status output (e.g., "sqlite").
    fn name(&self) -> &'static str;

    /// Queue a new Pending request.
    fn submit(
        &self,
        action: &str,
        agent: Option<&str>,
        params: Option<&Map<String, Value>>,
        reason: Option<&str>,
    ) -> Result<ApprovalRequest, GuardError>;

    /// Approve a Pending request.
    fn approve(&self, id: Uuid) -> Result<Option<ApprovalRequest>, GuardError>;

    /// Deny a Pending request.
    fn deny(&self, id: Uuid) -> Result<Option<ApprovalRequest>, GuardError>;

    /// All Pending requests, oldest first.
    fn get_pending(&self) -> Result<Vec<ApprovalRequest>, GuardError>;

    /// Fetch one request regardless of status.
    fn get(&self, id: Uuid) -> Result<Option<ApprovalRequest>, GuardError>;

    /// Up to `limit` requests of any status, newest first.
    fn get_history(&self, limit: usize) -> Result<Vec<ApprovalRequest>, GuardError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_can_reach_both_terminal_states() {
        assert!(ApprovalStatus::Pending.can_transition_to(ApprovalStatus::Approved));
        assert!(ApprovalStatus::Pending.can_transition_to(ApprovalStatus::Denied));
    }

    #[test]
    fn terminal_states_are_immutable() {
        for terminal in [ApprovalStatus::Approved, ApprovalStatus::Denied] {
            assert!(terminal.is_terminal());
            for next in [
                ApprovalStatus::Pending,
                ApprovalStatus::Approved,
                ApprovalStatus::Denied,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn decide_sets_decided_at_once() {
        let mut req = ApprovalRequest::pending("spend_money", None, None, None);
        assert!(req.decided_at.is_none());

        assert!(req.decide(ApprovalStatus::Approved));
        let first = req.decided_at;
        assert!(first.is_some());

        assert!(!req.decide(ApprovalStatus::Denied));
        assert_eq!(req.status, ApprovalStatus::Approved);
        assert_eq!(req.decided_at, first);
    }

    #[test]
    fn timestamps_have_millisecond_precision() {
        let mut req = ApprovalRequest::pending("deploy", None, None, None);
        assert!(req.decide(ApprovalStatus::Denied));
        assert_eq!(req.created_at.timestamp_subsec_nanos() % 1_000_000, 0);
        assert_eq!(req.decided_at.unwrap().timestamp_subsec_nanos() % 1_000_000, 0);
    }

    #[test]
    fn status_string_round_trip() {
        for status in [
            ApprovalStatus::Pending,
            ApprovalStatus::Approved,
            ApprovalStatus::Denied,
        ] {
            assert_eq!(status.to_string().parse::<ApprovalStatus>().unwrap(), status);
        }
        assert!("cancelled".parse::<ApprovalStatus>().is_err());
    }

    #[test]
    fn request_serializes_camel_case_with_lowercase_status() {
        let req = ApprovalRequest::pending("deploy", Some("agent-1".into()), None, None);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["status"], "pending");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("decidedAt").is_none());
        assert_eq!(json["agent"], "agent-1");
    }
}
