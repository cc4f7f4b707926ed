// tools.rs — The tool surface, independent of any wire protocol.
//
// Each tool takes a typed parameter struct and returns the JSON the caller
// sees. The MCP server in server.rs is one framing of these functions;
// `dispatch` is another (name + JSON arguments), used by tests and anything
// that speaks plain JSON.
//
// Approve and deny are not tools. Decisions belong to humans (CLI), never to
// the agent that asked.
//
// A disabled guard answers every check with "allowed" and refuses explicit
// approval requests, so nothing is ever queued.
//
// Ids that do not parse as UUIDs are reported as not found, exactly like a
// well-formed id that matches nothing.

use memvex_guard::GuardError;
use memvex_memory::{MemoryQuery, NewMemory, DEFAULT_RECALL_LIMIT};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::error::GatewayError;
use crate::state::GatewayState;

/// Every tool name, in registration order.
pub const TOOL_NAMES: [&str; 8] = [
    "guard_check",
    "guard_request_approval",
    "guard_list_pending",
    "guard_approval_status",
    "memory_store",
    "memory_recall",
    "memory_forget",
    "memory_list",
];

/// Result of `guard_approval_status` for an unknown id.
pub const NOT_FOUND: &str = "not found";

// ── Tool parameter types ─────────────────────────────────────────

/// Parameters for `guard_check`.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct GuardCheckParams {
    /// The action to check (e.g., "spend_money", "send_external_email").
    pub action: String,
    /// Optional parameters for the action (e.g., { "amount": 75 }).
    #[serde(default)]
    pub params: Option<Map<String, Value>>,
    /// Identifier of the calling agent.
    #[serde(default)]
    pub agent: Option<String>,
}

/// Parameters for `guard_request_approval`.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct GuardRequestApprovalParams {
    /// The action requiring approval.
    pub action: String,
    /// Why the agent wants to perform this action.
    #[serde(default)]
    pub reason: Option<String>,
    /// Identifier of the calling agent.
    #[serde(default)]
    pub agent: Option<String>,
    /// Parameters the action would run with.
    #[serde(default)]
    pub params: Option<Map<String, Value>>,
}

/// Parameters for `guard_approval_status`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ApprovalIdParams {
    /// The approval request id returned by `guard_check`.
    pub id: String,
}

/// Parameters for `memory_store`.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct MemoryStoreParams {
    /// The memory content to store.
    pub content: String,
    /// Optional namespace (e.g., "work", "personal", "project:atlas").
    #[serde(default)]
    pub namespace: Option<String>,
    /// Optional tags for filtering.
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    /// Identifier of the storing agent.
    #[serde(default)]
    pub agent: Option<String>,
}

/// Parameters for `memory_recall`.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct MemoryRecallParams {
    /// Search text. Words are matched individually; any word may match.
    pub query: String,
    /// Optional namespace to filter by.
    #[serde(default)]
    pub namespace: Option<String>,
    /// Max results (default: 10). Any JSON number is accepted; fractions are
    /// truncated and values below 1 mean the default.
    #[serde(default)]
    pub limit: Option<f64>,
    /// Only return memories carrying at least one of these tags.
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Parameters for `memory_forget`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct MemoryIdParams {
    /// Memory id to delete.
    pub id: String,
}

/// Parameters for `memory_list`.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct MemoryListParams {
    /// Optional namespace to list.
    #[serde(default)]
    pub namespace: Option<String>,
}

/// Parameters for tools that take none.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct NoParams {}

// ── Guard tools ──────────────────────────────────────────────────

pub fn guard_check(state: &GatewayState, p: GuardCheckParams) -> Result<Value, GatewayError> {
    let outcome = state
        .guard
        .check(&p.action, p.params.as_ref(), p.agent.as_deref())?;
    to_json(&outcome)
}

pub fn guard_request_approval(
    state: &GatewayState,
    p: GuardRequestApprovalParams,
) -> Result<Value, GatewayError> {
    let request = state
        .guard
        .request_approval(
            &p.action,
            p.agent.as_deref(),
            p.params.as_ref(),
            p.reason.as_deref(),
        )
        .map_err(|e| match e {
            GuardError::Disabled => GatewayError::ModuleDisabled("guard"),
            other => other.into(),
        })?;
    to_json(&request)
}

pub fn guard_list_pending(state: &GatewayState) -> Result<Value, GatewayError> {
    to_json(&state.guard.pending_approvals()?)
}

pub fn guard_approval_status(state: &GatewayState, p: ApprovalIdParams) -> Result<Value, GatewayError> {
    let found = match parse_id(&p.id) {
        Some(id) => state.guard.get(id)?,
        None => None,
    };
    match found {
        Some(request) => to_json(&request),
        None => Ok(Value::String(NOT_FOUND.to_string())),
    }
}

// ── Memory tools ─────────────────────────────────────────────────

pub fn memory_store(state: &GatewayState, p: MemoryStoreParams) -> Result<Value, GatewayError> {
    let entry = state.memory()?.store(NewMemory {
        content: p.content,
        namespace: p.namespace,
        agent: p.agent,
        tags: p.tags,
        expires_at: None,
    })?;
    to_json(&entry)
}

pub fn memory_recall(state: &GatewayState, p: MemoryRecallParams) -> Result<Value, GatewayError> {
    let query = MemoryQuery {
        query: p.query,
        namespace: p.namespace,
        limit: recall_limit(p.limit),
        tags: p.tags.unwrap_or_default(),
    };
    to_json(&state.memory()?.recall(query)?)
}

pub fn memory_forget(state: &GatewayState, p: MemoryIdParams) -> Result<Value, GatewayError> {
    let memory = state.memory()?;
    let removed = match parse_id(&p.id) {
        Some(id) => memory.forget(id)?,
        None => false,
    };
    Ok(Value::Bool(removed))
}

pub fn memory_list(state: &GatewayState, p: MemoryListParams) -> Result<Value, GatewayError> {
    to_json(&state.memory()?.list(p.namespace.as_deref())?)
}

// ── Dispatch ─────────────────────────────────────────────────────

/// Invoke a tool by name with JSON arguments (`null` counts as `{}`).
pub fn dispatch(state: &GatewayState, tool: &str, args: Value) -> Result<Value, GatewayError> {
    match tool {
        "guard_check" => guard_check(state, parse_args(tool, args)?),
        "guard_request_approval" => guard_request_approval(state, parse_args(tool, args)?),
        "guard_list_pending" => {
            let NoParams {} = parse_args(tool, args)?;
            guard_list_pending(state)
        }
        "guard_approval_status" => guard_approval_status(state, parse_args(tool, args)?),
        "memory_store" => memory_store(state, parse_args(tool, args)?),
        "memory_recall" => memory_recall(state, parse_args(tool, args)?),
        "memory_forget" => memory_forget(state, parse_args(tool, args)?),
        "memory_list" => memory_list(state, parse_args(tool, args)?),
        other => Err(GatewayError::UnknownTool(other.to_string())),
    }
}

fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, GatewayError> {
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args).map_err(|e| GatewayError::InvalidArguments {
        tool: tool.to_string(),
        reason: e.to_string(),
    })
}

fn recall_limit(raw: Option<f64>) -> usize {
    match raw {
        Some(n) if n.is_finite() && n >= 1.0 => n as usize,
        _ => DEFAULT_RECALL_LIMIT,
    }
}

fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, GatewayError> {
    Ok(serde_json::to_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GatewayConfig, MemvexConfig};
    use tempfile::tempdir;

    fn state(yaml: &str) -> (GatewayState, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let memvex = MemvexConfig::parse(yaml).unwrap();
        let state = GatewayState::new(&memvex, GatewayConfig::for_project(dir.path())).unwrap();
        (state, dir)
    }

    #[test]
    fn unknown_tool_is_rejected() {
        let (state, _dir) = state("");
        match dispatch(&state, "guard_approve", json!({})) {
            Err(GatewayError::UnknownTool(name)) => assert_eq!(name, "guard_approve"),
            other => panic!("expected UnknownTool, got {:?}", other),
        }
    }

    #[test]
    fn non_object_params_are_invalid_arguments() {
        let (state, _dir) = state("guard:\n  enabled: true\n");
        let result = dispatch(&state, "guard_check", json!({ "action": "x", "params": [1, 2] }));
        assert!(matches!(result, Err(GatewayError::InvalidArguments { .. })));
    }

    #[test]
    fn missing_required_argument_is_invalid() {
        let (state, _dir) = state("");
        let result = dispatch(&state, "memory_store", json!({ "namespace": "work" }));
        assert!(matches!(result, Err(GatewayError::InvalidArguments { .. })));
    }

    #[test]
    fn malformed_ids_are_not_found() {
        let (state, _dir) = state("guard:\n  enabled: true\n");
        let status = dispatch(&state, "guard_approval_status", json!({ "id": "nope" })).unwrap();
        assert_eq!(status, json!(NOT_FOUND));

        let forgot = dispatch(&state, "memory_forget", json!({ "id": "nope" })).unwrap();
        assert_eq!(forgot, json!(false));
    }

    #[test]
    fn request_approval_queues_pending() {
        let (state, _dir) = state("guard:\n  enabled: true\n");
        let req = dispatch(
            &state,
            "guard_request_approval",
            json!({ "action": "deploy", "reason": "hotfix", "agent": "ci" }),
        )
        .unwrap();
        assert_eq!(req["status"], "pending");
        assert_eq!(req["reason"], "hotfix");

        let pending = dispatch(&state, "guard_list_pending", Value::Null).unwrap();
        assert_eq!(pending.as_array().unwrap().len(), 1);
        assert_eq!(pending[0]["id"], req["id"]);
    }

    #[test]
    fn disabled_guard_queues_nothing() {
        let (state, _dir) = state("");
        assert!(!state.guard.is_enabled());

        let result = dispatch(&state, "guard_request_approval", json!({ "action": "deploy" }));
        assert!(matches!(result, Err(GatewayError::ModuleDisabled("guard"))));

        let check = dispatch(&state, "guard_check", json!({ "action": "deploy" })).unwrap();
        assert_eq!(check["allowed"], json!(true));
        assert!(check.get("approvalId").is_none());

        assert_eq!(dispatch(&state, "guard_list_pending", Value::Null).unwrap(), json!([]));
    }

    #[test]
    fn memory_tools_round_trip() {
        let (state, _dir) = state("");
        let stored = dispatch(
            &state,
            "memory_store",
            json!({ "content": "User prefers tabs", "namespace": "coding", "tags": ["style"], "agent": "cursor" }),
        )
        .unwrap();
        assert_eq!(stored["namespace"], "coding");
        assert!(stored["createdAt"].is_string());

        let recalled = dispatch(
            &state,
            "memory_recall",
            json!({ "query": "tabs", "tags": ["style"], "limit": 5 }),
        )
        .unwrap();
        assert_eq!(recalled.as_array().unwrap().len(), 1);

        let listed = dispatch(&state, "memory_list", json!({ "namespace": "coding" })).unwrap();
        assert_eq!(listed[0]["id"], stored["id"]);

        let forgot = dispatch(&state, "memory_forget", json!({ "id": stored["id"] })).unwrap();
        assert_eq!(forgot, json!(true));
        assert_eq!(dispatch(&state, "memory_list", Value::Null).unwrap(), json!([]));
    }

    #[test]
    fn recall_limit_accepts_any_number() {
        let (state, _dir) = state("");
        for i in 0..4 {
            dispatch(&state, "memory_store", json!({ "content": format!("note {}", i) })).unwrap();
        }
        let hits = dispatch(&state, "memory_recall", json!({ "query": "note", "limit": 2.0 })).unwrap();
        assert_eq!(hits.as_array().unwrap().len(), 2);

        let hits = dispatch(&state, "memory_recall", json!({ "query": "note", "limit": 3.7 })).unwrap();
        assert_eq!(hits.as_array().unwrap().len(), 3);

        assert_eq!(recall_limit(Some(-1.0)), DEFAULT_RECALL_LIMIT);
        assert_eq!(recall_limit(Some(f64::NAN)), DEFAULT_RECALL_LIMIT);
        assert_eq!(recall_limit(None), DEFAULT_RECALL_LIMIT);
    }

    #[test]
    fn blank_content_is_a_memory_error() {
        let (state, _dir) = state("");
        let result = dispatch(&state, "memory_store", json!({ "content": "  " }));
        assert!(matches!(result, Err(GatewayError::Memory(_))));
    }

    #[test]
    fn memory_tools_fail_when_disabled() {
        let (state, _dir) = state("memory:\n  enabled: false\n");
        let result = dispatch(&state, "memory_list", json!({}));
        assert!(matches!(result, Err(GatewayError::ModuleDisabled("memory"))));
    }
}
