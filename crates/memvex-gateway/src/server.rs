// server.rs — MCP server for memvex.
//
// MemvexServer implements the rmcp ServerHandler trait and registers the
// functions in tools.rs as MCP tools. Handlers hold no logic of their own:
// they unwrap parameters, call the tool function, and wrap the JSON result.
//
// Tools (prefixed by module):
//   guard_check             — evaluate an action against the rules
//   guard_request_approval  — ask a human for approval directly
//   guard_list_pending      — list requests awaiting a decision
//   guard_approval_status   — look up one approval request
//   memory_store            — save a memory for every agent
//   memory_recall           — text search over memories
//   memory_forget           — delete one memory
//   memory_list             — list memories, optionally by namespace

use std::sync::Arc;

use memvex_memory::MemoryError;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde_json::Value;

use crate::error::GatewayError;
use crate::state::GatewayState;
use crate::tools::{
    self, ApprovalIdParams, GuardCheckParams, GuardRequestApprovalParams, MemoryIdParams,
    MemoryListParams, MemoryRecallParams, MemoryStoreParams,
};

/// The MCP server. Holds the project's services and the tool router.
pub struct MemvexServer {
    state: Arc<GatewayState>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl MemvexServer {
    pub fn new(state: GatewayState) -> Self {
        Self {
            state: Arc::new(state),
            tool_router: Self::tool_router(),
        }
    }

    /// Shared state (for testing).
    pub fn state(&self) -> &Arc<GatewayState> {
        &self.state
    }

    // ── Guard tools ──────────────────────────────────────────

    #[tool(
        description = "Check if an action is allowed by the user's guard rules. Returns whether the action is permitted, blocked, or requires human approval. When approval is required, the response carries an approvalId."
    )]
    fn guard_check(
        &self,
        Parameters(params): Parameters<GuardCheckParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(tools::guard_check(&self.state, params))
    }

    #[tool(
        description = "Request human approval for an action. Returns an approval request whose id can be checked later with guard_approval_status. Refused when the guard is disabled."
    )]
    fn guard_request_approval(
        &self,
        Parameters(params): Parameters<GuardRequestApprovalParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(tools::guard_request_approval(&self.state, params))
    }

    #[tool(description = "List all actions currently pending human approval, oldest first.")]
    fn guard_list_pending(&self) -> Result<CallToolResult, McpError> {
        respond(tools::guard_list_pending(&self.state))
    }

    #[tool(
        description = "Get the status of an approval request by id (pending, approved, or denied). Returns \"not found\" for unknown ids."
    )]
    fn guard_approval_status(
        &self,
        Parameters(params): Parameters<ApprovalIdParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(tools::guard_approval_status(&self.state, params))
    }

    // ── Memory tools ─────────────────────────────────────────

    #[tool(
        description = "Store a new memory. Agents use this to save learnings, context, or facts that should persist across conversations and be available to all agents."
    )]
    fn memory_store(
        &self,
        Parameters(params): Parameters<MemoryStoreParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(tools::memory_store(&self.state, params))
    }

    #[tool(
        description = "Recall memories matching a text query, newest first. Returns stored memories across all agents, optionally filtered by namespace and tags."
    )]
    fn memory_recall(
        &self,
        Parameters(params): Parameters<MemoryRecallParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(tools::memory_recall(&self.state, params))
    }

    #[tool(description = "Delete a specific memory by its id. Returns true if a memory was removed.")]
    fn memory_forget(
        &self,
        Parameters(params): Parameters<MemoryIdParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(tools::memory_forget(&self.state, params))
    }

    #[tool(description = "List all memories, newest first, optionally limited to one namespace.")]
    fn memory_list(
        &self,
        Parameters(params): Parameters<MemoryListParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(tools::memory_list(&self.state, params))
    }
}

#[tool_handler]
impl ServerHandler for MemvexServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "memvex".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: Some("memvex".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "memvex MCP server. Call guard_check before any sensitive action \
                 and respect its answer; if approval is required, tell the user \
                 and poll guard_approval_status. Use memory_store to save facts \
                 other agents should know and memory_recall to look them up."
                    .into(),
            ),
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn respond(result: Result<Value, GatewayError>) -> Result<CallToolResult, McpError> {
    let value = result.map_err(to_mcp_error)?;
    Ok(CallToolResult::success(vec![Content::json(value)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?]))
}

/// Caller mistakes become `invalid_params`/`invalid_request`; everything
/// else is an internal error.
fn to_mcp_error(err: GatewayError) -> McpError {
    match &err {
        GatewayError::InvalidArguments { .. }
        | GatewayError::UnknownTool(_)
        | GatewayError::Memory(MemoryError::InvalidInput(_)) => {
            McpError::invalid_params(err.to_string(), None)
        }
        GatewayError::ModuleDisabled(_) => McpError::invalid_request(err.to_string(), None),
        _ => {
            tracing::error!(error = %err, "tool call failed");
            McpError::internal_error(err.to_string(), None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GatewayConfig, MemvexConfig};
    use tempfile::tempdir;

    fn test_server() -> (MemvexServer, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let memvex = MemvexConfig::parse(
            "guard:\n  enabled: true\n  rules:\n    - action: spend_money\n      require_approval_above: 50\n",
        )
        .unwrap();
        let state = GatewayState::new(&memvex, GatewayConfig::for_project(dir.path())).unwrap();
        (MemvexServer::new(state), dir)
    }

    #[test]
    fn tool_count_matches_expected() {
        let (server, _dir) = test_server();
        let listed = server.tool_router.list_all();
        let names: Vec<String> = listed.iter().map(|t| t.name.to_string()).collect();
        assert_eq!(listed.len(), 8, "expected 8 tools, got: {:?}", names);
        for name in tools::TOOL_NAMES {
            assert!(names.iter().any(|n| n == name), "missing tool '{}'", name);
        }
    }

    #[test]
    fn tool_names_are_prefixed() {
        let (server, _dir) = test_server();
        for tool in &server.tool_router.list_all() {
            assert!(
                tool.name.starts_with("guard_") || tool.name.starts_with("memory_"),
                "tool '{}' should be prefixed with 'guard_' or 'memory_'",
                tool.name
            );
        }
    }

    #[test]
    fn approve_and_deny_are_not_exposed() {
        let (server, _dir) = test_server();
        let names: Vec<String> = server
            .tool_router
            .list_all()
            .iter()
            .map(|t| t.name.to_string())
            .collect();
        assert!(!names.iter().any(|n| n.contains("approve") || n.contains("deny")));
    }

    #[test]
    fn server_info_names_memvex() {
        let (server, _dir) = test_server();
        let info = server.get_info();
        assert_eq!(info.server_info.name, "memvex");
        assert!(info.capabilities.tools.is_some());
    }

    #[test]
    fn guard_check_handler_succeeds() {
        let (server, _dir) = test_server();
        let params = serde_json::from_value::<GuardCheckParams>(serde_json::json!({
            "action": "spend_money",
            "params": { "amount": 75 }
        }))
        .unwrap();
        let result = server.guard_check(Parameters(params)).unwrap();
        assert_ne!(result.is_error, Some(true));
        assert_eq!(server.state().guard.pending_approvals().unwrap().len(), 1);
    }

    #[test]
    fn error_mapping_distinguishes_caller_mistakes() {
        let invalid = to_mcp_error(GatewayError::UnknownTool("x".into()));
        assert_eq!(invalid.code, ErrorCode::INVALID_PARAMS);

        let disabled = to_mcp_error(GatewayError::ModuleDisabled("memory"));
        assert_eq!(disabled.code, ErrorCode::INVALID_REQUEST);

        let internal = to_mcp_error(GatewayError::InvalidConfig("boom".into()));
        assert_eq!(internal.code, ErrorCode::INTERNAL_ERROR);
    }
}
