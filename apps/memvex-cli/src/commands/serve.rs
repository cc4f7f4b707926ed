// serve.rs — Start the MCP server on stdio.
//
// Builds the same GatewayState every other command builds, so the server and
// the CLI always read and write the same approval queue and memory store.

use std::path::Path;

use memvex_gateway::MemvexServer;
use rmcp::ServiceExt;

pub fn execute(config_path: &Path) -> anyhow::Result<()> {
    let state = super::load_state(config_path)?;
    tracing::info!(
        config = %config_path.display(),
        project_root = %state.config.project_root.display(),
        guard = state.guard.backend_name(),
        memory = state.memory.as_ref().map(|m| m.backend_name()).unwrap_or("disabled"),
        "starting memvex MCP server"
    );
    let server = MemvexServer::new(state);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let transport = rmcp::transport::stdio();
        let service = server
            .serve(transport)
            .await
            .inspect_err(|e| tracing::error!("serving error: {:?}", e))
            .map_err(|e| anyhow::anyhow!("MCP server error: {}", e))?;
        service.waiting().await?;
        tracing::info!("MCP server shutting down");
        Ok::<(), anyhow::Error>(())
    })
}
