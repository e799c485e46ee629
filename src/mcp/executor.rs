//! Tool execution seams
//!
//! The orchestrator only sees [`ToolExecutor`]; the connection manager only
//! sees [`ToolDiscovery`]. [`ToolRouter`] runs system tools in-process and
//! forwards everything else to a remote executor.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::model::{Connection, Tool, ToolOutput};
use crate::tools::system::{execute_system_tool, is_system_tool};

/// Invokes a tool by name
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Execute `tool_name` with `arguments` on behalf of `connection`
    ///
    /// # Errors
    ///
    /// Any error is a failed invocation; the orchestrator records it and
    /// reports it to the provider as an error result.
    async fn execute(
        &self,
        connection: &Connection,
        tool_name: &str,
        arguments: serde_json::Value,
    ) -> Result<ToolOutput>;
}

/// Lists the tools a connection's server exposes
#[async_trait]
pub trait ToolDiscovery: Send + Sync {
    /// Fetch the remote tool catalog
    async fn list_tools(&self, connection: &Connection) -> Result<Vec<Tool>>;
}

/// Dispatches system tools locally and the rest remotely
#[derive(Clone)]
pub struct ToolRouter {
    remote: Arc<dyn ToolExecutor>,
}

impl ToolRouter {
    /// Create a router over a remote executor
    pub fn new(remote: Arc<dyn ToolExecutor>) -> Self {
        Self { remote }
    }
}

#[async_trait]
impl ToolExecutor for ToolRouter {
    async fn execute(
        &self,
        connection: &Connection,
        tool_name: &str,
        arguments: serde_json::Value,
    ) -> Result<ToolOutput> {
        if is_system_tool(tool_name) {
            tracing::debug!("Executing system tool {}", tool_name);
            return execute_system_tool(tool_name, &arguments);
        }
        self.remote.execute(connection, tool_name, arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockExecutor;
    use serde_json::json;

    #[tokio::test]
    async fn test_router_runs_system_tools_locally() {
        let remote = Arc::new(MockExecutor::new());
        let router = ToolRouter::new(remote.clone());
        let connection = Connection::new("local", "http://localhost:1/mcp");

        let output = router
            .execute(&connection, "generate_uuid", json!({}))
            .await
            .unwrap();
        assert!(output.wrapped_text().unwrap().contains("uuid"));
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_router_forwards_remote_tools() {
        let remote = Arc::new(MockExecutor::new().with_result("list_files", json!({"ok": true})));
        let router = ToolRouter::new(remote.clone());
        let connection = Connection::new("local", "http://localhost:1/mcp");

        let output = router
            .execute(&connection, "list_files", json!({"path": "."}))
            .await
            .unwrap();
        assert_eq!(output.as_value(), &json!({"ok": true}));
        assert_eq!(remote.calls(), vec![("list_files".to_string(), json!({"path": "."}))]);
    }
}
