//! Process-global tools executed in-process
//!
//! System tools are offered on every connection alongside the remote
//! catalog. Their ids carry a `system:` prefix so they never collide with a
//! remote tool id; the provider calls them by bare name.

use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{McpConnectError, Result};
use crate::model::{Tool, ToolOutput, ToolParameter, ToolSource};

/// Returns the current time
pub const GET_CURRENT_TIME: &str = "get_current_time";
/// Returns a random UUID
pub const GENERATE_UUID: &str = "generate_uuid";

const SYSTEM_ID_PREFIX: &str = "system:";

fn system_tool(name: &str, description: &str, parameters: Vec<ToolParameter>) -> Tool {
    Tool {
        id: format!("{}{}", SYSTEM_ID_PREFIX, name),
        name: name.to_string(),
        description: description.to_string(),
        input_schema: None,
        parameters,
        source: ToolSource::System,
    }
}

/// All system tools
///
/// # Examples
///
/// ```
/// use mcpconnect::tools::system::system_tools;
///
/// let tools = system_tools();
/// assert!(tools.iter().all(|t| t.is_system()));
/// ```
pub fn system_tools() -> Vec<Tool> {
    vec![
        system_tool(
            GET_CURRENT_TIME,
            "Get the current date and time",
            vec![ToolParameter {
                name: "format".to_string(),
                param_type: "string".to_string(),
                description: "Output format: \"rfc3339\" (default) or \"unix\"".to_string(),
                required: false,
            }],
        ),
        system_tool(GENERATE_UUID, "Generate a random UUID (v4)", Vec::new()),
    ]
}

/// Whether `name` is handled in-process
pub fn is_system_tool(name: &str) -> bool {
    matches!(name, GET_CURRENT_TIME | GENERATE_UUID)
}

/// Run a system tool
///
/// # Errors
///
/// Returns `ToolExecution` for unknown tools or invalid arguments
pub fn execute_system_tool(name: &str, arguments: &Value) -> Result<ToolOutput> {
    match name {
        GET_CURRENT_TIME => {
            let now = Utc::now();
            let format = arguments
                .get("format")
                .and_then(Value::as_str)
                .unwrap_or("rfc3339");
            let payload = match format {
                "rfc3339" | "iso" => json!({ "time": now.to_rfc3339() }),
                "unix" => json!({ "time": now.timestamp() }),
                other => {
                    return Err(McpConnectError::ToolExecution(format!(
                        "Unsupported time format '{}'",
                        other
                    ))
                    .into())
                }
            };
            Ok(ToolOutput::text(payload.to_string()))
        }
        GENERATE_UUID => {
            let payload = json!({ "uuid": Uuid::new_v4().to_string() });
            Ok(ToolOutput::text(payload.to_string()))
        }
        other => Err(McpConnectError::ToolExecution(format!("Unknown system tool '{}'", other)).into()),
    }
}
