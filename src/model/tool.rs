//! Tool descriptors and the schemas declared to the provider

use serde::{Deserialize, Serialize};

/// Where a tool is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolSource {
    /// Exposed by the connection's MCP server
    #[default]
    Remote,
    /// Process-global, executed in-process
    System,
}

/// A declared tool parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    /// Parameter name
    pub name: String,
    /// JSON-schema type name (`string`, `number`, ...)
    #[serde(rename = "type", default = "default_parameter_type")]
    pub param_type: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// Whether the parameter must be supplied
    #[serde(default)]
    pub required: bool,
}

fn default_parameter_type() -> String {
    "string".to_string()
}

/// An invocable tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Unique id within its connection (or globally for system tools)
    pub id: String,
    /// Name the provider uses to call the tool
    pub name: String,
    /// Description offered to the provider
    #[serde(default)]
    pub description: String,
    /// JSON-schema-like description of the input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<serde_json::Value>,
    /// Flat parameter list, used when no schema is available
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ToolParameter>,
    /// Remote or system
    #[serde(default)]
    pub source: ToolSource,
}

impl Tool {
    /// Creates a remote tool whose id equals its name
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            name,
            description: description.into(),
            input_schema: None,
            parameters: Vec::new(),
            source: ToolSource::Remote,
        }
    }

    /// Sets the input schema
    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.input_schema = Some(schema);
        self
    }

    /// Returns true for process-global tools
    pub fn is_system(&self) -> bool {
        self.source == ToolSource::System
    }

    /// Schema declared to the provider
    ///
    /// Uses the explicit input schema when present, otherwise derives one from
    /// the parameter list, otherwise an empty object schema.
    ///
    /// # Examples
    ///
    /// ```
    /// use mcpconnect::model::Tool;
    ///
    /// let tool = Tool::new("ping", "Ping the server");
    /// assert_eq!(
    ///     tool.declaration_schema(),
    ///     serde_json::json!({"type": "object", "properties": {}})
    /// );
    /// ```
    pub fn declaration_schema(&self) -> serde_json::Value {
        if let Some(schema) = &self.input_schema {
            return schema.clone();
        }

        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for param in &self.parameters {
            properties.insert(
                param.name.clone(),
                serde_json::json!({
                    "type": param.param_type,
                    "description": param.description,
                }),
            );
            if param.required {
                required.push(serde_json::Value::String(param.name.clone()));
            }
        }

        let mut schema = serde_json::json!({
            "type": "object",
            "properties": properties,
        });
        if !required.is_empty() {
            schema["required"] = serde_json::Value::Array(required);
        }
        schema
    }
}
