//! Opaque tool results

use serde::{Deserialize, Serialize};

/// Result returned by a tool executor
///
/// The value is treated as opaque JSON everywhere except
/// [`ToolOutput::format_for_provider`], which applies a best-effort
/// readability heuristic before the result is echoed to the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolOutput(serde_json::Value);

impl ToolOutput {
    /// Wraps a raw JSON value
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// Builds the wrapped-text shape (`{"content":[{"type":"text","text":..}]}`)
    /// used by MCP servers and system tools
    pub fn text(text: impl Into<String>) -> Self {
        Self(serde_json::json!({
            "content": [{ "type": "text", "text": text.into() }]
        }))
    }

    /// Borrow the raw value
    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    /// Consume into the raw value
    pub fn into_value(self) -> serde_json::Value {
        self.0
    }

    /// Returns the nested text payload (`content[0].text`), if present
    pub fn wrapped_text(&self) -> Option<&str> {
        self.0
            .get("content")?
            .as_array()?
            .first()?
            .get("text")?
            .as_str()
    }

    /// Normalizes the result to the string sent back in a `tool_result` block
    ///
    /// A wrapped text payload is parsed as JSON and pretty-printed when
    /// possible and used verbatim otherwise. Any other value is
    /// JSON-stringified.
    ///
    /// # Examples
    ///
    /// ```
    /// use mcpconnect::model::ToolOutput;
    ///
    /// let out = ToolOutput::text(r#"["a.txt"]"#);
    /// assert_eq!(out.format_for_provider(), "[\n  \"a.txt\"\n]");
    ///
    /// let raw = ToolOutput::new(serde_json::json!({"count": 2}));
    /// assert_eq!(raw.format_for_provider(), r#"{"count":2}"#);
    /// ```
    pub fn format_for_provider(&self) -> String {
        if let Some(text) = self.wrapped_text() {
            return match serde_json::from_str::<serde_json::Value>(text) {
                Ok(parsed) => {
                    serde_json::to_string_pretty(&parsed).unwrap_or_else(|_| text.to_string())
                }
                Err(_) => text.to_string(),
            };
        }
        self.0.to_string()
    }
}

impl From<serde_json::Value> for ToolOutput {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}
