//! Result from tool execution

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Outcome of one tool call: success text, success data, or an error message
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ToolResult {
    Text(String),
    Data(Value),
    Error(String),
}

impl ToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        ToolResult::Text(text.into())
    }

    pub fn data(data: impl Into<Value>) -> Self {
        ToolResult::Data(data.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        ToolResult::Error(message.into())
    }

    pub fn succeeded(&self) -> bool {
        !self.failed()
    }

    pub fn failed(&self) -> bool {
        matches!(self, ToolResult::Error(_))
    }

    /// Error message, if this is a failure
    pub fn message(&self) -> Option<&str> {
        match self {
            ToolResult::Error(message) => Some(message),
            _ => None,
        }
    }

    /// Textual form handed back to the model
    pub fn to_text(&self) -> String {
        match self {
            ToolResult::Text(text) => text.clone(),
            ToolResult::Data(data) => data.to_string(),
            ToolResult::Error(message) => message.clone(),
        }
    }

    /// Structured view: `{success, text | data | error}`
    pub fn to_value(&self) -> Value {
        match self {
            ToolResult::Text(text) => json!({ "success": true, "text": text }),
            ToolResult::Data(data) => json!({ "success": true, "data": data }),
            ToolResult::Error(message) => json!({ "success": false, "error": message }),
        }
    }
}
