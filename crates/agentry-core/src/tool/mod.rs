//! Tool System
//!
//! Tools are typed callable actions an agent may invoke. They are registered
//! once in a [`ToolRegistry`], adapted into provider-facing descriptors by the
//! [`ToolBuilder`], and every call goes through the [`ToolExecutor`] so hook
//! handlers observe it and failures stay contained.

mod builder;
mod context;
mod executor;
mod registry;
mod result;

pub use builder::{AgentTool, FailureFormatter, ProviderTool, ToolBuilder, ToolHandlerFn};
pub use context::ToolContext;
pub use executor::ToolExecutor;
pub use registry::{ConfigureFn, RegisteredTool, ToolRegistry};
pub use result::ToolResult;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{AgentError, Result};

/// Arguments of a single tool call
pub type ToolArgs = HashMap<String, Value>;

/// Type of a tool parameter
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParameterKind {
    String,
    Number,
    Integer,
    Boolean,
    Enum { values: Vec<String> },
    Array { items: Box<ParameterSchema> },
    Object { properties: Vec<ParameterSchema> },
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    pub name: String,

    #[serde(flatten)]
    pub kind: ParameterKind,

    /// Human-readable description (shown to the model)
    pub description: String,

    #[serde(default)]
    pub required: bool,
}

impl ParameterSchema {
    pub fn new(name: impl Into<String>, kind: ParameterKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            required: false,
        }
    }

    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::String, description)
    }

    pub fn number(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::Number, description)
    }

    pub fn integer(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::Integer, description)
    }

    pub fn boolean(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::Boolean, description)
    }

    pub fn enumeration<I, S>(name: impl Into<String>, description: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect();
        Self::new(name, ParameterKind::Enum { values }, description)
    }

    pub fn array(name: impl Into<String>, description: impl Into<String>, items: ParameterSchema) -> Self {
        Self::new(
            name,
            ParameterKind::Array {
                items: Box::new(items),
            },
            description,
        )
    }

    pub fn object(
        name: impl Into<String>,
        description: impl Into<String>,
        properties: Vec<ParameterSchema>,
    ) -> Self {
        Self::new(name, ParameterKind::Object { properties }, description)
    }

    /// Mark the parameter as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Render as a JSON Schema fragment
    pub fn json_schema(&self) -> Value {
        let mut schema = match &self.kind {
            ParameterKind::String => json!({ "type": "string" }),
            ParameterKind::Number => json!({ "type": "number" }),
            ParameterKind::Integer => json!({ "type": "integer" }),
            ParameterKind::Boolean => json!({ "type": "boolean" }),
            ParameterKind::Enum { values } => json!({ "type": "string", "enum": values }),
            ParameterKind::Array { items } => json!({ "type": "array", "items": items.json_schema() }),
            ParameterKind::Object { properties } => object_schema(properties),
        };
        if !self.description.is_empty() {
            schema["description"] = Value::String(self.description.clone());
        }
        schema
    }
}

fn object_schema(properties: &[ParameterSchema]) -> Value {
    let props: Map<String, Value> = properties
        .iter()
        .map(|p| (p.name.clone(), p.json_schema()))
        .collect();
    let required: Vec<&str> = properties
        .iter()
        .filter(|p| p.required)
        .map(|p| p.name.as_str())
        .collect();
    json!({
        "type": "object",
        "properties": props,
        "required": required,
    })
}

/// Tool definition schema (for LLM function calling)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to the model)
    pub description: String,

    /// Ordered parameter definitions
    #[serde(default)]
    pub parameters: Vec<ParameterSchema>,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, parameter: ParameterSchema) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// JSON Schema object describing the arguments
    pub fn json_schema(&self) -> Value {
        object_schema(&self.parameters)
    }
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Schema shown to the model
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with given arguments
    async fn handle(&self, args: ToolArgs, context: &ToolContext) -> Result<ToolResult>;

    fn name(&self) -> String {
        self.definition().name
    }

    /// Validate arguments before execution (optional)
    fn validate(&self, args: &ToolArgs) -> Result<()> {
        for param in &self.definition().parameters {
            if param.required && args.get(&param.name).is_none_or(Value::is_null) {
                return Err(AgentError::ToolExecution(format!(
                    "Missing required parameter: {}",
                    param.name
                )));
            }
        }

        Ok(())
    }
}
