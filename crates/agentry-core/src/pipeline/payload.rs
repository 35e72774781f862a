//! Data passed through hook handlers

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::{AgentDefinition, AgentResponse};
use crate::context::ExecutionContext;
use crate::error::AgentError;
use crate::stream::{StreamEvent, StreamSummary};
use crate::tool::{AgentTool, Tool, ToolArgs, ToolContext, ToolResult};

/// Observable description of a failure, handed to `*.on_error` hooks
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: String,
    pub message: String,
    pub retryable: bool,
}

impl ErrorReport {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            retryable: false,
        }
    }
}

impl From<&AgentError> for ErrorReport {
    fn from(err: &AgentError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

/// `agent.*` hooks: `{agent, input, context, tools, response?, error?}`
#[derive(Clone, Debug)]
pub struct AgentHookData {
    pub agent: Arc<AgentDefinition>,
    pub input: String,
    pub context: ExecutionContext,
    pub tools: Vec<AgentTool>,
    pub response: Option<AgentResponse>,
    pub error: Option<ErrorReport>,
}

impl AgentHookData {
    pub fn new(agent: Arc<AgentDefinition>, input: impl Into<String>, context: ExecutionContext) -> Self {
        Self {
            agent,
            input: input.into(),
            context,
            tools: Vec::new(),
            response: None,
            error: None,
        }
    }

    pub fn with_tools(mut self, tools: Vec<AgentTool>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_response(mut self, response: AgentResponse) -> Self {
        self.response = Some(response);
        self
    }

    pub fn with_error(mut self, error: ErrorReport) -> Self {
        self.error = Some(error);
        self
    }
}

/// `agent.system_prompt.*` hooks: `{agent, context, prompt?}`
#[derive(Clone, Debug)]
pub struct PromptHookData {
    pub agent: Arc<AgentDefinition>,
    pub context: ExecutionContext,
    pub prompt: Option<String>,
}

/// `tool.*` hooks: `{tool, args, context, result?, error?}`
#[derive(Clone)]
pub struct ToolHookData {
    pub tool: Arc<dyn Tool>,
    pub args: ToolArgs,
    pub context: ToolContext,
    pub result: Option<ToolResult>,
    pub error: Option<String>,
}

impl ToolHookData {
    pub fn new(tool: Arc<dyn Tool>, args: ToolArgs, context: ToolContext) -> Self {
        Self {
            tool,
            args,
            context,
            result: None,
            error: None,
        }
    }
}

impl std::fmt::Debug for ToolHookData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolHookData")
            .field("tool", &self.tool.name())
            .field("args", &self.args)
            .field("context", &self.context)
            .field("result", &self.result)
            .field("error", &self.error)
            .finish()
    }
}

/// Pipeline data. Each hook family carries its own variant.
#[derive(Clone, Debug)]
pub enum HookPayload {
    Agent(AgentHookData),
    SystemPrompt(PromptHookData),
    Tool(ToolHookData),
    StreamEvent(StreamEvent),
    StreamCompleted(StreamSummary),
    /// Free-form payload for embedding/image/speech and user-defined hooks
    Custom(Value),
}

impl HookPayload {
    /// Variant name, for logs
    pub fn kind(&self) -> &'static str {
        match self {
            HookPayload::Agent(_) => "agent",
            HookPayload::SystemPrompt(_) => "system_prompt",
            HookPayload::Tool(_) => "tool",
            HookPayload::StreamEvent(_) => "stream_event",
            HookPayload::StreamCompleted(_) => "stream_completed",
            HookPayload::Custom(_) => "custom",
        }
    }

    pub fn into_agent(self) -> Option<AgentHookData> {
        match self {
            HookPayload::Agent(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_agent_mut(&mut self) -> Option<&mut AgentHookData> {
        match self {
            HookPayload::Agent(data) => Some(data),
            _ => None,
        }
    }

    pub fn into_prompt(self) -> Option<PromptHookData> {
        match self {
            HookPayload::SystemPrompt(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_prompt_mut(&mut self) -> Option<&mut PromptHookData> {
        match self {
            HookPayload::SystemPrompt(data) => Some(data),
            _ => None,
        }
    }

    pub fn into_tool(self) -> Option<ToolHookData> {
        match self {
            HookPayload::Tool(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_tool_mut(&mut self) -> Option<&mut ToolHookData> {
        match self {
            HookPayload::Tool(data) => Some(data),
            _ => None,
        }
    }

    pub fn into_stream_event(self) -> Option<StreamEvent> {
        match self {
            HookPayload::StreamEvent(event) => Some(event),
            _ => None,
        }
    }

    pub fn into_custom(self) -> Option<Value> {
        match self {
            HookPayload::Custom(value) => Some(value),
            _ => None,
        }
    }
}
