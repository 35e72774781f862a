//! LLM Provider Boundary
//!
//! The executor never talks to a model API directly. It builds a
//! [`ProviderRequest`] and hands it to an [`LlmProvider`], which owns the HTTP
//! transport and the provider-side tool loop.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agentry_core::provider::{LlmProvider, ProviderRequest};
//!
//! let request = ProviderRequest::for_prompt("openai", "gpt-4o", "Hello")
//!     .with_system_prompt("Be brief.");
//! let response = provider.complete(request).await?;
//! ```

mod usage;

pub use usage::{
    AnthropicUsageExtractor, DefaultUsageExtractor, FinishReason, OpenAiUsageExtractor, TokenUsage,
    UsageExtractor, UsageExtractors,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::context::{RequestOverride, RetryPolicy};
use crate::error::ProviderResult;
use crate::message::Message;
use crate::stream::EventStream;
use crate::tool::AgentTool;

/// Prompt or conversation sent to the model
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RequestInput {
    Prompt(String),
    Messages(Vec<Message>),
}

/// Configuration for LLM generation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Temperature for sampling (0.0 = deterministic, 2.0 = most creative)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Upper bound on model/tool round trips
    pub max_steps: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: None,
            max_tokens: None,
            max_steps: 1,
        }
    }
}

/// Schema the model's structured output must follow
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StructuredSchema {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// JSON Schema document
    pub schema: Value,
}

impl StructuredSchema {
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            description: None,
            schema,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Everything the provider collaborator needs for one completion
#[derive(Clone, Debug)]
pub struct ProviderRequest {
    /// Provider identifier (`openai`, `anthropic`, ...)
    pub provider: String,

    pub model: String,

    pub input: RequestInput,

    pub system_prompt: Option<String>,

    /// Callable tools plus native provider tool descriptors
    pub tools: Vec<AgentTool>,

    /// Present for structured requests
    pub schema: Option<StructuredSchema>,

    pub options: GenerationOptions,

    pub retry: Option<RetryPolicy>,

    /// Free-form provider options
    pub provider_options: Map<String, Value>,
}

impl ProviderRequest {
    fn new(provider: impl Into<String>, model: impl Into<String>, input: RequestInput) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            input,
            system_prompt: None,
            tools: Vec::new(),
            schema: None,
            options: GenerationOptions::default(),
            retry: None,
            provider_options: Map::new(),
        }
    }

    /// Single-prompt request
    pub fn for_prompt(provider: impl Into<String>, model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self::new(provider, model, RequestInput::Prompt(prompt.into()))
    }

    /// Request over a full conversation
    pub fn for_messages(provider: impl Into<String>, model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self::new(provider, model, RequestInput::Messages(messages))
    }

    /// Turn this request into a structured-output request
    pub fn for_structured(mut self, schema: StructuredSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt;
        self
    }

    pub fn with_tools(mut self, tools: Vec<AgentTool>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_provider_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.provider_options.insert(key.into(), value.into());
        self
    }

    /// Apply queued context overrides in order; later ones win
    pub fn apply_overrides(mut self, overrides: &[RequestOverride]) -> Self {
        for item in overrides {
            match item {
                RequestOverride::Temperature { value } => self.options.temperature = Some(*value),
                RequestOverride::MaxTokens { value } => self.options.max_tokens = Some(*value),
                RequestOverride::MaxSteps { value } => self.options.max_steps = *value,
                RequestOverride::ProviderOption { key, value } => {
                    self.provider_options.insert(key.clone(), value.clone());
                }
                RequestOverride::Retry { policy } => self.retry = Some(policy.clone()),
            }
        }
        self
    }

    pub fn is_structured(&self) -> bool {
        self.schema.is_some()
    }
}

/// One tool call the provider made during its loop
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub arguments: Value,

    /// Text returned to the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

/// Raw completion from the provider
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    #[serde(default)]
    pub text: Option<String>,

    /// Decoded structured output, for structured requests
    #[serde(default)]
    pub structured: Option<Value>,

    #[serde(default)]
    pub tool_calls: Vec<ToolCallRecord>,

    #[serde(default)]
    pub steps: u32,

    /// Finish reason as reported by the provider (`stop`, `end_turn`, ...)
    #[serde(default)]
    pub finish_reason: String,

    /// Usage block as reported by the provider
    #[serde(default)]
    pub usage: Value,

    #[serde(default)]
    pub meta: Map<String, Value>,
}

impl ProviderResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            steps: 1,
            finish_reason: "stop".into(),
            ..Self::default()
        }
    }

    pub fn structured(value: Value) -> Self {
        Self {
            structured: Some(value),
            steps: 1,
            finish_reason: "stop".into(),
            ..Self::default()
        }
    }

    pub fn with_usage(mut self, usage: Value) -> Self {
        self.usage = usage;
        self
    }
}

/// Strategy trait for LLM providers
///
/// Implement this trait to add support for new LLM backends. Callable tools in
/// the request carry their own handlers; the provider invokes them during its
/// tool loop, one at a time, in the order the model asked for them.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Run a completion, including any tool round trips
    async fn complete(&self, request: ProviderRequest) -> ProviderResult<ProviderResponse>;

    /// Run a streaming completion
    async fn complete_stream(&self, request: ProviderRequest) -> ProviderResult<EventStream>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_constructors() {
        let prompt = ProviderRequest::for_prompt("openai", "gpt-4o", "Hi");
        assert_eq!(prompt.input, RequestInput::Prompt("Hi".into()));
        assert!(!prompt.is_structured());

        let messages = ProviderRequest::for_messages("anthropic", "claude", vec![Message::user("Hi")])
            .for_structured(StructuredSchema::new("answer", json!({"type": "object"})));
        assert!(matches!(messages.input, RequestInput::Messages(ref m) if m.len() == 1));
        assert!(messages.is_structured());
    }

    #[test]
    fn test_apply_overrides_in_order() {
        let overrides = vec![
            RequestOverride::Temperature { value: 0.2 },
            RequestOverride::Temperature { value: 0.9 },
            RequestOverride::MaxSteps { value: 4 },
            RequestOverride::ProviderOption {
                key: "seed".into(),
                value: json!(7),
            },
            RequestOverride::Retry {
                policy: RetryPolicy::new(3, 250),
            },
        ];

        let request = ProviderRequest::for_prompt("openai", "gpt-4o", "Hi").apply_overrides(&overrides);
        assert_eq!(request.options.temperature, Some(0.9));
        assert_eq!(request.options.max_steps, 4);
        assert_eq!(request.provider_options["seed"], 7);
        assert_eq!(request.retry, Some(RetryPolicy::new(3, 250)));
    }

    #[test]
    fn test_response_deserializes_with_defaults() {
        let response: ProviderResponse = serde_json::from_value(json!({"text": "hello"})).unwrap();
        assert_eq!(response.text.as_deref(), Some("hello"));
        assert!(response.tool_calls.is_empty());
        assert_eq!(response.usage, Value::Null);
    }
}
