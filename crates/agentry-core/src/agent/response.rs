//! Normalized agent response

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::provider::{FinishReason, ProviderResponse, TokenUsage, ToolCallRecord};

/// What the executor hands back after a completed run
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Final text, for text requests
    pub text: Option<String>,

    /// Decoded output, for structured requests
    pub structured: Option<Value>,

    /// Tool calls the provider made along the way
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRecord>,

    #[serde(default)]
    pub usage: TokenUsage,

    #[serde(default)]
    pub finish_reason: FinishReason,

    /// Model/tool round trips taken
    #[serde(default)]
    pub steps: u32,

    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl AgentResponse {
    /// Response with nothing in it
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            finish_reason: FinishReason::Stop,
            steps: 1,
            ..Self::default()
        }
    }

    pub fn from_structured(value: Value) -> Self {
        Self {
            structured: Some(value),
            finish_reason: FinishReason::Stop,
            steps: 1,
            ..Self::default()
        }
    }

    /// Build from a raw provider response and its normalized usage
    pub fn from_provider(response: ProviderResponse, usage: TokenUsage, finish_reason: FinishReason) -> Self {
        Self {
            text: response.text,
            structured: response.structured,
            tool_calls: response.tool_calls,
            usage,
            finish_reason,
            steps: response.steps,
            metadata: response.meta.into_iter().collect(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Text, or empty when the response carried none
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }

    /// Deserialize the structured output
    pub fn structured_as<T: serde::de::DeserializeOwned>(&self) -> Option<serde_json::Result<T>> {
        self.structured.clone().map(serde_json::from_value)
    }
}
