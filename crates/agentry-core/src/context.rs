//! Execution Context
//!
//! Per-request carrier of conversation history, prompt variables, metadata and
//! queued provider-request overrides. Every `with_*`/`merge_*` method returns a
//! new context; the receiver is never modified.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::Message;

/// Client-side retry policy forwarded to the provider collaborator
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Attempts after the first one
    pub times: u32,

    /// Delay between attempts in milliseconds
    pub delay_ms: u64,
}

impl RetryPolicy {
    pub fn new(times: u32, delay_ms: u64) -> Self {
        Self { times, delay_ms }
    }
}

/// A provider-request adjustment queued on the context and applied at dispatch
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequestOverride {
    Temperature { value: f32 },
    MaxTokens { value: u32 },
    MaxSteps { value: u32 },
    ProviderOption { key: String, value: Value },
    Retry { policy: RetryPolicy },
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
    #[serde(default)]
    messages: Vec<Message>,

    #[serde(default)]
    variables: HashMap<String, Value>,

    #[serde(default)]
    metadata: HashMap<String, Value>,

    #[serde(default)]
    overrides: Vec<RequestOverride>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the conversation history
    pub fn with_messages(&self, messages: Vec<Message>) -> Self {
        let mut next = self.clone();
        next.messages = messages;
        next
    }

    /// Append one message to the history
    pub fn with_message(&self, message: Message) -> Self {
        let mut next = self.clone();
        next.messages.push(message);
        next
    }

    /// Replace all prompt variables
    pub fn with_variables(&self, variables: HashMap<String, Value>) -> Self {
        let mut next = self.clone();
        next.variables = variables;
        next
    }

    pub fn with_variable(&self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut next = self.clone();
        next.variables.insert(key.into(), value.into());
        next
    }

    /// Add variables, later keys win
    pub fn merge_variables(&self, variables: HashMap<String, Value>) -> Self {
        let mut next = self.clone();
        next.variables.extend(variables);
        next
    }

    pub fn with_metadata(&self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut next = self.clone();
        next.metadata.insert(key.into(), value.into());
        next
    }

    pub fn merge_metadata(&self, metadata: HashMap<String, Value>) -> Self {
        let mut next = self.clone();
        next.metadata.extend(metadata);
        next
    }

    /// Replace all metadata
    pub fn replace_metadata(&self, metadata: HashMap<String, Value>) -> Self {
        let mut next = self.clone();
        next.metadata = metadata;
        next
    }

    /// Queue a provider-request override
    pub fn with_override(&self, item: RequestOverride) -> Self {
        let mut next = self.clone();
        next.overrides.push(item);
        next
    }

    pub fn with_temperature(&self, value: f32) -> Self {
        self.with_override(RequestOverride::Temperature { value })
    }

    pub fn with_max_tokens(&self, value: u32) -> Self {
        self.with_override(RequestOverride::MaxTokens { value })
    }

    pub fn with_max_steps(&self, value: u32) -> Self {
        self.with_override(RequestOverride::MaxSteps { value })
    }

    pub fn with_provider_option(&self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with_override(RequestOverride::ProviderOption {
            key: key.into(),
            value: value.into(),
        })
    }

    pub fn with_retry(&self, policy: RetryPolicy) -> Self {
        self.with_override(RequestOverride::Retry { policy })
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn has_messages(&self) -> bool {
        !self.messages.is_empty()
    }

    pub fn variables(&self) -> &HashMap<String, Value> {
        &self.variables
    }

    pub fn variable(&self, key: &str) -> Option<&Value> {
        self.variables.get(key)
    }

    pub fn metadata(&self) -> &HashMap<String, Value> {
        &self.metadata
    }

    pub fn metadata_value(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    pub fn has_metadata(&self, key: &str) -> bool {
        self.metadata.contains_key(key)
    }

    pub fn overrides(&self) -> &[RequestOverride] {
        &self.overrides
    }
}
