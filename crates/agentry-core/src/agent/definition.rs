//! Agent definitions
//!
//! An agent is a named bundle of provider, model, prompt template, bound tools
//! and generation settings. Definitions are immutable once built.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AgentError, Result};

/// How the agent is driven
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionType {
    /// Provider HTTP API
    #[default]
    Api,
    /// Local command-line agent
    Cli,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentDefinition {
    key: String,
    name: String,
    execution_type: ExecutionType,
    provider: String,
    model: String,
    prompt: Option<String>,
    tools: Vec<String>,
    provider_tools: Vec<Value>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    max_steps: Option<u32>,
    settings: HashMap<String, Value>,
}

impl AgentDefinition {
    pub fn builder(key: impl Into<String>) -> AgentDefinitionBuilder {
        AgentDefinitionBuilder::new(key)
    }

    /// Builder pre-filled with this definition, for variants
    pub fn to_builder(&self) -> AgentDefinitionBuilder {
        AgentDefinitionBuilder {
            definition: self.clone(),
        }
    }

    /// Registry key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Display name (defaults to the key)
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn execution_type(&self) -> ExecutionType {
        self.execution_type
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// System prompt template with `{variable}` placeholders
    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    /// Names of registered tools bound to this agent
    pub fn tools(&self) -> &[String] {
        &self.tools
    }

    /// Provider-native tool descriptors, forwarded unchanged
    pub fn provider_tools(&self) -> &[Value] {
        &self.provider_tools
    }

    pub fn temperature(&self) -> Option<f32> {
        self.temperature
    }

    pub fn max_tokens(&self) -> Option<u32> {
        self.max_tokens
    }

    pub fn max_steps(&self) -> Option<u32> {
        self.max_steps
    }

    pub fn settings(&self) -> &HashMap<String, Value> {
        &self.settings
    }

    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }
}

/// Builder for [`AgentDefinition`]
#[derive(Clone, Debug)]
pub struct AgentDefinitionBuilder {
    definition: AgentDefinition,
}

impl AgentDefinitionBuilder {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            definition: AgentDefinition {
                name: key.clone(),
                key,
                execution_type: ExecutionType::default(),
                provider: String::new(),
                model: String::new(),
                prompt: None,
                tools: Vec::new(),
                provider_tools: Vec::new(),
                temperature: None,
                max_tokens: None,
                max_steps: None,
                settings: HashMap::new(),
            },
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.definition.name = name.into();
        self
    }

    pub fn execution_type(mut self, execution_type: ExecutionType) -> Self {
        self.definition.execution_type = execution_type;
        self
    }

    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.definition.provider = provider.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.definition.model = model.into();
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.definition.prompt = Some(prompt.into());
        self
    }

    pub fn tool(mut self, name: impl Into<String>) -> Self {
        self.definition.tools.push(name.into());
        self
    }

    pub fn tools<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.definition.tools.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn provider_tool(mut self, descriptor: Value) -> Self {
        self.definition.provider_tools.push(descriptor);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.definition.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.definition.max_tokens = Some(max_tokens);
        self
    }

    pub fn max_steps(mut self, max_steps: u32) -> Self {
        self.definition.max_steps = Some(max_steps);
        self
    }

    pub fn setting(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.definition.settings.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Result<AgentDefinition> {
        let definition = self.definition;

        if definition.key.trim().is_empty() {
            return Err(AgentError::InvalidConfiguration("Agent key is required".into()));
        }
        if definition.provider.trim().is_empty() {
            return Err(AgentError::InvalidConfiguration(format!(
                "Agent '{}' has no provider",
                definition.key
            )));
        }
        if definition.model.trim().is_empty() {
            return Err(AgentError::InvalidConfiguration(format!(
                "Agent '{}' has no model",
                definition.key
            )));
        }
        if let Some(temperature) = definition.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(AgentError::InvalidConfiguration(format!(
                    "Agent '{}' temperature {} is outside 0.0..=2.0",
                    definition.key, temperature
                )));
            }
        }

        Ok(definition)
    }
}
