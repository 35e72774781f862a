//! System prompt construction

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::config::PlaceholderPolicy;
use crate::context::ExecutionContext;
use crate::error::{AgentError, Result};
use crate::pipeline::{hooks, HookPayload, PipelineRunner, PromptHookData};

use super::AgentDefinition;

/// Builds an agent's system prompt from its template and the context variables
#[derive(Clone, Debug, Default)]
pub struct SystemPromptBuilder {
    pipeline: PipelineRunner,
    policy: PlaceholderPolicy,
}

impl SystemPromptBuilder {
    pub fn new(pipeline: PipelineRunner, policy: PlaceholderPolicy) -> Self {
        Self { pipeline, policy }
    }

    /// `None` when the agent has no prompt template
    pub async fn build(&self, agent: &Arc<AgentDefinition>, context: &ExecutionContext) -> Result<Option<String>> {
        let before = PromptHookData {
            agent: Arc::clone(agent),
            context: context.clone(),
            prompt: None,
        };
        let data = self
            .pipeline
            .run_if_active(hooks::SYSTEM_PROMPT_BEFORE_BUILD, HookPayload::SystemPrompt(before), None)
            .await
            .into_prompt()
            .ok_or_else(|| foreign_payload(hooks::SYSTEM_PROMPT_BEFORE_BUILD))?;

        let Some(template) = data.agent.prompt() else {
            return Ok(None);
        };
        let prompt = interpolate(template, data.context.variables(), self.policy)?;

        let after = PromptHookData {
            prompt: Some(prompt),
            ..data
        };
        let data = self
            .pipeline
            .run_if_active(hooks::SYSTEM_PROMPT_AFTER_BUILD, HookPayload::SystemPrompt(after), None)
            .await
            .into_prompt()
            .ok_or_else(|| foreign_payload(hooks::SYSTEM_PROMPT_AFTER_BUILD))?;

        Ok(data.prompt)
    }
}

fn foreign_payload(hook: &str) -> AgentError {
    AgentError::Pipeline(format!("{} handler returned a non-prompt payload", hook))
}

fn is_placeholder_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '-')
}

/// Substitute `{name}` placeholders from `variables`.
///
/// Strings are inserted verbatim, other scalars in display form, arrays and
/// objects as JSON. Braces that do not enclose a valid name are left alone.
pub fn interpolate(template: &str, variables: &HashMap<String, Value>, policy: PlaceholderPolicy) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];

        let name_len = after_open
            .find(|c: char| !is_placeholder_char(c))
            .unwrap_or(after_open.len());
        let name = &after_open[..name_len];

        if name.is_empty() || !after_open[name_len..].starts_with('}') {
            out.push('{');
            rest = after_open;
            continue;
        }

        match variables.get(name) {
            Some(Value::String(s)) => out.push_str(s),
            Some(value) => out.push_str(&value.to_string()),
            None => match policy {
                PlaceholderPolicy::Keep => {
                    out.push('{');
                    out.push_str(name);
                    out.push('}');
                }
                PlaceholderPolicy::Remove => {}
                PlaceholderPolicy::Error => {
                    return Err(AgentError::InvalidConfiguration(format!(
                        "No value for prompt placeholder '{{{}}}'",
                        name
                    )));
                }
            },
        }
        rest = &after_open[name_len + 1..];
    }

    out.push_str(rest);
    Ok(out)
}
