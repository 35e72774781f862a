//! Scripted LLM provider
//!
//! Plays back a fixed script instead of calling a model. Tool-call steps run
//! the request's callable tools for real, so hooks and failure containment
//! behave exactly as they would against a live provider.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;

use agentry_core::error::{ProviderError, ProviderResult};
use agentry_core::provider::{FinishReason, LlmProvider, ProviderRequest, ProviderResponse, ToolCallRecord};
use agentry_core::stream::{EventStream, StreamEvent, StreamResponse};
use agentry_core::tool::{AgentTool, ToolResult};

use crate::fake::lock;

/// A tool call the scripted model asks for
#[derive(Clone, Debug, PartialEq)]
pub struct ScriptedToolCall {
    pub name: String,
    pub arguments: Value,
}

impl ScriptedToolCall {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// One model turn
#[derive(Clone)]
pub enum ScriptStep {
    /// Final text answer
    Text(String),
    /// Tool calls, run in order; the script continues with the next step
    ToolCalls(Vec<ScriptedToolCall>),
    /// Final structured answer
    Structured(Value),
    Fail(Arc<dyn Fn() -> ProviderError + Send + Sync>),
    /// Stream events; collected into text for non-stream requests
    Events(Vec<StreamEvent>),
}

impl ScriptStep {
    pub fn text(text: impl Into<String>) -> Self {
        ScriptStep::Text(text.into())
    }

    pub fn tool_call(name: impl Into<String>, arguments: Value) -> Self {
        ScriptStep::ToolCalls(vec![ScriptedToolCall::new(name, arguments)])
    }

    pub fn fail<F>(factory: F) -> Self
    where
        F: Fn() -> ProviderError + Send + Sync + 'static,
    {
        ScriptStep::Fail(Arc::new(factory))
    }
}

impl std::fmt::Debug for ScriptStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScriptStep::Text(text) => f.debug_tuple("Text").field(text).finish(),
            ScriptStep::ToolCalls(calls) => f.debug_tuple("ToolCalls").field(calls).finish(),
            ScriptStep::Structured(value) => f.debug_tuple("Structured").field(value).finish(),
            ScriptStep::Fail(_) => f.write_str("Fail(..)"),
            ScriptStep::Events(events) => f.debug_tuple("Events").field(&events.len()).finish(),
        }
    }
}

/// A tool call the provider ran, with the full result
#[derive(Clone, Debug, PartialEq)]
pub struct ToolOutcome {
    pub name: String,
    pub arguments: Value,
    pub result: ToolResult,
}

/// [`LlmProvider`] that plays a script and records every request
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    script: Mutex<VecDeque<ScriptStep>>,
    requests: Mutex<Vec<ProviderRequest>>,
    outcomes: Mutex<Vec<ToolOutcome>>,
    usage: Value,
}

impl ScriptedProvider {
    pub fn new(steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            script: Mutex::new(steps.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Usage block reported on every final answer
    pub fn with_usage(mut self, usage: Value) -> Self {
        self.usage = usage;
        self
    }

    /// Append steps to the script
    pub fn push(&self, steps: impl IntoIterator<Item = ScriptStep>) {
        lock(&self.script).extend(steps);
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        lock(&self.requests).clone()
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        lock(&self.requests).last().cloned()
    }

    pub fn tool_outcomes(&self) -> Vec<ToolOutcome> {
        lock(&self.outcomes).clone()
    }

    pub fn remaining(&self) -> usize {
        lock(&self.script).len()
    }

    fn next_step(&self) -> ProviderResult<ScriptStep> {
        lock(&self.script)
            .pop_front()
            .ok_or_else(|| ProviderError::Transport(anyhow!("Provider script exhausted")))
    }

    fn answer(&self, mut response: ProviderResponse, steps: u32, tool_calls: Vec<ToolCallRecord>) -> ProviderResponse {
        response.steps = steps;
        response.tool_calls = tool_calls;
        response.usage = self.usage.clone();
        response
    }

    async fn run_tool(&self, request: &ProviderRequest, call: ScriptedToolCall, index: usize) -> ToolCallRecord {
        let tool = request
            .tools
            .iter()
            .filter_map(AgentTool::as_callable)
            .find(|tool| tool.name() == call.name);

        let result = match tool {
            Some(tool) => tool.invoke(call.arguments.clone()).await,
            None => ToolResult::error(format!("Tool '{}' is not available", call.name)),
        };
        tracing::debug!(tool = %call.name, failed = result.failed(), "Scripted tool call finished");

        let record = ToolCallRecord {
            id: format!("call_{index}"),
            name: call.name.clone(),
            arguments: call.arguments.clone(),
            result: Some(result.to_text()),
        };
        lock(&self.outcomes).push(ToolOutcome {
            name: call.name,
            arguments: call.arguments,
            result,
        });
        record
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(&self, request: ProviderRequest) -> ProviderResult<ProviderResponse> {
        lock(&self.requests).push(request.clone());

        let max_steps = request.options.max_steps.max(1);
        let mut tool_calls = Vec::new();
        let mut steps = 0;

        loop {
            steps += 1;
            match self.next_step()? {
                ScriptStep::Text(text) => {
                    return Ok(self.answer(ProviderResponse::text(text), steps, tool_calls));
                }
                ScriptStep::Structured(value) => {
                    return Ok(self.answer(ProviderResponse::structured(value), steps, tool_calls));
                }
                ScriptStep::Fail(factory) => return Err(factory()),
                ScriptStep::Events(events) => {
                    let mut stream = StreamResponse::from_events(events);
                    stream.collect().await;
                    let finish = stream.finish_reason().unwrap_or("stop").to_string();
                    let response = ProviderResponse {
                        finish_reason: finish,
                        ..ProviderResponse::text(stream.text())
                    };
                    return Ok(self.answer(response, steps, tool_calls));
                }
                ScriptStep::ToolCalls(calls) => {
                    for call in calls {
                        let index = tool_calls.len();
                        tool_calls.push(self.run_tool(&request, call, index).await);
                    }
                    if steps >= max_steps {
                        let response = ProviderResponse {
                            finish_reason: FinishReason::ToolUse.as_str().into(),
                            ..ProviderResponse::default()
                        };
                        return Ok(self.answer(response, steps, tool_calls));
                    }
                }
            }
        }
    }

    async fn complete_stream(&self, request: ProviderRequest) -> ProviderResult<EventStream> {
        lock(&self.requests).push(request);

        let events = match self.next_step()? {
            ScriptStep::Events(events) => events,
            ScriptStep::Text(text) => vec![
                StreamEvent::text_delta(text),
                StreamEvent::stream_end("stop", self.usage.clone()),
            ],
            ScriptStep::Fail(factory) => return Err(factory()),
            other => {
                return Err(ProviderError::Transport(anyhow!(
                    "Script step {other:?} cannot be streamed"
                )));
            }
        };
        Ok(futures::stream::iter(events).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentry_core::provider::GenerationOptions;
    use agentry_core::tool::{ParameterSchema, ProviderTool, ToolDefinition};
    use futures::FutureExt;
    use serde_json::json;

    fn echo_tool() -> AgentTool {
        let definition = ToolDefinition::new("echo", "Echo the message")
            .with_parameter(ParameterSchema::string("message", "Text").required());
        AgentTool::Callable(ProviderTool::new(
            definition,
            Arc::new(|args: Value| {
                async move { ToolResult::text(args["message"].as_str().unwrap_or_default().to_string()) }.boxed()
            }),
        ))
    }

    fn request() -> ProviderRequest {
        ProviderRequest::for_prompt("openai", "gpt-4o", "Say hi").with_tools(vec![echo_tool()])
    }

    #[tokio::test]
    async fn test_tool_calls_then_text() {
        let provider = ScriptedProvider::new([
            ScriptStep::tool_call("echo", json!({"message": "hi"})),
            ScriptStep::text("done"),
        ])
        .with_usage(json!({"prompt_tokens": 3, "completion_tokens": 1}));

        let request = request().with_options(GenerationOptions {
            max_steps: 5,
            ..GenerationOptions::default()
        });
        let response = provider.complete(request).await.unwrap();

        assert_eq!(response.text.as_deref(), Some("done"));
        assert_eq!(response.steps, 2);
        assert_eq!(response.tool_calls[0].result.as_deref(), Some("hi"));
        assert_eq!(response.usage["prompt_tokens"], 3);
        assert_eq!(provider.tool_outcomes()[0].result, ToolResult::text("hi"));
        assert_eq!(provider.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_step_limit_stops_tool_loop() {
        let provider = ScriptedProvider::new([
            ScriptStep::tool_call("echo", json!({"message": "again"})),
            ScriptStep::text("unreached"),
        ]);

        let response = provider.complete(request()).await.unwrap();
        assert!(response.text.is_none());
        assert_eq!(response.finish_reason, "tool_calls");
        assert_eq!(FinishReason::from_raw(&response.finish_reason), FinishReason::ToolUse);
        assert_eq!(provider.remaining(), 1);
    }

    #[tokio::test]
    async fn test_unknown_tool_reports_error_result() {
        let provider = ScriptedProvider::new([
            ScriptStep::ToolCalls(vec![ScriptedToolCall::new("search", json!({}))]),
            ScriptStep::text("ok"),
        ]);
        let request = request().with_options(GenerationOptions {
            max_steps: 2,
            ..GenerationOptions::default()
        });

        provider.complete(request).await.unwrap();
        let outcome = &provider.tool_outcomes()[0];
        assert!(outcome.result.failed());
        assert_eq!(outcome.result.message(), Some("Tool 'search' is not available"));
    }

    #[tokio::test]
    async fn test_fail_and_exhaustion() {
        let provider = ScriptedProvider::new([ScriptStep::fail(|| ProviderError::Overloaded("busy".into()))]);
        assert!(matches!(
            provider.complete(request()).await,
            Err(ProviderError::Overloaded(_))
        ));
        assert!(matches!(
            provider.complete(request()).await,
            Err(ProviderError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_stream_text_step() {
        let provider = ScriptedProvider::new([ScriptStep::text("streamed")]);
        let source = provider.complete_stream(request()).await.unwrap();

        let mut stream = StreamResponse::new(source);
        stream.collect().await;
        assert_eq!(stream.text(), "streamed");
        assert_eq!(stream.finish_reason(), Some("stop"));
    }
}
