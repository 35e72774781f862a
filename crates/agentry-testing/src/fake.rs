//! Fake agent runner
//!
//! Binds in place of the real executor and answers from per-agent queues.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::{json, Value};

use agentry_core::agent::{AgentRef, AgentResponse, AgentRunner, Agents};
use agentry_core::error::{AgentError, Result};
use agentry_core::provider::{FinishReason, StructuredSchema, TokenUsage, ToolCallRecord};
use agentry_core::stream::{Artifact, StreamEvent, StreamResponse};
use agentry_core::ExecutionContext;

use crate::record::RecordedRequest;

pub type FailureFactory = Arc<dyn Fn() -> AgentError + Send + Sync>;

/// Artifact type carrying a canned structured output through a stream
const STRUCTURED_ARTIFACT: &str = "structured_output";

/// What the fake answers with for one call
#[derive(Clone)]
pub enum FakeResponse {
    Response(AgentResponse),
    /// Built fresh per call since `AgentError` is not `Clone`
    Failure(FailureFactory),
    /// Streamed as-is; collected into a response for non-stream calls
    Events(Vec<StreamEvent>),
    /// Delegate to the runner that was bound before activation
    Passthrough,
}

impl FakeResponse {
    pub fn text(text: impl Into<String>) -> Self {
        FakeResponse::Response(AgentResponse::from_text(text))
    }

    pub fn structured(value: Value) -> Self {
        FakeResponse::Response(AgentResponse::from_structured(value))
    }

    pub fn failure<F>(factory: F) -> Self
    where
        F: Fn() -> AgentError + Send + Sync + 'static,
    {
        FakeResponse::Failure(Arc::new(factory))
    }

    pub fn events(events: impl IntoIterator<Item = StreamEvent>) -> Self {
        FakeResponse::Events(events.into_iter().collect())
    }

    async fn into_response(self) -> Result<AgentResponse> {
        match self {
            FakeResponse::Response(response) => Ok(response),
            FakeResponse::Failure(factory) => Err(factory()),
            FakeResponse::Events(events) => {
                let mut stream = StreamResponse::from_events(events);
                stream.collect().await;
                Ok(response_from_summary(&stream))
            }
            FakeResponse::Passthrough => Err(no_previous_runner()),
        }
    }

    fn into_stream(self) -> Result<StreamResponse> {
        match self {
            FakeResponse::Response(response) => Ok(StreamResponse::from_events(events_for(response))),
            FakeResponse::Failure(factory) => Err(factory()),
            FakeResponse::Events(events) => Ok(StreamResponse::from_events(events)),
            FakeResponse::Passthrough => Err(no_previous_runner()),
        }
    }
}

impl From<AgentResponse> for FakeResponse {
    fn from(response: AgentResponse) -> Self {
        FakeResponse::Response(response)
    }
}

impl std::fmt::Debug for FakeResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FakeResponse::Response(response) => f.debug_tuple("Response").field(response).finish(),
            FakeResponse::Failure(_) => f.write_str("Failure(..)"),
            FakeResponse::Events(events) => f.debug_tuple("Events").field(&events.len()).finish(),
            FakeResponse::Passthrough => f.write_str("Passthrough"),
        }
    }
}

/// Replay a canned response as the events a provider would have streamed
fn events_for(response: AgentResponse) -> Vec<StreamEvent> {
    let mut events = Vec::with_capacity(response.tool_calls.len() * 2 + 3);
    for call in response.tool_calls {
        events.push(StreamEvent::tool_call_start(&call.id, &call.name, call.arguments));
        let result = call.result.unwrap_or_default();
        events.push(StreamEvent::tool_call_end(call.id, call.name, result, true));
    }
    if let Some(value) = response.structured {
        events.push(StreamEvent::artifact(Artifact {
            artifact_type: STRUCTURED_ARTIFACT.into(),
            name: "output".into(),
            content: value,
        }));
    }
    if let Some(text) = response.text {
        events.push(StreamEvent::text_delta(text));
    }
    let usage = serde_json::to_value(response.usage).unwrap_or_else(|_| json!({}));
    events.push(StreamEvent::stream_end(response.finish_reason.as_str(), usage));
    events
}

fn response_from_summary(stream: &StreamResponse) -> AgentResponse {
    let summary = stream.summary();
    let tool_calls = summary
        .tool_calls
        .iter()
        .map(|call| ToolCallRecord {
            id: call.id.clone(),
            name: call.name.clone(),
            arguments: call.arguments.clone(),
            result: call.result.clone(),
        })
        .collect();

    AgentResponse {
        text: (!summary.text.is_empty()).then(|| summary.text.clone()),
        structured: summary
            .artifacts
            .iter()
            .find(|artifact| artifact.artifact_type == STRUCTURED_ARTIFACT)
            .map(|artifact| artifact.content.clone()),
        tool_calls,
        usage: serde_json::from_value::<TokenUsage>(summary.usage.clone()).unwrap_or_default(),
        finish_reason: summary
            .finish_reason
            .as_deref()
            .map_or(FinishReason::Unknown, FinishReason::from_raw),
        steps: summary.steps.max(1),
        ..AgentResponse::default()
    }
}

fn no_previous_runner() -> AgentError {
    AgentError::InvalidConfiguration("Passthrough requires a fake runner activated over a real one".into())
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Responses queued for one agent key
#[derive(Debug, Default)]
struct ResponseQueue {
    entries: VecDeque<FakeResponse>,
}

impl ResponseQueue {
    /// FIFO; the last entry keeps answering once the rest are used up
    fn next(&mut self) -> Option<FakeResponse> {
        if self.entries.len() > 1 {
            self.entries.pop_front()
        } else {
            self.entries.front().cloned()
        }
    }
}

/// Stand-in [`AgentRunner`] with scripted answers and a call log
#[derive(Default)]
pub struct FakeAgentRunner {
    queues: Mutex<HashMap<String, ResponseQueue>>,
    fallback: Mutex<ResponseQueue>,
    strict: AtomicBool,
    pub(crate) log: Mutex<Vec<RecordedRequest>>,
    previous: Mutex<Option<Arc<dyn AgentRunner>>>,
}

impl FakeAgentRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind this fake to `agents`, remembering the runner it replaces
    pub fn activate(self, agents: &Agents) -> Arc<Self> {
        let fake = Arc::new(self);
        *lock(&fake.previous) = Some(agents.runner());
        agents.bind(Arc::clone(&fake) as Arc<dyn AgentRunner>);
        tracing::debug!("Fake agent runner activated");
        fake
    }

    /// Rebind the runner captured by [`activate`](Self::activate)
    pub fn restore(&self, agents: &Agents) {
        if let Some(previous) = lock(&self.previous).take() {
            agents.bind(previous);
            tracing::debug!("Fake agent runner restored previous runner");
        }
    }

    /// Answer every call for `key` with `response`
    pub fn respond(&self, key: impl Into<String>, response: impl Into<FakeResponse>) -> &Self {
        self.respond_sequence(key, [response.into()])
    }

    /// Answer calls for `key` in order, repeating the last entry
    pub fn respond_sequence(&self, key: impl Into<String>, responses: impl IntoIterator<Item = FakeResponse>) -> &Self {
        let queue = ResponseQueue {
            entries: responses.into_iter().collect(),
        };
        lock(&self.queues).insert(key.into(), queue);
        self
    }

    /// Answer for keys with nothing queued
    pub fn respond_default(&self, response: impl Into<FakeResponse>) -> &Self {
        self.respond_default_sequence([response.into()])
    }

    /// Answer keys with nothing queued in order, repeating the last entry.
    /// The sequence is shared by every unmatched key.
    pub fn respond_default_sequence(&self, responses: impl IntoIterator<Item = FakeResponse>) -> &Self {
        *lock(&self.fallback) = ResponseQueue {
            entries: responses.into_iter().collect(),
        };
        self
    }

    /// Fail calls for agents with no configured response
    pub fn strict(&self) -> &Self {
        self.strict.store(true, Ordering::SeqCst);
        self
    }

    /// Answer unconfigured agents with an empty response
    pub fn lenient(&self) -> &Self {
        self.strict.store(false, Ordering::SeqCst);
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict.load(Ordering::SeqCst)
    }

    fn previous(&self) -> Option<Arc<dyn AgentRunner>> {
        lock(&self.previous).clone()
    }

    fn next_response(&self, key: &str) -> Result<FakeResponse> {
        let queued = lock(&self.queues).get_mut(key).and_then(ResponseQueue::next);
        if let Some(response) = queued.or_else(|| lock(&self.fallback).next()) {
            return Ok(response);
        }

        if self.is_strict() {
            tracing::warn!(agent = %key, "Unexpected agent execution");
            Err(AgentError::UnexpectedExecution(key.to_string()))
        } else {
            Ok(FakeResponse::Response(AgentResponse::empty()))
        }
    }

    fn push(&self, record: RecordedRequest) {
        lock(&self.log).push(record);
    }
}

#[async_trait]
impl AgentRunner for FakeAgentRunner {
    async fn execute(&self, agent: AgentRef, input: String, context: ExecutionContext) -> Result<AgentResponse> {
        let record = RecordedRequest::new(&agent, &input, &context, None, false);
        let outcome = match self.next_response(agent.key()) {
            Ok(FakeResponse::Passthrough) => match self.previous() {
                Some(runner) => runner.execute(agent, input, context).await,
                None => Err(no_previous_runner()),
            },
            Ok(response) => response.into_response().await,
            Err(e) => Err(e),
        };
        self.push(record.finish(&outcome));
        outcome
    }

    async fn execute_structured(
        &self,
        agent: AgentRef,
        input: String,
        schema: StructuredSchema,
        context: ExecutionContext,
    ) -> Result<AgentResponse> {
        let record = RecordedRequest::new(&agent, &input, &context, Some(schema.clone()), false);
        let outcome = match self.next_response(agent.key()) {
            Ok(FakeResponse::Passthrough) => match self.previous() {
                Some(runner) => runner.execute_structured(agent, input, schema, context).await,
                None => Err(no_previous_runner()),
            },
            Ok(response) => response.into_response().await,
            Err(e) => Err(e),
        };
        self.push(record.finish(&outcome));
        outcome
    }

    async fn stream(&self, agent: AgentRef, input: String, context: ExecutionContext) -> Result<StreamResponse> {
        let record = RecordedRequest::new(&agent, &input, &context, None, true);
        let outcome = match self.next_response(agent.key()) {
            Ok(FakeResponse::Passthrough) => match self.previous() {
                Some(runner) => runner.stream(agent, input, context).await,
                None => Err(no_previous_runner()),
            },
            Ok(response) => response.into_stream(),
            Err(e) => Err(e),
        };
        self.push(record.finish_stream(outcome.as_ref().err()));
        outcome
    }
}

impl std::fmt::Debug for FakeAgentRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeAgentRunner")
            .field("strict", &self.is_strict())
            .field("recorded", &lock(&self.log).len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Real runner stand-in that echoes its input
    struct Echo;

    #[async_trait]
    impl AgentRunner for Echo {
        async fn execute(&self, _agent: AgentRef, input: String, _context: ExecutionContext) -> Result<AgentResponse> {
            Ok(AgentResponse::from_text(format!("echo: {input}")))
        }

        async fn execute_structured(
            &self,
            agent: AgentRef,
            input: String,
            _schema: StructuredSchema,
            context: ExecutionContext,
        ) -> Result<AgentResponse> {
            self.execute(agent, input, context).await
        }

        async fn stream(&self, _agent: AgentRef, input: String, _context: ExecutionContext) -> Result<StreamResponse> {
            Ok(StreamResponse::from_events(vec![StreamEvent::text_delta(input)]))
        }
    }

    #[tokio::test]
    async fn test_sequence_repeats_last_entry() {
        let fake = FakeAgentRunner::new();
        fake.respond_sequence("writer", [FakeResponse::text("first"), FakeResponse::text("second")]);

        let ctx = ExecutionContext::new();
        let mut answers = Vec::new();
        for _ in 0..3 {
            let response = fake.execute("writer".into(), "go".into(), ctx.clone()).await.unwrap();
            answers.push(response.text.unwrap());
        }
        assert_eq!(answers, ["first", "second", "second"]);
    }

    #[tokio::test]
    async fn test_failure_factory_runs_per_call() {
        let fake = FakeAgentRunner::new();
        fake.respond("writer", FakeResponse::failure(|| AgentError::Overloaded("busy".into())));

        for _ in 0..2 {
            let err = fake
                .execute("writer".into(), "go".into(), ExecutionContext::new())
                .await
                .unwrap_err();
            assert!(matches!(err, AgentError::Overloaded(_)));
        }
        assert_eq!(lock(&fake.log).len(), 2);
        assert!(lock(&fake.log).iter().all(|r| r.error.is_some()));
    }

    #[tokio::test]
    async fn test_default_response_covers_unknown_keys() {
        let fake = FakeAgentRunner::new();
        fake.strict().respond_default(FakeResponse::text("fallback"));

        let response = fake
            .execute("anyone".into(), "go".into(), ExecutionContext::new())
            .await
            .unwrap();
        assert_eq!(response.text.as_deref(), Some("fallback"));
    }

    #[tokio::test]
    async fn test_default_sequence_shared_by_unknown_keys() {
        let fake = FakeAgentRunner::new();
        fake.strict().respond_default_sequence([
            FakeResponse::failure(|| AgentError::Overloaded("warming up".into())),
            FakeResponse::text("ready"),
        ]);

        let first = fake.execute("alpha".into(), "go".into(), ExecutionContext::new()).await;
        assert!(matches!(first, Err(AgentError::Overloaded(_))));

        for key in ["beta", "alpha"] {
            let response = fake.execute(key.into(), "go".into(), ExecutionContext::new()).await.unwrap();
            assert_eq!(response.text.as_deref(), Some("ready"));
        }
        assert_eq!(lock(&fake.log).len(), 3);
    }

    #[tokio::test]
    async fn test_streamed_response_keeps_tool_calls_usage_and_finish() {
        let canned = AgentResponse {
            text: Some("Sunny".into()),
            structured: Some(json!({"sky": "clear"})),
            tool_calls: vec![ToolCallRecord {
                id: "call_0".into(),
                name: "weather".into(),
                arguments: json!({"city": "Lima"}),
                result: Some("24C".into()),
            }],
            usage: TokenUsage {
                prompt_tokens: 12,
                completion_tokens: 3,
                total_tokens: 15,
                ..TokenUsage::default()
            },
            finish_reason: FinishReason::Length,
            ..AgentResponse::default()
        };
        let fake = FakeAgentRunner::new();
        fake.respond("forecaster", canned);

        let mut stream = fake
            .stream("forecaster".into(), "go".into(), ExecutionContext::new())
            .await
            .unwrap();
        stream.collect().await;

        assert_eq!(stream.text(), "Sunny");
        assert_eq!(stream.finish_reason(), Some("length"));
        assert_eq!(stream.usage()["total_tokens"], 15);
        assert_eq!(stream.tool_calls().len(), 1);
        assert_eq!(stream.tool_calls()[0].name, "weather");
        assert_eq!(stream.tool_calls()[0].result.as_deref(), Some("24C"));
        assert_eq!(stream.artifacts()[0].content, json!({"sky": "clear"}));

        let replayed = response_from_summary(&stream);
        assert_eq!(replayed.structured, Some(json!({"sky": "clear"})));
        assert_eq!(replayed.usage.total_tokens, 15);
        assert_eq!(replayed.finish_reason, FinishReason::Length);
        assert_eq!(replayed.tool_calls[0].result.as_deref(), Some("24C"));
    }

    #[tokio::test]
    async fn test_events_collect_into_response_and_stream() {
        let events = vec![
            StreamEvent::text_delta("ab"),
            StreamEvent::text_delta("cd"),
            StreamEvent::stream_end("stop", json!({})),
        ];
        let fake = FakeAgentRunner::new();
        fake.respond("writer", FakeResponse::events(events));

        let response = fake
            .execute("writer".into(), "go".into(), ExecutionContext::new())
            .await
            .unwrap();
        assert_eq!(response.text.as_deref(), Some("abcd"));
        assert_eq!(response.finish_reason, FinishReason::Stop);

        let mut stream = fake
            .stream("writer".into(), "go".into(), ExecutionContext::new())
            .await
            .unwrap();
        stream.collect().await;
        assert_eq!(stream.text(), "abcd");
        assert!(lock(&fake.log)[1].streamed);
    }

    #[tokio::test]
    async fn test_activate_passthrough_and_restore() {
        let agents = Agents::new(Arc::new(Echo));
        let fake = FakeAgentRunner::new().activate(&agents);
        fake.respond("real", FakeResponse::Passthrough);
        fake.respond("faked", FakeResponse::text("canned"));

        let real = agents.execute("real", "hi", ExecutionContext::new()).await.unwrap();
        assert_eq!(real.text.as_deref(), Some("echo: hi"));
        let faked = agents.execute("faked", "hi", ExecutionContext::new()).await.unwrap();
        assert_eq!(faked.text.as_deref(), Some("canned"));

        fake.restore(&agents);
        let after = agents.execute("faked", "hi", ExecutionContext::new()).await.unwrap();
        assert_eq!(after.text.as_deref(), Some("echo: hi"));
        assert_eq!(lock(&fake.log).len(), 2);
    }

    #[tokio::test]
    async fn test_passthrough_without_activation_fails() {
        let fake = FakeAgentRunner::new();
        fake.respond("real", FakeResponse::Passthrough);

        let err = fake
            .execute("real".into(), "hi".into(), ExecutionContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidConfiguration(_)));
    }
}
