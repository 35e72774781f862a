//! Streamed agent response
//!
//! Single-pass, pull-based wrapper over the provider's event stream. Every
//! event passes through `stream.on_event` and is folded into accumulators as
//! it goes by.

use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::pipeline::{hooks, HookPayload, PipelineRunner};

use super::event::{Artifact, Citation, StreamEvent, StreamEventKind};

/// Event source handed over by the provider
pub type EventStream = BoxStream<'static, StreamEvent>;

/// A tool call observed on the stream
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StreamToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,

    /// Filled in by the matching `tool_call_end`
    pub result: Option<String>,
    pub success: Option<bool>,
}

/// An error event observed on the stream
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamError {
    pub message: String,
    pub error_type: String,
    pub recoverable: bool,
}

/// Everything accumulated from a stream so far
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamSummary {
    pub text: String,
    pub thinking: String,
    pub tool_calls: Vec<StreamToolCall>,
    pub citations: Vec<Citation>,
    pub artifacts: Vec<Artifact>,
    pub errors: Vec<StreamError>,
    pub usage: Value,
    pub finish_reason: Option<String>,
    pub steps: u32,
}

impl StreamSummary {
    fn apply(&mut self, event: &StreamEvent) {
        match &event.kind {
            StreamEventKind::TextDelta { text } => self.text.push_str(text),
            StreamEventKind::ThinkingDelta { text, .. } => self.thinking.push_str(text),
            StreamEventKind::ToolCallStart {
                tool_id,
                tool_name,
                arguments,
            } => self.tool_calls.push(StreamToolCall {
                id: tool_id.clone(),
                name: tool_name.clone(),
                arguments: arguments.clone(),
                result: None,
                success: None,
            }),
            StreamEventKind::ToolCallEnd {
                tool_id,
                result,
                success,
                ..
            } => {
                if let Some(call) = self.tool_calls.iter_mut().find(|call| &call.id == tool_id) {
                    call.result = Some(result.clone());
                    call.success = Some(*success);
                }
            }
            StreamEventKind::Citation(citation) => self.citations.push(citation.clone()),
            StreamEventKind::Artifact(artifact) => self.artifacts.push(artifact.clone()),
            StreamEventKind::StepFinish { step, .. } => self.steps = self.steps.max(*step),
            StreamEventKind::Error {
                message,
                error_type,
                recoverable,
            } => self.errors.push(StreamError {
                message: message.clone(),
                error_type: error_type.clone(),
                recoverable: *recoverable,
            }),
            StreamEventKind::StreamEnd { finish_reason, usage } => {
                self.finish_reason = Some(finish_reason.clone());
                self.usage = usage.clone();
            }
            StreamEventKind::StreamStart { .. }
            | StreamEventKind::ThinkingStart { .. }
            | StreamEventKind::ThinkingComplete { .. }
            | StreamEventKind::StepStart { .. } => {}
        }
    }
}

pub struct StreamResponse {
    source: Option<EventStream>,
    pipeline: Option<PipelineRunner>,
    summary: StreamSummary,
    completed: bool,
}

impl StreamResponse {
    pub fn new(source: EventStream) -> Self {
        Self {
            source: Some(source),
            pipeline: None,
            summary: StreamSummary::default(),
            completed: false,
        }
    }

    /// Stream over a fixed list of events
    pub fn from_events(events: Vec<StreamEvent>) -> Self {
        Self::new(stream::iter(events).boxed())
    }

    /// Route events through `stream.on_event` / `stream.after_complete`
    pub fn with_pipeline(mut self, pipeline: PipelineRunner) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Pull the next event, or `None` once the stream is complete
    pub async fn next(&mut self) -> Option<StreamEvent> {
        let source = self.source.as_mut()?;
        let Some(event) = source.next().await else {
            self.complete().await;
            return None;
        };

        let event = match &self.pipeline {
            Some(pipeline) => observe(pipeline, event).await,
            None => event,
        };
        self.summary.apply(&event);
        if event.is_terminal() {
            self.complete().await;
        }
        Some(event)
    }

    /// Drain whatever is left of the stream
    pub async fn collect(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next().await {
            events.push(event);
        }
        events
    }

    async fn complete(&mut self) {
        if self.completed {
            return;
        }
        self.completed = true;
        self.source = None;

        tracing::debug!(
            text_len = self.summary.text.len(),
            tool_calls = self.summary.tool_calls.len(),
            finish_reason = ?self.summary.finish_reason,
            "Stream completed"
        );

        if let Some(pipeline) = &self.pipeline {
            pipeline
                .run_if_active(
                    hooks::STREAM_AFTER_COMPLETE,
                    HookPayload::StreamCompleted(self.summary.clone()),
                    None,
                )
                .await;
        }
    }

    pub fn text(&self) -> &str {
        &self.summary.text
    }

    pub fn thinking(&self) -> &str {
        &self.summary.thinking
    }

    pub fn tool_calls(&self) -> &[StreamToolCall] {
        &self.summary.tool_calls
    }

    pub fn citations(&self) -> &[Citation] {
        &self.summary.citations
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.summary.artifacts
    }

    pub fn errors(&self) -> &[StreamError] {
        &self.summary.errors
    }

    /// Raw usage reported by `stream_end`
    pub fn usage(&self) -> &Value {
        &self.summary.usage
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.summary.finish_reason.as_deref()
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    pub fn summary(&self) -> &StreamSummary {
        &self.summary
    }

    /// Remaining events as SSE frames
    pub fn into_sse(self) -> BoxStream<'static, Result<String>> {
        stream::unfold(self, |mut response| async move {
            let event = response.next().await?;
            Some((event.to_sse_frame(), response))
        })
        .boxed()
    }
}

async fn observe(pipeline: &PipelineRunner, event: StreamEvent) -> StreamEvent {
    let payload = pipeline
        .run_if_active(hooks::STREAM_ON_EVENT, HookPayload::StreamEvent(event.clone()), None)
        .await;
    payload.into_stream_event().unwrap_or_else(|| {
        tracing::warn!(hook = hooks::STREAM_ON_EVENT, "Hook returned a foreign payload, keeping original event");
        event
    })
}

impl std::fmt::Debug for StreamResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamResponse")
            .field("summary", &self.summary)
            .field("completed", &self.completed)
            .field("pipeline", &self.pipeline.is_some())
            .finish_non_exhaustive()
    }
}
