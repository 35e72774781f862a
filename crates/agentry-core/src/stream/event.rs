//! Stream events emitted by a streamed agent response

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::Result;

/// A source citation surfaced by the provider
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_text: Option<String>,
}

/// A generated artifact (file, code block, document)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub artifact_type: String,
    pub name: String,
    pub content: Value,
}

/// Payload of a stream event, tagged by `type` on the wire
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEventKind {
    StreamStart {
        model: String,
        provider: String,
    },
    TextDelta {
        text: String,
    },
    ToolCallStart {
        tool_id: String,
        tool_name: String,
        #[serde(default)]
        arguments: Value,
    },
    ToolCallEnd {
        tool_id: String,
        tool_name: String,
        result: String,
        success: bool,
    },
    ThinkingStart {
        reasoning_id: String,
    },
    ThinkingDelta {
        reasoning_id: String,
        text: String,
    },
    ThinkingComplete {
        reasoning_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        summary: Option<String>,
    },
    Citation(Citation),
    StepStart {
        step: u32,
    },
    StepFinish {
        step: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        finish_reason: Option<String>,
    },
    Artifact(Artifact),
    Error {
        message: String,
        error_type: String,
        recoverable: bool,
    },
    StreamEnd {
        finish_reason: String,
        #[serde(default)]
        usage: Value,
    },
}

/// One event of a streamed response
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    /// Unique event ID (`evt_<uuid>`)
    pub id: String,

    /// Emission time, unix seconds on the wire
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,

    #[serde(flatten)]
    pub kind: StreamEventKind,
}

impl StreamEvent {
    pub fn new(kind: StreamEventKind) -> Self {
        Self {
            id: format!("evt_{}", Uuid::new_v4().simple()),
            timestamp: Utc::now(),
            kind,
        }
    }

    pub fn stream_start(model: impl Into<String>, provider: impl Into<String>) -> Self {
        Self::new(StreamEventKind::StreamStart {
            model: model.into(),
            provider: provider.into(),
        })
    }

    pub fn text_delta(text: impl Into<String>) -> Self {
        Self::new(StreamEventKind::TextDelta { text: text.into() })
    }

    pub fn tool_call_start(tool_id: impl Into<String>, tool_name: impl Into<String>, arguments: Value) -> Self {
        Self::new(StreamEventKind::ToolCallStart {
            tool_id: tool_id.into(),
            tool_name: tool_name.into(),
            arguments,
        })
    }

    pub fn tool_call_end(
        tool_id: impl Into<String>,
        tool_name: impl Into<String>,
        result: impl Into<String>,
        success: bool,
    ) -> Self {
        Self::new(StreamEventKind::ToolCallEnd {
            tool_id: tool_id.into(),
            tool_name: tool_name.into(),
            result: result.into(),
            success,
        })
    }

    pub fn thinking_start(reasoning_id: impl Into<String>) -> Self {
        Self::new(StreamEventKind::ThinkingStart {
            reasoning_id: reasoning_id.into(),
        })
    }

    pub fn thinking_delta(reasoning_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(StreamEventKind::ThinkingDelta {
            reasoning_id: reasoning_id.into(),
            text: text.into(),
        })
    }

    pub fn thinking_complete(reasoning_id: impl Into<String>, summary: Option<String>) -> Self {
        Self::new(StreamEventKind::ThinkingComplete {
            reasoning_id: reasoning_id.into(),
            summary,
        })
    }

    pub fn citation(citation: Citation) -> Self {
        Self::new(StreamEventKind::Citation(citation))
    }

    pub fn step_start(step: u32) -> Self {
        Self::new(StreamEventKind::StepStart { step })
    }

    pub fn step_finish(step: u32, finish_reason: Option<String>) -> Self {
        Self::new(StreamEventKind::StepFinish { step, finish_reason })
    }

    pub fn artifact(artifact: Artifact) -> Self {
        Self::new(StreamEventKind::Artifact(artifact))
    }

    pub fn error(message: impl Into<String>, error_type: impl Into<String>, recoverable: bool) -> Self {
        Self::new(StreamEventKind::Error {
            message: message.into(),
            error_type: error_type.into(),
            recoverable,
        })
    }

    pub fn stream_end(finish_reason: impl Into<String>, usage: Value) -> Self {
        Self::new(StreamEventKind::StreamEnd {
            finish_reason: finish_reason.into(),
            usage,
        })
    }

    /// Wire name of the event type
    pub fn event_type(&self) -> &'static str {
        match &self.kind {
            StreamEventKind::StreamStart { .. } => "stream_start",
            StreamEventKind::TextDelta { .. } => "text_delta",
            StreamEventKind::ToolCallStart { .. } => "tool_call_start",
            StreamEventKind::ToolCallEnd { .. } => "tool_call_end",
            StreamEventKind::ThinkingStart { .. } => "thinking_start",
            StreamEventKind::ThinkingDelta { .. } => "thinking_delta",
            StreamEventKind::ThinkingComplete { .. } => "thinking_complete",
            StreamEventKind::Citation(_) => "citation",
            StreamEventKind::StepStart { .. } => "step_start",
            StreamEventKind::StepFinish { .. } => "step_finish",
            StreamEventKind::Artifact(_) => "artifact",
            StreamEventKind::Error { .. } => "error",
            StreamEventKind::StreamEnd { .. } => "stream_end",
        }
    }

    /// `stream_end` completes a stream
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, StreamEventKind::StreamEnd { .. })
    }

    /// Flat JSON view: `{id, type, timestamp, ...fields}`
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Server-sent-events frame: `event: <type>\ndata: <json>\n\n`
    pub fn to_sse_frame(&self) -> Result<String> {
        let data = serde_json::to_string(self)?;
        Ok(format!("event: {}\ndata: {}\n\n", self.event_type(), data))
    }
}
