//! Hook Pipelines
//!
//! Named extension points with ordered, short-circuiting handler chains.
//!
//! ```text
//!  run("tool.before_execute", data)
//!      │
//!      ▼
//!  handler[0](data, next) ──next.run──▶ handler[1](data, next) ──▶ … ──▶ destination(data)
//!      ▲                                   │
//!      └──────────── result ◀──────────────┘
//! ```
//!
//! A handler that returns without calling `next.run` halts the chain; its
//! return value becomes the pipeline result.

mod payload;
mod registry;
mod runner;

pub use payload::{AgentHookData, ErrorReport, HookPayload, PromptHookData, ToolHookData};
pub use registry::{HandlerFactory, HandlerSlot, HookDefinition, PipelineRegistry};
pub use runner::{destination, handler_fn, Destination, FnHandler, HookHandler, Next, PipelineRunner};

/// Built-in hook names
pub mod hooks {
    pub const AGENT_BEFORE_EXECUTE: &str = "agent.before_execute";
    pub const AGENT_AFTER_EXECUTE: &str = "agent.after_execute";
    pub const AGENT_ON_ERROR: &str = "agent.on_error";
    pub const SYSTEM_PROMPT_BEFORE_BUILD: &str = "agent.system_prompt.before_build";
    pub const SYSTEM_PROMPT_AFTER_BUILD: &str = "agent.system_prompt.after_build";

    pub const TOOL_BEFORE_EXECUTE: &str = "tool.before_execute";
    pub const TOOL_AFTER_EXECUTE: &str = "tool.after_execute";
    pub const TOOL_ON_ERROR: &str = "tool.on_error";

    pub const EMBEDDING_BEFORE: &str = "embedding.before_embed";
    pub const EMBEDDING_AFTER: &str = "embedding.after_embed";
    pub const EMBEDDING_ON_ERROR: &str = "embedding.on_error";
    pub const IMAGE_BEFORE: &str = "image.before_generate";
    pub const IMAGE_AFTER: &str = "image.after_generate";
    pub const IMAGE_ON_ERROR: &str = "image.on_error";
    pub const SPEECH_BEFORE: &str = "speech.before_generate";
    pub const SPEECH_AFTER: &str = "speech.after_generate";
    pub const SPEECH_ON_ERROR: &str = "speech.on_error";

    pub const STREAM_ON_EVENT: &str = "stream.on_event";
    pub const STREAM_AFTER_COMPLETE: &str = "stream.after_complete";

    /// Every built-in hook with its description
    pub const CATALOG: &[(&str, &str)] = &[
        (AGENT_BEFORE_EXECUTE, "Before an agent request is dispatched to the provider"),
        (AGENT_AFTER_EXECUTE, "After the provider returned a response"),
        (AGENT_ON_ERROR, "When agent execution fails"),
        (SYSTEM_PROMPT_BEFORE_BUILD, "Before the system prompt template is interpolated"),
        (SYSTEM_PROMPT_AFTER_BUILD, "After the system prompt has been built"),
        (TOOL_BEFORE_EXECUTE, "Before a tool handles a call"),
        (TOOL_AFTER_EXECUTE, "After a tool returned a result"),
        (TOOL_ON_ERROR, "When a tool call fails"),
        (EMBEDDING_BEFORE, "Before embeddings are generated"),
        (EMBEDDING_AFTER, "After embeddings are generated"),
        (EMBEDDING_ON_ERROR, "When embedding generation fails"),
        (IMAGE_BEFORE, "Before an image is generated"),
        (IMAGE_AFTER, "After an image is generated"),
        (IMAGE_ON_ERROR, "When image generation fails"),
        (SPEECH_BEFORE, "Before speech is generated or transcribed"),
        (SPEECH_AFTER, "After speech is generated or transcribed"),
        (SPEECH_ON_ERROR, "When a speech operation fails"),
        (STREAM_ON_EVENT, "For every event of a streamed response"),
        (STREAM_AFTER_COMPLETE, "Once a streamed response is fully consumed"),
    ];
}
