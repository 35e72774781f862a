//! # agentry-core
//!
//! Runtime for LLM-backed agents: registries, hook pipelines, tool execution,
//! provider-agnostic dispatch and streaming.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                         Agents (facade)                            │
//! │                               │                                    │
//! │                        AgentRunner (seam)                          │
//! │                               │                                    │
//! │  ┌──────────────┐   ┌─────────────────┐   ┌──────────────────────┐ │
//! │  │ AgentResolver│──▶│  AgentExecutor  │──▶│ LlmProvider          │ │
//! │  │  + Registry  │   │ prompt · tools  │   │ (Strategy)           │ │
//! │  └──────────────┘   └────────┬────────┘   └──────────────────────┘ │
//! │                              │                                     │
//! │          ┌───────────────────┼────────────────────┐                │
//! │          ▼                   ▼                    ▼                │
//! │   PipelineRunner        ToolExecutor        StreamResponse         │
//! │   (hook chains)      (contained failures)   (SSE, accumulators)    │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait owns transport and the provider-side tool loop, so
//! agents run against OpenAI, Anthropic or a test double without code changes.

pub mod agent;
pub mod config;
pub mod context;
pub mod error;
pub mod message;
pub mod pipeline;
pub mod provider;
pub mod registry;
pub mod stream;
pub mod tool;

pub use agent::{
    AgentDefinition, AgentExecutor, AgentRef, AgentRegistry, AgentResolver, AgentResponse, AgentRunner, Agents,
};
pub use config::{AgentryConfig, PlaceholderPolicy};
pub use context::ExecutionContext;
pub use error::{AgentError, ProviderError, Result};
pub use message::{Message, Role};
pub use pipeline::{HookPayload, PipelineRegistry, PipelineRunner};
pub use provider::{LlmProvider, ProviderRequest, ProviderResponse, StructuredSchema};
pub use stream::{StreamEvent, StreamResponse};
pub use tool::{Tool, ToolContext, ToolDefinition, ToolExecutor, ToolRegistry, ToolResult};
