//! # agentry-testing
//!
//! Test doubles for applications built on `agentry-core`.
//!
//! - [`FakeAgentRunner`] binds into [`Agents`](agentry_core::Agents) in place
//!   of the executor, answers from per-agent queues and records every call.
//! - [`ScriptedProvider`] stands in for a model at the provider boundary and
//!   runs the request's tools for real.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let agents = Agents::new(Arc::new(executor));
//! let fake = FakeAgentRunner::new().activate(&agents);
//! fake.respond("summarizer", FakeResponse::text("short version"));
//!
//! let reply = agents.execute("summarizer", "long text", ExecutionContext::new()).await?;
//! fake.assert_agent_called_times("summarizer", 1);
//! fake.restore(&agents);
//! ```

mod fake;
mod provider;
mod record;

pub use fake::{FailureFactory, FakeAgentRunner, FakeResponse};
pub use provider::{ScriptStep, ScriptedProvider, ScriptedToolCall, ToolOutcome};
pub use record::RecordedRequest;
