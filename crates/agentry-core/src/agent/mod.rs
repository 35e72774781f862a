//! Agents
//!
//! Definitions, registry and resolution, system prompt construction, and the
//! executor that drives a run end to end.

mod definition;
mod executor;
mod prompt;
mod registry;
mod response;
mod runner;

pub use definition::{AgentDefinition, AgentDefinitionBuilder, ExecutionType};
pub use executor::{AgentExecutor, AgentExecutorBuilder};
pub use prompt::{interpolate, SystemPromptBuilder};
pub use registry::{AgentFactory, AgentRef, AgentRegistry, AgentResolver};
pub use response::AgentResponse;
pub use runner::{AgentRunner, Agents};
