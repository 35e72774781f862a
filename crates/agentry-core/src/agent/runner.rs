//! Runner seam and process-wide facade
//!
//! Application code calls [`Agents`]; what actually runs is whatever
//! [`AgentRunner`] is bound to it. Tests bind a fake in place of the executor.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use crate::context::ExecutionContext;
use crate::error::Result;
use crate::provider::StructuredSchema;
use crate::stream::StreamResponse;

use super::registry::AgentRef;
use super::response::AgentResponse;

#[async_trait]
pub trait AgentRunner: Send + Sync {
    async fn execute(&self, agent: AgentRef, input: String, context: ExecutionContext) -> Result<AgentResponse>;

    async fn execute_structured(
        &self,
        agent: AgentRef,
        input: String,
        schema: StructuredSchema,
        context: ExecutionContext,
    ) -> Result<AgentResponse>;

    async fn stream(&self, agent: AgentRef, input: String, context: ExecutionContext) -> Result<StreamResponse>;
}

/// Facade over the currently bound runner
pub struct Agents {
    runner: RwLock<Arc<dyn AgentRunner>>,
}

impl Agents {
    pub fn new(runner: Arc<dyn AgentRunner>) -> Self {
        Self {
            runner: RwLock::new(runner),
        }
    }

    /// The runner calls are currently routed to
    pub fn runner(&self) -> Arc<dyn AgentRunner> {
        let runner = self.runner.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*runner)
    }

    /// Route calls to `runner`, returning the one previously bound
    pub fn bind(&self, runner: Arc<dyn AgentRunner>) -> Arc<dyn AgentRunner> {
        let mut slot = self.runner.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, runner)
    }

    pub async fn execute(
        &self,
        agent: impl Into<AgentRef>,
        input: impl Into<String>,
        context: ExecutionContext,
    ) -> Result<AgentResponse> {
        let (agent, input) = (agent.into(), input.into());
        self.runner().execute(agent, input, context).await
    }

    pub async fn execute_structured(
        &self,
        agent: impl Into<AgentRef>,
        input: impl Into<String>,
        schema: StructuredSchema,
        context: ExecutionContext,
    ) -> Result<AgentResponse> {
        let (agent, input) = (agent.into(), input.into());
        self.runner().execute_structured(agent, input, schema, context).await
    }

    pub async fn stream(
        &self,
        agent: impl Into<AgentRef>,
        input: impl Into<String>,
        context: ExecutionContext,
    ) -> Result<StreamResponse> {
        let (agent, input) = (agent.into(), input.into());
        self.runner().stream(agent, input, context).await
    }
}

impl std::fmt::Debug for Agents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agents").finish_non_exhaustive()
    }
}
