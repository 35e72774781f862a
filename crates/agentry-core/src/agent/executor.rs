//! Agent Executor
//!
//! Orchestrates one agent run:
//!
//! ```text
//!  resolve ─▶ system prompt ─▶ tools ─▶ agent.before_execute ─▶ provider
//!                                                                  │
//!        response ◀── agent.after_execute ◀── usage ◀──────────────┘
//!
//!  any failure after resolution ─▶ agent.on_error ─▶ Err(classified)
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::AgentryConfig;
use crate::context::ExecutionContext;
use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::pipeline::{hooks, AgentHookData, ErrorReport, HookPayload, PipelineRunner};
use crate::provider::{GenerationOptions, LlmProvider, ProviderRequest, StructuredSchema, UsageExtractors};
use crate::stream::StreamResponse;
use crate::tool::{AgentTool, ToolBuilder, ToolExecutor, ToolRegistry};

use super::prompt::SystemPromptBuilder;
use super::registry::{AgentRef, AgentRegistry, AgentResolver};
use super::response::AgentResponse;
use super::runner::AgentRunner;
use super::AgentDefinition;

/// Hook data after `agent.before_execute`, plus the built system prompt
struct Prepared {
    data: AgentHookData,
    system_prompt: Option<String>,
}

pub struct AgentExecutor {
    resolver: AgentResolver,
    provider: Arc<dyn LlmProvider>,
    pipeline: PipelineRunner,
    prompts: SystemPromptBuilder,
    tools: ToolBuilder,
    usage: UsageExtractors,
    config: AgentryConfig,
}

impl AgentExecutor {
    pub fn builder() -> AgentExecutorBuilder {
        AgentExecutorBuilder::new()
    }

    pub fn resolver(&self) -> &AgentResolver {
        &self.resolver
    }

    pub fn pipeline(&self) -> &PipelineRunner {
        &self.pipeline
    }

    pub fn config(&self) -> &AgentryConfig {
        &self.config
    }

    /// Run an agent and return its text response
    pub async fn execute(
        &self,
        agent: impl Into<AgentRef>,
        input: impl Into<String>,
        context: ExecutionContext,
    ) -> Result<AgentResponse> {
        self.run(agent.into(), input.into(), context, None).await
    }

    /// Run an agent whose output must follow `schema`
    pub async fn execute_structured(
        &self,
        agent: impl Into<AgentRef>,
        input: impl Into<String>,
        schema: StructuredSchema,
        context: ExecutionContext,
    ) -> Result<AgentResponse> {
        self.run(agent.into(), input.into(), context, Some(schema)).await
    }

    /// Run an agent in streaming mode
    pub async fn stream(
        &self,
        agent: impl Into<AgentRef>,
        input: impl Into<String>,
        context: ExecutionContext,
    ) -> Result<StreamResponse> {
        let agent = self.resolver.resolve(agent.into())?;
        let input = input.into();
        tracing::debug!(agent = %agent.key(), provider = %agent.provider(), model = %agent.model(), "Streaming agent");

        match self.open_stream(&agent, input.clone(), context.clone()).await {
            Ok(stream) => Ok(stream),
            Err(err) => Err(self.fail(agent, input, context, err).await),
        }
    }

    async fn run(
        &self,
        agent: AgentRef,
        input: String,
        context: ExecutionContext,
        schema: Option<StructuredSchema>,
    ) -> Result<AgentResponse> {
        // Resolution errors are not routed through agent.on_error
        let agent = self.resolver.resolve(agent)?;
        tracing::debug!(
            agent = %agent.key(),
            provider = %agent.provider(),
            model = %agent.model(),
            structured = schema.is_some(),
            "Executing agent"
        );

        match self.dispatch(&agent, input.clone(), context.clone(), schema).await {
            Ok(response) => Ok(response),
            Err(err) => Err(self.fail(agent, input, context, err).await),
        }
    }

    async fn dispatch(
        &self,
        agent: &Arc<AgentDefinition>,
        input: String,
        context: ExecutionContext,
        schema: Option<StructuredSchema>,
    ) -> Result<AgentResponse> {
        let Prepared { data, system_prompt } = self.prepare(agent, input, context).await?;
        let request = self.request_for(&data, system_prompt, schema);
        let provider = request.provider.clone();

        let raw = self.provider.complete(request).await?;
        let (usage, finish_reason) = self.usage.extract(&provider, &raw);

        let response = AgentResponse::from_provider(raw, usage, finish_reason);
        let data = self
            .pipeline
            .run_if_active(
                hooks::AGENT_AFTER_EXECUTE,
                HookPayload::Agent(data.with_response(response)),
                None,
            )
            .await
            .into_agent()
            .ok_or_else(|| foreign_payload(hooks::AGENT_AFTER_EXECUTE))?;

        // The after hook owns the final response, usage included
        let response = data.response.unwrap_or_default();

        tracing::debug!(
            agent = %data.agent.key(),
            steps = response.steps,
            tool_calls = response.tool_calls.len(),
            total_tokens = response.usage.total_tokens,
            "Agent completed"
        );
        Ok(response)
    }

    async fn open_stream(
        &self,
        agent: &Arc<AgentDefinition>,
        input: String,
        context: ExecutionContext,
    ) -> Result<StreamResponse> {
        let Prepared { data, system_prompt } = self.prepare(agent, input, context).await?;
        let request = self.request_for(&data, system_prompt, None);
        let events = self.provider.complete_stream(request).await?;
        Ok(StreamResponse::new(events).with_pipeline(self.pipeline.clone()))
    }

    /// System prompt, tool set and `agent.before_execute`
    async fn prepare(&self, agent: &Arc<AgentDefinition>, input: String, context: ExecutionContext) -> Result<Prepared> {
        let system_prompt = self.prompts.build(agent, &context).await?;

        let mut tools: Vec<AgentTool> = self
            .tools
            .build_for_agent(agent, &context)?
            .into_iter()
            .map(AgentTool::Callable)
            .collect();
        tools.extend(agent.provider_tools().iter().cloned().map(AgentTool::Native));

        let data = AgentHookData::new(Arc::clone(agent), input, context).with_tools(tools);
        let data = self
            .pipeline
            .run_if_active(hooks::AGENT_BEFORE_EXECUTE, HookPayload::Agent(data), None)
            .await
            .into_agent()
            .ok_or_else(|| foreign_payload(hooks::AGENT_BEFORE_EXECUTE))?;

        Ok(Prepared { data, system_prompt })
    }

    fn request_for(
        &self,
        data: &AgentHookData,
        system_prompt: Option<String>,
        schema: Option<StructuredSchema>,
    ) -> ProviderRequest {
        let agent = &data.agent;

        let request = if data.context.has_messages() {
            let mut messages = data.context.messages().to_vec();
            messages.push(Message::user(data.input.clone()));
            ProviderRequest::for_messages(agent.provider(), agent.model(), messages)
        } else {
            ProviderRequest::for_prompt(agent.provider(), agent.model(), data.input.clone())
        };

        let request = match schema {
            Some(schema) => request.for_structured(schema),
            None => request,
        };

        request
            .with_system_prompt(system_prompt)
            .with_tools(data.tools.clone())
            .with_options(GenerationOptions {
                temperature: agent.temperature(),
                max_tokens: agent.max_tokens(),
                max_steps: agent.max_steps().unwrap_or(self.config.default_max_steps),
            })
            .apply_overrides(data.context.overrides())
    }

    async fn fail(
        &self,
        agent: Arc<AgentDefinition>,
        input: String,
        context: ExecutionContext,
        err: AgentError,
    ) -> AgentError {
        tracing::error!(agent = %agent.key(), kind = err.kind(), error = %err, "Agent execution failed");

        let data = AgentHookData::new(agent, input, context).with_error(ErrorReport::from(&err));
        self.pipeline
            .run_if_active(hooks::AGENT_ON_ERROR, HookPayload::Agent(data), None)
            .await;
        err
    }
}

fn foreign_payload(hook: &str) -> AgentError {
    AgentError::Pipeline(format!("{} handler returned a non-agent payload", hook))
}

#[async_trait]
impl AgentRunner for AgentExecutor {
    async fn execute(&self, agent: AgentRef, input: String, context: ExecutionContext) -> Result<AgentResponse> {
        self.run(agent, input, context, None).await
    }

    async fn execute_structured(
        &self,
        agent: AgentRef,
        input: String,
        schema: StructuredSchema,
        context: ExecutionContext,
    ) -> Result<AgentResponse> {
        self.run(agent, input, context, Some(schema)).await
    }

    async fn stream(&self, agent: AgentRef, input: String, context: ExecutionContext) -> Result<StreamResponse> {
        AgentExecutor::stream(self, agent, input, context).await
    }
}

impl std::fmt::Debug for AgentExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentExecutor")
            .field("resolver", &self.resolver)
            .field("tools", &self.tools)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`AgentExecutor`]
pub struct AgentExecutorBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    resolver: Option<AgentResolver>,
    agents: Arc<AgentRegistry>,
    tools: Arc<ToolRegistry>,
    pipeline: PipelineRunner,
    usage: UsageExtractors,
    config: AgentryConfig,
}

impl Default for AgentExecutorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentExecutorBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            resolver: None,
            agents: Arc::new(AgentRegistry::new()),
            tools: Arc::new(ToolRegistry::new()),
            pipeline: PipelineRunner::empty(),
            usage: UsageExtractors::new(),
            config: AgentryConfig::default(),
        }
    }

    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Agents resolvable by key. Ignored when a resolver is set.
    pub fn agents(mut self, agents: AgentRegistry) -> Self {
        self.agents = Arc::new(agents);
        self
    }

    /// Custom resolver, e.g. with registered agent types
    pub fn resolver(mut self, resolver: AgentResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = Arc::new(tools);
        self
    }

    pub fn pipeline(mut self, pipeline: PipelineRunner) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn usage_extractors(mut self, usage: UsageExtractors) -> Self {
        self.usage = usage;
        self
    }

    pub fn config(mut self, config: AgentryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<AgentExecutor> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::InvalidConfiguration("Provider is required".into()))?;

        let executor = ToolExecutor::new(self.pipeline.clone());
        Ok(AgentExecutor {
            resolver: self.resolver.unwrap_or_else(|| AgentResolver::new(self.agents)),
            provider,
            prompts: SystemPromptBuilder::new(self.pipeline.clone(), self.config.placeholder_policy),
            tools: ToolBuilder::new(self.tools, executor),
            pipeline: self.pipeline,
            usage: self.usage,
            config: self.config,
        })
    }
}
