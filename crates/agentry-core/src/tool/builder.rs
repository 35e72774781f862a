//! Tool Builder
//!
//! Turns the tool names bound to an agent into provider-facing descriptors.
//! Each descriptor carries a handler that forwards the model's JSON arguments
//! into the [`ToolExecutor`] with a fixed [`ToolContext`].

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{Map, Value};

use crate::agent::AgentDefinition;
use crate::context::ExecutionContext;
use crate::error::Result;

use super::{ParameterSchema, RegisteredTool, Tool, ToolArgs, ToolContext, ToolDefinition, ToolExecutor, ToolRegistry, ToolResult};

/// Handler invoked by the provider with the model's raw arguments
pub type ToolHandlerFn = Arc<dyn Fn(Value) -> BoxFuture<'static, ToolResult> + Send + Sync>;

/// Renders a failed result into the text the model sees
pub type FailureFormatter = Arc<dyn Fn(&ToolResult) -> String + Send + Sync>;

/// Callable tool descriptor handed to the provider
#[derive(Clone)]
pub struct ProviderTool {
    definition: ToolDefinition,
    provider_options: Map<String, Value>,
    failure_formatter: Option<FailureFormatter>,
    handler: ToolHandlerFn,
}

impl ProviderTool {
    pub fn new(definition: ToolDefinition, handler: ToolHandlerFn) -> Self {
        Self {
            definition,
            provider_options: Map::new(),
            failure_formatter: None,
            handler,
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn description(&self) -> &str {
        &self.definition.description
    }

    pub fn parameters(&self) -> &[ParameterSchema] {
        &self.definition.parameters
    }

    pub fn provider_options(&self) -> &Map<String, Value> {
        &self.provider_options
    }

    /// `{name, description, parameters}` with parameters as JSON Schema
    pub fn json_schema(&self) -> Value {
        serde_json::json!({
            "name": self.definition.name,
            "description": self.definition.description,
            "parameters": self.definition.json_schema(),
        })
    }

    /// Attach a provider-specific option (cache control, strict mode, ...)
    pub fn with_provider_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.provider_options.insert(key.into(), value.into());
        self
    }

    pub fn with_failure_formatter<F>(mut self, formatter: F) -> Self
    where
        F: Fn(&ToolResult) -> String + Send + Sync + 'static,
    {
        self.failure_formatter = Some(Arc::new(formatter));
        self
    }

    /// Run the bound handler
    pub async fn invoke(&self, arguments: Value) -> ToolResult {
        (self.handler)(arguments).await
    }

    /// Run the bound handler and render the text returned to the model
    pub async fn call(&self, arguments: Value) -> String {
        let result = self.invoke(arguments).await;
        match &self.failure_formatter {
            Some(format) if result.failed() => format(&result),
            _ => result.to_text(),
        }
    }
}

impl std::fmt::Debug for ProviderTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderTool")
            .field("name", &self.definition.name)
            .field("provider_options", &self.provider_options)
            .field("failure_formatter", &self.failure_formatter.is_some())
            .finish_non_exhaustive()
    }
}

/// Entry in a provider request's tool set
#[derive(Clone, Debug)]
pub enum AgentTool {
    /// Registered tool with a bound handler
    Callable(ProviderTool),
    /// Provider-native descriptor (web search, code interpreter), passed through
    Native(Value),
}

impl AgentTool {
    pub fn as_callable(&self) -> Option<&ProviderTool> {
        match self {
            AgentTool::Callable(tool) => Some(tool),
            AgentTool::Native(_) => None,
        }
    }

    /// Tool name; native descriptors report their `name` or `type` field
    pub fn name(&self) -> Option<&str> {
        match self {
            AgentTool::Callable(tool) => Some(tool.name()),
            AgentTool::Native(raw) => raw
                .get("name")
                .or_else(|| raw.get("type"))
                .and_then(Value::as_str),
        }
    }
}

#[derive(Clone)]
pub struct ToolBuilder {
    registry: Arc<ToolRegistry>,
    executor: ToolExecutor,
}

impl ToolBuilder {
    pub fn new(registry: Arc<ToolRegistry>, executor: ToolExecutor) -> Self {
        Self { registry, executor }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Descriptors for every tool bound to `agent`, in binding order
    pub fn build_for_agent(&self, agent: &Arc<AgentDefinition>, context: &ExecutionContext) -> Result<Vec<ProviderTool>> {
        let tool_context = ToolContext::for_agent(Arc::clone(agent)).merge_metadata(context.metadata().clone());

        agent
            .tools()
            .iter()
            .map(|name| self.build(name, &tool_context))
            .collect()
    }

    /// Descriptor for one registered tool
    pub fn build(&self, name: &str, context: &ToolContext) -> Result<ProviderTool> {
        let RegisteredTool { tool, configure } = self.registry.get(name)?;
        let definition = tool.definition();
        let handler = bind(tool, self.executor.clone(), context.clone());
        let descriptor = ProviderTool::new(definition, handler);

        Ok(match configure {
            Some(configure) => configure(descriptor),
            None => descriptor,
        })
    }
}

impl std::fmt::Debug for ToolBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolBuilder")
            .field("tools", &self.registry.names())
            .finish_non_exhaustive()
    }
}

fn bind(tool: Arc<dyn Tool>, executor: ToolExecutor, context: ToolContext) -> ToolHandlerFn {
    Arc::new(move |arguments: Value| {
        let tool = Arc::clone(&tool);
        let executor = executor.clone();
        let context = context.clone();

        async move {
            let args: ToolArgs = match arguments {
                Value::Object(map) => map.into_iter().collect(),
                Value::Null => ToolArgs::new(),
                other => {
                    return ToolResult::error(format!(
                        "Tool '{}' expects an object of arguments, got: {}",
                        tool.name(),
                        other
                    ));
                }
            };
            executor.execute(tool, args, context).await
        }
        .boxed()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Reports the tenant and calling agent it sees
    struct Whoami {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Tool for Whoami {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("whoami", "Report caller")
                .with_parameter(ParameterSchema::string("greeting", "Prefix").required())
        }

        async fn handle(&self, args: ToolArgs, context: &ToolContext) -> Result<ToolResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let greeting = args["greeting"].as_str().unwrap_or_default();
            let tenant = context.get("tenant").and_then(Value::as_str).unwrap_or("none");
            let agent = context.agent().map_or("none", |agent| agent.key());
            Ok(ToolResult::text(format!("{} {}@{}", greeting, agent, tenant)))
        }
    }

    fn setup() -> (ToolBuilder, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::new();
        registry
            .register_configured(
                Whoami {
                    calls: Arc::clone(&calls),
                },
                |tool| {
                    tool.with_provider_option("strict", true)
                        .with_failure_formatter(|result| format!("ERROR: {}", result.to_text()))
                },
            )
            .unwrap();
        (ToolBuilder::new(Arc::new(registry), ToolExecutor::default()), calls)
    }

    fn agent(tools: &[&str]) -> Arc<AgentDefinition> {
        Arc::new(
            AgentDefinition::builder("concierge")
                .provider("openai")
                .model("gpt-4o")
                .tools(tools.iter().copied())
                .build()
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_handler_forwards_context_and_agent() {
        let (builder, calls) = setup();
        let context = ExecutionContext::new().with_metadata("tenant", "acme");

        let tools = builder.build_for_agent(&agent(&["whoami"]), &context).unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name(), "whoami");
        assert_eq!(tools[0].provider_options()["strict"], true);
        assert_eq!(tools[0].json_schema()["parameters"]["required"], json!(["greeting"]));

        let text = tools[0].call(json!({"greeting": "hi"})).await;
        assert_eq!(text, "hi concierge@acme");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_object_arguments_do_not_invoke_tool() {
        let (builder, calls) = setup();
        let tools = builder
            .build_for_agent(&agent(&["whoami"]), &ExecutionContext::new())
            .unwrap();

        let result = tools[0].invoke(json!(["hi"])).await;
        assert!(result.failed());
        assert!(result.message().unwrap().starts_with("Tool 'whoami' expects an object"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failure_formatter_applies_to_failures_only() {
        let (builder, _) = setup();
        let tool = builder.build("whoami", &ToolContext::new()).unwrap();

        let text = tool.call(json!({})).await;
        assert_eq!(text, "ERROR: Tool 'whoami' failed: Missing required parameter: greeting");

        let text = tool.call(json!({"greeting": "yo"})).await;
        assert_eq!(text, "yo none@none");
    }

    #[test]
    fn test_unknown_tool_is_not_found() {
        let (builder, _) = setup();
        let err = builder
            .build_for_agent(&agent(&["whoami", "teleport"]), &ExecutionContext::new())
            .unwrap_err();
        assert!(matches!(err, AgentError::NotFound { ref key, .. } if key == "teleport"));
    }

    #[test]
    fn test_native_tool_name() {
        let native = AgentTool::Native(json!({"type": "web_search_preview"}));
        assert_eq!(native.name(), Some("web_search_preview"));
        assert!(native.as_callable().is_none());
    }
}
