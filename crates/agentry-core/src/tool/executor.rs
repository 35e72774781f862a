//! Tool Executor
//!
//! Single entry point for running a tool call:
//!
//! ```text
//!  tool.before_execute ─▶ validate ─▶ handle ─▶ tool.after_execute ─▶ result
//!                            │          │
//!                            └── Err / panic ──▶ tool.on_error ─▶ ToolResult::Error
//! ```
//!
//! Failures never escape; the model always gets a result back.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use crate::pipeline::{hooks, HookPayload, PipelineRunner, ToolHookData};

use super::{Tool, ToolArgs, ToolContext, ToolResult};

#[derive(Clone, Debug, Default)]
pub struct ToolExecutor {
    pipeline: PipelineRunner,
}

impl ToolExecutor {
    pub fn new(pipeline: PipelineRunner) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &PipelineRunner {
        &self.pipeline
    }

    /// Run one tool call through the hook pipeline
    pub async fn execute(&self, tool: Arc<dyn Tool>, args: ToolArgs, context: ToolContext) -> ToolResult {
        let name = tool.name();
        tracing::debug!(tool = %name, "Executing tool");

        let (args, context) = self.before(&tool, args, context).await;

        match invoke(&*tool, &args, &context).await {
            Ok(result) => self.after(tool, args, context, result).await,
            Err(message) => {
                tracing::warn!(tool = %name, error = %message, "Tool execution failed");
                let data = ToolHookData {
                    error: Some(message.clone()),
                    ..ToolHookData::new(tool, args, context)
                };
                self.pipeline
                    .run_if_active(hooks::TOOL_ON_ERROR, HookPayload::Tool(data), None)
                    .await;
                ToolResult::error(format!("Tool '{}' failed: {}", name, message))
            }
        }
    }

    async fn before(&self, tool: &Arc<dyn Tool>, args: ToolArgs, context: ToolContext) -> (ToolArgs, ToolContext) {
        let data = ToolHookData::new(Arc::clone(tool), args.clone(), context.clone());
        let payload = self
            .pipeline
            .run_if_active(hooks::TOOL_BEFORE_EXECUTE, HookPayload::Tool(data), None)
            .await;

        match payload.into_tool() {
            Some(data) => (data.args, data.context),
            None => {
                tracing::warn!(hook = hooks::TOOL_BEFORE_EXECUTE, "Hook returned a foreign payload, keeping original arguments");
                (args, context)
            }
        }
    }

    async fn after(&self, tool: Arc<dyn Tool>, args: ToolArgs, context: ToolContext, result: ToolResult) -> ToolResult {
        let data = ToolHookData {
            result: Some(result.clone()),
            ..ToolHookData::new(tool, args, context)
        };
        let payload = self
            .pipeline
            .run_if_active(hooks::TOOL_AFTER_EXECUTE, HookPayload::Tool(data), None)
            .await;

        payload.into_tool().and_then(|data| data.result).unwrap_or(result)
    }
}

/// Validate and handle, folding errors and panics into a message
async fn invoke(tool: &dyn Tool, args: &ToolArgs, context: &ToolContext) -> Result<ToolResult, String> {
    tool.validate(args).map_err(|err| err.to_string())?;

    match AssertUnwindSafe(tool.handle(args.clone(), context)).catch_unwind().await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(err)) => Err(err.to_string()),
        Err(panic) => Err(panic_message(&*panic)),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "tool panicked".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AgentError, Result};
    use crate::pipeline::{handler_fn, Next, PipelineRegistry};
    use crate::tool::{ParameterSchema, ToolDefinition};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct Adder {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Tool for Adder {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("adder", "Add two numbers")
                .with_parameter(ParameterSchema::number("a", "First").required())
                .with_parameter(ParameterSchema::number("b", "Second").required())
        }

        async fn handle(&self, args: ToolArgs, _context: &ToolContext) -> Result<ToolResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let a = args["a"].as_f64().unwrap_or_default();
            let b = args["b"].as_f64().unwrap_or_default();
            Ok(ToolResult::text((a + b).to_string()))
        }
    }

    struct Broken {
        panics: bool,
    }

    #[async_trait]
    impl Tool for Broken {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("broken", "Always fails")
        }

        async fn handle(&self, _args: ToolArgs, _context: &ToolContext) -> Result<ToolResult> {
            if self.panics {
                panic!("kaboom");
            }
            Err(AgentError::ToolExecution("database unreachable".into()))
        }
    }

    fn adder() -> (Arc<dyn Tool>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Arc::new(Adder {
                calls: Arc::clone(&calls),
            }),
            calls,
        )
    }

    fn args(value: Value) -> ToolArgs {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_execute_success() {
        let (tool, calls) = adder();
        let result = ToolExecutor::default()
            .execute(tool, args(json!({"a": 2, "b": 2})), ToolContext::new())
            .await;

        assert_eq!(result, ToolResult::text("4"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_error_is_contained_and_names_tool() {
        let result = ToolExecutor::default()
            .execute(Arc::new(Broken { panics: false }), ToolArgs::new(), ToolContext::new())
            .await;

        assert!(result.failed());
        assert_eq!(result.message(), Some("Tool 'broken' failed: database unreachable"));
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let result = ToolExecutor::default()
            .execute(Arc::new(Broken { panics: true }), ToolArgs::new(), ToolContext::new())
            .await;

        assert!(result.failed());
        assert_eq!(result.message(), Some("Tool 'broken' failed: kaboom"));
    }

    #[tokio::test]
    async fn test_missing_required_parameter_skips_handle() {
        let (tool, calls) = adder();
        let result = ToolExecutor::default()
            .execute(tool, args(json!({"a": 2})), ToolContext::new())
            .await;

        assert_eq!(
            result.message(),
            Some("Tool 'adder' failed: Missing required parameter: b")
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_hooks_rewrite_args_and_result() {
        let mut registry = PipelineRegistry::with_default_hooks();
        registry.register(
            hooks::TOOL_BEFORE_EXECUTE,
            handler_fn(|mut payload: HookPayload, next: Next| async move {
                if let Some(data) = payload.as_tool_mut() {
                    data.args.insert("b".into(), json!(40));
                }
                next.run(payload).await
            }),
        );
        registry.register(
            hooks::TOOL_AFTER_EXECUTE,
            handler_fn(|mut payload: HookPayload, next: Next| async move {
                if let Some(data) = payload.as_tool_mut() {
                    let text = data.result.as_ref().map(ToolResult::to_text).unwrap_or_default();
                    data.result = Some(ToolResult::text(format!("answer: {}", text)));
                }
                next.run(payload).await
            }),
        );
        let executor = ToolExecutor::new(PipelineRunner::new(Arc::new(registry)));

        let (tool, _) = adder();
        let result = executor
            .execute(tool, args(json!({"a": 2, "b": 2})), ToolContext::new())
            .await;
        assert_eq!(result, ToolResult::text("answer: 42"));
    }

    #[tokio::test]
    async fn test_on_error_hook_observes_failure() {
        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = Arc::clone(&seen);

        let mut registry = PipelineRegistry::with_default_hooks();
        registry.register(
            hooks::TOOL_ON_ERROR,
            handler_fn(move |payload: HookPayload, next: Next| {
                if let HookPayload::Tool(data) = &payload {
                    sink.lock().unwrap().push(data.error.clone().unwrap_or_default());
                }
                next.run(payload)
            }),
        );
        let executor = ToolExecutor::new(PipelineRunner::new(Arc::new(registry)));

        executor
            .execute(Arc::new(Broken { panics: false }), ToolArgs::new(), ToolContext::new())
            .await;
        assert_eq!(*seen.lock().unwrap(), vec!["database unreachable".to_string()]);
    }
}
