//! Registry for available tools

use std::sync::Arc;

use crate::error::{EntryKind, Result};
use crate::registry::{ExtensionRegistry, FactoryResolver, InstanceResolver};

use super::{ProviderTool, Tool, ToolDefinition};

/// Optional provider-specific configuration step, applied to the descriptor
/// after the tool builder creates it
pub type ConfigureFn = Arc<dyn Fn(ProviderTool) -> ProviderTool + Send + Sync>;

/// A resolved tool together with its optional configure step
#[derive(Clone)]
pub struct RegisteredTool {
    pub tool: Arc<dyn Tool>,
    pub configure: Option<ConfigureFn>,
}

impl std::fmt::Debug for RegisteredTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredTool")
            .field("tool", &self.tool.name())
            .field("configure", &self.configure.is_some())
            .finish()
    }
}

pub struct ToolRegistry {
    tools: ExtensionRegistry<RegisteredTool>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: ExtensionRegistry::for_kind(EntryKind::Tool),
        }
    }

    /// Register a new tool under its definition name
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        self.register_arc(Arc::new(tool))
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        self.register_entry(RegisteredTool {
            tool,
            configure: None,
        })
    }

    /// Register a tool that customizes its provider descriptor
    pub fn register_configured<T, F>(&mut self, tool: T, configure: F) -> Result<()>
    where
        T: Tool + 'static,
        F: Fn(ProviderTool) -> ProviderTool + Send + Sync + 'static,
    {
        self.register_entry(RegisteredTool {
            tool: Arc::new(tool),
            configure: Some(Arc::new(configure)),
        })
    }

    /// Register a tool built fresh on every resolution
    pub fn register_factory<F>(&mut self, name: impl Into<String>, factory: F) -> Result<()>
    where
        F: Fn() -> Arc<dyn Tool> + Send + Sync + 'static,
    {
        self.tools.register(FactoryResolver::new(name, move || {
            Ok(RegisteredTool {
                tool: factory(),
                configure: None,
            })
        }))
    }

    /// Register, replacing any tool with the same name
    pub fn register_override<T: Tool + 'static>(&mut self, tool: T) {
        let tool: Arc<dyn Tool> = Arc::new(tool);
        let name = tool.name();
        self.tools.register_override(InstanceResolver::new(
            name,
            RegisteredTool {
                tool,
                configure: None,
            },
        ));
    }

    fn register_entry(&mut self, entry: RegisteredTool) -> Result<()> {
        let name = entry.tool.name();
        self.tools.register(InstanceResolver::new(name, entry))
    }

    /// Resolve a tool and its configure step
    pub fn get(&self, name: &str) -> Result<RegisteredTool> {
        self.tools.get(name)
    }

    /// Resolve just the tool
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Tool>> {
        Ok(self.get(name)?.tool)
    }

    pub fn supports(&self, name: &str) -> bool {
        self.tools.supports(name)
    }

    /// Get tool names
    pub fn names(&self) -> Vec<&str> {
        self.tools.registered()
    }

    /// Definitions of every registered tool
    pub fn definitions(&self) -> Result<Vec<ToolDefinition>> {
        self.names()
            .into_iter()
            .map(|name| Ok(self.resolve(name)?.definition()))
            .collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.count()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use crate::tool::{ToolArgs, ToolContext, ToolResult};
    use async_trait::async_trait;

    struct Clock(&'static str);

    #[async_trait]
    impl Tool for Clock {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("clock", self.0)
        }

        async fn handle(&self, _args: ToolArgs, _context: &ToolContext) -> Result<ToolResult> {
            Ok(ToolResult::text("12:00"))
        }
    }

    #[test]
    fn test_tool_registry() {
        let mut registry = ToolRegistry::new();
        registry.register(Clock("first")).unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.supports("clock"));
        assert!(registry.get("unknown").is_err());
        assert_eq!(registry.names(), vec!["clock"]);
    }

    #[test]
    fn test_duplicate_and_override() {
        let mut registry = ToolRegistry::new();
        registry.register(Clock("first")).unwrap();

        let err = registry.register(Clock("second")).unwrap_err();
        assert!(matches!(
            err,
            AgentError::DuplicateRegistration {
                kind: EntryKind::Tool,
                ..
            }
        ));

        registry.register_override(Clock("second"));
        let definitions = registry.definitions().unwrap();
        assert_eq!(definitions[0].description, "second");
    }

    #[test]
    fn test_configured_and_factory_registration() {
        let mut registry = ToolRegistry::new();
        registry
            .register_configured(Clock("configured"), |tool| {
                tool.with_provider_option("cache_control", "ephemeral")
            })
            .unwrap();
        registry
            .register_factory("fresh_clock", || Arc::new(Clock("fresh")))
            .unwrap();

        assert!(registry.get("clock").unwrap().configure.is_some());
        assert!(registry.get("fresh_clock").unwrap().configure.is_none());
        assert_eq!(registry.len(), 2);
    }
}
