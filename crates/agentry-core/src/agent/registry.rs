//! Agent registry and resolution

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AgentError, EntryKind, Result};
use crate::registry::{ExtensionRegistry, FactoryResolver, InstanceResolver};

use super::AgentDefinition;

/// Builds an agent definition on demand
pub type AgentFactory = Arc<dyn Fn() -> Result<AgentDefinition> + Send + Sync>;

pub struct AgentRegistry {
    agents: ExtensionRegistry<Arc<AgentDefinition>>,
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: ExtensionRegistry::for_kind(EntryKind::Agent),
        }
    }

    /// Register a definition under its key. Every `get` returns the same instance.
    pub fn register(&mut self, agent: AgentDefinition) -> Result<()> {
        self.register_arc(Arc::new(agent))
    }

    pub fn register_arc(&mut self, agent: Arc<AgentDefinition>) -> Result<()> {
        let key = agent.key().to_string();
        self.agents.register(InstanceResolver::new(key, agent))
    }

    /// Register, replacing any agent with the same key
    pub fn register_override(&mut self, agent: AgentDefinition) {
        let key = agent.key().to_string();
        self.agents.register_override(InstanceResolver::new(key, Arc::new(agent)));
    }

    /// Register a factory; every `get` builds a fresh definition
    pub fn register_factory<F>(&mut self, key: impl Into<String>, factory: F) -> Result<()>
    where
        F: Fn() -> Result<AgentDefinition> + Send + Sync + 'static,
    {
        self.agents
            .register(FactoryResolver::new(key, move || factory().map(Arc::new)))
    }

    pub fn get(&self, key: &str) -> Result<Arc<AgentDefinition>> {
        self.agents.get(key)
    }

    pub fn supports(&self, key: &str) -> bool {
        self.agents.supports(key)
    }

    /// Registered keys, sorted
    pub fn keys(&self) -> Vec<&str> {
        self.agents.registered()
    }

    pub fn count(&self) -> usize {
        self.agents.count()
    }
}

/// How a caller names the agent to run
#[derive(Clone, Debug)]
pub enum AgentRef {
    /// A ready definition, used as-is
    Instance(Arc<AgentDefinition>),
    /// A registry key or a registered type identifier
    Named(String),
}

impl AgentRef {
    /// Key used for logging and fake-runner matching
    pub fn key(&self) -> &str {
        match self {
            AgentRef::Instance(agent) => agent.key(),
            AgentRef::Named(key) => key,
        }
    }
}

impl From<&str> for AgentRef {
    fn from(key: &str) -> Self {
        AgentRef::Named(key.to_string())
    }
}

impl From<String> for AgentRef {
    fn from(key: String) -> Self {
        AgentRef::Named(key)
    }
}

impl From<Arc<AgentDefinition>> for AgentRef {
    fn from(agent: Arc<AgentDefinition>) -> Self {
        AgentRef::Instance(agent)
    }
}

impl From<AgentDefinition> for AgentRef {
    fn from(agent: AgentDefinition) -> Self {
        AgentRef::Instance(Arc::new(agent))
    }
}

/// Resolves an [`AgentRef`] into a definition.
///
/// Precedence: explicit instance, registered key, registered type identifier.
#[derive(Clone)]
pub struct AgentResolver {
    registry: Arc<AgentRegistry>,
    types: HashMap<String, AgentFactory>,
}

impl AgentResolver {
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        Self {
            registry,
            types: HashMap::new(),
        }
    }

    /// Make `type_id` constructible even though it is not a registered key
    pub fn register_type<F>(&mut self, type_id: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<AgentDefinition> + Send + Sync + 'static,
    {
        self.types.insert(type_id.into(), Arc::new(factory));
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn resolve(&self, agent: impl Into<AgentRef>) -> Result<Arc<AgentDefinition>> {
        match agent.into() {
            AgentRef::Instance(agent) => Ok(agent),
            AgentRef::Named(key) if self.registry.supports(&key) => self.registry.get(&key),
            AgentRef::Named(key) => match self.types.get(&key) {
                Some(factory) => factory().map(Arc::new),
                None => Err(AgentError::not_found(EntryKind::Agent, key)),
            },
        }
    }
}

impl std::fmt::Debug for AgentResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<_> = self.types.keys().collect();
        types.sort();
        f.debug_struct("AgentResolver")
            .field("agents", &self.registry.keys())
            .field("types", &types)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(key: &str, model: &str) -> AgentDefinition {
        AgentDefinition::builder(key)
            .provider("openai")
            .model(model)
            .build()
            .unwrap()
    }

    #[test]
    fn test_duplicate_then_override() {
        let mut registry = AgentRegistry::new();
        registry.register(definition("writer", "gpt-4o")).unwrap();

        let err = registry.register(definition("writer", "gpt-4o-mini")).unwrap_err();
        assert_eq!(err.to_string(), "Agent 'writer' is already registered");

        registry.register_override(definition("writer", "gpt-4o-mini"));
        assert_eq!(registry.get("writer").unwrap().model(), "gpt-4o-mini");
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_instance_vs_factory_identity() {
        let mut registry = AgentRegistry::new();
        registry.register(definition("cached", "gpt-4o")).unwrap();
        registry
            .register_factory("fresh", || Ok(definition("fresh", "gpt-4o")))
            .unwrap();

        assert!(Arc::ptr_eq(&registry.get("cached").unwrap(), &registry.get("cached").unwrap()));
        assert!(!Arc::ptr_eq(&registry.get("fresh").unwrap(), &registry.get("fresh").unwrap()));
        assert_eq!(registry.keys(), vec!["cached", "fresh"]);
    }

    #[test]
    fn test_resolve_instance_preserves_identity() {
        let resolver = AgentResolver::new(Arc::new(AgentRegistry::new()));
        let agent = Arc::new(definition("adhoc", "gpt-4o"));

        let resolved = resolver.resolve(Arc::clone(&agent)).unwrap();
        assert!(Arc::ptr_eq(&resolved, &agent));
    }

    #[test]
    fn test_resolve_precedence() {
        let mut registry = AgentRegistry::new();
        registry.register(definition("triage", "registered")).unwrap();

        let mut resolver = AgentResolver::new(Arc::new(registry));
        resolver.register_type("triage", || Ok(definition("triage", "constructed")));
        resolver.register_type("summarizer", || Ok(definition("summarizer", "constructed")));

        assert_eq!(resolver.resolve("triage").unwrap().model(), "registered");
        assert_eq!(resolver.resolve("summarizer").unwrap().model(), "constructed");

        let err = resolver.resolve("ghost").unwrap_err();
        assert!(matches!(
            err,
            AgentError::NotFound {
                kind: EntryKind::Agent,
                ref key
            } if key == "ghost"
        ));
    }
}
