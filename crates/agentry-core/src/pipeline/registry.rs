//! Pipeline Registry
//!
//! Table of hook definitions. Each hook owns an ordered handler list and an
//! active flag.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AgentError, EntryKind, Result};

use super::hooks;
use super::runner::HookHandler;

/// Factory for handlers constructed per pipeline run
pub type HandlerFactory = Arc<dyn Fn() -> Arc<dyn HookHandler> + Send + Sync>;

/// A registered handler: a live instance or a factory
#[derive(Clone)]
pub enum HandlerSlot {
    Instance(Arc<dyn HookHandler>),
    Lazy(HandlerFactory),
}

impl HandlerSlot {
    /// Instance handlers are shared; lazy ones are built on every call
    pub fn resolve(&self) -> Arc<dyn HookHandler> {
        match self {
            HandlerSlot::Instance(handler) => Arc::clone(handler),
            HandlerSlot::Lazy(factory) => factory(),
        }
    }
}

impl std::fmt::Debug for HandlerSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandlerSlot::Instance(_) => f.write_str("HandlerSlot::Instance"),
            HandlerSlot::Lazy(_) => f.write_str("HandlerSlot::Lazy"),
        }
    }
}

/// A named hook point
#[derive(Clone, Debug)]
pub struct HookDefinition {
    pub name: String,

    pub description: String,

    /// Inactive hooks are skipped by `run_if_active`
    pub active: bool,

    pub handlers: Arc<Vec<HandlerSlot>>,
}

impl HookDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            active: true,
            handlers: Arc::new(Vec::new()),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct PipelineRegistry {
    hooks: HashMap<String, HookDefinition>,
}

impl PipelineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in hook point defined
    pub fn with_default_hooks() -> Self {
        let mut registry = Self::new();
        for (name, description) in hooks::CATALOG {
            registry.define(*name, *description);
        }
        registry
    }

    /// Declare a hook point. Redefining keeps existing handlers.
    pub fn define(&mut self, name: impl Into<String>, description: impl Into<String>) -> &mut Self {
        let name = name.into();
        let description = description.into();
        self.hooks
            .entry(name.clone())
            .and_modify(|hook| hook.description.clone_from(&description))
            .or_insert_with(|| HookDefinition::new(name, description));
        self
    }

    /// Append a handler instance to a hook, defining the hook if needed
    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn HookHandler>) -> &mut Self {
        self.push(name.into(), HandlerSlot::Instance(handler))
    }

    /// Append a handler factory, invoked once per pipeline run
    pub fn register_lazy<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Arc<dyn HookHandler> + Send + Sync + 'static,
    {
        self.push(name.into(), HandlerSlot::Lazy(Arc::new(factory)))
    }

    fn push(&mut self, name: String, slot: HandlerSlot) -> &mut Self {
        let hook = self
            .hooks
            .entry(name.clone())
            .or_insert_with(|| HookDefinition::new(name, ""));
        Arc::make_mut(&mut hook.handlers).push(slot);
        self
    }

    pub fn activate(&mut self, name: &str) -> Result<()> {
        self.set_active(name, true)
    }

    pub fn deactivate(&mut self, name: &str) -> Result<()> {
        self.set_active(name, false)
    }

    fn set_active(&mut self, name: &str, active: bool) -> Result<()> {
        let hook = self
            .hooks
            .get_mut(name)
            .ok_or_else(|| AgentError::not_found(EntryKind::Hook, name))?;
        hook.active = active;
        Ok(())
    }

    /// Unknown hooks count as inactive
    pub fn is_active(&self, name: &str) -> bool {
        self.hooks.get(name).is_some_and(|hook| hook.active)
    }

    pub fn has_handlers(&self, name: &str) -> bool {
        self.handler_count(name) > 0
    }

    pub fn handler_count(&self, name: &str) -> usize {
        self.hooks.get(name).map_or(0, |hook| hook.handlers.len())
    }

    pub fn get(&self, name: &str) -> Option<&HookDefinition> {
        self.hooks.get(name)
    }

    /// All hook definitions sorted by name
    pub fn definitions(&self) -> Vec<&HookDefinition> {
        let mut definitions: Vec<_> = self.hooks.values().collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }
}
