//! Extension Registry
//!
//! Generic key → resolver map. Agent and tool registries are thin wrappers
//! around it so they share duplicate/override semantics.

use std::collections::BTreeMap;

use crate::error::{AgentError, EntryKind, Result};

/// A key-addressable factory for pluggable behavior
pub trait ExtensionResolver<T>: Send + Sync {
    /// Registration key
    fn key(&self) -> &str;

    /// Produce the value behind this key
    fn resolve(&self) -> Result<T>;
}

/// Resolver that hands out clones of a cached value
pub struct InstanceResolver<T> {
    key: String,
    value: T,
}

impl<T> InstanceResolver<T> {
    pub fn new(key: impl Into<String>, value: T) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

impl<T: Clone + Send + Sync> ExtensionResolver<T> for InstanceResolver<T> {
    fn key(&self) -> &str {
        &self.key
    }

    fn resolve(&self) -> Result<T> {
        Ok(self.value.clone())
    }
}

/// Resolver that constructs a fresh value on every lookup
pub struct FactoryResolver<T> {
    key: String,
    factory: Box<dyn Fn() -> Result<T> + Send + Sync>,
}

impl<T> FactoryResolver<T> {
    pub fn new<F>(key: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<T> + Send + Sync + 'static,
    {
        Self {
            key: key.into(),
            factory: Box::new(factory),
        }
    }
}

impl<T> ExtensionResolver<T> for FactoryResolver<T> {
    fn key(&self) -> &str {
        &self.key
    }

    fn resolve(&self) -> Result<T> {
        (self.factory)()
    }
}

/// Registry of resolvers keyed by name
pub struct ExtensionRegistry<T> {
    kind: EntryKind,
    resolvers: BTreeMap<String, Box<dyn ExtensionResolver<T>>>,
}

impl<T: 'static> Default for ExtensionRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> ExtensionRegistry<T> {
    pub fn new() -> Self {
        Self::for_kind(EntryKind::Extension)
    }

    /// Registry whose errors name `kind` (agent, tool, ...)
    pub fn for_kind(kind: EntryKind) -> Self {
        Self {
            kind,
            resolvers: BTreeMap::new(),
        }
    }

    /// Register a resolver; fails if its key is taken
    pub fn register<R>(&mut self, resolver: R) -> Result<()>
    where
        R: ExtensionResolver<T> + 'static,
    {
        let key = resolver.key().to_string();
        if self.resolvers.contains_key(&key) {
            return Err(AgentError::duplicate(self.kind, key));
        }
        tracing::debug!(kind = %self.kind, key = %key, "Registered extension");
        self.resolvers.insert(key, Box::new(resolver));
        Ok(())
    }

    /// Register a resolver, replacing any existing entry under the same key
    pub fn register_override<R>(&mut self, resolver: R)
    where
        R: ExtensionResolver<T> + 'static,
    {
        let key = resolver.key().to_string();
        if self.resolvers.insert(key.clone(), Box::new(resolver)).is_some() {
            tracing::debug!(kind = %self.kind, key = %key, "Overrode extension");
        }
    }

    /// Resolve the value registered under `key`
    pub fn get(&self, key: &str) -> Result<T> {
        self.resolvers
            .get(key)
            .ok_or_else(|| AgentError::not_found(self.kind, key))?
            .resolve()
    }

    pub fn supports(&self, key: &str) -> bool {
        self.resolvers.contains_key(key)
    }

    /// Registered keys in sorted order
    pub fn registered(&self) -> Vec<&str> {
        self.resolvers.keys().map(String::as_str).collect()
    }

    pub fn count(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }
}
