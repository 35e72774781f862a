//! Tool call context: metadata plus an optional back-reference to the agent
//! that triggered the call.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::agent::AgentDefinition;

#[derive(Clone, Debug, Default)]
pub struct ToolContext {
    metadata: HashMap<String, Value>,
    agent: Option<Arc<AgentDefinition>>,
}

impl ToolContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context bound to the invoking agent
    pub fn for_agent(agent: Arc<AgentDefinition>) -> Self {
        Self {
            metadata: HashMap::new(),
            agent: Some(agent),
        }
    }

    pub fn with_metadata(&self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut next = self.clone();
        next.metadata.insert(key.into(), value.into());
        next
    }

    pub fn merge_metadata(&self, metadata: HashMap<String, Value>) -> Self {
        let mut next = self.clone();
        next.metadata.extend(metadata);
        next
    }

    pub fn with_agent(&self, agent: Arc<AgentDefinition>) -> Self {
        let mut next = self.clone();
        next.agent = Some(agent);
        next
    }

    pub fn metadata(&self) -> &HashMap<String, Value> {
        &self.metadata
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.metadata.contains_key(key)
    }

    pub fn agent(&self) -> Option<&Arc<AgentDefinition>> {
        self.agent.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_with_metadata_returns_new_instance() {
        let original = ToolContext::new().with_metadata("request_id", "r-1");
        let updated = original.with_metadata("user", "ada");

        assert!(!original.has("user"));
        assert_eq!(original.metadata().len(), 1);
        assert_eq!(updated.get("user"), Some(&json!("ada")));
        assert_eq!(updated.get("request_id"), Some(&json!("r-1")));
    }

    #[test]
    fn test_merge_metadata_returns_new_instance() {
        let original = ToolContext::new().with_metadata("a", 1);
        let merged = original.merge_metadata(HashMap::from([("a".to_string(), json!(2))]));

        assert_eq!(original.get("a"), Some(&json!(1)));
        assert_eq!(merged.get("a"), Some(&json!(2)));
    }

    #[test]
    fn test_agent_back_reference() {
        let agent = Arc::new(
            AgentDefinition::builder("helper")
                .provider("openai")
                .model("gpt-4o")
                .build()
                .unwrap(),
        );
        let ctx = ToolContext::new().with_agent(Arc::clone(&agent));
        assert!(Arc::ptr_eq(ctx.agent().unwrap(), &agent));
        assert!(ToolContext::new().agent().is_none());
    }
}
