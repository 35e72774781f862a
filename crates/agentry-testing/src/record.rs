//! Call log and assertions

use std::sync::Arc;

use chrono::{DateTime, Utc};

use agentry_core::agent::{AgentDefinition, AgentRef, AgentResponse};
use agentry_core::error::{AgentError, Result};
use agentry_core::provider::StructuredSchema;
use agentry_core::ExecutionContext;

use crate::fake::{lock, FakeAgentRunner};

/// One call the fake runner received
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub agent_key: String,
    /// Set when the caller passed a definition rather than a key
    pub agent: Option<Arc<AgentDefinition>>,
    pub input: String,
    pub context: ExecutionContext,
    pub schema: Option<StructuredSchema>,
    pub streamed: bool,
    pub response: Option<AgentResponse>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl RecordedRequest {
    pub(crate) fn new(
        agent: &AgentRef,
        input: &str,
        context: &ExecutionContext,
        schema: Option<StructuredSchema>,
        streamed: bool,
    ) -> Self {
        let definition = match agent {
            AgentRef::Instance(definition) => Some(Arc::clone(definition)),
            AgentRef::Named(_) => None,
        };

        Self {
            agent_key: agent.key().to_string(),
            agent: definition,
            input: input.to_string(),
            context: context.clone(),
            schema,
            streamed,
            response: None,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub(crate) fn finish(mut self, outcome: &Result<AgentResponse>) -> Self {
        match outcome {
            Ok(response) => self.response = Some(response.clone()),
            Err(e) => self.error = Some(e.to_string()),
        }
        self
    }

    pub(crate) fn finish_stream(mut self, error: Option<&AgentError>) -> Self {
        self.error = error.map(ToString::to_string);
        self
    }
}

impl FakeAgentRunner {
    /// Snapshot of every call, oldest first
    pub fn recorded(&self) -> Vec<RecordedRequest> {
        lock(&self.log).clone()
    }

    pub fn recorded_for(&self, key: &str) -> Vec<RecordedRequest> {
        lock(&self.log)
            .iter()
            .filter(|record| record.agent_key == key)
            .cloned()
            .collect()
    }

    /// Forget recorded calls; configured responses stay
    pub fn reset(&self) {
        lock(&self.log).clear();
    }

    #[track_caller]
    pub fn assert_called(&self) {
        assert!(!lock(&self.log).is_empty(), "Expected at least one agent call, got none");
    }

    #[track_caller]
    pub fn assert_agent_called(&self, key: &str) {
        assert!(
            !self.recorded_for(key).is_empty(),
            "Expected agent '{key}' to be called; called: {:?}",
            self.called_keys()
        );
    }

    #[track_caller]
    pub fn assert_called_times(&self, times: usize) {
        let actual = lock(&self.log).len();
        assert_eq!(actual, times, "Expected {times} agent call(s), got {actual}");
    }

    #[track_caller]
    pub fn assert_agent_called_times(&self, key: &str, times: usize) {
        let actual = self.recorded_for(key).len();
        assert_eq!(actual, times, "Expected agent '{key}' to be called {times} time(s), got {actual}");
    }

    #[track_caller]
    pub fn assert_not_called(&self) {
        assert!(
            lock(&self.log).is_empty(),
            "Expected no agent calls; called: {:?}",
            self.called_keys()
        );
    }

    #[track_caller]
    pub fn assert_agent_not_called(&self, key: &str) {
        let actual = self.recorded_for(key).len();
        assert_eq!(actual, 0, "Expected agent '{key}' not to be called, got {actual} call(s)");
    }

    /// Some recorded call satisfies `predicate`
    #[track_caller]
    pub fn assert_sent<F>(&self, predicate: F)
    where
        F: Fn(&RecordedRequest) -> bool,
    {
        assert!(
            lock(&self.log).iter().any(predicate),
            "No recorded agent call matched the predicate"
        );
    }

    #[track_caller]
    pub fn assert_sent_with_metadata(&self, key: &str) {
        assert!(
            lock(&self.log).iter().any(|record| record.context.has_metadata(key)),
            "No recorded agent call carried metadata '{key}'"
        );
    }

    #[track_caller]
    pub fn assert_sent_with_schema(&self) {
        assert!(
            lock(&self.log).iter().any(|record| record.schema.is_some()),
            "No recorded agent call requested structured output"
        );
    }

    fn called_keys(&self) -> Vec<String> {
        lock(&self.log).iter().map(|record| record.agent_key.clone()).collect()
    }
}
