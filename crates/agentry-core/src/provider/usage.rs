//! Token usage and finish-reason normalization
//!
//! Providers report usage in their own shapes. An extractor per provider id
//! folds the raw block into [`TokenUsage`].

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ProviderResponse;

/// Token usage statistics
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,

    #[serde(default)]
    pub cache_read_tokens: u32,

    #[serde(default)]
    pub cache_write_tokens: u32,

    #[serde(default)]
    pub reasoning_tokens: u32,
}

/// Reason for completion finishing
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolUse,
    ContentFilter,
    Error,
    #[default]
    Unknown,
}

impl FinishReason {
    /// Normalize a provider's raw finish reason
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "stop" | "end_turn" | "stop_sequence" => FinishReason::Stop,
            "length" | "max_tokens" => FinishReason::Length,
            "tool_calls" | "tool_use" | "function_call" => FinishReason::ToolUse,
            "content_filter" | "refusal" => FinishReason::ContentFilter,
            "error" => FinishReason::Error,
            _ => FinishReason::Unknown,
        }
    }

    /// Raw name, as `from_raw` reads it back
    pub fn as_str(self) -> &'static str {
        match self {
            FinishReason::Stop => "stop",
            FinishReason::Length => "length",
            FinishReason::ToolUse => "tool_calls",
            FinishReason::ContentFilter => "content_filter",
            FinishReason::Error => "error",
            FinishReason::Unknown => "unknown",
        }
    }
}

/// Reads usage out of a provider response
pub trait UsageExtractor: Send + Sync {
    fn usage(&self, raw: &Value) -> TokenUsage;

    fn finish_reason(&self, response: &ProviderResponse) -> FinishReason {
        FinishReason::from_raw(&response.finish_reason)
    }
}

fn count(raw: &Value, keys: &[&str]) -> u32 {
    keys.iter()
        .find_map(|key| raw.pointer(key).and_then(Value::as_u64))
        .map_or(0, |n| u32::try_from(n).unwrap_or(u32::MAX))
}

fn with_total(mut usage: TokenUsage, raw: &Value) -> TokenUsage {
    usage.total_tokens = match count(raw, &["/total_tokens"]) {
        0 => usage.prompt_tokens.saturating_add(usage.completion_tokens),
        total => total,
    };
    usage
}

/// Accepts both OpenAI and Anthropic top-level key names
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultUsageExtractor;

impl UsageExtractor for DefaultUsageExtractor {
    fn usage(&self, raw: &Value) -> TokenUsage {
        with_total(
            TokenUsage {
                prompt_tokens: count(raw, &["/prompt_tokens", "/input_tokens"]),
                completion_tokens: count(raw, &["/completion_tokens", "/output_tokens"]),
                ..TokenUsage::default()
            },
            raw,
        )
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct AnthropicUsageExtractor;

impl UsageExtractor for AnthropicUsageExtractor {
    fn usage(&self, raw: &Value) -> TokenUsage {
        with_total(
            TokenUsage {
                prompt_tokens: count(raw, &["/input_tokens"]),
                completion_tokens: count(raw, &["/output_tokens"]),
                cache_read_tokens: count(raw, &["/cache_read_input_tokens"]),
                cache_write_tokens: count(raw, &["/cache_creation_input_tokens"]),
                ..TokenUsage::default()
            },
            raw,
        )
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct OpenAiUsageExtractor;

impl UsageExtractor for OpenAiUsageExtractor {
    fn usage(&self, raw: &Value) -> TokenUsage {
        with_total(
            TokenUsage {
                prompt_tokens: count(raw, &["/prompt_tokens"]),
                completion_tokens: count(raw, &["/completion_tokens"]),
                cache_read_tokens: count(raw, &["/prompt_tokens_details/cached_tokens"]),
                reasoning_tokens: count(raw, &["/completion_tokens_details/reasoning_tokens"]),
                ..TokenUsage::default()
            },
            raw,
        )
    }
}

/// Extractors keyed by provider id, with a fallback
#[derive(Clone)]
pub struct UsageExtractors {
    extractors: HashMap<String, Arc<dyn UsageExtractor>>,
    fallback: Arc<dyn UsageExtractor>,
}

impl Default for UsageExtractors {
    fn default() -> Self {
        Self::new()
    }
}

impl UsageExtractors {
    /// Built-in extractors for `anthropic` and `openai`
    pub fn new() -> Self {
        let mut extractors: HashMap<String, Arc<dyn UsageExtractor>> = HashMap::new();
        extractors.insert("anthropic".into(), Arc::new(AnthropicUsageExtractor));
        extractors.insert("openai".into(), Arc::new(OpenAiUsageExtractor));
        Self {
            extractors,
            fallback: Arc::new(DefaultUsageExtractor),
        }
    }

    pub fn register(&mut self, provider: impl Into<String>, extractor: Arc<dyn UsageExtractor>) {
        self.extractors.insert(provider.into(), extractor);
    }

    pub fn for_provider(&self, provider: &str) -> &dyn UsageExtractor {
        self.extractors
            .get(provider)
            .map_or(&*self.fallback, |extractor| &**extractor)
    }

    pub fn extract(&self, provider: &str, response: &ProviderResponse) -> (TokenUsage, FinishReason) {
        let extractor = self.for_provider(provider);
        (extractor.usage(&response.usage), extractor.finish_reason(response))
    }
}

impl std::fmt::Debug for UsageExtractors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut providers: Vec<_> = self.extractors.keys().collect();
        providers.sort();
        f.debug_struct("UsageExtractors")
            .field("providers", &providers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(finish_reason: &str, usage: Value) -> ProviderResponse {
        ProviderResponse {
            finish_reason: finish_reason.into(),
            usage,
            ..ProviderResponse::default()
        }
    }

    #[test]
    fn test_finish_reason_normalization() {
        assert_eq!(FinishReason::from_raw("end_turn"), FinishReason::Stop);
        assert_eq!(FinishReason::from_raw("max_tokens"), FinishReason::Length);
        assert_eq!(FinishReason::from_raw("tool_calls"), FinishReason::ToolUse);
        assert_eq!(FinishReason::from_raw("refusal"), FinishReason::ContentFilter);
        assert_eq!(FinishReason::from_raw(""), FinishReason::Unknown);
    }

    #[test]
    fn test_finish_reason_raw_names_read_back() {
        assert_eq!(FinishReason::ToolUse.as_str(), "tool_calls");
        for reason in [
            FinishReason::Stop,
            FinishReason::Length,
            FinishReason::ToolUse,
            FinishReason::ContentFilter,
            FinishReason::Error,
            FinishReason::Unknown,
        ] {
            assert_eq!(FinishReason::from_raw(reason.as_str()), reason);
        }
    }

    #[test]
    fn test_anthropic_usage() {
        let extractors = UsageExtractors::new();
        let (usage, reason) = extractors.extract(
            "anthropic",
            &response(
                "end_turn",
                json!({
                    "input_tokens": 100,
                    "output_tokens": 20,
                    "cache_read_input_tokens": 80,
                    "cache_creation_input_tokens": 5
                }),
            ),
        );

        assert_eq!(usage.prompt_tokens, 100);
        assert_eq!(usage.completion_tokens, 20);
        assert_eq!(usage.total_tokens, 120);
        assert_eq!(usage.cache_read_tokens, 80);
        assert_eq!(usage.cache_write_tokens, 5);
        assert_eq!(reason, FinishReason::Stop);
    }

    #[test]
    fn test_openai_usage_details() {
        let (usage, _) = UsageExtractors::new().extract(
            "openai",
            &response(
                "stop",
                json!({
                    "prompt_tokens": 10,
                    "completion_tokens": 30,
                    "total_tokens": 40,
                    "prompt_tokens_details": {"cached_tokens": 4},
                    "completion_tokens_details": {"reasoning_tokens": 12}
                }),
            ),
        );
        assert_eq!(usage.total_tokens, 40);
        assert_eq!(usage.cache_read_tokens, 4);
        assert_eq!(usage.reasoning_tokens, 12);
    }

    #[test]
    fn test_unknown_provider_uses_fallback() {
        let (usage, reason) = UsageExtractors::new().extract(
            "mistral",
            &response("length", json!({"input_tokens": 3, "completion_tokens": 4})),
        );
        assert_eq!(usage.prompt_tokens, 3);
        assert_eq!(usage.completion_tokens, 4);
        assert_eq!(usage.total_tokens, 7);
        assert_eq!(reason, FinishReason::Length);

        let (usage, _) = UsageExtractors::new().extract("mistral", &response("", Value::Null));
        assert_eq!(usage, TokenUsage::default());
    }
}
