//! Error Types
//!
//! `AgentError` is what callers of the executor see. `ProviderError` is what the
//! external provider collaborator raises; [`classify`] folds it into the
//! provider-failure family of `AgentError`, keeping retry metadata.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Result type alias for provider collaborators
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Which registry an entry belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Agent,
    Tool,
    Hook,
    Extension,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Agent => write!(f, "Agent"),
            EntryKind::Tool => write!(f, "Tool"),
            EntryKind::Hook => write!(f, "Hook"),
            EntryKind::Extension => write!(f, "Extension"),
        }
    }
}

/// Rate limit snapshot reported alongside a 429
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    /// Limit family, e.g. `requests` or `tokens`
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u64>,

    /// Reset marker as reported by the provider (duration or timestamp)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resets_at: Option<String>,
}

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// Agent, tool, hook or extension key is not registered
    #[error("{kind} '{key}' is not registered")]
    NotFound { kind: EntryKind, key: String },

    /// Key registered twice without override
    #[error("{kind} '{key}' is already registered")]
    DuplicateRegistration { kind: EntryKind, key: String },

    /// Missing or invalid configuration field
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Tool failure. Contained by the tool executor and turned into a result.
    #[error("{0}")]
    ToolExecution(String),

    /// Provider rejected the request for rate limiting
    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<u64>,
        limits: Vec<RateLimit>,
    },

    /// Provider is overloaded or temporarily unavailable
    #[error("Provider overloaded: {0}")]
    Overloaded(String),

    /// Request exceeded provider size limits
    #[error("Request too large: {0}")]
    RequestTooLarge(String),

    /// Structured output did not match the declared schema
    #[error("Structured output could not be decoded: {0}")]
    StructuredDecoding(String),

    /// Any other provider failure
    #[error("Provider error: {0}")]
    Provider(String),

    /// Fake runner in strict mode received an unconfigured agent key
    #[error("Unexpected execution of agent '{0}'")]
    UnexpectedExecution(String),

    /// A hook handler returned a payload of the wrong kind
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    pub fn not_found(kind: EntryKind, key: impl Into<String>) -> Self {
        AgentError::NotFound { kind, key: key.into() }
    }

    pub fn duplicate(kind: EntryKind, key: impl Into<String>) -> Self {
        AgentError::DuplicateRegistration { kind, key: key.into() }
    }

    /// Stable machine-readable category
    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::NotFound { .. } => "not_found",
            AgentError::DuplicateRegistration { .. } => "duplicate_registration",
            AgentError::InvalidConfiguration(_) => "invalid_configuration",
            AgentError::ToolExecution(_) => "tool_execution",
            AgentError::RateLimited { .. } => "rate_limited",
            AgentError::Overloaded(_) => "overloaded",
            AgentError::RequestTooLarge(_) => "request_too_large",
            AgentError::StructuredDecoding(_) => "structured_decoding",
            AgentError::Provider(_) => "provider",
            AgentError::UnexpectedExecution(_) => "unexpected_execution",
            AgentError::Pipeline(_) => "pipeline",
            AgentError::Json(_) => "json",
            AgentError::Other(_) => "other",
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AgentError::RateLimited { .. } | AgentError::Overloaded(_)
        )
    }

    /// Seconds the provider asked us to wait, if any
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            AgentError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Rate limit snapshot captured from the provider response
    pub fn rate_limits(&self) -> &[RateLimit] {
        match self {
            AgentError::RateLimited { limits, .. } => limits,
            _ => &[],
        }
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            AgentError::NotFound { kind, key } => format!("{} '{}' is not available.", kind, key),
            AgentError::RateLimited { retry_after: Some(secs), .. } => {
                format!("Too many requests. Please retry in {} seconds.", secs)
            }
            AgentError::RateLimited { .. } => "Too many requests. Please wait a moment.".into(),
            AgentError::Overloaded(_) => "The AI service is currently overloaded. Please try again.".into(),
            AgentError::RequestTooLarge(_) => "The request is too large. Please shorten the input.".into(),
            AgentError::StructuredDecoding(_) => "The AI response did not match the expected format.".into(),
            AgentError::Provider(msg) => format!("The AI service encountered an error: {}", msg),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        AgentError::Other(err.to_string())
    }
}

impl From<ProviderError> for AgentError {
    fn from(err: ProviderError) -> Self {
        classify(err)
    }
}

/// Errors raised by the provider-request collaborator
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Raw HTTP failure; status and headers drive classification
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        headers: HashMap<String, String>,
    },

    #[error("rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<u64>,
        limits: Vec<RateLimit>,
    },

    #[error("provider overloaded: {0}")]
    Overloaded(String),

    #[error("request too large: {0}")]
    RequestTooLarge(String),

    #[error("structured decoding failed: {0}")]
    StructuredDecoding(String),

    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

/// Reclassify a provider failure into the agent error taxonomy
pub fn classify(err: ProviderError) -> AgentError {
    match err {
        ProviderError::RateLimited {
            message,
            retry_after,
            limits,
        } => AgentError::RateLimited {
            message,
            retry_after,
            limits,
        },
        ProviderError::Overloaded(msg) => AgentError::Overloaded(msg),
        ProviderError::RequestTooLarge(msg) => AgentError::RequestTooLarge(msg),
        ProviderError::StructuredDecoding(msg) => AgentError::StructuredDecoding(msg),
        ProviderError::Http {
            status,
            message,
            headers,
        } => {
            let headers: HashMap<String, String> = headers
                .into_iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v))
                .collect();
            match status {
                429 => AgentError::RateLimited {
                    message,
                    retry_after: parse_retry_after(&headers),
                    limits: parse_rate_limits(&headers),
                },
                413 => AgentError::RequestTooLarge(message),
                503 | 529 => AgentError::Overloaded(message),
                _ => AgentError::Provider(format!("HTTP {}: {}", status, message)),
            }
        }
        ProviderError::Transport(err) => AgentError::Provider(err.to_string()),
    }
}

fn parse_retry_after(headers: &HashMap<String, String>) -> Option<u64> {
    let raw = headers.get("retry-after")?.trim();
    raw.parse::<u64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(|secs| secs.ceil() as u64)
    })
}

fn parse_rate_limits(headers: &HashMap<String, String>) -> Vec<RateLimit> {
    ["requests", "tokens", "input-tokens", "output-tokens"]
        .iter()
        .filter_map(|name| {
            // OpenAI style first, then Anthropic style
            let lookup = |openai: String, anthropic: String| {
                headers.get(&openai).or_else(|| headers.get(&anthropic)).cloned()
            };
            let limit = lookup(
                format!("x-ratelimit-limit-{}", name),
                format!("anthropic-ratelimit-{}-limit", name),
            );
            let remaining = lookup(
                format!("x-ratelimit-remaining-{}", name),
                format!("anthropic-ratelimit-{}-remaining", name),
            );
            let resets_at = lookup(
                format!("x-ratelimit-reset-{}", name),
                format!("anthropic-ratelimit-{}-reset", name),
            );
            if limit.is_none() && remaining.is_none() && resets_at.is_none() {
                return None;
            }
            Some(RateLimit {
                name: (*name).to_string(),
                limit: limit.and_then(|v| v.trim().parse().ok()),
                remaining: remaining.and_then(|v| v.trim().parse().ok()),
                resets_at,
            })
        })
        .collect()
}
