//! Runtime Configuration
//!
//! Settings the executor and prompt builder read. Loading them from files is
//! left to the host application; `from_env` covers the common case.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What the system prompt builder does with `{placeholders}` that have no
/// matching variable
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderPolicy {
    /// Leave `{name}` in the prompt verbatim
    #[default]
    Keep,
    /// Replace it with an empty string
    Remove,
    /// Fail the build with an invalid-configuration error
    Error,
}

impl FromStr for PlaceholderPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" => Ok(Self::Keep),
            "remove" => Ok(Self::Remove),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown placeholder policy: {}", other)),
        }
    }
}

/// Core runtime configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentryConfig {
    /// Handling of unmatched prompt placeholders
    #[serde(default)]
    pub placeholder_policy: PlaceholderPolicy,

    /// Step budget for agents that do not set `max_steps`
    #[serde(default = "default_max_steps")]
    pub default_max_steps: u32,
}

fn default_max_steps() -> u32 {
    10
}

impl Default for AgentryConfig {
    fn default() -> Self {
        Self {
            placeholder_policy: PlaceholderPolicy::default(),
            default_max_steps: default_max_steps(),
        }
    }
}

impl AgentryConfig {
    /// Read `AGENTRY_PLACEHOLDER_POLICY` and `AGENTRY_DEFAULT_MAX_STEPS`,
    /// falling back to defaults for missing or unparsable values.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let placeholder_policy = lookup("AGENTRY_PLACEHOLDER_POLICY")
            .and_then(|raw| match raw.parse() {
                Ok(policy) => Some(policy),
                Err(e) => {
                    tracing::warn!(error = %e, "Ignoring AGENTRY_PLACEHOLDER_POLICY");
                    None
                }
            })
            .unwrap_or_default();

        let default_max_steps = lookup("AGENTRY_DEFAULT_MAX_STEPS")
            .and_then(|raw| raw.trim().parse().ok())
            .filter(|steps| *steps > 0)
            .unwrap_or_else(default_max_steps);

        Self {
            placeholder_policy,
            default_max_steps,
        }
    }

    pub fn with_placeholder_policy(mut self, policy: PlaceholderPolicy) -> Self {
        self.placeholder_policy = policy;
        self
    }

    pub fn with_default_max_steps(mut self, steps: u32) -> Self {
        self.default_max_steps = steps;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AgentryConfig::default();
        assert_eq!(config.placeholder_policy, PlaceholderPolicy::Keep);
        assert_eq!(config.default_max_steps, 10);
    }

    #[test]
    fn test_from_lookup() {
        let env: HashMap<&str, &str> = [
            ("AGENTRY_PLACEHOLDER_POLICY", "Remove"),
            ("AGENTRY_DEFAULT_MAX_STEPS", "4"),
        ]
        .into_iter()
        .collect();

        let config = AgentryConfig::from_lookup(|k| env.get(k).map(|v| (*v).to_string()));
        assert_eq!(config.placeholder_policy, PlaceholderPolicy::Remove);
        assert_eq!(config.default_max_steps, 4);
    }

    #[test]
    fn test_from_lookup_ignores_garbage() {
        let config = AgentryConfig::from_lookup(|k| match k {
            "AGENTRY_PLACEHOLDER_POLICY" => Some("sometimes".into()),
            "AGENTRY_DEFAULT_MAX_STEPS" => Some("0".into()),
            _ => None,
        });
        assert_eq!(config, AgentryConfig::default());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: AgentryConfig =
            serde_json::from_str(r#"{"placeholder_policy": "error"}"#).unwrap();
        assert_eq!(config.placeholder_policy, PlaceholderPolicy::Error);
        assert_eq!(config.default_max_steps, 10);
    }
}
