//! Loop configuration (layered: code > env > TOML file > defaults).

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::AgentError;
use crate::tools::DEFAULT_TOOL_TIMEOUT;
use crate::util::retry::RetryPolicy;

pub const DEFAULT_MAX_RECURSIONS: usize = 25;

const MAX_RECURSIONS_ENV: &str = "TOOLLOOP_MAX_RECURSIONS";
const SYSTEM_INSTRUCTIONS_ENV: &str = "TOOLLOOP_SYSTEM_INSTRUCTIONS";
const TOOL_TIMEOUT_SECS_ENV: &str = "TOOLLOOP_TOOL_TIMEOUT_SECS";
const RUN_DEADLINE_SECS_ENV: &str = "TOOLLOOP_RUN_DEADLINE_SECS";

/// Configuration consumed by [`AgentLoopController`](crate::agent_loop::AgentLoopController).
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// Model invocations allowed per turn before the loop ends with a
    /// bounded-terminal message.
    pub max_recursions: usize,
    /// Content of the system message prepended to a new thread.
    pub system_instructions: String,
    pub per_tool_timeout: Duration,
    /// Optional overall deadline for one `run`; behaves like cancellation.
    pub run_deadline: Option<Duration>,
    /// Retry policy for checkpoint writes.
    pub checkpoint_retry: RetryPolicy,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_recursions: DEFAULT_MAX_RECURSIONS,
            system_instructions: String::new(),
            per_tool_timeout: DEFAULT_TOOL_TIMEOUT,
            run_deadline: None,
            checkpoint_retry: RetryPolicy::default(),
        }
    }
}

/// On-disk representation; every field optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    max_recursions: Option<usize>,
    system_instructions: Option<String>,
    tool_timeout_secs: Option<f64>,
    run_deadline_secs: Option<f64>,
    checkpoint_retry: Option<RetryPolicy>,
}

impl AgentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_recursions(mut self, max_recursions: usize) -> Self {
        self.max_recursions = max_recursions;
        self
    }

    pub fn with_system_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.system_instructions = instructions.into();
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.per_tool_timeout = timeout;
        self
    }

    pub fn with_run_deadline(mut self, deadline: Duration) -> Self {
        self.run_deadline = Some(deadline);
        self
    }

    pub fn with_checkpoint_retry(mut self, policy: RetryPolicy) -> Self {
        self.checkpoint_retry = policy;
        self
    }

    /// Load from environment variables (`TOOLLOOP_*`), reading `.env` first
    /// if present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::default().overlay_env(|key| std::env::var(key).ok())
    }

    /// Apply environment-style overrides from `lookup`. Unparseable or zero
    /// numeric values are ignored.
    pub fn overlay_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(value) = lookup(MAX_RECURSIONS_ENV).as_deref().and_then(parse_positive_usize) {
            self.max_recursions = value;
        }
        if let Some(value) = lookup(SYSTEM_INSTRUCTIONS_ENV) {
            self.system_instructions = value;
        }
        if let Some(value) = lookup(TOOL_TIMEOUT_SECS_ENV).as_deref().and_then(parse_positive_secs) {
            self.per_tool_timeout = value;
        }
        if let Some(value) = lookup(RUN_DEADLINE_SECS_ENV).as_deref().and_then(parse_positive_secs) {
            self.run_deadline = Some(value);
        }
        self
    }

    /// Parse a TOML document. Absent keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, AgentError> {
        let file: FileConfig = toml::from_str(content)
            .map_err(|e| AgentError::Configuration(format!("invalid config: {e}")))?;
        let mut config = Self::default();

        if let Some(max_recursions) = file.max_recursions {
            if max_recursions == 0 {
                return Err(AgentError::Configuration(
                    "max_recursions must be at least 1".to_string(),
                ));
            }
            config.max_recursions = max_recursions;
        }
        if let Some(instructions) = file.system_instructions {
            config.system_instructions = instructions;
        }
        if let Some(secs) = file.tool_timeout_secs {
            config.per_tool_timeout = secs_to_duration("tool_timeout_secs", secs)?;
        }
        if let Some(secs) = file.run_deadline_secs {
            config.run_deadline = Some(secs_to_duration("run_deadline_secs", secs)?);
        }
        if let Some(policy) = file.checkpoint_retry {
            config.checkpoint_retry = policy;
        }
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AgentError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load a TOML file, then apply `.env` and `TOOLLOOP_*` overrides on top.
    /// `with_*` calls on the result take precedence over both.
    pub fn from_file_with_env(path: impl AsRef<Path>) -> Result<Self, AgentError> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Ok(Self::from_file(path)?.overlay_env(|key| std::env::var(key).ok()))
    }
}

fn secs_to_duration(key: &str, secs: f64) -> Result<Duration, AgentError> {
    if secs.is_finite() && secs > 0.0 {
        Ok(Duration::from_secs_f64(secs))
    } else {
        Err(AgentError::Configuration(format!(
            "{key} must be a positive number of seconds"
        )))
    }
}

fn parse_positive_usize(value: &str) -> Option<usize> {
    let parsed = value.trim().parse::<usize>().ok()?;
    if parsed == 0 {
        None
    } else {
        Some(parsed)
    }
}

fn parse_positive_secs(value: &str) -> Option<Duration> {
    let parsed = value.trim().parse::<f64>().ok()?;
    (parsed.is_finite() && parsed > 0.0).then(|| Duration::from_secs_f64(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = AgentConfig::default();

        assert_eq!(config.max_recursions, 25);
        assert_eq!(config.per_tool_timeout, Duration::from_secs(60));
        assert!(config.run_deadline.is_none());
    }

    #[test]
    fn env_overrides_apply() {
        let config = AgentConfig::default().overlay_env(lookup(&[
            ("TOOLLOOP_MAX_RECURSIONS", "7"),
            ("TOOLLOOP_SYSTEM_INSTRUCTIONS", "be brief"),
            ("TOOLLOOP_TOOL_TIMEOUT_SECS", "2.5"),
            ("TOOLLOOP_RUN_DEADLINE_SECS", "30"),
        ]));

        assert_eq!(config.max_recursions, 7);
        assert_eq!(config.system_instructions, "be brief");
        assert_eq!(config.per_tool_timeout, Duration::from_millis(2500));
        assert_eq!(config.run_deadline, Some(Duration::from_secs(30)));
    }

    #[test]
    fn zero_or_garbage_env_values_are_ignored() {
        let config = AgentConfig::default().overlay_env(lookup(&[
            ("TOOLLOOP_MAX_RECURSIONS", "0"),
            ("TOOLLOOP_TOOL_TIMEOUT_SECS", "soon"),
        ]));

        assert_eq!(config.max_recursions, DEFAULT_MAX_RECURSIONS);
        assert_eq!(config.per_tool_timeout, DEFAULT_TOOL_TIMEOUT);
    }

    #[test]
    fn toml_rejects_zero_recursions() {
        let err = AgentConfig::from_toml_str("max_recursions = 0").unwrap_err();
        assert!(matches!(err, AgentError::Configuration(_)));
    }
}
