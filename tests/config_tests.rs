//! Tests for configuration loading.

use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use pretty_assertions::assert_eq;

use toolloop::config::AgentConfig;
use toolloop::error::AgentError;
use toolloop::util::retry::RetryPolicy;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const CONFIG_ENV_VARS: [&str; 4] = [
    "TOOLLOOP_MAX_RECURSIONS",
    "TOOLLOOP_SYSTEM_INSTRUCTIONS",
    "TOOLLOOP_TOOL_TIMEOUT_SECS",
    "TOOLLOOP_RUN_DEADLINE_SECS",
];

struct EnvGuard {
    saved: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    fn capture(keys: &[&str]) -> Self {
        let saved = keys
            .iter()
            .map(|key| ((*key).to_string(), std::env::var(key).ok()))
            .collect();
        Self { saved }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.saved {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
    }
}

fn env_lock_guard() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[test]
fn from_env_reads_toolloop_variables() {
    let _lock = env_lock_guard();
    let _guard = EnvGuard::capture(&CONFIG_ENV_VARS);
    for key in CONFIG_ENV_VARS {
        std::env::remove_var(key);
    }
    std::env::set_var("TOOLLOOP_MAX_RECURSIONS", "4");
    std::env::set_var("TOOLLOOP_SYSTEM_INSTRUCTIONS", "You answer in haiku.");

    let config = AgentConfig::from_env();

    assert_eq!(config.max_recursions, 4);
    assert_eq!(config.system_instructions, "You answer in haiku.");
    assert_eq!(config.per_tool_timeout, Duration::from_secs(60));
    assert_eq!(config.run_deadline, None);
}

#[test]
fn from_file_reads_all_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("toolloop.toml");
    std::fs::write(
        &path,
        r#"
max_recursions = 8
system_instructions = "Use tools when unsure."
tool_timeout_secs = 1.5
run_deadline_secs = 120

[checkpoint_retry]
max_attempts = 5
initial_backoff = 10
max_backoff = 1000
multiplier = 3.0
"#,
    )
    .unwrap();

    let config = AgentConfig::from_file(&path).unwrap();

    assert_eq!(
        config,
        AgentConfig::default()
            .with_max_recursions(8)
            .with_system_instructions("Use tools when unsure.")
            .with_tool_timeout(Duration::from_millis(1500))
            .with_run_deadline(Duration::from_secs(120))
            .with_checkpoint_retry(RetryPolicy {
                max_attempts: 5,
                initial_backoff: Duration::from_millis(10),
                max_backoff: Duration::from_secs(1),
                multiplier: 3.0,
            })
    );
}

#[test]
fn partial_file_keeps_defaults() {
    let config = AgentConfig::from_toml_str("max_recursions = 3\n[checkpoint_retry]\nmax_attempts = 1\n")
        .unwrap();

    assert_eq!(config.max_recursions, 3);
    assert_eq!(config.system_instructions, "");
    assert_eq!(config.checkpoint_retry, RetryPolicy::none());
}

#[test]
fn unknown_keys_are_rejected() {
    let err = AgentConfig::from_toml_str("max_recursion = 3").unwrap_err();

    assert!(matches!(err, AgentError::Configuration(_)));
}

#[test]
fn non_positive_timeouts_are_rejected() {
    let err = AgentConfig::from_toml_str("tool_timeout_secs = 0").unwrap_err();

    assert!(err.to_string().contains("tool_timeout_secs"));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();

    let err = AgentConfig::from_file(dir.path().join("absent.toml")).unwrap_err();

    assert!(matches!(err, AgentError::Io(_)));
}

#[test]
fn env_overrides_file_values() {
    let _lock = env_lock_guard();
    let _guard = EnvGuard::capture(&CONFIG_ENV_VARS);
    for key in CONFIG_ENV_VARS {
        std::env::remove_var(key);
    }
    std::env::set_var("TOOLLOOP_MAX_RECURSIONS", "9");
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("toolloop.toml");
    std::fs::write(&path, "max_recursions = 2\nsystem_instructions = \"from file\"\n").unwrap();

    let config = AgentConfig::from_file_with_env(&path)
        .unwrap()
        .with_tool_timeout(Duration::from_secs(5));

    assert_eq!(config.max_recursions, 9);
    assert_eq!(config.system_instructions, "from file");
    assert_eq!(config.per_tool_timeout, Duration::from_secs(5));
}
