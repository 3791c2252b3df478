use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RunchartError};
use crate::types::{normalize_max_steps, DEFAULT_MAX_STEPS};

/// Top-level runchart configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub log: Option<LogConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Maximum number of node transitions per run. Non-positive values mean the default.
    #[serde(default = "default_max_steps")]
    pub max_steps: i64,
    /// Deadline for the whole run in seconds (0 = no deadline).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ExecutionConfig {
    /// Step ceiling after normalisation.
    pub fn step_limit(&self) -> usize {
        normalize_max_steps(self.max_steps)
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

fn default_max_steps() -> i64 { DEFAULT_MAX_STEPS as i64 }
fn default_timeout_secs() -> u64 { 24 * 60 * 60 }

/// How node commands are launched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Shell program used to interpret node commands.
    #[serde(default = "default_shell")]
    pub shell: String,
    /// Arguments placed between the shell program and the command text.
    #[serde(default = "default_shell_args")]
    pub shell_args: Vec<String>,
    /// Inherit stdout/stderr for node commands instead of discarding them.
    #[serde(default)]
    pub show_output: bool,
    /// Working directory for node commands. Default: the current directory.
    #[serde(default)]
    pub working_dir: Option<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            shell_args: default_shell_args(),
            show_output: false,
            working_dir: None,
        }
    }
}

impl RunnerConfig {
    pub fn working_dir(&self) -> Option<PathBuf> {
        self.working_dir.as_deref().map(PathBuf::from)
    }
}

#[cfg(windows)]
fn default_shell() -> String { "cmd".to_string() }
#[cfg(not(windows))]
fn default_shell() -> String { "/bin/sh".to_string() }

#[cfg(windows)]
fn default_shell_args() -> Vec<String> { vec!["/C".to_string()] }
#[cfg(not(windows))]
fn default_shell_args() -> Vec<String> { vec!["-c".to_string()] }

/// Diagnostic logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    /// Tracing filter directive, e.g. `runchart=debug`.
    #[serde(default)]
    pub level: Option<String>,
}

impl AppConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| RunchartError::ConfigNotFound(path.display().to_string()))?;

        // Expand ${ENV_VAR} references
        let expanded = expand_env_vars(&content);

        toml::from_str(&expanded).map_err(|e| RunchartError::Config(e.to_string()))
    }

    /// Load `path` if it exists, otherwise fall back to built-in defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Log filter directive from the `[log]` section, if any.
    pub fn log_level(&self) -> Option<&str> {
        self.log.as_ref().and_then(|l| l.level.as_deref())
    }
}

/// Expand `${ENV_VAR}` patterns in a string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                // Leave unset variables verbatim
                Err(_) => result.push_str(&format!("${{{}}}", var_name)),
            }
        } else {
            result.push(c);
        }
    }
    result
}
