//! Configuration loading, validation, and management for Steward.
//!
//! Loads configuration from `~/.steward/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// The root configuration structure.
///
/// Maps directly to `~/.steward/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// LLM endpoint
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Orchestration limits
    #[serde(default)]
    pub agent: AgentConfig,

    /// Conversation memory budgets
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Editor host queries
    #[serde(default)]
    pub host: HostConfig,

    /// Built-in tools
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Show timings in the `debug` array of replies
    #[serde(default = "default_true")]
    pub debug_metrics: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL (`http://host/v1`) or full chat-completions endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    /// HTTP request timeout
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    "http://localhost:11434/v1".into()
}

fn default_model() -> String {
    "qwen3:8b".into()
}

fn default_provider_timeout() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: None,
            model: default_model(),
            timeout_secs: default_provider_timeout(),
        }
    }
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum plan steps executed
    #[serde(default = "default_chain_limit")]
    pub chain_limit: usize,

    /// Maximum tool-resolution rounds per reply
    #[serde(default = "default_tool_iterations")]
    pub tool_iterations: usize,

    /// Retries per plan step after the first attempt
    #[serde(default = "default_step_retries")]
    pub agent_step_retries: usize,

    /// User/assistant exchanges included in each prompt
    #[serde(default = "default_recent_turns")]
    pub recent_turns: usize,
}

fn default_chain_limit() -> usize {
    25
}

fn default_tool_iterations() -> usize {
    3
}

fn default_step_retries() -> usize {
    2
}

fn default_recent_turns() -> usize {
    3
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            chain_limit: default_chain_limit(),
            tool_iterations: default_tool_iterations(),
            agent_step_retries: default_step_retries(),
            recent_turns: default_recent_turns(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Soft token cap of the active window (0 disables eviction)
    #[serde(default = "default_token_window")]
    pub token_window: usize,

    #[serde(default = "default_summary_budget")]
    pub summary_token_budget: usize,

    #[serde(default = "default_long_term_entries")]
    pub max_long_term_entries: usize,
}

fn default_token_window() -> usize {
    1200
}

fn default_summary_budget() -> usize {
    400
}

fn default_long_term_entries() -> usize {
    50
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            token_window: default_token_window(),
            summary_token_budget: default_summary_budget(),
            max_long_term_entries: default_long_term_entries(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    /// How long an editor query waits before failing closed
    #[serde(default = "default_query_timeout")]
    pub query_timeout_secs: u64,
}

fn default_query_timeout() -> u64 {
    10
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            query_timeout_secs: default_query_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_shell_timeout")]
    pub shell_timeout_secs: u64,

    /// Reject file paths outside the working directory
    #[serde(default = "default_true")]
    pub sandbox_to_workspace: bool,
}

fn default_shell_timeout() -> u64 {
    10
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            shell_timeout_secs: default_shell_timeout(),
            sandbox_to_workspace: true,
        }
    }
}

/// `1`, `true`, `yes`, `on` (any case) are true; anything else is false.
pub fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

impl AppConfig {
    /// Load configuration from the default path (~/.steward/config.toml),
    /// then apply environment overrides:
    /// - `OPENAI_API_URL`, `OPENAI_MODEL`
    /// - `STEWARD_API_KEY` (highest priority), `OPENAI_API_KEY`
    /// - `LLM_CHAIN_LIMIT` (or `CHAIN_LIMIT`), `LLM_TOOL_ITERATIONS`,
    ///   `LLM_AGENT_STEP_RETRIES`
    /// - `LLM_DEBUG_METRICS`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("OPENAI_API_URL") {
            self.provider.api_url = url;
        }
        if let Some(model) = lookup("OPENAI_MODEL") {
            self.provider.model = model;
        }
        if let Some(key) = lookup("STEWARD_API_KEY").or_else(|| lookup("OPENAI_API_KEY")) {
            self.provider.api_key = Some(key);
        }

        let chain = lookup("LLM_CHAIN_LIMIT")
            .map(|v| ("LLM_CHAIN_LIMIT", v))
            .or_else(|| lookup("CHAIN_LIMIT").map(|v| ("CHAIN_LIMIT", v)));
        if let Some((key, raw)) = chain {
            override_usize(&mut self.agent.chain_limit, key, &raw);
        }
        if let Some(raw) = lookup("LLM_TOOL_ITERATIONS") {
            override_usize(&mut self.agent.tool_iterations, "LLM_TOOL_ITERATIONS", &raw);
        }
        if let Some(raw) = lookup("LLM_AGENT_STEP_RETRIES") {
            override_usize(&mut self.agent.agent_step_retries, "LLM_AGENT_STEP_RETRIES", &raw);
        }

        if let Some(raw) = lookup("LLM_DEBUG_METRICS") {
            self.debug_metrics = parse_bool(&raw);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".steward")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.chain_limit == 0 {
            return Err(ConfigError::ValidationError("chain_limit must be at least 1".into()));
        }

        if self.agent.tool_iterations == 0 {
            return Err(ConfigError::ValidationError("tool_iterations must be at least 1".into()));
        }

        if self.memory.token_window > 0 && self.memory.summary_token_budget > self.memory.token_window {
            return Err(ConfigError::ValidationError(
                "summary_token_budget must not exceed token_window".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.provider.api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            agent: AgentConfig::default(),
            memory: MemoryConfig::default(),
            host: HostConfig::default(),
            tools: ToolsConfig::default(),
            debug_metrics: true,
        }
    }
}

fn override_usize(target: &mut usize, key: &str, raw: &str) {
    match raw.trim().parse::<usize>() {
        Ok(value) => *target = value,
        Err(e) => warn!(key, value = raw, error = %e, "Ignoring non-numeric environment override"),
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for steward_core::Error {
    fn from(err: ConfigError) -> Self {
        steward_core::Error::Config {
            message: err.to_string(),
        }
    }
}
