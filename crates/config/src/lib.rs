//! Configuration loading, validation, and management for ragsmith.
//!
//! Loads configuration from `~/.ragsmith/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.ragsmith/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Chunking, embedding, and retrieval settings
    #[serde(default)]
    pub indexing: IndexingConfig,

    /// Agent loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// File guard settings
    #[serde(default)]
    pub guard: GuardConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "openrouter".into()
}
fn default_model() -> String {
    "anthropic/claude-sonnet-4".into()
}
fn default_temperature() -> f32 {
    0.5
}
fn default_max_tokens() -> u32 {
    8000
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("indexing", &self.indexing)
            .field("agent", &self.agent)
            .field("guard", &self.guard)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Maximum characters per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Recognized file extensions, without the leading dot
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Directory names skipped while walking the repository
    #[serde(default = "default_ignore_dirs")]
    pub ignore_dirs: Vec<String>,

    /// Declared embedding dimensionality; other lengths are rejected
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Chunks retrieved per turn
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// "default" reuses the completion provider, "stub" is offline and
    /// deterministic, any other value names an entry under `[providers]`
    #[serde(default = "default_embedding_provider")]
    pub embedding_provider: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Texts per embedding request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_chunk_size() -> usize {
    500
}
fn default_extensions() -> Vec<String> {
    vec!["py".into(), "js".into(), "ts".into(), "md".into()]
}
fn default_ignore_dirs() -> Vec<String> {
    vec![".git".into(), "node_modules".into(), "target".into()]
}
fn default_dimension() -> usize {
    1024
}
fn default_top_k() -> usize {
    20
}
fn default_embedding_provider() -> String {
    "default".into()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}
fn default_batch_size() -> usize {
    64
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            extensions: default_extensions(),
            ignore_dirs: default_ignore_dirs(),
            dimension: default_dimension(),
            top_k: default_top_k(),
            embedding_provider: default_embedding_provider(),
            embedding_model: default_embedding_model(),
            batch_size: default_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Recent turns included in each prompt
    #[serde(default = "default_history_turns")]
    pub history_turns: usize,

    /// Turns kept in the log before the oldest is dropped
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

fn default_history_turns() -> usize {
    5
}
fn default_history_capacity() -> usize {
    50
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            history_turns: default_history_turns(),
            history_capacity: default_history_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Lowercase substrings that make a write target off-limits
    #[serde(default = "default_sensitive_patterns")]
    pub sensitive_patterns: Vec<String>,

    /// Record writes and denials in the audit log
    #[serde(default = "default_true")]
    pub audit: bool,
}

/// The built-in deny-list for write targets.
pub fn default_sensitive_patterns() -> Vec<String> {
    [
        ".ssh",
        ".aws",
        ".gnupg",
        ".env",
        ".git/",
        ".netrc",
        ".npmrc",
        ".pypirc",
        "id_rsa",
        "id_ed25519",
        "credentials",
        "secrets",
        "/etc/passwd",
        "/etc/shadow",
        "/etc/sudoers",
        ".htpasswd",
        ".pem",
        ".key",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_true() -> bool {
    true
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            sensitive_patterns: default_sensitive_patterns(),
            audit: true,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.ragsmith/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `RAGSMITH_API_KEY` (highest priority)
    /// - `OPENROUTER_API_KEY`
    /// - `OPENAI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
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

    fn apply_env_overrides(&mut self) {
        if self.api_key.is_none() {
            self.api_key = std::env::var("RAGSMITH_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("RAGSMITH_PROVIDER") {
            self.default_provider = provider;
        }

        if let Ok(model) = std::env::var("RAGSMITH_MODEL") {
            self.default_model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".ragsmith")
    }

    /// Get the configuration file path.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.indexing.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "indexing.chunk_size must be > 0".into(),
            ));
        }

        if self.indexing.dimension == 0 {
            return Err(ConfigError::ValidationError(
                "indexing.dimension must be > 0".into(),
            ));
        }

        if self.indexing.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "indexing.top_k must be > 0".into(),
            ));
        }

        if self.indexing.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "indexing.batch_size must be > 0".into(),
            ));
        }

        let selector = self.indexing.embedding_provider.as_str();
        let known = matches!(selector, "default" | "stub")
            || selector == self.default_provider
            || self.providers.contains_key(selector);
        if !known {
            return Err(ConfigError::ValidationError(format!(
                "indexing.embedding_provider '{selector}' must be 'default', 'stub' or a configured provider"
            )));
        }

        if self.agent.history_turns > self.agent.history_capacity {
            return Err(ConfigError::ValidationError(
                "agent.history_turns must not exceed agent.history_capacity".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            indexing: IndexingConfig::default(),
            agent: AgentConfig::default(),
            guard: GuardConfig::default(),
            providers: HashMap::new(),
        }
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

impl From<ConfigError> for ragsmith_core::Error {
    fn from(e: ConfigError) -> Self {
        ragsmith_core::Error::Config {
            message: e.to_string(),
        }
    }
}
