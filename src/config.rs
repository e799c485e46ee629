//! Configuration management for MCPConnect
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{McpConnectError, Result};
use crate::model::ProviderCredentials;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for MCPConnect
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Language-model provider settings
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Where state is persisted
    #[serde(default)]
    pub storage: StorageConfig,
    /// Share link settings
    #[serde(default)]
    pub share: ShareConfig,
    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Interactive chat settings
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Provider configuration
///
/// The provider is the Anthropic Messages API. `api_base` may point at a
/// mock server in tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key; a turn without one fails with a configuration error
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL of the provider API
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens in a reply
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Value sent in the `anthropic-version` header
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// HTTP timeout for one provider call
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_api_base() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_model() -> String {
    "claude-sonnet-4-5".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

fn default_timeout() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_api_base(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            api_version: default_api_version(),
            timeout_seconds: default_timeout(),
        }
    }
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// SQLite database file
    #[default]
    Sqlite,
    /// Process memory only
    Memory,
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend to use
    #[serde(default)]
    pub backend: StorageBackend,
    /// Database path; defaults to the user's data directory
    #[serde(default)]
    pub path: Option<String>,
}

/// Share link configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareConfig {
    /// Upper bound on the encoded payload
    #[serde(default = "default_max_encoded_bytes")]
    pub max_encoded_bytes: usize,
    /// URL the encoded payload is appended to
    #[serde(default = "default_share_base_url")]
    pub base_url: String,
}

fn default_max_encoded_bytes() -> usize {
    crate::share::DEFAULT_MAX_ENCODED_BYTES
}

fn default_share_base_url() -> String {
    "https://mcpconnect.app/share".to_string()
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            max_encoded_bytes: default_max_encoded_bytes(),
            base_url: default_share_base_url(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

/// Chat configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Title given to conversations created without one
    #[serde(default = "default_conversation_title")]
    pub default_title: String,
}

fn default_conversation_title() -> String {
    crate::history::DEFAULT_CONVERSATION_TITLE.to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_title: default_conversation_title(),
        }
    }
}

impl Config {
    /// Load configuration from file, environment, and CLI
    ///
    /// Missing files fall back to defaults. Environment variables override
    /// file values and CLI flags override both.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| McpConnectError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| McpConnectError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(key) = std::env::var("MCPCONNECT_API_KEY") {
            self.provider.api_key = Some(key);
        } else if self.provider.api_key.is_none() {
            if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
                self.provider.api_key = Some(key);
            }
        }

        if let Ok(model) = std::env::var("MCPCONNECT_MODEL") {
            self.provider.model = model;
        }

        if let Ok(base) = std::env::var("MCPCONNECT_API_BASE") {
            self.provider.api_base = base;
        }

        if let Ok(temperature) = std::env::var("MCPCONNECT_TEMPERATURE") {
            if let Ok(value) = temperature.parse() {
                self.provider.temperature = value;
            } else {
                tracing::warn!("Invalid MCPCONNECT_TEMPERATURE: {}", temperature);
            }
        }

        if let Ok(max_tokens) = std::env::var("MCPCONNECT_MAX_TOKENS") {
            if let Ok(value) = max_tokens.parse() {
                self.provider.max_tokens = value;
            } else {
                tracing::warn!("Invalid MCPCONNECT_MAX_TOKENS: {}", max_tokens);
            }
        }

        if let Ok(path) = std::env::var("MCPCONNECT_STORAGE_PATH") {
            self.storage.path = Some(path);
        }

        if let Ok(backend) = std::env::var("MCPCONNECT_STORAGE_BACKEND") {
            match backend.to_lowercase().as_str() {
                "sqlite" => self.storage.backend = StorageBackend::Sqlite,
                "memory" => self.storage.backend = StorageBackend::Memory,
                other => tracing::warn!("Invalid MCPCONNECT_STORAGE_BACKEND: {}", other),
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }
        if let Some(model) = &cli.model {
            self.provider.model = model.clone();
        }
        if cli.memory {
            self.storage.backend = StorageBackend::Memory;
        }
    }

    /// Credentials handed to the turn orchestrator
    pub fn credentials(&self) -> ProviderCredentials {
        ProviderCredentials {
            api_key: self.provider.api_key.clone(),
            model: self.provider.model.clone(),
            temperature: self.provider.temperature,
            max_tokens: self.provider.max_tokens,
        }
    }

    /// Validate the configuration
    ///
    /// A missing API key is not a validation failure; it surfaces when a
    /// turn is attempted.
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.provider.model.trim().is_empty() {
            return Err(McpConnectError::Config("provider.model cannot be empty".to_string()).into());
        }

        if url::Url::parse(&self.provider.api_base).is_err() {
            return Err(McpConnectError::Config(format!(
                "provider.api_base is not a valid URL: {}",
                self.provider.api_base
            ))
            .into());
        }

        if !(0.0..=1.0).contains(&self.provider.temperature) {
            return Err(McpConnectError::Config(
                "provider.temperature must be between 0.0 and 1.0".to_string(),
            )
            .into());
        }

        if self.provider.max_tokens == 0 {
            return Err(McpConnectError::Config(
                "provider.max_tokens must be greater than 0".to_string(),
            )
            .into());
        }

        if self.provider.timeout_seconds == 0 {
            return Err(McpConnectError::Config(
                "provider.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.share.max_encoded_bytes == 0 {
            return Err(McpConnectError::Config(
                "share.max_encoded_bytes must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }
}
