//! Configuration loading, validation, and management for shopassist.
//!
//! Loads configuration from `~/.shopassist/config.toml` with environment
//! variable overrides. Validates all settings at startup, except the model
//! provider key, which is resolved per turn so an unknown value rejects the
//! turn instead of the whole process.

use serde::{Deserialize, Serialize};
use shopassist_core::Error;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// The root configuration structure.
///
/// Maps directly to `~/.shopassist/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Which model backend answers ("anthropic" or "openai"); unset means anthropic
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_provider: Option<String>,

    /// Retailer the assistant speaks for
    #[serde(default = "default_retailer_name")]
    pub retailer_name: String,

    /// Sampling temperature
    #[serde(default)]
    pub temperature: f32,

    /// Max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Safety limit on model ↔ tool cycles within one turn
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: u32,

    /// Provider-specific configurations, keyed by provider name
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Product search backend
    #[serde(default)]
    pub search: SearchConfig,
}

fn default_retailer_name() -> String {
    "Elkjøp".into()
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_max_tool_iterations() -> u32 {
    25
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("model_provider", &self.model_provider)
            .field("retailer_name", &self.retailer_name)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_tool_iterations", &self.max_tool_iterations)
            .field("providers", &self.providers)
            .field("search", &self.search)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .finish()
    }
}

/// Settings for the hybrid (keyword + vector) product index.
///
/// With no `endpoint` the built-in demo catalog is searched instead.
#[derive(Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default = "default_index")]
    pub index: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Index field holding product embeddings
    #[serde(default = "default_vector_field")]
    pub vector_field: String,

    /// Nearest neighbours requested from the vector query
    #[serde(default = "default_k")]
    pub k: u32,

    /// Embedding model for vector queries; empty disables the vector part
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

fn default_index() -> String {
    "elkjop-demo".into()
}
fn default_api_version() -> String {
    "2023-11-01".into()
}
fn default_vector_field() -> String {
    "contentVector".into()
}
fn default_k() -> u32 {
    5
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            index: default_index(),
            api_key: None,
            api_version: default_api_version(),
            vector_field: default_vector_field(),
            k: default_k(),
            embedding_model: default_embedding_model(),
        }
    }
}

impl fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchConfig")
            .field("endpoint", &self.endpoint)
            .field("index", &self.index)
            .field("api_key", &redact(&self.api_key))
            .field("api_version", &self.api_version)
            .field("vector_field", &self.vector_field)
            .field("k", &self.k)
            .field("embedding_model", &self.embedding_model)
            .finish()
    }
}

/// The model backends a turn can be answered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    #[default]
    Anthropic,
    #[serde(rename = "openai")]
    OpenAi,
}

impl ModelProvider {
    /// The configuration key for this provider.
    pub fn key(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
        }
    }

    /// Chat model used when the provider section doesn't name one.
    pub fn default_model(self) -> &'static str {
        match self {
            Self::Anthropic => "claude-3-sonnet-20240229",
            Self::OpenAi => "gpt-4o",
        }
    }

    /// Resolve an optional provider key: absent means the default provider.
    pub fn resolve(key: Option<&str>) -> Result<Self, Error> {
        key.map_or(Ok(Self::default()), |k| k.parse())
    }
}

impl FromStr for ModelProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" => Ok(Self::Anthropic),
            "openai" => Ok(Self::OpenAi),
            _ => Err(Error::UnsupportedProvider { name: s.to_string() }),
        }
    }
}

impl fmt::Display for ModelProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl AppConfig {
    /// Load configuration from the default location with env var overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&path)?;
        config.apply_env(|key| std::env::var(key).ok());
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

    /// Apply environment overrides through `lookup`.
    ///
    /// Every variable that is set replaces the file value.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(provider) = lookup("SHOPASSIST_MODEL_PROVIDER") {
            self.model_provider = Some(provider);
        }

        if let Some(key) = lookup("SHOPASSIST_API_KEY") {
            self.api_key = Some(key);
        }

        for (env, provider) in [
            ("ANTHROPIC_API_KEY", ModelProvider::Anthropic),
            ("OPENAI_API_KEY", ModelProvider::OpenAi),
        ] {
            if let Some(key) = lookup(env) {
                let section = self.providers.entry(provider.key().to_string()).or_default();
                section.api_key = Some(key);
            }
        }

        if let Some(endpoint) = lookup("SHOPASSIST_SEARCH_ENDPOINT") {
            self.search.endpoint = Some(endpoint);
        }
        if let Some(key) = lookup("AZURE_SEARCH_KEY") {
            self.search.api_key = Some(key);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".shopassist")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.max_tool_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "max_tool_iterations must be at least 1".into(),
            ));
        }

        if self.retailer_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "retailer_name must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Resolve the model provider for a turn. `override_key` (per-turn
    /// configuration) takes precedence over the file/env value.
    pub fn resolve_model_provider(&self, override_key: Option<&str>) -> Result<ModelProvider, Error> {
        ModelProvider::resolve(override_key.or(self.model_provider.as_deref()))
    }

    /// API key for `provider`: its own section first, then the shared key.
    pub fn provider_api_key(&self, provider: ModelProvider) -> Option<String> {
        self.providers
            .get(provider.key())
            .and_then(|p| p.api_key.clone())
            .or_else(|| self.api_key.clone())
    }

    /// Chat model for `provider`.
    pub fn provider_model(&self, provider: ModelProvider) -> String {
        self.providers
            .get(provider.key())
            .and_then(|p| p.model.clone())
            .unwrap_or_else(|| provider.default_model().to_string())
    }

    /// Custom base URL for `provider`, if configured.
    pub fn provider_api_url(&self, provider: ModelProvider) -> Option<String> {
        self.providers
            .get(provider.key())
            .and_then(|p| p.api_url.clone())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model_provider: None,
            retailer_name: default_retailer_name(),
            temperature: 0.0,
            max_tokens: default_max_tokens(),
            max_tool_iterations: default_max_tool_iterations(),
            providers: HashMap::new(),
            search: SearchConfig::default(),
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

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config {
            message: e.to_string(),
        }
    }
}
